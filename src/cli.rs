use clap::{Parser, Subcommand};
use std::{env, net::SocketAddr, path::PathBuf};

use crate::logging::LogHandler;

pub const ENV_PREFIX: &str = "AGGREGATOR_";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or upgrade the database schema, then exit
    Migrate {
        #[arg(long, default_value_t = false, help = "Also insert the sample pages and blocks")]
        fixture: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Serve pages and their content blocks over HTTP",
    long_about = "A small read-only content service: lists pages and, per page, the blocks attached to it while counting block views.\n\nEvery option can also be set through an AGGREGATOR_-prefixed environment variable or in the dotenv file named by AGGREGATOR_CONFIG (default .env).",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    #[arg(
        long,
        env = "AGGREGATOR_DB_PATH",
        default_value = ".aggregator/aggregator.sqlite",
        value_name = "PATH",
        help = "SQLite database file"
    )]
    pub db_path: PathBuf,

    #[arg(
        long,
        default_value_t = false,
        help = "Reset all persisted state (delete the SQLite database) before starting"
    )]
    pub reset: bool,

    #[arg(
        long,
        env = "AGGREGATOR_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8080",
        help = "REST API listen address (host:port)"
    )]
    pub listen: SocketAddr,

    #[arg(
        long,
        env = "AGGREGATOR_PUBLIC_URL",
        value_name = "URL",
        help = "Base URL used for page links (defaults to the request Host)"
    )]
    pub public_url: Option<String>,

    #[arg(
        long,
        env = "AGGREGATOR_REQUEST_TIMEOUT_SECS",
        default_value_t = 30,
        value_name = "SECS",
        help = "Abort requests that take longer than SECS"
    )]
    pub request_timeout_secs: u64,

    #[arg(
        long,
        env = "AGGREGATOR_LOG_LEVEL",
        default_value = "info",
        value_name = "FILTER",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,

    #[arg(
        long,
        env = "AGGREGATOR_LOG_HANDLER",
        value_enum,
        default_value_t = LogHandler::Console,
        help = "Where logs go besides stderr"
    )]
    pub log_handler: LogHandler,

    #[arg(
        long = "log-file",
        env = "AGGREGATOR_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (file handler)"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        env = "AGGREGATOR_LOGSTASH_HOST",
        value_name = "HOST",
        help = "Logstash TCP input host (logstash handler)"
    )]
    pub logstash_host: Option<String>,

    #[arg(
        long,
        env = "AGGREGATOR_LOGSTASH_PORT",
        default_value_t = 5959,
        value_name = "PORT",
        help = "Logstash TCP input port"
    )]
    pub logstash_port: u16,

    #[arg(
        long,
        env = "AGGREGATOR_LOG_TAG",
        default_value = "DemoAggregatorServer",
        help = "Service tag attached to every log record"
    )]
    pub log_tag: String,

    #[arg(
        long,
        env = "AGGREGATOR_LOG_WORKER",
        default_value = "ServerAggregator",
        help = "Worker name attached to every log record"
    )]
    pub log_worker: String,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

/// Loads the dotenv file before parsing so its values back the `env` options.
/// Variables already set in the environment take precedence.
pub fn parse() -> Cli {
    let dotenv_path = env::var(format!("{ENV_PREFIX}CONFIG")).unwrap_or(".env".into());
    if dotenvy::from_filename(&dotenv_path).is_ok() {
        eprintln!("Loaded env from {}", dotenv_path);
    }

    Cli::parse()
}
