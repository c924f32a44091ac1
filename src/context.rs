use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{bail, Context as _};
use url::Url;

use crate::logging::{LogContext, LogHandler, LogSettings};

/// Resolved runtime configuration.
pub struct Context {
    pub db_path: PathBuf,
    pub reset: bool,
    pub listen: SocketAddr,
    pub public_url: Option<Url>,
    pub request_timeout: Duration,
    pub log: LogSettings,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> anyhow::Result<Self> {
        let public_url = cli
            .public_url
            .as_deref()
            .map(parse_public_url)
            .transpose()?;

        if cli.request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }

        let logstash = cli
            .logstash_host
            .clone()
            .map(|host| (host, cli.logstash_port));
        match cli.log_handler {
            LogHandler::File if cli.log_file.is_none() => {
                bail!("--log-file is required with the file log handler")
            }
            LogHandler::Logstash if logstash.is_none() => {
                bail!("--logstash-host is required with the logstash log handler")
            }
            _ => {}
        }

        let probe = logstash
            .as_ref()
            .map(|(host, port)| (host.as_str(), *port));
        let context = LogContext::new(&cli.log_tag, &cli.log_worker, probe);

        Ok(Self {
            db_path: cli.db_path.clone(),
            reset: cli.reset,
            listen: cli.listen,
            public_url,
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            log: LogSettings {
                level: cli.log_level.clone(),
                handler: cli.log_handler,
                log_file: cli.log_file.clone(),
                logstash,
                context,
            },
        })
    }
}

fn parse_public_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid public URL {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        bail!("public URL must be an http(s) URL, got {raw:?}");
    }
    Ok(url)
}
