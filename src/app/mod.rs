mod wiring;

use crate::{cli, context, fixture, logging, rest, storage};
use anyhow::{Context as AnyhowContext, Result};
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: storage::SqliteStorage,
    _log_guard: logging::LogGuard,
}

impl App {
    pub fn from_cli() -> Result<(Self, cli::Cli)> {
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli)?;

        let log_guard = logging::init(&ctx.log).context("initializing logging")?;
        log::info!("🚀 Starting content aggregator");
        log::info!(
            "🏷️ Log context: tag={} worker={} host={}",
            ctx.log.context.tag,
            ctx.log.context.worker,
            ctx.log.context.host
        );
        log::info!("📂 Database: {}", ctx.db_path.display());

        let storage = wiring::init_storage(&ctx)?;

        Ok((
            Self {
                ctx,
                storage,
                _log_guard: log_guard,
            },
            cli,
        ))
    }
}

pub async fn run_daemon(app: App) -> Result<()> {
    log::info!("🌐 REST API: http://{}", app.ctx.listen);
    log::info!("⏱️ Request timeout: {:?}", app.ctx.request_timeout);
    if let Some(url) = &app.ctx.public_url {
        log::info!("🔗 Public URL: {}", url);
    }
    if let Some(path) = app.ctx.log.log_file.as_deref() {
        log::info!("📝 Log file: {}", path.display());
    }

    let shutdown = CancellationToken::new();

    let state = wiring::build_state(&app.ctx, app.storage.clone())?;
    let addr = app.ctx.listen;
    let timeout = app.ctx.request_timeout;
    let rest_shutdown = shutdown.clone();
    let mut rest_handle =
        tokio::spawn(async move { rest::serve(addr, state, timeout, rest_shutdown).await });

    let early_exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("🧨 Ctrl-C received, shutting down");
            None
        }
        result = &mut rest_handle => Some(result),
    };

    shutdown.cancel();
    let rest_result = match early_exit {
        Some(result) => result,
        None => rest_handle.await,
    };

    // The server has drained, so no request still holds the connection.
    app.storage.close().context("closing storage")?;

    match rest_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::error!("REST server error: {:#}", e);
            return Err(e);
        }
        Err(e) => {
            log::error!("REST task failed: {}", e);
            return Err(e.into());
        }
    }

    log::info!("✅ Shutdown complete");
    Ok(())
}

pub fn run_migrate(app: App, with_fixture: bool) -> Result<()> {
    log::info!("🛠️ Schema is up to date");
    if with_fixture && fixture::load(&app.storage).context("loading fixture")? {
        log::info!("🌱 Fixture loaded");
    }
    app.storage.close().context("closing storage")?;
    Ok(())
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    if let Some(cmd) = &cli.cmd {
        // one-shot command mode
        return match cmd {
            cli::Command::Migrate { fixture } => run_migrate(app, *fixture),
        };
    }

    run_daemon(app).await
}
