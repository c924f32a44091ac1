use std::{
    net::SocketAddr,
    time::{Duration, SystemTime},
};

use axum::{extract::Request, routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{repository::ContentRepository, storage::Storage};

mod error;
mod handlers;
mod links;
mod models;

pub use links::LinkBuilder;

use handlers::{health, list_page_blocks, list_pages, not_found};

#[derive(Clone)]
pub struct AppState<S: Storage> {
    pub repository: ContentRepository<S>,
    pub links: LinkBuilder,
    pub started_at: SystemTime,
    /// Root span carrying the service tag, worker and host; parent of every request span.
    pub span: tracing::Span,
}

impl<S: Storage + Clone + Send + Sync + 'static> AppState<S> {
    pub fn new(storage: S, links: LinkBuilder, span: tracing::Span) -> Self {
        Self {
            repository: ContentRepository::new(storage),
            links,
            started_at: SystemTime::now(),
            span,
        }
    }
}

pub fn router<S: Storage + Clone + Send + Sync + 'static>(
    state: AppState<S>,
    request_timeout: Duration,
) -> Router {
    let root = state.span.clone();

    Router::new()
        .route("/health", get(health::<S>))
        .route("/pages", get(list_pages::<S>))
        .route("/page", get(list_page_blocks::<S>))
        .route("/page/", get(list_page_blocks::<S>))
        .route("/page/:page_slug", get(list_page_blocks::<S>))
        .fallback(not_found)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http().make_span_with(move |request: &Request| {
                tracing::info_span!(
                    parent: &root,
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

pub async fn serve<S: Storage + Clone + Send + Sync + 'static>(
    addr: SocketAddr,
    state: AppState<S>,
    request_timeout: Duration,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    let app = router(state, request_timeout);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 REST listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
