use axum::{
    extract::{Host, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    error::ServiceError,
    storage::{Block, Page, Storage},
};

use super::{
    links::LinkBuilder,
    models::{BlockResponse, ErrorResponse, HealthResponse, PageResponse},
    AppState,
};

pub async fn health<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            uptime_secs,
        }),
    )
}

pub async fn list_pages<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    host: Option<Host>,
) -> Result<Json<Vec<PageResponse>>, ServiceError> {
    log::debug!("request pages list");
    let pages = state.repository.list_pages().await?;

    let host = host.as_ref().map(|Host(host)| host.as_str());
    Ok(Json(
        pages
            .into_iter()
            .map(|page| page_to_response(&state.links, host, page))
            .collect(),
    ))
}

pub async fn list_page_blocks<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    page_slug: Option<Path<String>>,
) -> Result<Json<Vec<BlockResponse>>, ServiceError> {
    let page_slug = page_slug.map(|Path(slug)| slug);
    log::debug!("request page with slug: {:?}", page_slug);

    let blocks = state
        .repository
        .list_blocks_for_page(page_slug.as_deref())
        .await?;
    Ok(Json(blocks.into_iter().map(block_to_response).collect()))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "endpoint not found".to_string(),
        }),
    )
}

fn page_to_response(links: &LinkBuilder, host: Option<&str>, page: Page) -> PageResponse {
    PageResponse {
        link: links.page_link(host, &page.slug),
        name: page.name,
    }
}

fn block_to_response(block: Block) -> BlockResponse {
    BlockResponse {
        id: block.id,
        name: block.name,
        links: block.links,
        viewed_count: block.viewed_count,
    }
}
