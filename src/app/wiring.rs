use anyhow::{Context, Result};

use crate::{
    context,
    rest::{AppState, LinkBuilder},
    storage,
};

pub fn init_storage(ctx: &context::Context) -> Result<storage::SqliteStorage> {
    let sqlite = storage::SqliteStorage::new(&ctx.db_path);
    if ctx.reset {
        sqlite.reset_all().context("resetting storage")?;
    }
    sqlite.init().context("initializing storage")?;
    Ok(sqlite)
}

pub fn build_state(
    ctx: &context::Context,
    storage: storage::SqliteStorage,
) -> Result<AppState<storage::SqliteStorage>> {
    let links = LinkBuilder::new(ctx.public_url.clone(), ctx.listen)
        .context("building page link base")?;
    Ok(AppState::new(storage, links, ctx.log.context.span()))
}
