mod app;
mod cli;
mod context;
mod error;
mod fixture;
mod logging;
mod repository;
mod rest;
mod storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
