#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::Command as ProcCommand;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tempfile::TempDir;

pub fn db_path(data_dir: &TempDir) -> PathBuf {
    data_dir.path().join("aggregator.sqlite")
}

pub fn base_cmd(db_path: &Path) -> ProcCommand {
    let mut command = ProcCommand::new(env!("CARGO_BIN_EXE_content-aggregator"));
    command
        .env("AGGREGATOR_CONFIG", "/nonexistent/aggregator.env")
        .env("RUST_LOG", "info")
        .arg("--db-path")
        .arg(db_path);
    command
}

pub fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr")
}

/// Client that leaves redirects to the caller so `302 → /redirect` stays visible.
pub fn http_client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build http client")
}

pub fn wait_until_ready(client: &Client, addr: SocketAddr) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while Instant::now() < deadline {
        if let Ok(response) = client.get(format!("http://{addr}/health")).send() {
            if response.status().is_success() {
                return;
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    panic!("server at {addr} did not become ready");
}
