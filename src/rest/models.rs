use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse {
    pub name: String,
    pub link: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockResponse {
    pub id: i64,
    pub name: String,
    pub links: Value,
    pub viewed_count: i64,
}
