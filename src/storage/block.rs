use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: i64,
    pub name: String,
    /// Opaque payload; stored as JSON text and never interpreted.
    pub links: Value,
    pub viewed_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageBlockLink {
    pub page_id: i64,
    pub block_id: i64,
    pub order_by: i64,
}

impl PageBlockLink {
    pub fn new(page_id: i64, block_id: i64, order_by: i64) -> Self {
        Self {
            page_id,
            block_id,
            order_by,
        }
    }
}
