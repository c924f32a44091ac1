use serde_json::Value;

pub use super::block::{Block, PageBlockLink};
pub use super::page::{Page, Slug};

pub trait StorageRead {
    /// All pages, ascending by `order_by`.
    fn list_pages(&self) -> anyhow::Result<Vec<Page>>;
    fn load_page_by_slug(&self, slug: &str) -> anyhow::Result<Option<Page>>;
    /// Blocks linked to `page_id`, ascending by the link's `order_by`.
    fn list_page_blocks(&self, page_id: i64) -> anyhow::Result<Vec<Block>>;
}

pub trait StorageWrite {
    fn insert_page(&self, name: &str, slug: &Slug, order_by: i64) -> anyhow::Result<Page>;
    fn insert_block(&self, name: &str, links: &Value, viewed_count: i64) -> anyhow::Result<Block>;
    fn link_block(&self, link: &PageBlockLink) -> anyhow::Result<()>;
    /// Adds one view to every listed block in a single statement and returns
    /// the number of rows touched.
    fn increment_viewed_counts(&self, block_ids: &[i64]) -> anyhow::Result<usize>;
}

pub trait StorageTx: StorageRead + StorageWrite {
    fn commit(self) -> anyhow::Result<()>;
}

pub trait Storage: StorageRead + StorageWrite {
    type Tx: StorageTx;

    fn begin_tx(&self) -> anyhow::Result<Self::Tx>;
}
