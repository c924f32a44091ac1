mod block;
#[cfg(test)]
pub mod memory;
mod page;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Block, Page, PageBlockLink, Slug, Storage, StorageRead, StorageTx, StorageWrite};
