//! In-memory storage used by repository and handler tests.

use anyhow::anyhow;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, RwLock,
};

use super::traits::{
    Block, Page, PageBlockLink, Slug, Storage, StorageRead, StorageTx, StorageWrite,
};

#[derive(Default)]
struct Tables {
    pages: Vec<Page>,
    blocks: Vec<Block>,
    links: Vec<PageBlockLink>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_increments: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Number of storage calls made so far, writes included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_increments(&self) {
        self.fail_increments.store(true, Ordering::SeqCst);
    }

    /// Deletes a block without touching links, leaving a dangling link behind.
    pub fn drop_block_row(&self, block_id: i64) {
        let mut tables = self.tables.write().unwrap();
        tables.blocks.retain(|b| b.id != block_id);
    }

    pub fn block(&self, block_id: i64) -> Option<Block> {
        let tables = self.tables.read().unwrap();
        tables.blocks.iter().find(|b| b.id == block_id).cloned()
    }

    fn read(&self) -> anyhow::Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.tables.read().unwrap())
    }
}

impl StorageRead for MemoryStorage {
    fn list_pages(&self) -> anyhow::Result<Vec<Page>> {
        let tables = self.read()?;
        let mut pages = tables.pages.clone();
        pages.sort_by_key(|p| (p.order_by, p.id));
        Ok(pages)
    }

    fn load_page_by_slug(&self, slug: &str) -> anyhow::Result<Option<Page>> {
        let tables = self.read()?;
        Ok(tables
            .pages
            .iter()
            .find(|p| p.slug.as_str() == slug)
            .cloned())
    }

    fn list_page_blocks(&self, page_id: i64) -> anyhow::Result<Vec<Block>> {
        let tables = self.read()?;
        let mut linked: Vec<_> = tables
            .links
            .iter()
            .filter(|l| l.page_id == page_id)
            .collect();
        linked.sort_by_key(|l| (l.order_by, l.block_id));
        // A dangling link yields a blank placeholder block, so a later increment
        // touches fewer rows than were read.
        Ok(linked
            .into_iter()
            .map(|l| {
                tables
                    .blocks
                    .iter()
                    .find(|b| b.id == l.block_id)
                    .cloned()
                    .unwrap_or(Block {
                        id: l.block_id,
                        name: String::new(),
                        links: Value::Null,
                        viewed_count: 0,
                    })
            })
            .collect())
    }
}

impl StorageWrite for MemoryStorage {
    fn insert_page(&self, name: &str, slug: &Slug, order_by: i64) -> anyhow::Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().unwrap();
        if tables.pages.iter().any(|p| &p.slug == slug) {
            return Err(anyhow!("duplicate slug {slug}"));
        }
        tables.next_id += 1;
        let page = Page {
            id: tables.next_id,
            name: name.to_string(),
            slug: slug.clone(),
            order_by,
        };
        tables.pages.push(page.clone());
        Ok(page)
    }

    fn insert_block(&self, name: &str, links: &Value, viewed_count: i64) -> anyhow::Result<Block> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().unwrap();
        tables.next_id += 1;
        let block = Block {
            id: tables.next_id,
            name: name.to_string(),
            links: links.clone(),
            viewed_count,
        };
        tables.blocks.push(block.clone());
        Ok(block)
    }

    fn link_block(&self, link: &PageBlockLink) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().unwrap();
        if tables
            .links
            .iter()
            .any(|l| l.page_id == link.page_id && l.block_id == link.block_id)
        {
            return Err(anyhow!("duplicate link"));
        }
        tables.links.push(link.clone());
        Ok(())
    }

    fn increment_viewed_counts(&self, block_ids: &[i64]) -> anyhow::Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(anyhow!("database is locked"));
        }
        let mut tables = self.tables.write().unwrap();
        let mut updated = 0;
        for block in tables.blocks.iter_mut() {
            if block_ids.contains(&block.id) {
                block.viewed_count += 1;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

impl Storage for MemoryStorage {
    type Tx = NoopTx;

    fn begin_tx(&self) -> anyhow::Result<Self::Tx> {
        Err(anyhow!("transactions not supported in memory storage"))
    }
}

pub struct NoopTx;

impl StorageRead for NoopTx {
    fn list_pages(&self) -> anyhow::Result<Vec<Page>> {
        Err(anyhow!("not implemented"))
    }

    fn load_page_by_slug(&self, _slug: &str) -> anyhow::Result<Option<Page>> {
        Err(anyhow!("not implemented"))
    }

    fn list_page_blocks(&self, _page_id: i64) -> anyhow::Result<Vec<Block>> {
        Err(anyhow!("not implemented"))
    }
}

impl StorageWrite for NoopTx {
    fn insert_page(&self, _name: &str, _slug: &Slug, _order_by: i64) -> anyhow::Result<Page> {
        Err(anyhow!("not implemented"))
    }

    fn insert_block(
        &self,
        _name: &str,
        _links: &Value,
        _viewed_count: i64,
    ) -> anyhow::Result<Block> {
        Err(anyhow!("not implemented"))
    }

    fn link_block(&self, _link: &PageBlockLink) -> anyhow::Result<()> {
        Err(anyhow!("not implemented"))
    }

    fn increment_viewed_counts(&self, _block_ids: &[i64]) -> anyhow::Result<usize> {
        Err(anyhow!("not implemented"))
    }
}

impl StorageTx for NoopTx {
    fn commit(self) -> anyhow::Result<()> {
        Ok(())
    }
}
