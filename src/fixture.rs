use std::str::FromStr;

use anyhow::{Context as _, Result};
use serde_json::json;

use crate::storage::{PageBlockLink, Slug, Storage, StorageRead, StorageTx, StorageWrite};

const SAMPLE_LINKS: &str = "https://www.youtube.com/";

struct SamplePage {
    name: &'static str,
    slug: &'static str,
    order_by: i64,
    /// (block name, order of the block on this page)
    blocks: &'static [(&'static str, i64)],
}

const SAMPLE_PAGES: &[SamplePage] = &[
    SamplePage {
        name: "main_page",
        slug: "main_page_slug",
        order_by: 10,
        blocks: &[("first_block", 20), ("second_block", 10)],
    },
    SamplePage {
        name: "second_page",
        slug: "second_page_slug",
        order_by: 20,
        blocks: &[("third_block", 10)],
    },
];

/// Inserts the sample pages and blocks in one transaction.
///
/// Returns `false` without writing anything when the sample data is already present.
pub fn load<S: Storage>(storage: &S) -> Result<bool> {
    let tx = storage.begin_tx().context("starting fixture transaction")?;

    if tx.load_page_by_slug(SAMPLE_PAGES[0].slug)?.is_some() {
        log::info!("Fixture already present, skipping");
        return Ok(false);
    }

    for sample in SAMPLE_PAGES {
        let slug = Slug::from_str(sample.slug)?;
        let page = tx
            .insert_page(sample.name, &slug, sample.order_by)
            .with_context(|| format!("inserting page {}", sample.slug))?;
        for (name, order_by) in sample.blocks {
            let block = tx.insert_block(name, &json!(SAMPLE_LINKS), 0)?;
            tx.link_block(&PageBlockLink::new(page.id, block.id, *order_by))?;
        }
        log::info!(
            "Fixture page {} with {} blocks",
            page.slug,
            sample.blocks.len()
        );
    }

    tx.commit()?;
    Ok(true)
}
