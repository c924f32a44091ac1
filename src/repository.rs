use crate::{
    error::ServiceError,
    storage::{Block, Page, Storage},
};

/// Read side of the service: page listings and the page→blocks view workflow.
///
/// Storage backends are synchronous, so every call is moved onto the blocking
/// pool and request tasks only ever wait on the join handle.
#[derive(Clone)]
pub struct ContentRepository<S> {
    storage: S,
}

impl<S: Storage + Clone + Send + Sync + 'static> ContentRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn list_pages(&self) -> Result<Vec<Page>, ServiceError> {
        self.blocking("list pages", |storage| storage.list_pages())
            .await
    }

    /// Resolves `slug`, returns its blocks in link order and counts one view
    /// for each of them.
    ///
    /// The view counter is bookkeeping: if the batch update fails or touches
    /// fewer rows than were read, the error is logged and the blocks are
    /// returned with the counts as read.
    pub async fn list_blocks_for_page(&self, slug: Option<&str>) -> Result<Vec<Block>, ServiceError> {
        // Blank means missing; anything else is looked up verbatim.
        let slug = slug
            .filter(|s| !s.trim().is_empty())
            .ok_or(ServiceError::InvalidInput("page slug is required"))?
            .to_string();

        let lookup = slug.clone();
        let page = self
            .blocking("load page", move |storage| storage.load_page_by_slug(&lookup))
            .await?
            .ok_or_else(|| {
                log::debug!("page {} does not exist", slug);
                ServiceError::NotFound(slug.clone())
            })?;

        let page_id = page.id;
        let mut blocks = self
            .blocking("list page blocks", move |storage| {
                storage.list_page_blocks(page_id)
            })
            .await?;
        if blocks.is_empty() {
            return Ok(blocks);
        }

        let ids: Vec<i64> = blocks.iter().map(|b| b.id).collect();
        let expected = ids.len();
        match self
            .blocking("increment viewed counts", move |storage| {
                storage.increment_viewed_counts(&ids)
            })
            .await
        {
            Ok(updated) if updated == expected => {
                for block in blocks.iter_mut() {
                    block.viewed_count += 1;
                }
            }
            Ok(updated) => log::error!(
                "for page {} the blocks viewing update is partial: {} of {} rows",
                page.slug,
                updated,
                expected
            ),
            Err(_) => log::error!("for page {} the blocks viewing update failed", page.slug),
        }

        Ok(blocks)
    }

    async fn blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&S) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.storage.clone();
        let result = match tokio::task::spawn_blocking(move || f(&storage)).await {
            Ok(result) => result,
            Err(err) => Err(anyhow::Error::new(err)),
        };
        result.map_err(|err| {
            log::error!("storage error during {}: {:#}", operation, err);
            ServiceError::storage(operation, err)
        })
    }
}
