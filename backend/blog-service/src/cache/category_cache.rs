use moka::future::Cache;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::metrics::categories::CATEGORY_CACHE_EVENTS;
use crate::models::{CategoryListQuery, CategoryPage};
use crate::store::StoreResult;

/// Read-through cache of category listings
pub struct CategoryCache {
    entries: Cache<CategoryListQuery, Arc<CategoryPage>>,
    /// Bumped on every invalidation; loads that straddle one are not stored.
    generation: AtomicU64,
}

impl CategoryCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the cached page for `query`, or run `load` and cache its result.
    /// Load errors are returned as-is and nothing is cached.
    pub async fn get_or_load<F, Fut>(
        &self,
        query: &CategoryListQuery,
        load: F,
    ) -> StoreResult<Arc<CategoryPage>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<CategoryPage>>,
    {
        if let Some(page) = self.entries.get(query).await {
            CATEGORY_CACHE_EVENTS.with_label_values(&["hit"]).inc();
            debug!(?query, "Category cache HIT");
            return Ok(page);
        }

        CATEGORY_CACHE_EVENTS.with_label_values(&["miss"]).inc();
        debug!(?query, "Category cache MISS");

        let generation = self.generation.load(Ordering::Acquire);
        let page = Arc::new(load().await?);

        if self.generation.load(Ordering::Acquire) == generation {
            self.entries.insert(query.clone(), page.clone()).await;
        }

        Ok(page)
    }

    /// Drop every cached listing.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate_all();
        CATEGORY_CACHE_EVENTS.with_label_values(&["invalidate"]).inc();
    }

    pub async fn contains(&self, query: &CategoryListQuery) -> bool {
        self.entries.get(query).await.is_some()
    }
}
