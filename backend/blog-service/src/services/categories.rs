/// Category service - category deletion cascade and cached listings
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::reassignment::{CascadeError, ReassignmentEngine, ReassignmentReport};
use super::validation::{authorize_deletion, validate_deletion, ValidatedDeletion};
use crate::cache::CategoryCache;
use crate::config::{CascadeMode, CategoryConfig};
use crate::metrics::categories::{
    CATEGORY_CASCADE_DURATION_SECONDS, CATEGORY_DELETIONS_TOTAL, CATEGORY_POSTS_REASSIGNED_TOTAL,
};
use crate::models::{ActionResult, Category, CategoryListQuery, CategoryPage};
use crate::store::{LinkStore, LinkTransaction, StoreError, UserDirectory};

pub const DELETE_SUCCESS_MESSAGE: &str = "The category was successfully deleted!";

#[derive(Debug, thiserror::Error)]
pub enum DeletionError {
    #[error("Unauthorized!")]
    Unauthorized,

    #[error("There are no category for deleting!")]
    NotFound,

    #[error("You have no permission to delete this category!")]
    Forbidden,

    #[error("Cannot delete \"{name}\" category!")]
    CannotDeleteFallback { name: String },

    #[error("There is no \"{name}\" category to link post with!")]
    FallbackMissing { name: String },

    #[error("Failed to update post categories before deleting category!")]
    PartialFailure(#[source] CascadeError),

    #[error("Failed to delete category!")]
    Store(#[from] StoreError),
}

impl DeletionError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DeletionError::Unauthorized => "unauthorized",
            DeletionError::NotFound => "not_found",
            DeletionError::Forbidden => "forbidden",
            DeletionError::CannotDeleteFallback { .. } => "cannot_delete_fallback",
            DeletionError::FallbackMissing { .. } => "fallback_missing",
            DeletionError::PartialFailure(_) => "partial_failure",
            DeletionError::Store(_) => "store_failure",
        }
    }
}

/// Progress of one deletion; a failure reports the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStage {
    Start,
    Authorized,
    Validated,
    Reassigned,
    Deleted,
}

impl fmt::Display for DeletionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeletionStage::Start => "start",
            DeletionStage::Authorized => "authorized",
            DeletionStage::Validated => "validated",
            DeletionStage::Reassigned => "reassigned",
            DeletionStage::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DeletionSuccess {
    pub category: Category,
    pub fallback: Category,
    pub report: ReassignmentReport,
    pub stale_links_removed: u64,
}

/// A deletion outcome rendered as the two-outcome result callers expect.
pub fn action_result(result: &Result<DeletionSuccess, DeletionError>) -> ActionResult {
    match result {
        Ok(_) => ActionResult::Success(DELETE_SUCCESS_MESSAGE.to_string()),
        Err(err) => ActionResult::Error(err.to_string()),
    }
}

struct CascadeOutcome {
    report: ReassignmentReport,
    stale_links_removed: u64,
}

pub struct CategoryService {
    store: Arc<dyn LinkStore>,
    users: Arc<dyn UserDirectory>,
    engine: ReassignmentEngine,
    mode: CascadeMode,
    fallback_name: String,
    cache: Option<Arc<CategoryCache>>,
}

impl CategoryService {
    pub fn new(
        store: Arc<dyn LinkStore>,
        users: Arc<dyn UserDirectory>,
        config: &CategoryConfig,
    ) -> Self {
        Self {
            store,
            users,
            engine: ReassignmentEngine::new(config.reassign_concurrency),
            mode: config.cascade_mode,
            fallback_name: config.fallback_name.clone(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CategoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Delete a category, keeping every one of its posts categorized.
    pub async fn delete_category(
        &self,
        requester_id: Option<Uuid>,
        category_id: Uuid,
    ) -> Result<DeletionSuccess, DeletionError> {
        let mut stage = DeletionStage::Start;
        let result = self.run_deletion(requester_id, category_id, &mut stage).await;

        match &result {
            Ok(success) => {
                CATEGORY_DELETIONS_TOTAL.with_label_values(&["success"]).inc();
                for (action, count) in [
                    ("relinked", success.report.relinked.len()),
                    ("retained", success.report.retained.len()),
                    ("skipped", success.report.skipped.len()),
                ] {
                    CATEGORY_POSTS_REASSIGNED_TOTAL
                        .with_label_values(&[action])
                        .inc_by(count as u64);
                }
                info!(
                    %category_id,
                    requester_id = ?requester_id,
                    category = %success.category.name,
                    relinked = success.report.relinked.len(),
                    retained = success.report.retained.len(),
                    skipped = success.report.skipped.len(),
                    stale_links_removed = success.stale_links_removed,
                    mode = self.mode.as_str(),
                    "Category deleted"
                );
            }
            Err(err) => {
                CATEGORY_DELETIONS_TOTAL
                    .with_label_values(&[err.kind()])
                    .inc();
                match err {
                    DeletionError::PartialFailure(_) | DeletionError::Store(_) => warn!(
                        %category_id,
                        requester_id = ?requester_id,
                        %stage,
                        kind = err.kind(),
                        error = ?err,
                        "Category deletion failed"
                    ),
                    _ => info!(
                        %category_id,
                        requester_id = ?requester_id,
                        %stage,
                        kind = err.kind(),
                        "Category deletion rejected"
                    ),
                }
            }
        }

        result
    }

    /// Category listing served through the read-through cache when present.
    pub async fn list_categories(
        &self,
        query: &CategoryListQuery,
    ) -> Result<Arc<CategoryPage>, StoreError> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_load(query, || self.store.list_categories(query))
                    .await
            }
            None => Ok(Arc::new(self.store.list_categories(query).await?)),
        }
    }

    async fn run_deletion(
        &self,
        requester_id: Option<Uuid>,
        category_id: Uuid,
        stage: &mut DeletionStage,
    ) -> Result<DeletionSuccess, DeletionError> {
        let authorized = authorize_deletion(
            self.store.as_ref(),
            self.users.as_ref(),
            requester_id,
            category_id,
        )
        .await?;
        *stage = DeletionStage::Authorized;

        let validated =
            validate_deletion(self.store.as_ref(), authorized, &self.fallback_name).await?;
        *stage = DeletionStage::Validated;

        let started = Instant::now();
        let outcome = match self.mode {
            CascadeMode::Transactional => self.cascade_transactional(&validated, stage).await?,
            CascadeMode::Concurrent => self.cascade_concurrent(&validated, stage).await?,
        };
        CATEGORY_CASCADE_DURATION_SECONDS
            .with_label_values(&[self.mode.as_str()])
            .observe(started.elapsed().as_secs_f64());
        *stage = DeletionStage::Deleted;

        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }

        Ok(DeletionSuccess {
            category: validated.category,
            fallback: validated.fallback,
            report: outcome.report,
            stale_links_removed: outcome.stale_links_removed,
        })
    }

    /// Reassign, drop stale links and delete the row in one transaction.
    async fn cascade_transactional(
        &self,
        validated: &ValidatedDeletion,
        stage: &mut DeletionStage,
    ) -> Result<CascadeOutcome, DeletionError> {
        let mut tx = self.store.begin().await?;

        match self.cascade_in(tx.as_mut(), validated, stage).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        category_id = %validated.category.id,
                        error = %rollback_err,
                        "Category cascade rollback failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn cascade_in(
        &self,
        tx: &mut dyn LinkTransaction,
        validated: &ValidatedDeletion,
        stage: &mut DeletionStage,
    ) -> Result<CascadeOutcome, DeletionError> {
        let category_id = validated.category.id;

        // Another request may have removed it since validation.
        if tx.lock_category(category_id).await?.is_none() {
            return Err(DeletionError::NotFound);
        }

        let posts = tx.find_post_ids_linked_to_category(category_id).await?;
        // Link counts are only stable while the posts are held.
        tx.lock_posts(&posts).await?;

        let report = self
            .engine
            .reassign_in_transaction(tx, &posts, category_id, validated.fallback.id)
            .await
            .map_err(DeletionError::PartialFailure)?;
        *stage = DeletionStage::Reassigned;

        let stale_links_removed = self.engine.remove_stale_links(tx, category_id).await?;
        ensure_posts_linked(tx, &posts).await?;
        if !tx.delete_category(category_id).await? {
            return Err(DeletionError::NotFound);
        }

        Ok(CascadeOutcome {
            report,
            stale_links_removed,
        })
    }

    /// Fan the per-post updates out against the pool, then drop stale links
    /// and the row together. A failed fan-out leaves its successful updates
    /// committed and the category in place. The final transaction holds the
    /// posts and refuses to orphan any of them.
    async fn cascade_concurrent(
        &self,
        validated: &ValidatedDeletion,
        stage: &mut DeletionStage,
    ) -> Result<CascadeOutcome, DeletionError> {
        let category_id = validated.category.id;

        let posts = self
            .store
            .find_post_ids_linked_to_category(category_id)
            .await?;
        let report = self
            .engine
            .reassign(
                self.store.as_ref(),
                &posts,
                category_id,
                validated.fallback.id,
            )
            .await
            .map_err(DeletionError::PartialFailure)?;
        *stage = DeletionStage::Reassigned;

        let mut tx = self.store.begin().await?;
        let removal = async {
            tx.lock_posts(&posts).await?;
            let removed = self.engine.remove_stale_links(tx.as_mut(), category_id).await?;
            ensure_posts_linked(tx.as_mut(), &posts).await?;
            let deleted = tx.delete_category(category_id).await?;
            Ok::<_, DeletionError>((removed, deleted))
        }
        .await;

        match removal {
            Ok((stale_links_removed, true)) => {
                tx.commit().await?;
                Ok(CascadeOutcome {
                    report,
                    stale_links_removed,
                })
            }
            Ok((_, false)) => {
                tx.rollback().await?;
                Err(DeletionError::NotFound)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        %category_id,
                        error = %rollback_err,
                        "Category delete rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Fails when any of `posts` has no link left inside `tx`.
async fn ensure_posts_linked(
    tx: &mut dyn LinkTransaction,
    posts: &[Uuid],
) -> Result<(), DeletionError> {
    let orphaned = tx.find_unlinked_posts(posts).await?;
    if orphaned.is_empty() {
        Ok(())
    } else {
        Err(DeletionError::PartialFailure(CascadeError::Orphaned {
            posts: orphaned,
        }))
    }
}
