/// Category reassignment engine
///
/// Keeps every post linked to a category that is about to be deleted
/// categorized: a post whose only link points at the deleted category has that
/// link rewritten to the fallback category. Posts with other links are left
/// alone here; their link to the deleted category is removed by
/// `remove_stale_links` right before the category row goes away.
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{LinkStore, LinkTransaction, StoreError};

/// What the engine does with one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// The post's single link was moved to the fallback category.
    Relink,
    /// The post keeps other links; nothing to rewrite.
    Retain,
    /// The input was stale (no links, or the link had already moved).
    Skip,
}

impl LinkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkAction::Relink => "relinked",
            LinkAction::Retain => "retained",
            LinkAction::Skip => "skipped",
        }
    }
}

/// Decide from a post's current link count.
pub fn plan_for_link_count(count: i64) -> LinkAction {
    match count {
        1 => LinkAction::Relink,
        c if c > 1 => LinkAction::Retain,
        _ => LinkAction::Skip,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassignmentReport {
    pub relinked: Vec<Uuid>,
    pub retained: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
}

impl ReassignmentReport {
    fn record(&mut self, post_id: Uuid, action: LinkAction) {
        match action {
            LinkAction::Relink => self.relinked.push(post_id),
            LinkAction::Retain => self.retained.push(post_id),
            LinkAction::Skip => self.skipped.push(post_id),
        }
    }

    pub fn total(&self) -> usize {
        self.relinked.len() + self.retained.len() + self.skipped.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// Concurrent mode: some per-post updates failed, the rest may be committed.
    #[error("{failed} of {total} post category updates failed")]
    PartialFailure {
        failed: usize,
        total: usize,
        #[source]
        first: StoreError,
    },

    /// Transactional mode: the batch stopped at the first failing post.
    #[error("post category update failed for post {post_id}")]
    Aborted {
        post_id: Uuid,
        #[source]
        source: StoreError,
    },

    /// Removing the stale links would leave these posts with no category,
    /// e.g. a concurrent deletion already took their other category away.
    #[error("{} posts would be left without a category", posts.len())]
    Orphaned { posts: Vec<Uuid> },
}

#[derive(Debug, Clone)]
pub struct ReassignmentEngine {
    concurrency: usize,
}

impl Default for ReassignmentEngine {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReassignmentEngine {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Fan the per-post work out against the pool and wait for all of it.
    ///
    /// Updates are not wrapped in a transaction: when some fail, the ones that
    /// already succeeded stay committed.
    pub async fn reassign(
        &self,
        store: &dyn LinkStore,
        posts_in_category: &[Uuid],
        deleted_category_id: Uuid,
        fallback_category_id: Uuid,
    ) -> Result<ReassignmentReport, CascadeError> {
        let posts = unique_posts(posts_in_category);
        let total = posts.len();

        let outcomes: Vec<(Uuid, Result<LinkAction, StoreError>)> = stream::iter(posts)
            .map(|post_id| async move {
                let outcome =
                    relink_with_store(store, post_id, deleted_category_id, fallback_category_id)
                        .await;
                (post_id, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ReassignmentReport::default();
        let mut failed = 0usize;
        let mut first_error = None;

        for (post_id, outcome) in outcomes {
            match outcome {
                Ok(action) => report.record(post_id, action),
                Err(err) => {
                    warn!(%post_id, error = %err, "post category update failed");
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(first) => Err(CascadeError::PartialFailure {
                failed,
                total,
                first,
            }),
            None => Ok(report),
        }
    }

    /// Same decision per post, run sequentially inside `tx`. Stops at the
    /// first failure; the caller is expected to roll the transaction back.
    pub async fn reassign_in_transaction(
        &self,
        tx: &mut dyn LinkTransaction,
        posts_in_category: &[Uuid],
        deleted_category_id: Uuid,
        fallback_category_id: Uuid,
    ) -> Result<ReassignmentReport, CascadeError> {
        let mut report = ReassignmentReport::default();

        for post_id in unique_posts(posts_in_category) {
            let action = relink_in_transaction(tx, post_id, deleted_category_id, fallback_category_id)
                .await
                .map_err(|source| CascadeError::Aborted { post_id, source })?;
            report.record(post_id, action);
        }

        Ok(report)
    }

    /// Delete every link still pointing at `category_id`. After a successful
    /// reassignment these belong only to posts that keep another link.
    pub async fn remove_stale_links(
        &self,
        tx: &mut dyn LinkTransaction,
        category_id: Uuid,
    ) -> Result<u64, StoreError> {
        let removed = tx.delete_links_for_category(category_id).await?;
        debug!(%category_id, removed, "removed stale category links");
        Ok(removed)
    }
}

async fn relink_with_store(
    store: &dyn LinkStore,
    post_id: Uuid,
    deleted_category_id: Uuid,
    fallback_category_id: Uuid,
) -> Result<LinkAction, StoreError> {
    let count = store.count_links_for_post(post_id).await?;

    match plan_for_link_count(count) {
        LinkAction::Relink => {
            let moved = store
                .update_link(post_id, deleted_category_id, fallback_category_id)
                .await?;
            Ok(moved_or_skipped(post_id, moved))
        }
        other => Ok(other),
    }
}

async fn relink_in_transaction(
    tx: &mut dyn LinkTransaction,
    post_id: Uuid,
    deleted_category_id: Uuid,
    fallback_category_id: Uuid,
) -> Result<LinkAction, StoreError> {
    let count = tx.count_links_for_post(post_id).await?;

    match plan_for_link_count(count) {
        LinkAction::Relink => {
            let moved = tx
                .update_link(post_id, deleted_category_id, fallback_category_id)
                .await?;
            Ok(moved_or_skipped(post_id, moved))
        }
        other => Ok(other),
    }
}

fn moved_or_skipped(post_id: Uuid, moved: u64) -> LinkAction {
    if moved == 0 {
        // The single link points somewhere else: the post list was stale.
        warn!(%post_id, "post had no link to the deleted category; skipping");
        LinkAction::Skip
    } else {
        LinkAction::Relink
    }
}

/// First occurrence wins; order is otherwise preserved.
fn unique_posts(posts: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(posts.len());
    posts.iter().copied().filter(|id| seen.insert(*id)).collect()
}
