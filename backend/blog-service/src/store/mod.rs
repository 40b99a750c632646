//! Store seams used by the category cascade.
//!
//! `LinkStore` is the pooled, concurrency-safe view of categories and
//! post/category links. `LinkTransaction` is one open transaction on the same
//! data; nothing it does is visible to others until `commit`.
//! `UserDirectory` resolves requesters.

pub mod postgres;

pub use postgres::{PgLinkTransaction, PgStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Category, CategoryListQuery, CategoryPage, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn find_category_by_id(&self, category_id: Uuid) -> StoreResult<Option<Category>>;

    /// Resolved on every call; implementations must not cache the answer.
    async fn find_fallback_category(&self) -> StoreResult<Option<Category>>;

    async fn find_post_ids_linked_to_category(&self, category_id: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn count_links_for_post(&self, post_id: Uuid) -> StoreResult<i64>;

    /// Rewrite `(post_id, from_category)` to `(post_id, to_category)`.
    /// Returns the number of rows rewritten.
    async fn update_link(
        &self,
        post_id: Uuid,
        from_category: Uuid,
        to_category: Uuid,
    ) -> StoreResult<u64>;

    async fn list_categories(&self, query: &CategoryListQuery) -> StoreResult<CategoryPage>;

    async fn begin(&self) -> StoreResult<Box<dyn LinkTransaction>>;
}

/// Dropping a transaction without `commit` discards its writes.
#[async_trait]
pub trait LinkTransaction: Send {
    /// Fetch the category and hold it until the transaction ends.
    async fn lock_category(&mut self, category_id: Uuid) -> StoreResult<Option<Category>>;

    async fn find_post_ids_linked_to_category(
        &mut self,
        category_id: Uuid,
    ) -> StoreResult<Vec<Uuid>>;

    /// Hold the posts until the transaction ends, so their link counts
    /// cannot change underneath the cascade. Implementations lock in a
    /// stable order.
    async fn lock_posts(&mut self, post_ids: &[Uuid]) -> StoreResult<()>;

    /// Posts among `post_ids` that still exist and have no link left.
    async fn find_unlinked_posts(&mut self, post_ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    async fn count_links_for_post(&mut self, post_id: Uuid) -> StoreResult<i64>;

    async fn update_link(
        &mut self,
        post_id: Uuid,
        from_category: Uuid,
        to_category: Uuid,
    ) -> StoreResult<u64>;

    async fn delete_links_for_category(&mut self, category_id: Uuid) -> StoreResult<u64>;

    /// Returns whether a category row was removed.
    async fn delete_category(&mut self, category_id: Uuid) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>>;
}
