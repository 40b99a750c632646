use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{LinkStore, LinkTransaction, StoreError, StoreResult, UserDirectory};
use crate::db::{category_repo, post_category_repo, post_repo, user_repo};
use crate::models::{Category, CategoryListQuery, CategoryPage, User};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    fallback_name: String,
}

impl PgStore {
    pub fn new(pool: PgPool, fallback_name: impl Into<String>) -> Self {
        Self {
            pool,
            fallback_name: fallback_name.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LinkStore for PgStore {
    async fn find_category_by_id(&self, category_id: Uuid) -> StoreResult<Option<Category>> {
        Ok(category_repo::find_category_by_id(&self.pool, category_id).await?)
    }

    async fn find_fallback_category(&self) -> StoreResult<Option<Category>> {
        Ok(category_repo::find_category_by_name(&self.pool, &self.fallback_name).await?)
    }

    async fn find_post_ids_linked_to_category(&self, category_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(post_category_repo::find_post_ids_by_category(&self.pool, category_id).await?)
    }

    async fn count_links_for_post(&self, post_id: Uuid) -> StoreResult<i64> {
        Ok(post_category_repo::count_links_for_post(&self.pool, post_id).await?)
    }

    async fn update_link(
        &self,
        post_id: Uuid,
        from_category: Uuid,
        to_category: Uuid,
    ) -> StoreResult<u64> {
        post_category_repo::move_link(&self.pool, post_id, from_category, to_category)
            .await
            .map_err(map_link_error)
    }

    async fn list_categories(&self, query: &CategoryListQuery) -> StoreResult<CategoryPage> {
        let categories = category_repo::list_categories(&self.pool, query).await?;
        let categories_count = category_repo::count_categories(&self.pool, query).await?;

        Ok(CategoryPage {
            categories,
            categories_count,
        })
    }

    async fn begin(&self) -> StoreResult<Box<dyn LinkTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLinkTransaction { tx }))
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(user_repo::find_user_by_id(&self.pool, user_id).await?)
    }
}

/// An open PostgreSQL transaction; rolled back on drop unless committed
pub struct PgLinkTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LinkTransaction for PgLinkTransaction {
    async fn lock_category(&mut self, category_id: Uuid) -> StoreResult<Option<Category>> {
        Ok(category_repo::lock_category(&mut *self.tx, category_id).await?)
    }

    async fn find_post_ids_linked_to_category(
        &mut self,
        category_id: Uuid,
    ) -> StoreResult<Vec<Uuid>> {
        Ok(post_category_repo::find_post_ids_by_category(&mut *self.tx, category_id).await?)
    }

    async fn lock_posts(&mut self, post_ids: &[Uuid]) -> StoreResult<()> {
        post_repo::lock_posts(&mut *self.tx, post_ids).await?;
        Ok(())
    }

    async fn find_unlinked_posts(&mut self, post_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        Ok(post_repo::find_unlinked_posts(&mut *self.tx, post_ids).await?)
    }

    async fn count_links_for_post(&mut self, post_id: Uuid) -> StoreResult<i64> {
        Ok(post_category_repo::count_links_for_post(&mut *self.tx, post_id).await?)
    }

    async fn update_link(
        &mut self,
        post_id: Uuid,
        from_category: Uuid,
        to_category: Uuid,
    ) -> StoreResult<u64> {
        post_category_repo::move_link(&mut *self.tx, post_id, from_category, to_category)
            .await
            .map_err(map_link_error)
    }

    async fn delete_links_for_category(&mut self, category_id: Uuid) -> StoreResult<u64> {
        Ok(post_category_repo::delete_links_for_category(&mut *self.tx, category_id).await?)
    }

    async fn delete_category(&mut self, category_id: Uuid) -> StoreResult<bool> {
        category_repo::delete_category(&mut *self.tx, category_id)
            .await
            .map_err(map_link_error)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(self.tx.rollback().await?)
    }
}

/// Unique and foreign-key violations on link rows are conflicts, not outages.
fn map_link_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}
