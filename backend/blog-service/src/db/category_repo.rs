use crate::models::{Category, CategoryListQuery};
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

/// Find a category by ID
pub async fn find_category_by_id<'e, E>(
    executor: E,
    category_id: Uuid,
) -> Result<Option<Category>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, created_at
        FROM categories
        WHERE id = $1
        "#,
    )
    .bind(category_id)
    .fetch_optional(executor)
    .await
}

/// Find a category by ID and hold a row lock until the transaction ends
pub async fn lock_category<'e, E>(
    executor: E,
    category_id: Uuid,
) -> Result<Option<Category>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, created_at
        FROM categories
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(category_id)
    .fetch_optional(executor)
    .await
}

/// Find the fallback category by its (case-insensitive) name
pub async fn find_category_by_name<'e, E>(
    executor: E,
    name: &str,
) -> Result<Option<Category>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, created_at
        FROM categories
        WHERE lower(name) = lower($1)
        "#,
    )
    .bind(name)
    .fetch_optional(executor)
    .await
}

/// List categories ordered by name, optionally filtered by a name substring
pub async fn list_categories<'e, E>(
    executor: E,
    query: &CategoryListQuery,
) -> Result<Vec<Category>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, created_at
        FROM categories
        WHERE $1::text IS NULL OR name ILIKE '%' || $1 || '%'
        ORDER BY name ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(query.search.as_deref())
    .bind(query.limit)
    .bind(query.offset)
    .fetch_all(executor)
    .await
}

/// Count categories matching the listing filter
pub async fn count_categories<'e, E>(
    executor: E,
    query: &CategoryListQuery,
) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM categories
        WHERE $1::text IS NULL OR name ILIKE '%' || $1 || '%'
        "#,
    )
    .bind(query.search.as_deref())
    .fetch_one(executor)
    .await?;

    Ok(row.get::<i64, _>("count"))
}

/// Hard delete a category row; returns whether a row was removed
pub async fn delete_category<'e, E>(executor: E, category_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
