use sqlx::{PgExecutor, Row};
use uuid::Uuid;

/// IDs of every post linked to a category
pub async fn find_post_ids_by_category<'e, E>(
    executor: E,
    category_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, (Uuid,)>(
        r#"
        SELECT post_id
        FROM post_categories
        WHERE category_id = $1
        ORDER BY post_id
        "#,
    )
    .bind(category_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Number of category links a post currently has
pub async fn count_links_for_post<'e, E>(executor: E, post_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query("SELECT COUNT(*) AS count FROM post_categories WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(executor)
        .await?;

    Ok(row.get::<i64, _>("count"))
}

/// Repoint the `(post_id, from_category)` link at `to_category`.
/// Returns the number of rows rewritten (0 or 1).
pub async fn move_link<'e, E>(
    executor: E,
    post_id: Uuid,
    from_category: Uuid,
    to_category: Uuid,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE post_categories
        SET category_id = $3
        WHERE post_id = $1 AND category_id = $2
        "#,
    )
    .bind(post_id)
    .bind(from_category)
    .bind(to_category)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Remove every link pointing at a category
pub async fn delete_links_for_category<'e, E>(
    executor: E,
    category_id: Uuid,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM post_categories WHERE category_id = $1")
        .bind(category_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
