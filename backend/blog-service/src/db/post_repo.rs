use sqlx::PgExecutor;
use uuid::Uuid;

/// Row-lock the given posts until the transaction ends.
///
/// Locks are taken in id order so two cascades sharing posts cannot deadlock.
/// Returns the ids that still exist.
pub async fn lock_posts<'e, E>(executor: E, post_ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, (Uuid,)>(
        r#"
        SELECT id
        FROM posts
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(post_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Posts among `post_ids` that exist but have no category link left
pub async fn find_unlinked_posts<'e, E>(
    executor: E,
    post_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, (Uuid,)>(
        r#"
        SELECT p.id
        FROM posts p
        WHERE p.id = ANY($1)
          AND NOT EXISTS (
              SELECT 1 FROM post_categories pc WHERE pc.post_id = p.id
          )
        ORDER BY p.id
        "#,
    )
    .bind(post_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
