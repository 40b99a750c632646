use crate::models::User;
use sqlx::PgExecutor;
use uuid::Uuid;

/// Find an active (not soft-deleted) user by ID
pub async fn find_user_by_id<'e, E>(executor: E, user_id: Uuid) -> Result<Option<User>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, role
        FROM users
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}
