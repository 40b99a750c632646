/// Data models for blog-service
///
/// - Category: a post category; one of them is the fallback ("Uncategorized")
/// - PostCategory: the `(post_id, category_id)` link between a post and a category
/// - User: the requester of admin actions, with its role
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostCategory {
    pub post_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Query parameters of a category listing; doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryListQuery {
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl CategoryListQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// Clamp paging and drop blank searches so equivalent queries share a key.
    pub fn normalized(search: Option<String>, limit: Option<i64>, offset: Option<i64>) -> Self {
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Self {
            search,
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for CategoryListQuery {
    fn default() -> Self {
        Self::normalized(None, None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPage {
    pub categories: Vec<Category>,
    pub categories_count: i64,
}

/// Two-outcome result returned to callers of admin actions: exactly one of
/// `{"success": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    Success(String),
    Error(String),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ActionResult::Success(msg) | ActionResult::Error(msg) => msg,
        }
    }
}
