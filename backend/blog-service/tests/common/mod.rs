//! Shared fixtures for blog-service integration tests

#![allow(dead_code)]

pub mod memory_store;

use blog_service::config::{CascadeMode, CategoryConfig};
use blog_service::models::{Category, User, UserRole};
use chrono::Utc;
use uuid::Uuid;

pub const FALLBACK: &str = "Uncategorized";

pub fn category_config(mode: CascadeMode) -> CategoryConfig {
    CategoryConfig {
        fallback_name: FALLBACK.to_string(),
        cascade_mode: mode,
        reassign_concurrency: 4,
        ..CategoryConfig::default()
    }
}

pub fn new_category(name: &str) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        created_at: Utc::now(),
    }
}

pub fn new_user(role: UserRole) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        email: format!("{}@example.com", id.simple()),
        name: Some("Test User".to_string()),
        role,
    }
}
