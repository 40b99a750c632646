/// Blog Service Library
///
/// Category administration for the blog: deleting a category re-links the
/// posts that would otherwise be left without a category to the fallback
/// ("Uncategorized") category before the category row is removed.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: Data structures for categories, posts, links and users
/// - `services`: Deletion cascade, reassignment engine and validation
/// - `store`: Store traits and their PostgreSQL implementation
/// - `db`: SQL query functions
/// - `cache`: Category listing cache
/// - `middleware`: Bearer-token authentication
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
