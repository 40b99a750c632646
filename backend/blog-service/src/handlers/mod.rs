/// HTTP handlers for blog-service
///
/// - Categories: cascade deletion and cached listing
pub mod categories;

pub use categories::{configure, delete_category, list_categories};
