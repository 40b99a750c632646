/// Database access layer
///
/// Plain query functions over any `PgExecutor`, so the same statement runs
/// against the pool or inside an open transaction:
/// - `category_repo`: categories and the fallback lookup
/// - `post_category_repo`: post/category links
/// - `post_repo`: post row locks and link coverage checks
/// - `user_repo`: requester lookup
pub mod category_repo;
pub mod post_category_repo;
pub mod post_repo;
pub mod user_repo;
