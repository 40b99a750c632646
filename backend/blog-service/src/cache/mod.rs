/// Caching layer
///
/// - `CategoryCache`: read-through cache of category listings keyed by the
///   listing query, invalidated explicitly after every mutating call
pub mod category_cache;

pub use category_cache::CategoryCache;
