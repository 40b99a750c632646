use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Category deletion attempts by outcome (success or the error kind).
    pub static ref CATEGORY_DELETIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "category_deletions_total",
        "Category deletion attempts segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register category_deletions_total");

    /// Posts touched by a committed cascade (relinked, retained, skipped).
    pub static ref CATEGORY_POSTS_REASSIGNED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "category_posts_reassigned_total",
        "Posts handled by category cascades segmented by action",
        &["action"]
    )
    .expect("failed to register category_posts_reassigned_total");

    /// Wall time of the reassign-and-delete phase by cascade mode.
    pub static ref CATEGORY_CASCADE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "category_cascade_duration_seconds",
        "Category cascade duration segmented by mode",
        &["mode"]
    )
    .expect("failed to register category_cascade_duration_seconds");

    /// Category list cache events (hit/miss/invalidate).
    pub static ref CATEGORY_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "category_cache_events_total",
        "Category list cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register category_cache_events_total");
}
