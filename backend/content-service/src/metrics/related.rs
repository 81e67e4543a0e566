use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Related-posts requests by outcome (ok, not_found, error, empty_limit).
    pub static ref RELATED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "related_posts_requests_total",
        "Related-posts requests segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register related_posts_requests_total");

    /// Duration of successful related-posts rankings by source (database, cache).
    pub static ref RELATED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "related_posts_request_duration_seconds",
        "Related-posts ranking duration segmented by data source",
        &["source"]
    )
    .expect("failed to register related_posts_request_duration_seconds");

    /// Items contributed to final results, by tier (a, b, c, d, fallback).
    pub static ref RELATED_TIER_ITEMS: IntCounterVec = register_int_counter_vec!(
        "related_posts_tier_items_total",
        "Related posts contributed to results segmented by tier",
        &["tier"]
    )
    .expect("failed to register related_posts_tier_items_total");

    /// Related-posts cache events (hit/miss/error).
    pub static ref RELATED_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "related_posts_cache_events_total",
        "Related-posts cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register related_posts_cache_events_total");
}
