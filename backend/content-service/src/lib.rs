/// Content Service Library
///
/// Read-side content endpoints for the Wayfarer Journal blog. The main
/// workload is ranking related posts for a published post.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route wiring
/// - `models`: Posts as seen by the ranker and the API
/// - `services`: Related-posts ranking
/// - `db`: Connection pool, migrations and the post repository
/// - `cache`: Redis cache of ranked results
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
