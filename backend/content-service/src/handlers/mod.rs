/// HTTP handlers for content-related endpoints
///
/// - Related posts: ranked related content for a published post
/// - Health: liveness and readiness probes
pub mod health;
pub mod related;

pub use health::{health_summary, liveness_check, readiness_summary, HealthState};
pub use related::{get_related_posts, RelatedHandlerState};

use actix_web::web;

/// Health probes and the public `/api/v1` routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/health", web::get().to(health_summary))
        .route("/api/v1/health/ready", web::get().to(readiness_summary))
        .route("/api/v1/health/live", web::get().to(liveness_check))
        .service(
            web::scope("/api/v1").service(
                web::scope("/posts").service(
                    web::resource("/{slug}/related").route(web::get().to(get_related_posts)),
                ),
            ),
        );
}
