/// Related-posts handler - HTTP endpoint for related content of a post
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::num::IntErrorKind;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::AppError;
use crate::models::RelatedPostsResponse;
use crate::services::related::{RelatedPostsService, POST_NOT_FOUND};

/// Query parameters of `GET /api/v1/posts/{slug}/related`
#[derive(Debug, Default, Deserialize)]
pub struct RelatedQueryParams {
    /// Kept as text so a malformed value falls back to the default instead of
    /// failing extraction.
    pub limit: Option<String>,
}

impl RelatedQueryParams {
    pub(crate) fn resolve_limit(&self, default_limit: i64, max_limit: i64) -> i64 {
        let max_limit = max_limit.max(1);
        let requested = match self.limit.as_deref().map(|raw| raw.trim().parse::<i64>()) {
            None => default_limit,
            Some(Ok(limit)) => limit,
            // Out-of-range integers still clamp; only non-numeric text uses the default.
            Some(Err(e)) => match e.kind() {
                IntErrorKind::PosOverflow => max_limit,
                IntErrorKind::NegOverflow => 1,
                _ => default_limit,
            },
        };
        requested.clamp(1, max_limit)
    }
}

pub struct RelatedHandlerState {
    pub related: Arc<RelatedPostsService>,
    pub default_limit: i64,
    pub max_limit: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{slug}/related",
    tag = "posts",
    params(
        ("slug" = String, Path, description = "Slug of a published, public post"),
        ("limit" = Option<i64>, Query, description = "Number of related posts, 1-10 (default 4)")
    ),
    responses(
        (status = 200, description = "Related posts in ranking order", body = RelatedPostsResponse),
        (status = 404, description = "Post missing, unpublished or not public"),
        (status = 500, description = "Related posts could not be loaded")
    )
)]
pub async fn get_related_posts(
    slug: web::Path<String>,
    query: web::Query<RelatedQueryParams>,
    state: web::Data<RelatedHandlerState>,
) -> HttpResponse {
    let limit = query.resolve_limit(state.default_limit, state.max_limit);
    debug!("Related posts request: slug={} limit={}", slug, limit);

    match state.related.find_related_by_slug(&slug, limit).await {
        Ok(posts) => HttpResponse::Ok().json(RelatedPostsResponse {
            success: true,
            posts,
        }),
        Err(AppError::NotFound(_)) => HttpResponse::NotFound().json(serde_json::json!({
            "error": POST_NOT_FOUND,
        })),
        Err(e) => {
            error!("Error fetching related posts for slug {}: {}", slug, e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": "Internal server error",
                "message": "Failed to fetch related posts",
            }))
        }
    }
}
