/// OpenAPI documentation for the blog Content Service
use utoipa::OpenApi;

use crate::models::{
    AuthorSummary, CategorySummary, Location, RelatedPost, RelatedPostsResponse, TagSummary,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wayfarer Journal Content Service API",
        version = "1.0.0",
        description = "Read endpoints for published blog content. Ranks related posts for a published post by shared category, tags and author, topping up with popular recent posts.",
        contact(
            name = "Wayfarer Journal Team",
            email = "dev@wayfarer-journal.dev"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081", description = "Development server"),
    ),
    paths(crate::handlers::related::get_related_posts),
    components(schemas(
        RelatedPostsResponse,
        RelatedPost,
        AuthorSummary,
        CategorySummary,
        TagSummary,
        Location
    )),
    tags(
        (name = "health", description = "Service health checks"),
        (name = "posts", description = "Published post content"),
    ),
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api/v1/openapi.json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_path_is_documented() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/posts/{slug}/related"));
    }
}
