/// Data models for content-service
///
/// - `ContentItem`: the ranking view of a post (classification, ownership,
///   publication state, popularity and recency)
/// - `SourceItem`: the identity attributes of the post related content is
///   computed for
/// - `RelatedPost`: the card returned to API clients for each related post
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Post publication status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Scheduled,
    Archived,
}

/// Post visibility, independent of publication status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Restricted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Published => "PUBLISHED",
            PostStatus::Scheduled => "SCHEDULED",
            PostStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for PostStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(PostStatus::Draft),
            "PUBLISHED" => Ok(PostStatus::Published),
            "SCHEDULED" => Ok(PostStatus::Scheduled),
            "ARCHIVED" => Ok(PostStatus::Archived),
            other => Err(AppError::Internal(format!("unknown post status '{}'", other))),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Restricted => "RESTRICTED",
        }
    }
}

impl FromStr for Visibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Visibility::Public),
            "PRIVATE" => Ok(Visibility::Private),
            "RESTRICTED" => Ok(Visibility::Restricted),
            other => Err(AppError::Internal(format!("unknown visibility '{}'", other))),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranking view of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub author_id: Uuid,
    pub status: PostStatus,
    pub visibility: Visibility,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Published and publicly visible.
    pub fn is_listed(&self) -> bool {
        self.status == PostStatus::Published && self.visibility == Visibility::Public
    }

    pub fn shares_tag_with(&self, tag_ids: &[Uuid]) -> bool {
        self.tag_ids.iter().any(|tag| tag_ids.contains(tag))
    }
}

/// Identity attributes of the post related content is computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub author_id: Uuid,
}

impl From<&ContentItem> for SourceItem {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: item.id,
            category_id: item.category_id,
            tag_ids: item.tag_ids.clone(),
            author_id: item.author_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthorSummary {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TagSummary {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Related-post card returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Estimated read time in minutes
    pub read_time: Option<i32>,
    pub view_count: i64,
    pub location: Option<Location>,
    pub author: AuthorSummary,
    pub category: Option<CategorySummary>,
    pub tags: Vec<TagSummary>,
    /// Approved comments only
    pub comment_count: i64,
}

/// Success body of the related-posts endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelatedPostsResponse {
    pub success: bool,
    pub posts: Vec<RelatedPost>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: PostStatus, visibility: Visibility) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            slug: "lisbon-in-three-days".into(),
            category_id: None,
            tag_ids: vec![],
            author_id: Uuid::new_v4(),
            status,
            visibility,
            view_count: 0,
            published_at: None,
        }
    }

    #[test]
    fn test_only_published_public_items_are_listed() {
        assert!(item(PostStatus::Published, Visibility::Public).is_listed());
        assert!(!item(PostStatus::Draft, Visibility::Public).is_listed());
        assert!(!item(PostStatus::Scheduled, Visibility::Public).is_listed());
        assert!(!item(PostStatus::Published, Visibility::Private).is_listed());
        assert!(!item(PostStatus::Published, Visibility::Restricted).is_listed());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&PostStatus::Published).unwrap(),
            "\"PUBLISHED\""
        );
        assert_eq!(
            serde_json::from_str::<Visibility>("\"RESTRICTED\"").unwrap(),
            Visibility::Restricted
        );
    }

    #[test]
    fn test_status_round_trips_through_column_text() {
        for status in [
            PostStatus::Draft,
            PostStatus::Published,
            PostStatus::Scheduled,
            PostStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
        assert_eq!("public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert!("HIDDEN".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_related_post_uses_camel_case_fields() {
        let post = RelatedPost {
            id: Uuid::nil(),
            slug: "bali-with-kids".into(),
            title: "Bali with Kids".into(),
            excerpt: None,
            featured_image: Some("uploads/bali.jpg".into()),
            published_at: None,
            read_time: Some(7),
            view_count: 42,
            location: None,
            author: AuthorSummary {
                name: "Ana".into(),
                image: None,
            },
            category: None,
            tags: vec![],
            comment_count: 3,
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["featuredImage"], "uploads/bali.jpg");
        assert_eq!(json["readTime"], 7);
        assert_eq!(json["viewCount"], 42);
        assert_eq!(json["commentCount"], 3);
        assert!(json.get("featured_image").is_none());
    }
}
