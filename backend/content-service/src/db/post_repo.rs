use crate::error::{AppError, Result};
use crate::models::{
    AuthorSummary, CategorySummary, ContentItem, Location, PostStatus, RelatedPost, SourceItem,
    TagSummary, Visibility,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::cmp::Ordering;
use uuid::Uuid;

/// Sort order of a candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrder {
    /// `view_count DESC, published_at DESC NULLS LAST, id ASC`
    Popularity,
    /// `published_at DESC NULLS LAST, view_count DESC, id ASC`
    Recency,
}

impl CandidateOrder {
    fn sql(self) -> &'static str {
        match self {
            CandidateOrder::Popularity => {
                " ORDER BY p.view_count DESC, p.published_at DESC NULLS LAST, p.id ASC"
            }
            CandidateOrder::Recency => {
                " ORDER BY p.published_at DESC NULLS LAST, p.view_count DESC, p.id ASC"
            }
        }
    }

    /// Same ordering as the SQL clause, for stores that sort in memory.
    pub fn compare(self, a: &ContentItem, b: &ContentItem) -> Ordering {
        let views = b.view_count.cmp(&a.view_count);
        let recency = published_desc(a.published_at, b.published_at);
        let primary = match self {
            CandidateOrder::Popularity => views.then(recency),
            CandidateOrder::Recency => recency.then(views),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn published_desc(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Attribute-filtered query over published, publicly visible posts.
///
/// Every populated filter narrows the result; an empty `tag_ids` means "no
/// tag constraint", not "posts without tags".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub author_id: Option<Uuid>,
    pub exclude_ids: Vec<Uuid>,
    pub order: CandidateOrder,
    pub limit: i64,
}

impl CandidateQuery {
    pub fn new(order: CandidateOrder, limit: i64) -> Self {
        Self {
            category_id: None,
            tag_ids: Vec::new(),
            author_id: None,
            exclude_ids: Vec::new(),
            order,
            limit,
        }
    }

    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_any_tag(mut self, tag_ids: &[Uuid]) -> Self {
        self.tag_ids = tag_ids.to_vec();
        self
    }

    pub fn by_author(mut self, author_id: Uuid) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn excluding<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = Uuid>,
    {
        self.exclude_ids.extend(ids);
        self
    }

    /// Whether `item` satisfies every filter of this query.
    pub fn matches(&self, item: &ContentItem) -> bool {
        item.is_listed()
            && !self.exclude_ids.contains(&item.id)
            && self.category_id.map_or(true, |c| item.category_id == Some(c))
            && (self.tag_ids.is_empty() || item.shares_tag_with(&self.tag_ids))
            && self.author_id.map_or(true, |a| item.author_id == a)
    }
}

/// Read access to blog posts needed by the related-posts ranker.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Source attributes of a published, public post by id.
    async fn find_listed_by_id(&self, post_id: Uuid) -> Result<Option<SourceItem>>;

    /// Source attributes of a published, public post by slug.
    async fn find_listed_by_slug(&self, slug: &str) -> Result<Option<SourceItem>>;

    /// Posts matching `query`, in the query's order, at most `query.limit`.
    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<ContentItem>>;

    /// Response cards for `post_ids`. Order of the returned cards is unspecified.
    async fn load_related_posts(&self, post_ids: &[Uuid]) -> Result<Vec<RelatedPost>>;

    /// Cheap connectivity probe used by readiness checks.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const LISTED: &str = "p.status = 'PUBLISHED' AND p.visibility = 'PUBLIC'";

const TAG_IDS: &str =
    "ARRAY(SELECT pt.tag_id FROM post_tags pt WHERE pt.post_id = p.id ORDER BY pt.tag_id) AS tag_ids";

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: Uuid,
    category_id: Option<Uuid>,
    author_id: Uuid,
    tag_ids: Vec<Uuid>,
}

impl From<SourceRow> for SourceItem {
    fn from(row: SourceRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            tag_ids: row.tag_ids,
            author_id: row.author_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    slug: String,
    category_id: Option<Uuid>,
    author_id: Uuid,
    status: String,
    visibility: String,
    view_count: i64,
    published_at: Option<DateTime<Utc>>,
    tag_ids: Vec<Uuid>,
}

impl TryFrom<CandidateRow> for ContentItem {
    type Error = AppError;

    fn try_from(row: CandidateRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            slug: row.slug,
            category_id: row.category_id,
            tag_ids: row.tag_ids,
            author_id: row.author_id,
            status: row.status.parse::<PostStatus>()?,
            visibility: row.visibility.parse::<Visibility>()?,
            view_count: row.view_count,
            published_at: row.published_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RelatedPostRow {
    id: Uuid,
    slug: String,
    title: String,
    excerpt: Option<String>,
    featured_image: Option<String>,
    published_at: Option<DateTime<Utc>>,
    read_time: Option<i32>,
    view_count: i64,
    location_name: Option<String>,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    author_name: String,
    author_image: Option<String>,
    category_name: Option<String>,
    category_slug: Option<String>,
    tags: Json<Vec<TagSummary>>,
    comment_count: i64,
}

impl From<RelatedPostRow> for RelatedPost {
    fn from(row: RelatedPostRow) -> Self {
        let location = if row.location_name.is_some()
            || row.location_lat.is_some()
            || row.location_lng.is_some()
        {
            Some(Location {
                name: row.location_name,
                latitude: row.location_lat,
                longitude: row.location_lng,
            })
        } else {
            None
        };

        let category = match (row.category_name, row.category_slug) {
            (Some(name), Some(slug)) => Some(CategorySummary { name, slug }),
            _ => None,
        };

        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            featured_image: row.featured_image,
            published_at: row.published_at,
            read_time: row.read_time,
            view_count: row.view_count,
            location,
            author: AuthorSummary {
                name: row.author_name,
                image: row.author_image,
            },
            category,
            tags: row.tags.0,
            comment_count: row.comment_count,
        }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find_listed_by_id(&self, post_id: Uuid) -> Result<Option<SourceItem>> {
        let sql = format!(
            "SELECT p.id, p.category_id, p.author_id, {TAG_IDS} FROM posts p WHERE p.id = $1 AND {LISTED}"
        );
        let row = sqlx::query_as::<_, SourceRow>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SourceItem::from))
    }

    async fn find_listed_by_slug(&self, slug: &str) -> Result<Option<SourceItem>> {
        let sql = format!(
            "SELECT p.id, p.category_id, p.author_id, {TAG_IDS} FROM posts p WHERE p.slug = $1 AND {LISTED}"
        );
        let row = sqlx::query_as::<_, SourceRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SourceItem::from))
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<ContentItem>> {
        if query.limit <= 0 {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT p.id, p.slug, p.category_id, p.author_id, p.status, p.visibility, \
             p.view_count, p.published_at, {TAG_IDS} FROM posts p WHERE {LISTED}"
        ));

        if let Some(category_id) = query.category_id {
            builder.push(" AND p.category_id = ");
            builder.push_bind(category_id);
        }
        if !query.tag_ids.is_empty() {
            builder.push(
                " AND EXISTS (SELECT 1 FROM post_tags st WHERE st.post_id = p.id AND st.tag_id = ANY(",
            );
            builder.push_bind(query.tag_ids.clone());
            builder.push("))");
        }
        if let Some(author_id) = query.author_id {
            builder.push(" AND p.author_id = ");
            builder.push_bind(author_id);
        }
        if !query.exclude_ids.is_empty() {
            builder.push(" AND p.id <> ALL(");
            builder.push_bind(query.exclude_ids.clone());
            builder.push(")");
        }

        builder.push(query.order.sql());
        builder.push(" LIMIT ");
        builder.push_bind(query.limit);

        let rows = builder
            .build_query_as::<CandidateRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn load_related_posts(&self, post_ids: &[Uuid]) -> Result<Vec<RelatedPost>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT p.id, p.slug, p.title, p.excerpt, p.featured_image, p.published_at,
                   p.read_time, p.view_count, p.location_name, p.location_lat, p.location_lng,
                   a.name AS author_name, a.image AS author_image,
                   c.name AS category_name, c.slug AS category_slug,
                   COALESCE(
                       (SELECT json_agg(json_build_object('name', t.name, 'slug', t.slug) ORDER BY t.name)
                        FROM post_tags pt
                        JOIN tags t ON t.id = pt.tag_id
                        WHERE pt.post_id = p.id),
                       '[]'::json
                   ) AS tags,
                   (SELECT COUNT(*) FROM comments cm
                    WHERE cm.post_id = p.id AND cm.status = 'APPROVED') AS comment_count
            FROM posts p
            JOIN authors a ON a.id = p.author_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = ANY($1) AND {LISTED}
            "#
        );

        let rows = sqlx::query_as::<_, RelatedPostRow>(&sql)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RelatedPost::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
