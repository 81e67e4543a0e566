//! In-memory ContentRepository for integration tests
//!
//! Mirrors the PostgreSQL repository's filtering and ordering so ranking can be
//! exercised without a database. Records every candidate query and supports
//! failure injection.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use content_service::db::{CandidateQuery, ContentRepository};
use content_service::error::{AppError, Result};
use content_service::models::{
    AuthorSummary, ContentItem, PostStatus, RelatedPost, SourceItem, Visibility,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type QueryPredicate = Box<dyn Fn(&CandidateQuery) -> bool + Send + Sync>;

#[derive(Default)]
pub struct InMemoryContentRepository {
    posts: Mutex<Vec<ContentItem>>,
    queries: Mutex<Vec<CandidateQuery>>,
    lookup_calls: AtomicUsize,
    card_calls: AtomicUsize,
    fail_lookup: AtomicBool,
    fail_cards: AtomicBool,
    fail_ping: AtomicBool,
    fail_when: Mutex<Option<QueryPredicate>>,
}

impl InMemoryContentRepository {
    pub fn new(posts: Vec<ContentItem>) -> Arc<Self> {
        Arc::new(Self {
            posts: Mutex::new(posts),
            ..Default::default()
        })
    }

    pub fn insert(&self, post: ContentItem) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn snapshot(&self) -> Vec<ContentItem> {
        self.posts.lock().unwrap().clone()
    }

    /// Fail every candidate query matching `predicate`.
    pub fn fail_candidates_when<F>(&self, predicate: F)
    where
        F: Fn(&CandidateQuery) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock().unwrap() = Some(Box::new(predicate));
    }

    pub fn fail_lookups(&self) {
        self.fail_lookup.store(true, Ordering::SeqCst);
    }

    pub fn fail_cards(&self) {
        self.fail_cards.store(true, Ordering::SeqCst);
    }

    pub fn fail_ping(&self) {
        self.fail_ping.store(true, Ordering::SeqCst);
    }

    pub fn candidate_queries(&self) -> Vec<CandidateQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
            + self.card_calls.load(Ordering::SeqCst)
            + self.queries.lock().unwrap().len()
    }

    fn lookup<F>(&self, pred: F) -> Result<Option<SourceItem>>
    where
        F: Fn(&ContentItem) -> bool,
    {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("connection refused".into()));
        }
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| pred(p) && p.is_listed())
            .map(SourceItem::from))
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn find_listed_by_id(&self, post_id: Uuid) -> Result<Option<SourceItem>> {
        self.lookup(|p| p.id == post_id)
    }

    async fn find_listed_by_slug(&self, slug: &str) -> Result<Option<SourceItem>> {
        self.lookup(|p| p.slug == slug)
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> Result<Vec<ContentItem>> {
        self.queries.lock().unwrap().push(query.clone());

        if let Some(predicate) = self.fail_when.lock().unwrap().as_ref() {
            if predicate(query) {
                return Err(AppError::DatabaseError("statement timeout".into()));
            }
        }

        let mut matching: Vec<ContentItem> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.order.compare(a, b));
        matching.truncate(query.limit.max(0) as usize);
        Ok(matching)
    }

    async fn load_related_posts(&self, post_ids: &[Uuid]) -> Result<Vec<RelatedPost>> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cards.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("connection reset".into()));
        }
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| post_ids.contains(&p.id))
            .map(card_for)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            Err(AppError::DatabaseError("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

fn card_for(post: &ContentItem) -> RelatedPost {
    RelatedPost {
        id: post.id,
        slug: post.slug.clone(),
        title: post.slug.replace('-', " "),
        excerpt: None,
        featured_image: None,
        published_at: post.published_at,
        read_time: Some(5),
        view_count: post.view_count,
        location: None,
        author: AuthorSummary {
            name: "Test Author".into(),
            image: None,
        },
        category: None,
        tags: vec![],
        comment_count: 0,
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Published, public post with no category, tags or views.
pub fn post(slug: &str) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        category_id: None,
        tag_ids: vec![],
        author_id: Uuid::new_v4(),
        status: PostStatus::Published,
        visibility: Visibility::Public,
        view_count: 0,
        published_at: Some(base_time()),
    }
}

pub trait PostFixture {
    fn category(self, category_id: Uuid) -> Self;
    fn tags(self, tag_ids: &[Uuid]) -> Self;
    fn author(self, author_id: Uuid) -> Self;
    fn views(self, views: i64) -> Self;
    fn days_ago(self, days: i64) -> Self;
    fn status(self, status: PostStatus) -> Self;
    fn visibility(self, visibility: Visibility) -> Self;
}

impl PostFixture for ContentItem {
    fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    fn tags(mut self, tag_ids: &[Uuid]) -> Self {
        self.tag_ids = tag_ids.to_vec();
        self
    }

    fn author(mut self, author_id: Uuid) -> Self {
        self.author_id = author_id;
        self
    }

    fn views(mut self, views: i64) -> Self {
        self.view_count = views;
        self
    }

    fn days_ago(mut self, days: i64) -> Self {
        self.published_at = Some(base_time() - Duration::days(days));
        self
    }

    fn status(mut self, status: PostStatus) -> Self {
        self.status = status;
        if status != PostStatus::Published {
            self.published_at = None;
        }
        self
    }

    fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}
