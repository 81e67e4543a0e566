use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::cache::RelatedResultCache;
use crate::config::RelatedConfig;
use crate::db::{CandidateOrder, CandidateQuery, ContentRepository};
use crate::error::{AppError, Result};
use crate::metrics::related::{
    RELATED_REQUEST_DURATION_SECONDS, RELATED_REQUEST_TOTAL, RELATED_TIER_ITEMS,
};
use crate::models::{ContentItem, RelatedPost, SourceItem};

pub const POST_NOT_FOUND: &str = "Post not found";

/// Priority bucket an item was collected from, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Same category and at least one shared tag, most viewed first
    CategoryAndTag,
    /// Same category, newest first
    Category,
    /// At least one shared tag, most viewed first
    Tag,
    /// Same author, newest first
    Author,
    /// Any other listed post, most viewed then newest
    Fallback,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::CategoryAndTag => "a",
            Tier::Category => "b",
            Tier::Tag => "c",
            Tier::Author => "d",
            Tier::Fallback => "fallback",
        }
    }
}

/// A related item together with the tier that contributed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedItem {
    pub item: ContentItem,
    pub tier: Tier,
}

/// Candidate queries for the tiers that apply to `source`, in priority order.
///
/// A missing category skips the category tiers and an empty tag set skips the
/// tag tiers; neither is widened into a match-all query.
pub fn plan_tiers(source: &SourceItem, limit: usize) -> Vec<(Tier, CandidateQuery)> {
    let limit = limit as i64;
    let has_tags = !source.tag_ids.is_empty();
    let mut plan = Vec::with_capacity(4);

    if let (Some(category_id), true) = (source.category_id, has_tags) {
        plan.push((
            Tier::CategoryAndTag,
            CandidateQuery::new(CandidateOrder::Popularity, limit)
                .in_category(category_id)
                .with_any_tag(&source.tag_ids)
                .excluding([source.id]),
        ));
    }
    if let Some(category_id) = source.category_id {
        plan.push((
            Tier::Category,
            CandidateQuery::new(CandidateOrder::Recency, limit)
                .in_category(category_id)
                .excluding([source.id]),
        ));
    }
    if has_tags {
        plan.push((
            Tier::Tag,
            CandidateQuery::new(CandidateOrder::Popularity, limit)
                .with_any_tag(&source.tag_ids)
                .excluding([source.id]),
        ));
    }
    plan.push((
        Tier::Author,
        CandidateQuery::new(CandidateOrder::Recency, limit)
            .by_author(source.author_id)
            .excluding([source.id]),
    ));

    plan
}

/// Merge tier results in the given order, keeping the first occurrence of
/// each id and stopping at `limit`.
pub fn merge_tiers(
    source_id: Uuid,
    tiers: Vec<(Tier, Vec<ContentItem>)>,
    limit: usize,
) -> Vec<RankedItem> {
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(limit + 1);
    seen.insert(source_id);
    let mut merged = Vec::with_capacity(limit);

    'tiers: for (tier, items) in tiers {
        for item in items {
            if merged.len() >= limit {
                break 'tiers;
            }
            if seen.insert(item.id) {
                merged.push(RankedItem { item, tier });
            }
        }
    }

    merged
}

/// Related-posts ranking over a content repository.
pub struct RelatedPostsService {
    repo: Arc<dyn ContentRepository>,
    cache: Option<Arc<dyn RelatedResultCache>>,
    max_limit: usize,
}

impl RelatedPostsService {
    pub fn new(repo: Arc<dyn ContentRepository>, config: &RelatedConfig) -> Self {
        Self {
            repo,
            cache: None,
            max_limit: config.max_limit.max(1) as usize,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn RelatedResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn repository(&self) -> &Arc<dyn ContentRepository> {
        &self.repo
    }

    pub fn cache(&self) -> Option<&Arc<dyn RelatedResultCache>> {
        self.cache.as_ref()
    }

    /// Requested limit clamped to `[0, max_limit]`; zero means "return nothing".
    pub fn effective_limit(&self, requested: i64) -> usize {
        if requested <= 0 {
            0
        } else {
            (requested as u64).min(self.max_limit as u64) as usize
        }
    }

    /// Related items for the published, public post `source_id`.
    pub async fn find_related(&self, source_id: Uuid, limit: i64) -> Result<Vec<RankedItem>> {
        let limit = self.effective_limit(limit);
        if limit == 0 {
            RELATED_REQUEST_TOTAL.with_label_values(&["empty_limit"]).inc();
            return Ok(Vec::new());
        }

        let source = self.resolve(self.repo.find_listed_by_id(source_id).await)?;
        let ranked = self.rank(&source, limit).await?;
        RELATED_REQUEST_TOTAL.with_label_values(&["ok"]).inc();
        Ok(ranked)
    }

    /// Related-post cards for the published, public post with `slug`.
    pub async fn find_related_by_slug(&self, slug: &str, limit: i64) -> Result<Vec<RelatedPost>> {
        let limit = self.effective_limit(limit);
        if limit == 0 {
            RELATED_REQUEST_TOTAL.with_label_values(&["empty_limit"]).inc();
            return Ok(Vec::new());
        }

        let source = self.resolve(self.repo.find_listed_by_slug(slug).await)?;
        let post_ids = match self.read_cache(source.id, limit).await {
            Some(ids) => ids,
            None => {
                let ranked = self.rank(&source, limit).await?;
                let ids: Vec<Uuid> = ranked.iter().map(|r| r.item.id).collect();
                self.write_cache(source.id, limit, &ids).await;
                ids
            }
        };

        let cards = self.repo.load_related_posts(&post_ids).await.map_err(|e| {
            error!(post_id = %source.id, "Failed to load related post cards: {}", e);
            RELATED_REQUEST_TOTAL.with_label_values(&["error"]).inc();
            e
        })?;

        RELATED_REQUEST_TOTAL.with_label_values(&["ok"]).inc();
        Ok(order_cards(&post_ids, cards))
    }

    fn resolve(&self, lookup: Result<Option<SourceItem>>) -> Result<SourceItem> {
        match lookup {
            Ok(Some(source)) => Ok(source),
            Ok(None) => {
                RELATED_REQUEST_TOTAL.with_label_values(&["not_found"]).inc();
                Err(AppError::NotFound(POST_NOT_FOUND.to_string()))
            }
            Err(e) => {
                error!("Source post lookup failed: {}", e);
                RELATED_REQUEST_TOTAL.with_label_values(&["error"]).inc();
                Err(e)
            }
        }
    }

    /// Tiered ranking for an already resolved source.
    pub async fn rank(&self, source: &SourceItem, limit: usize) -> Result<Vec<RankedItem>> {
        let limit = limit.min(self.max_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let plan = plan_tiers(source, limit);
        debug!(
            post_id = %source.id,
            tiers = plan.len(),
            limit,
            "Ranking related posts"
        );

        let results = try_join_all(plan.iter().map(|(_, query)| self.repo.find_candidates(query)))
            .await
            .map_err(|e| {
                error!(post_id = %source.id, "Related tier query failed: {}", e);
                RELATED_REQUEST_TOTAL.with_label_values(&["error"]).inc();
                e
            })?;

        let tiers: Vec<(Tier, Vec<ContentItem>)> = plan
            .iter()
            .map(|(tier, _)| *tier)
            .zip(results)
            .inspect(|(tier, items)| {
                debug!(
                    post_id = %source.id,
                    tier = tier.label(),
                    candidates = items.len(),
                    "Related tier fetched"
                );
            })
            .collect();

        let mut ranked = merge_tiers(source.id, tiers, limit);

        if ranked.len() < limit {
            let mut collected: HashSet<Uuid> = ranked.iter().map(|r| r.item.id).collect();
            collected.insert(source.id);

            let fallback =
                CandidateQuery::new(CandidateOrder::Popularity, (limit - ranked.len()) as i64)
                    .excluding(collected.iter().copied());

            let extra = self.repo.find_candidates(&fallback).await.map_err(|e| {
                error!(post_id = %source.id, "Related fallback query failed: {}", e);
                RELATED_REQUEST_TOTAL.with_label_values(&["error"]).inc();
                e
            })?;
            debug!(post_id = %source.id, candidates = extra.len(), "Related fallback fetched");

            for item in extra {
                if ranked.len() >= limit {
                    break;
                }
                if collected.insert(item.id) {
                    ranked.push(RankedItem {
                        item,
                        tier: Tier::Fallback,
                    });
                }
            }
        }

        let mut contributions: HashMap<Tier, u64> = HashMap::new();
        for r in &ranked {
            *contributions.entry(r.tier).or_default() += 1;
        }
        for (tier, count) in contributions {
            RELATED_TIER_ITEMS
                .with_label_values(&[tier.label()])
                .inc_by(count);
        }

        RELATED_REQUEST_DURATION_SECONDS
            .with_label_values(&["database"])
            .observe(start.elapsed().as_secs_f64());

        Ok(ranked)
    }

    async fn read_cache(&self, source_id: Uuid, limit: usize) -> Option<Vec<Uuid>> {
        let cache = self.cache()?;
        let start = Instant::now();
        match cache.read(source_id, limit).await {
            Ok(Some(cached)) => {
                RELATED_REQUEST_DURATION_SECONDS
                    .with_label_values(&["cache"])
                    .observe(start.elapsed().as_secs_f64());
                Some(cached.post_ids)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(post_id = %source_id, "related cache read failed: {}", err);
                None
            }
        }
    }

    async fn write_cache(&self, source_id: Uuid, limit: usize, post_ids: &[Uuid]) {
        if let Some(cache) = self.cache() {
            if let Err(err) = cache.write(source_id, limit, post_ids).await {
                debug!(post_id = %source_id, "related cache set failed: {}", err);
            }
        }
    }
}

/// Cards in ranking order; ids without a card are dropped.
fn order_cards(post_ids: &[Uuid], cards: Vec<RelatedPost>) -> Vec<RelatedPost> {
    let mut by_id: HashMap<Uuid, RelatedPost> =
        cards.into_iter().map(|card| (card.id, card)).collect();
    post_ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
