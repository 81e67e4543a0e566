use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::related::RELATED_CACHE_EVENTS;

/// Store for ranked related-post id lists, keyed by source and limit.
#[async_trait]
pub trait RelatedResultCache: Send + Sync {
    async fn read(&self, source_id: Uuid, limit: usize) -> Result<Option<CachedRelated>>;

    async fn write(&self, source_id: Uuid, limit: usize, post_ids: &[Uuid]) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

/// Related-posts cache manager using Redis
#[derive(Clone)]
pub struct RelatedCache {
    redis: ConnectionManager,
    ttl: Duration,
}

/// Cached ranking for one (source, limit) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRelated {
    pub post_ids: Vec<Uuid>,
}

impl RelatedCache {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            redis,
            ttl: Duration::from_secs(ttl_secs.max(1)),
        }
    }

    /// Connect to Redis and build a cache around the managed connection.
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager, ttl_secs))
    }

    pub(crate) fn related_key(source_id: Uuid, limit: usize) -> String {
        format!("related:v1:{}:{}", source_id, limit)
    }

    /// TTL plus up to 10% jitter so entries written together do not expire together.
    pub(crate) fn jittered_ttl(ttl: Duration, jitter_percent: u32) -> Duration {
        let jitter = (jitter_percent % 10) as f64 / 100.0;
        let jitter_secs = (ttl.as_secs_f64() * jitter).round() as u64;
        ttl + Duration::from_secs(jitter_secs)
    }
}

#[async_trait]
impl RelatedResultCache for RelatedCache {
    async fn read(&self, source_id: Uuid, limit: usize) -> Result<Option<CachedRelated>> {
        let key = Self::related_key(source_id, limit);
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(data)) => {
                debug!("Related cache HIT for post {} (limit {})", source_id, limit);
                RELATED_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                serde_json::from_str::<CachedRelated>(&data)
                    .map(Some)
                    .map_err(|e| {
                        error!("Failed to deserialize cached related posts: {}", e);
                        RELATED_CACHE_EVENTS.with_label_values(&["error"]).inc();
                        AppError::CacheError(format!("Cache deserialization error: {}", e))
                    })
            }
            Ok(None) => {
                debug!("Related cache MISS for post {} (limit {})", source_id, limit);
                RELATED_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                Ok(None)
            }
            Err(e) => {
                warn!("Redis read error for related cache: {}", e);
                RELATED_CACHE_EVENTS.with_label_values(&["error"]).inc();
                Err(AppError::CacheError(e.to_string()))
            }
        }
    }

    async fn write(&self, source_id: Uuid, limit: usize, post_ids: &[Uuid]) -> Result<()> {
        let key = Self::related_key(source_id, limit);
        let data = serde_json::to_string(&CachedRelated {
            post_ids: post_ids.to_vec(),
        })?;
        let ttl = Self::jittered_ttl(self.ttl, rand::random::<u32>());

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, data, ttl.as_secs())
            .await
            .map_err(|e| {
                warn!("Failed to write related cache: {}", e);
                RELATED_CACHE_EVENTS.with_label_values(&["write_error"]).inc();
                AppError::CacheError(e.to_string())
            })?;

        debug!(
            "Related cache WRITE for post {} ({} posts) with TTL {:?}",
            source_id,
            post_ids.len(),
            ttl
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(AppError::CacheError(format!("unexpected PING response: {}", pong)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_key_format() {
        let post_id = Uuid::new_v4();
        let key = RelatedCache::related_key(post_id, 4);
        assert_eq!(key, format!("related:v1:{}:4", post_id));
    }

    #[test]
    fn test_jitter_stays_under_ten_percent() {
        let ttl = Duration::from_secs(300);
        assert_eq!(RelatedCache::jittered_ttl(ttl, 0), ttl);
        assert_eq!(RelatedCache::jittered_ttl(ttl, 5), Duration::from_secs(315));
        for seed in [9, 19, 99, u32::MAX] {
            assert!(RelatedCache::jittered_ttl(ttl, seed) <= Duration::from_secs(327));
        }
    }
}
