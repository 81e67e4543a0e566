//! In-memory RelatedResultCache for integration tests
//!
//! Keeps entries in a map keyed like the Redis cache and can be switched into
//! a broken state where every operation errors.

use async_trait::async_trait;
use content_service::cache::{CachedRelated, RelatedResultCache};
use content_service::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryRelatedCache {
    entries: Mutex<HashMap<(Uuid, usize), Vec<Uuid>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    broken: AtomicBool,
}

impl InMemoryRelatedCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Cache whose reads, writes and pings all fail.
    pub fn broken() -> Arc<Self> {
        let cache = Self::default();
        cache.broken.store(true, Ordering::SeqCst);
        Arc::new(cache)
    }

    pub fn seed(&self, source_id: Uuid, limit: usize, post_ids: Vec<Uuid>) {
        self.entries
            .lock()
            .unwrap()
            .insert((source_id, limit), post_ids);
    }

    pub fn entry(&self, source_id: Uuid, limit: usize) -> Option<Vec<Uuid>> {
        self.entries.lock().unwrap().get(&(source_id, limit)).cloned()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(AppError::CacheError("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RelatedResultCache for InMemoryRelatedCache {
    async fn read(&self, source_id: Uuid, limit: usize) -> Result<Option<CachedRelated>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .entry(source_id, limit)
            .map(|post_ids| CachedRelated { post_ids }))
    }

    async fn write(&self, source_id: Uuid, limit: usize, post_ids: &[Uuid]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.seed(source_id, limit, post_ids.to_vec());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}
