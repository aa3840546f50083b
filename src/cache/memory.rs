//! In-memory cache backend with TTL-based expiration.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

use super::{Cache, CachedMessage, Lookup};
use crate::error::CacheError;

struct CacheEntry {
    message: CachedMessage,
    inserted_at: Instant,
}

/// Entries plus their insertion order.
///
/// `order` may hold records for keys that were since replaced or dropped;
/// a record is live only while its timestamp matches the entry's.
#[derive(Default)]
struct Table {
    entries: FxHashMap<String, CacheEntry>,
    order: VecDeque<(String, Instant)>,
}

impl Table {
    fn insert(&mut self, key: &str, message: CachedMessage, now: Instant) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                message,
                inserted_at: now,
            },
        );
        self.order.push_back((key.to_string(), now));

        if self.order.len() > 2 * self.entries.len() + 16 {
            self.compact();
        }
    }

    /// Drop the oldest live entry, skipping superseded order records.
    fn evict_oldest(&mut self) -> bool {
        while let Some((key, inserted_at)) = self.order.pop_front() {
            if self.is_live(&key, inserted_at) {
                self.entries.remove(&key);
                return true;
            }
        }
        false
    }

    fn is_live(&self, key: &str, inserted_at: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at == inserted_at)
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order.retain(|(key, inserted_at)| {
            entries
                .get(key)
                .is_some_and(|entry| entry.inserted_at == *inserted_at)
        });
    }
}

/// Bounded in-memory cache.
///
/// Entries are fresh for `expire` after insertion. With a stale window,
/// an expired entry is still returned as [`Lookup::Expired`] until the
/// window elapses; without one, expiry is binary. Entries past their
/// retention are dropped on read. When full, the oldest insertion is
/// evicted; since every entry shares one lifetime, dead entries always go
/// first.
pub struct MemoryCache {
    table: RwLock<Table>,
    expire: Duration,
    max_count: usize,
    stale_window: Option<Duration>,
}

enum Age {
    Fresh,
    Stale,
    Dead,
}

impl MemoryCache {
    pub fn new(expire: Duration, max_count: usize) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            expire,
            max_count,
            stale_window: None,
        }
    }

    /// Keep expired entries available for stale serving for `window`.
    pub fn with_stale_window(mut self, window: Duration) -> Self {
        self.stale_window = Some(window);
        self
    }

    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn age(&self, entry: &CacheEntry, now: Instant) -> Age {
        let elapsed = now.saturating_duration_since(entry.inserted_at);
        if elapsed < self.expire {
            return Age::Fresh;
        }
        match self.stale_window {
            Some(window) if elapsed - self.expire < window => Age::Stale,
            _ => Age::Dead,
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Lookup, CacheError> {
        let now = Instant::now();

        {
            let table = self.table.read().map_err(|_| CacheError::Poisoned)?;
            let Some(entry) = table.entries.get(key) else {
                return Ok(Lookup::NotFound);
            };
            match self.age(entry, now) {
                Age::Fresh => return Ok(Lookup::Fresh(entry.message.clone())),
                Age::Stale => return Ok(Lookup::Expired(entry.message.clone())),
                Age::Dead => {}
            }
        }

        let mut table = self.table.write().map_err(|_| CacheError::Poisoned)?;
        // Re-check: a concurrent set may have replaced the entry.
        if let Some(entry) = table.entries.get(key) {
            match self.age(entry, now) {
                Age::Fresh => return Ok(Lookup::Fresh(entry.message.clone())),
                Age::Stale => return Ok(Lookup::Expired(entry.message.clone())),
                Age::Dead => {
                    table.entries.remove(key);
                }
            }
        }
        Ok(Lookup::NotFound)
    }

    async fn set(&self, key: &str, message: Option<Message>) -> Result<(), CacheError> {
        if self.max_count == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut table = self.table.write().map_err(|_| CacheError::Poisoned)?;

        if !table.entries.contains_key(key) {
            while table.entries.len() >= self.max_count && table.evict_oldest() {}
        }

        table.insert(key, message.map(Arc::new), now);
        Ok(())
    }
}
