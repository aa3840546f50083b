//! Cache contract shared by every storage backend.
//!
//! The handler only talks to [`Cache`]; concrete backends are picked once
//! from configuration by [`build_caches`].

mod memory;
mod noop;

pub use memory::MemoryCache;
pub use noop::NoCache;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::Message;

use crate::config::Settings;
use crate::error::{CacheError, ConfigError};

/// A stored payload. Negative entries carry no message.
pub type CachedMessage = Option<Arc<Message>>;

/// Outcome of a cache read.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Entry present and within its time-to-live.
    Fresh(CachedMessage),
    /// Entry past its time-to-live but still retained for stale serving.
    Expired(CachedMessage),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        !matches!(self, Lookup::NotFound)
    }
}

/// Key to response mapping with TTL-driven expiration.
///
/// Implementations synchronize internally: each `get` and `set` is atomic
/// with respect to every other call on the same cache.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Lookup, CacheError>;

    /// Insert or replace the entry for `key`, resetting its expiration.
    async fn set(&self, key: &str, message: Option<Message>) -> Result<(), CacheError>;
}

/// Storage substrates known to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(CacheBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Build the positive and negative caches described by `settings`.
pub fn build_caches(settings: &Settings) -> Result<(Arc<dyn Cache>, Arc<dyn Cache>), ConfigError> {
    let cache_settings = &settings.cache;

    match cache_settings.backend.parse::<CacheBackend>()? {
        CacheBackend::Memory => {
            let mut cache = MemoryCache::new(cache_settings.expire, cache_settings.max_count);
            if let Some(window) = cache_settings.stale_window {
                cache = cache.with_stale_window(window);
            }

            let negative: Arc<dyn Cache> = if cache_settings.no_negative {
                Arc::new(NoCache)
            } else {
                Arc::new(MemoryCache::new(
                    settings.negative_expire(),
                    cache_settings.max_count,
                ))
            };

            Ok((Arc::new(cache), negative))
        }
    }
}
