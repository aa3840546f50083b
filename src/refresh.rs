//! Single-flight coordination of background cache refreshes.
//!
//! A stale cache hit fires a refresh and moves on. Concurrent stale hits on
//! the same key collapse into the one refresh already in flight.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Tracks which cache keys have a refresh in flight.
#[derive(Clone, Default)]
pub struct RefreshGroup {
    inflight: Arc<Mutex<FxHashSet<String>>>,
}

/// Marks a key as in flight until dropped.
struct InflightGuard {
    key: String,
    inflight: Arc<Mutex<FxHashSet<String>>>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        lock(&self.inflight).remove(&self.key);
    }
}

// Guards release keys while unwinding, so a poisoned set is still consistent.
fn lock(set: &Mutex<FxHashSet<String>>) -> MutexGuard<'_, FxHashSet<String>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RefreshGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `work` for `key` unless a refresh for `key` is already running.
    ///
    /// Returns `true` when `work` was spawned. The caller never waits for it;
    /// the key is released once `work` finishes or panics.
    pub fn refresh_once<F>(&self, key: &str, work: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(guard) = self.acquire(key) else {
            return false;
        };

        spawn_supervised(key.to_string(), async move {
            let _guard = guard;
            work.await;
        });
        true
    }

    /// Whether a refresh for `key` is currently running.
    pub fn in_flight(&self, key: &str) -> bool {
        lock(&self.inflight).contains(key)
    }

    /// Number of refreshes currently running.
    pub fn len(&self) -> usize {
        lock(&self.inflight).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, key: &str) -> Option<InflightGuard> {
        if !lock(&self.inflight).insert(key.to_string()) {
            return None;
        }
        Some(InflightGuard {
            key: key.to_string(),
            inflight: Arc::clone(&self.inflight),
        })
    }
}

/// Spawn `work` detached from the caller, logging instead of propagating a panic.
fn spawn_supervised<F>(key: String, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(work);
    tokio::spawn(async move {
        match handle.await {
            Ok(()) => debug!(%key, "refresh finished"),
            Err(e) if e.is_panic() => warn!(%key, "refresh task panicked"),
            Err(e) => warn!(%key, error = %e, "refresh task cancelled"),
        }
    });
}
