//! Handler configuration.
//!
//! Settings are built once at startup and passed to constructors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the query handler and its collaborators.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub hosts: HostsSettings,
    pub upstream: UpstreamSettings,
}

impl Settings {
    /// Negative entries live for half the positive expiry.
    pub fn negative_expire(&self) -> Duration {
        self.cache.expire / 2
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Backend name, resolved when the handler is built.
    pub backend: String,
    /// Time-to-live of positive entries.
    pub expire: Duration,
    /// Maximum entry count per cache.
    pub max_count: usize,
    /// Disable negative caching entirely.
    pub no_negative: bool,
    /// How long an expired positive entry may still be served stale.
    /// `None` disables stale serving.
    pub stale_window: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let expire = Duration::from_secs(600);
        Self {
            backend: "memory".to_string(),
            expire,
            max_count: 5000,
            no_negative: false,
            stale_window: Some(expire),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostsSettings {
    pub enable: bool,
    pub path: Option<PathBuf>,
    /// TTL of synthesized hosts records, in seconds.
    pub ttl: u32,
}

impl Default for HostsSettings {
    fn default() -> Self {
        Self {
            enable: false,
            path: None,
            ttl: 600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Upstream DNS servers, raced on every lookup.
    pub servers: Vec<SocketAddr>,
    /// Per-exchange timeout.
    pub timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            servers: vec![SocketAddr::from(([8, 8, 8, 8], 53))],
            timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_expire_is_half_of_expire() {
        let mut settings = Settings::default();
        settings.cache.expire = Duration::from_secs(60);

        assert_eq!(settings.negative_expire(), Duration::from_secs(30));
    }

    #[test]
    fn defaults_select_memory_backend() {
        let settings = Settings::default();

        assert_eq!(settings.cache.backend, "memory");
        assert_eq!(settings.cache.stale_window, Some(settings.cache.expire));
        assert!(!settings.hosts.enable);
    }
}
