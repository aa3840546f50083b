//! DNS query handling.
//!
//! Handles the core query processing pipeline, first match wins:
//! 1. Hosts override (address queries only)
//! 2. Positive cache: fresh hit, or stale hit plus background refresh
//! 3. Negative cache: recent failure short-circuits to SERVFAIL
//! 4. Upstream resolution, populating the caches
//!
//! The reply is always written before any cache mutation.

use std::sync::Arc;
use std::time::Instant;

use hickory_proto::op::Message;
use tracing::{debug, info, warn};

use crate::cache::{Cache, Lookup, build_caches};
use crate::config::Settings;
use crate::error::ConfigError;
use crate::hosts::{Hosts, HostsTable};
use crate::question::Question;
use crate::refresh::RefreshGroup;
use crate::reply::{self, ReplySink};
use crate::stats::Stats;
use crate::upstream::{Transport, UpstreamResolver};

/// Which stage of the pipeline produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Answered from the hosts override table.
    Hosts,
    /// Fresh positive cache hit.
    Cached,
    /// Expired cache hit served stale; a refresh was requested.
    Stale,
    /// Negative cache hit, answered SERVFAIL.
    Negative,
    /// Answered by the upstream resolver.
    Forwarded,
    /// Upstream lookup failed, answered SERVFAIL.
    Failed,
    /// Request without a question, answered FORMERR.
    Malformed,
}

/// Answers questions from hosts, cache or upstream.
///
/// Holds no per-query state; a single handler serves any number of
/// concurrent queries.
pub struct QueryHandler {
    upstream: Arc<dyn UpstreamResolver>,
    cache: Arc<dyn Cache>,
    negative: Arc<dyn Cache>,
    hosts: Option<Arc<dyn Hosts>>,
    hosts_ttl: u32,
    refresh: RefreshGroup,
    stats: Arc<Stats>,
}

impl QueryHandler {
    pub fn new(
        upstream: Arc<dyn UpstreamResolver>,
        cache: Arc<dyn Cache>,
        negative: Arc<dyn Cache>,
    ) -> Self {
        Self {
            upstream,
            cache,
            negative,
            hosts: None,
            hosts_ttl: 0,
            refresh: RefreshGroup::new(),
            stats: Arc::new(Stats::new()),
        }
    }

    /// Consult `hosts` for address queries, answering with `ttl`.
    pub fn with_hosts(mut self, hosts: Arc<dyn Hosts>, ttl: u32) -> Self {
        self.hosts = Some(hosts);
        self.hosts_ttl = ttl;
        self
    }

    /// Build a handler with the caches and hosts table `settings` describe.
    ///
    /// Fails on an unknown cache backend or an unreadable hosts file.
    pub fn from_settings(
        settings: &Settings,
        upstream: Arc<dyn UpstreamResolver>,
    ) -> Result<Self, ConfigError> {
        let (cache, negative) = build_caches(settings)?;
        let mut handler = Self::new(upstream, cache, negative);

        if settings.hosts.enable {
            let hosts = match &settings.hosts.path {
                Some(path) => HostsTable::load(path)?,
                None => HostsTable::default(),
            };
            info!(names = hosts.len(), "hosts override enabled");
            handler = handler.with_hosts(Arc::new(hosts), settings.hosts.ttl);
        }

        Ok(handler)
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    pub fn refresh_group(&self) -> &RefreshGroup {
        &self.refresh
    }

    /// Answer `request`, writing exactly one reply to `sink`.
    ///
    /// Only the first question is processed. Failures are turned into DNS
    /// error replies and never escape.
    pub async fn handle(
        &self,
        transport: Transport,
        request: &Message,
        sink: &mut dyn ReplySink,
    ) -> Outcome {
        let start = Instant::now();
        let outcome = self.resolve(transport, request, sink).await;
        self.stats.record(outcome, start.elapsed());
        outcome
    }

    async fn resolve(
        &self,
        transport: Transport,
        request: &Message,
        sink: &mut dyn ReplySink,
    ) -> Outcome {
        let peer = sink.remote_addr();
        let Some(query) = request.queries().first() else {
            warn!(peer = %peer.ip(), %transport, "request carries no question");
            write_reply(sink, &reply::format_error(request)).await;
            return Outcome::Malformed;
        };

        let question = Question::from_query(query);
        info!(peer = %peer.ip(), %transport, %question, "lookup");

        if let (Some(hosts), Some(family)) = (&self.hosts, question.address_family()) {
            match hosts.lookup(&question.name, family) {
                Some(addrs) => {
                    let reply = reply::address_reply(request, query.name(), &addrs, self.hosts_ttl);
                    write_reply(sink, &reply).await;
                    debug!(%question, "found in hosts");
                    return Outcome::Hosts;
                }
                None => debug!(%question, "not found in hosts"),
            }
        }

        let key = question.key();
        match read_cache(self.cache.as_ref(), &key, &question).await {
            Lookup::Fresh(Some(cached)) => {
                debug!(%question, "hit cache");
                write_reply(sink, &reply::cached_reply(&cached, request.id())).await;
                return Outcome::Cached;
            }
            Lookup::Expired(Some(cached)) => {
                debug!(%question, "return stale cache and refresh");
                write_reply(sink, &reply::cached_reply(&cached, request.id())).await;
                self.spawn_refresh(key, question, transport, request.clone());
                return Outcome::Stale;
            }
            _ => {}
        }

        // Negative entries are present or absent; an expired one is absent.
        if let Lookup::Fresh(_) = read_cache(self.negative.as_ref(), &key, &question).await {
            debug!(%question, "hit negative cache");
            write_reply(sink, &reply::server_failure(request)).await;
            return Outcome::Negative;
        }
        debug!(%question, "didn't hit cache");

        match self.upstream.lookup(transport, request).await {
            Ok(mut response) => {
                response.set_id(request.id());
                write_reply(sink, &response).await;
                store_answer(self.cache.as_ref(), &key, &question, response).await;
                Outcome::Forwarded
            }
            Err(e) => {
                warn!(%question, error = %e, "resolve query error");
                write_reply(sink, &reply::server_failure(request)).await;

                if let Err(e) = self.negative.set(&key, None).await {
                    warn!(%question, error = %e, "set negative cache failed");
                }
                Outcome::Failed
            }
        }
    }

    /// Fire a background refresh for `key` unless one is already running.
    fn spawn_refresh(
        &self,
        key: String,
        question: Question,
        transport: Transport,
        request: Message,
    ) {
        let upstream = Arc::clone(&self.upstream);
        let cache = Arc::clone(&self.cache);
        let inflight_key = key.clone();

        let started = self.refresh.refresh_once(&inflight_key, async move {
            match upstream.lookup(transport, &request).await {
                Ok(response) => store_answer(cache.as_ref(), &key, &question, response).await,
                Err(e) => debug!(%question, error = %e, "resolve query on refresh error"),
            }
        });

        if !started {
            debug!(key = %inflight_key, "refresh already in flight");
        }
    }
}

/// Read `key`, treating a backend error as a miss.
async fn read_cache(cache: &dyn Cache, key: &str, question: &Question) -> Lookup {
    match cache.get(key).await {
        Ok(lookup) => lookup,
        Err(e) => {
            warn!(%question, error = %e, "get cache failed");
            Lookup::NotFound
        }
    }
}

/// Cache `response` under `key` if it carries at least one answer.
async fn store_answer(cache: &dyn Cache, key: &str, question: &Question, response: Message) {
    if response.answers().is_empty() {
        return;
    }

    match cache.set(key, Some(response)).await {
        Ok(()) => debug!(%question, "insert into cache"),
        Err(e) => warn!(%question, error = %e, "set cache failed"),
    }
}

async fn write_reply(sink: &mut dyn ReplySink, message: &Message) {
    if let Err(e) = sink.write(message).await {
        warn!(peer = %sink.remote_addr(), error = %e, "failed to write reply");
    }
}
