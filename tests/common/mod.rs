#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};

use ferry::cache::{Cache, Lookup};
use ferry::error::{CacheError, ResolveError};
use ferry::hosts::Hosts;
use ferry::question::AddressFamily;
use ferry::reply::ReplySink;
use ferry::upstream::{Transport, UpstreamResolver};

pub fn request(id: u16, name: &str, qtype: RecordType) -> Message {
    let mut request = Message::new();
    request
        .set_id(id)
        .set_recursion_desired(true)
        .add_query(Query::query(Name::from_str(name).unwrap(), qtype));
    request
}

pub fn a_record(name: &str, ip: Ipv4Addr, ttl: u32) -> Record {
    Record::from_rdata(Name::from_str(name).unwrap(), ttl, RData::A(A(ip)))
}

/// Upstream answer to `request` carrying `answers`.
pub fn answer(request: &Message, answers: &[Record]) -> Message {
    let mut response = request.clone();
    response
        .set_message_type(MessageType::Response)
        .set_response_code(ResponseCode::NoError);
    for record in answers {
        response.add_answer(record.clone());
    }
    response
}

enum Behavior {
    Answer(Vec<Record>),
    Fail,
}

/// Upstream double counting its lookups.
pub struct MockUpstream {
    calls: AtomicUsize,
    behavior: Mutex<Behavior>,
    delay: Duration,
}

impl MockUpstream {
    pub fn answering(records: Vec<Record>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            behavior: Mutex::new(Behavior::Answer(records)),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            behavior: Mutex::new(Behavior::Fail),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn answer_with(&self, records: Vec<Record>) {
        *self.behavior.lock().unwrap() = Behavior::Answer(records);
    }

    pub fn fail(&self) {
        *self.behavior.lock().unwrap() = Behavior::Fail;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamResolver for MockUpstream {
    async fn lookup(
        &self,
        _transport: Transport,
        request: &Message,
    ) -> Result<Message, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = match &*self.behavior.lock().unwrap() {
            Behavior::Answer(records) => Ok(answer(request, records)),
            Behavior::Fail => Err(ResolveError::Timeout(SocketAddr::from(([192, 0, 2, 1], 53)))),
        };
        response
    }
}

/// Cache wrapper counting calls to the wrapped backend.
pub struct CountingCache<C> {
    inner: C,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl<C> CountingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Cache> Cache for CountingCache<C> {
    async fn get(&self, key: &str) -> Result<Lookup, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, message: Option<Message>) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, message).await
    }
}

/// Cache whose writes always fail.
pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Lookup, CacheError> {
        Err(CacheError::Backend("store unreachable".to_string()))
    }

    async fn set(&self, _key: &str, _message: Option<Message>) -> Result<(), CacheError> {
        Err(CacheError::Backend("store unreachable".to_string()))
    }
}

/// Hosts double with a single entry.
pub struct StaticHosts {
    name: String,
    addrs: Vec<IpAddr>,
    lookups: AtomicUsize,
}

impl StaticHosts {
    pub fn new(name: &str, addrs: Vec<IpAddr>) -> Self {
        Self {
            name: name.to_string(),
            addrs,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Hosts for StaticHosts {
    fn lookup(&self, name: &str, family: AddressFamily) -> Option<Vec<IpAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if name != self.name {
            return None;
        }
        let addrs: Vec<IpAddr> = self.addrs.iter().copied().filter(|a| family.matches(a)).collect();
        if addrs.is_empty() { None } else { Some(addrs) }
    }
}

/// Sink recording every reply written to it.
#[derive(Default)]
pub struct RecordingSink {
    pub replies: Vec<Message>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_reply(&self) -> &Message {
        assert_eq!(self.replies.len(), 1, "expected exactly one reply");
        &self.replies[0]
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    fn remote_addr(&self) -> SocketAddr {
        SocketAddr::from(([198, 51, 100, 7], 40000))
    }

    async fn write(&mut self, message: &Message) -> io::Result<()> {
        self.replies.push(message.clone());
        Ok(())
    }
}

/// Sink noting, at each write, whether `key` was already in `cache`.
pub struct CacheWatchingSink {
    cache: Arc<dyn Cache>,
    key: String,
    pub replies: Vec<Message>,
    pub cached_at_write: Vec<bool>,
}

impl CacheWatchingSink {
    pub fn new(cache: Arc<dyn Cache>, key: &str) -> Self {
        Self {
            cache,
            key: key.to_string(),
            replies: Vec::new(),
            cached_at_write: Vec::new(),
        }
    }
}

#[async_trait]
impl ReplySink for CacheWatchingSink {
    fn remote_addr(&self) -> SocketAddr {
        SocketAddr::from(([198, 51, 100, 8], 40001))
    }

    async fn write(&mut self, message: &Message) -> io::Result<()> {
        let cached = match self.cache.get(&self.key).await {
            Ok(lookup) => lookup.is_found(),
            Err(_) => false,
        };
        self.cached_at_write.push(cached);
        self.replies.push(message.clone());
        Ok(())
    }
}

/// Let spawned background work run to completion.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn upstream_arc(upstream: &Arc<MockUpstream>) -> Arc<dyn UpstreamResolver> {
    Arc::clone(upstream) as Arc<dyn UpstreamResolver>
}
