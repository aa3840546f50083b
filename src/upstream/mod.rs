//! Upstream resolution.
//!
//! Forwards requests to upstream DNS servers over UDP or TCP. All
//! configured upstreams are raced and the first usable answer wins.

pub mod tcp;
pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;

/// Length of the fixed DNS header.
pub const HEADER_LEN: usize = 12;

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::select_ok;
use hickory_proto::op::{Message, ResponseCode};
use tracing::debug;

use crate::config::UpstreamSettings;
use crate::error::ResolveError;

/// Transport a request arrived on, reused for the upstream exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performs the actual lookup for a request the cache could not answer.
#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    async fn lookup(
        &self,
        transport: Transport,
        request: &Message,
    ) -> Result<Message, ResolveError>;
}

/// Resolver that forwards requests verbatim to a set of upstream servers.
pub struct ForwardingResolver {
    upstreams: Vec<SocketAddr>,
    timeout: Duration,
}

impl ForwardingResolver {
    pub fn new(upstreams: Vec<SocketAddr>, timeout: Duration) -> Self {
        Self { upstreams, timeout }
    }

    pub fn from_settings(settings: &UpstreamSettings) -> Self {
        Self::new(settings.servers.clone(), settings.timeout)
    }

    /// One bounded exchange with a single upstream.
    async fn exchange(
        &self,
        transport: Transport,
        upstream: SocketAddr,
        wire: &[u8],
    ) -> Result<Message, ResolveError> {
        let start = Instant::now();
        let exchange = async {
            match transport {
                Transport::Udp => udp::exchange(upstream, wire).await,
                Transport::Tcp => tcp::exchange(upstream, wire).await,
            }
        };
        let bytes = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => return Err(ResolveError::Timeout(upstream)),
        };

        let response = Message::from_vec(&bytes)?;
        if response.response_code() == ResponseCode::ServFail {
            return Err(ResolveError::ServerFailure(upstream));
        }

        debug!(
            %upstream,
            %transport,
            rtt_ms = start.elapsed().as_secs_f64() * 1000.0,
            "upstream answered"
        );
        Ok(response)
    }
}

#[async_trait]
impl UpstreamResolver for ForwardingResolver {
    async fn lookup(
        &self,
        transport: Transport,
        request: &Message,
    ) -> Result<Message, ResolveError> {
        if self.upstreams.is_empty() {
            return Err(ResolveError::NoUpstreams);
        }

        let wire = request.to_vec()?;
        let attempts = self
            .upstreams
            .iter()
            .map(|&upstream| Box::pin(self.exchange(transport, upstream, &wire)));

        let (response, _) = select_ok(attempts).await?;
        Ok(response)
    }
}
