use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::{Name, RecordType};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferry::QueryHandler;
use ferry::config::{CacheSettings, HostsSettings, Settings, UpstreamSettings};
use ferry::error::ConfigError;
use ferry::reply::ReplySink;
use ferry::upstream::{ForwardingResolver, Transport};

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Resolve names through the caching DNS forwarding core", long_about = None)]
struct Args {
    /// Names to resolve
    #[arg(required = true)]
    names: Vec<String>,

    /// Record type to query
    #[arg(short = 't', long = "type", default_value = "A")]
    qtype: String,

    /// Upstream DNS server (host:port), repeatable
    #[arg(short, long = "upstream", default_value = "8.8.8.8:53")]
    upstreams: Vec<SocketAddr>,

    /// Query upstreams over TCP instead of UDP
    #[arg(long)]
    tcp: bool,

    /// Upstream timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Cache backend
    #[arg(long, default_value = "memory")]
    cache_backend: String,

    /// Cache expiry in seconds
    #[arg(long, default_value_t = 600)]
    cache_expire: u64,

    /// Maximum number of cached entries
    #[arg(long, default_value_t = 5000)]
    cache_max_count: usize,

    /// Disable negative caching
    #[arg(long)]
    no_negative: bool,

    /// Hosts file consulted before the cache
    #[arg(long)]
    hosts_file: Option<PathBuf>,

    /// TTL of records answered from the hosts file
    #[arg(long, default_value_t = 600)]
    hosts_ttl: u32,

    /// Resolve each name this many times
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn settings(&self) -> Settings {
        let expire = Duration::from_secs(self.cache_expire);
        Settings {
            cache: CacheSettings {
                backend: self.cache_backend.clone(),
                expire,
                max_count: self.cache_max_count,
                no_negative: self.no_negative,
                stale_window: Some(expire),
            },
            hosts: HostsSettings {
                enable: self.hosts_file.is_some(),
                path: self.hosts_file.clone(),
                ttl: self.hosts_ttl,
            },
            upstream: UpstreamSettings {
                servers: self.upstreams.clone(),
                timeout: Duration::from_secs(self.timeout),
            },
        }
    }
}

/// Prints replies to stdout.
struct StdoutSink;

#[async_trait]
impl ReplySink for StdoutSink {
    fn remote_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    async fn write(&mut self, message: &Message) -> io::Result<()> {
        println!(";; id={} status={}", message.id(), message.response_code());
        for record in message.answers() {
            println!("{record}");
        }
        Ok(())
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_request(id: u16, name: &str, qtype: RecordType) -> anyhow::Result<Message> {
    let name = Name::from_str(name).with_context(|| format!("invalid name {name}"))?;
    let mut request = Message::new();
    request
        .set_id(id)
        .set_recursion_desired(true)
        .add_query(Query::query(name, qtype));
    Ok(request)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.settings();
    let qtype = RecordType::from_str(&args.qtype)
        .map_err(|_| ConfigError::InvalidRecordType(args.qtype.clone()))?;
    let transport = if args.tcp { Transport::Tcp } else { Transport::Udp };

    let upstream = Arc::new(ForwardingResolver::from_settings(&settings.upstream));
    let handler = QueryHandler::from_settings(&settings, upstream)?;

    let mut id: u16 = 1;
    for name in &args.names {
        for _ in 0..args.repeat {
            let request = build_request(id, name, qtype)?;
            let outcome = handler.handle(transport, &request, &mut StdoutSink).await;
            info!(%name, ?outcome, "answered");
            id = id.wrapping_add(1);
        }
    }

    let stats = handler.stats().snapshot_and_reset();
    info!(
        requests = stats.requests,
        hosts = stats.hosts,
        cached = stats.cached,
        stale = stats.stale,
        negative = stats.negative,
        forwarded = stats.forwarded,
        failed = stats.failed,
        avg_response_ms = stats.avg_response_ms,
        "stats"
    );

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(args))
}
