//! Static hostname overrides.
//!
//! Parses hosts-file text into a table consulted before the cache for
//! address queries.

use std::net::IpAddr;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::ConfigError;
use crate::question::{AddressFamily, un_fqdn};

/// Read-only name to address overrides.
pub trait Hosts: Send + Sync {
    /// Addresses of `family` recorded for `name`, in table order.
    ///
    /// Returns `None` when the name has no address of that family.
    fn lookup(&self, name: &str, family: AddressFamily) -> Option<Vec<IpAddr>>;
}

/// Hosts table in `/etc/hosts` format.
#[derive(Debug, Default, Clone)]
pub struct HostsTable {
    names: FxHashMap<String, Vec<IpAddr>>,
}

impl HostsTable {
    /// Build a table from hosts-file text.
    ///
    /// Each line is `address name [alias...]`; `#` starts a comment.
    pub fn parse(text: &str) -> Self {
        let mut names: FxHashMap<String, Vec<IpAddr>> = FxHashMap::default();

        for line in text.lines() {
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let mut fields = line.split_whitespace();
            let Some(addr) = fields.next() else {
                continue;
            };
            let addr: IpAddr = match addr.parse() {
                Ok(addr) => addr,
                Err(_) => {
                    warn!(line = line.trim(), "skipping hosts entry with invalid address");
                    continue;
                }
            };

            for name in fields {
                let addrs = names.entry(normalize(name)).or_default();
                if !addrs.contains(&addr) {
                    addrs.push(addr);
                }
            }
        }

        Self { names }
    }

    /// Load a table from a hosts file on disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Hosts {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Returns the number of names in the table.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Hosts for HostsTable {
    fn lookup(&self, name: &str, family: AddressFamily) -> Option<Vec<IpAddr>> {
        let addrs: Vec<IpAddr> = self
            .names
            .get(&normalize(name))?
            .iter()
            .filter(|addr| family.matches(addr))
            .copied()
            .collect();

        if addrs.is_empty() { None } else { Some(addrs) }
    }
}

fn normalize(name: &str) -> String {
    un_fqdn(name).to_lowercase()
}
