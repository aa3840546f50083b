//! Normalized DNS questions and cache key derivation.

use std::fmt;
use std::net::IpAddr;

use hickory_proto::op::Query;
use hickory_proto::rr::{DNSClass, RecordType};

/// Address family of an address query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Whether `addr` belongs to this family.
    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// A parsed DNS question.
///
/// The name is kept as received, minus the trailing root dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: DNSClass,
}

impl Question {
    pub fn new(name: &str, qtype: RecordType, qclass: DNSClass) -> Self {
        Self {
            name: un_fqdn(name).to_string(),
            qtype,
            qclass,
        }
    }

    /// Build a question from the first query of a request.
    pub fn from_query(query: &Query) -> Self {
        Self::new(
            &query.name().to_ascii(),
            query.query_type(),
            query.query_class(),
        )
    }

    /// Cache key for this question: name, class and type in that order.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Classify the question as an address query.
    ///
    /// Only internet-class A and AAAA questions qualify.
    pub fn address_family(&self) -> Option<AddressFamily> {
        if self.qclass != DNSClass::IN {
            return None;
        }

        match self.qtype {
            RecordType::A => Some(AddressFamily::V4),
            RecordType::AAAA => Some(AddressFamily::V6),
            _ => None,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

/// Strip the trailing root dot from a fully-qualified name.
pub fn un_fqdn(name: &str) -> &str {
    match name.strip_suffix('.') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    }
}
