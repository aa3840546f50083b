//! Ferry - the query-resolution and caching core of a DNS forwarding proxy.
//!
//! Answers questions from a hosts override table, a positive/negative
//! cache with stale-serve and refresh-ahead, or an upstream resolver.

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod hosts;
pub mod question;
pub mod refresh;
pub mod reply;
pub mod stats;
pub mod upstream;

pub use handler::{Outcome, QueryHandler};
