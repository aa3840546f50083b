use async_trait::async_trait;
use hickory_proto::op::Message;

use super::{Cache, Lookup};
use crate::error::CacheError;

/// Cache that remembers nothing. Stands in for a disabled negative cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _key: &str) -> Result<Lookup, CacheError> {
        Ok(Lookup::NotFound)
    }

    async fn set(&self, _key: &str, _message: Option<Message>) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_is_discarded() {
        let cache = NoCache;
        cache.set("k", Some(Message::new())).await.unwrap();

        assert!(matches!(cache.get("k").await.unwrap(), Lookup::NotFound));
    }
}
