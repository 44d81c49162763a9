// ============================================================================
// bucketlink Library
// ============================================================================

pub mod classify;
pub mod connection;
pub mod core;
pub mod entity;
pub mod policy;
pub mod query;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{
    AccessError, AccessErrorKind, Cas, Document, EMPTY_JSON_DOC, JsonObject, Result,
};
pub use connection::{BucketConfig, BucketSession};
pub use entity::{
    Activities, ArrayAppends, CounterMutations, DocumentCollection, EntityKind, Results, Stats,
};
pub use policy::{ExecutionPolicy, RetryTier, RetryTrigger};
pub use store::{Bucket, Cluster, MemoryBucket, MemoryCluster, StoreFailure};

use std::sync::Arc;

// ============================================================================
// High-level Client API
// ============================================================================

/// Entry point owning the shared bucket session.
///
/// Every entity handle it hands out shares the one session, so at most one
/// logical bucket handle is in use at a time. Nothing is opened until the
/// first operation runs.
///
/// # Examples
///
/// ```
/// use bucketlink::{BucketClient, BucketConfig, MemoryCluster};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = BucketClient::connect(Arc::new(MemoryCluster::new()), BucketConfig::default())?;
///
/// let results = client.results();
/// results.create("r1", json!({}).as_object().cloned().unwrap()).await?;
/// let counted = results.add_one_to_contributions_count("r1").await?;
/// assert_eq!(counted.get("contributions_count"), Some(&json!(1)));
/// # Ok(())
/// # }
/// ```
pub struct BucketClient {
    session: Arc<BucketSession>,
    config: BucketConfig,
}

impl BucketClient {
    /// Validate `config` and prepare a lazily opened session on `cluster`.
    pub fn connect(cluster: Arc<dyn Cluster>, config: BucketConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|err| AccessError::Unavailable(format!("invalid configuration: {err}")))?;

        let session = Arc::new(BucketSession::new(cluster, config.clone()));

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<BucketSession> {
        &self.session
    }

    pub fn activities(&self) -> Activities {
        Activities::new(self.collection(EntityKind::Activity))
    }

    pub fn results(&self) -> Results {
        Results::new(self.collection(EntityKind::Result))
    }

    pub fn stats(&self) -> Stats {
        Stats::new(self.collection(EntityKind::Stats))
    }

    pub async fn is_open(&self) -> bool {
        self.session.is_open().await
    }

    /// Close the bucket handle; the next operation reopens it.
    pub async fn close(&self) {
        self.session.close().await;
    }

    fn collection(&self, kind: EntityKind) -> DocumentCollection {
        DocumentCollection::new(
            kind,
            Arc::clone(&self.session),
            self.config.key_policy(),
            self.config.query_policy(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_invalid_config() {
        let err = BucketClient::connect(
            Arc::new(MemoryCluster::new()),
            BucketConfig::new("", "pass"),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), AccessErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let cluster = Arc::new(MemoryCluster::new());
        let client = BucketClient::connect(cluster.clone(), BucketConfig::default()).unwrap();
        assert!(!client.is_open().await);
        assert_eq!(cluster.open_count(), 0);

        client.activities().fetch("a1").await.unwrap();
        assert!(client.is_open().await);
        assert_eq!(cluster.open_count(), 1);
    }

    #[tokio::test]
    async fn test_handles_share_one_session() {
        let cluster = Arc::new(MemoryCluster::new());
        let client = BucketClient::connect(cluster.clone(), BucketConfig::default()).unwrap();

        client.activities().fetch("a1").await.unwrap();
        client.results().fetch("r1").await.unwrap();
        client.stats().fetch("s1").await.unwrap();
        assert_eq!(cluster.open_count(), 1);

        client.close().await;
        assert!(!client.is_open().await);
        client.stats().fetch("s1").await.unwrap();
        assert_eq!(cluster.open_count(), 2);
    }
}
