//! The consumed store boundary.
//!
//! A [`Cluster`] opens [`Bucket`] handles from a [`BucketConfig`] carrying
//! endpoint, credentials and bucket name; a bucket offers key operations
//! guarded by an optional CAS and update-and-return statements.
//! Everything here reports [`StoreFailure`]; callers of the crate never see it.

pub mod memory;

use crate::connection::BucketConfig;
use crate::core::{Cas, JsonObject};
use crate::query::UpdateStatement;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use memory::{BucketOp, Fault, MemoryBucket, MemoryCluster};

/// Low-level failures a store call may terminate with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    #[error("document with key '{0}' already exists")]
    DuplicateKey(String),

    #[error("document with key '{0}' does not exist")]
    KeyNotFound(String),

    #[error("CAS mismatch for key '{0}'")]
    VersionMismatch(String),

    #[error("temporary failure: {0}")]
    Overloaded(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreFailure>;

/// A document exactly as the store holds it: the id lives beside the value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub content: JsonObject,
    pub cas: Cas,
}

#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    fn is_closed(&self) -> bool;

    async fn close(&self);

    /// Fails with [`StoreFailure::DuplicateKey`] when `id` is taken.
    async fn insert(&self, id: &str, content: JsonObject) -> StoreResult<StoredDocument>;

    /// Absent keys yield `Ok(None)`.
    async fn get(&self, id: &str) -> StoreResult<Option<StoredDocument>>;

    /// Replaces an existing document; `cas: None` skips the version check.
    async fn replace(
        &self,
        id: &str,
        content: JsonObject,
        cas: Option<Cas>,
    ) -> StoreResult<StoredDocument>;

    /// Removes a document and returns the CAS of the removal.
    async fn remove(&self, id: &str, cas: Option<Cas>) -> StoreResult<Cas>;

    /// Runs an update-and-return statement; one row per updated document.
    async fn query(&self, statement: &UpdateStatement) -> StoreResult<Vec<JsonObject>>;
}

#[async_trait]
pub trait Cluster: Send + Sync {
    /// Connects to `config.host:config.port` as `config.username` and opens
    /// `config.bucket`. Bad credentials fail like any other open failure.
    async fn open_bucket(&self, config: &BucketConfig) -> StoreResult<Arc<dyn Bucket>>;
}
