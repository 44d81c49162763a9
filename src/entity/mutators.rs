//! Capability interfaces layered on top of [`DocumentCollection`].
//!
//! An entity kind opts into server-side field mutation by implementing these
//! traits; the actual statement building lives in the collection.

use super::DocumentCollection;
use crate::core::{Document, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Atomic +1 / -1 on a numeric field.
#[async_trait]
pub trait CounterMutations: Send + Sync {
    fn collection(&self) -> &DocumentCollection;

    /// Adds 1 to `field`; returns the id and the new value.
    async fn increment_field(&self, id: &str, field: &str) -> Result<Document> {
        self.collection().adjust_counter(id, field, 1).await
    }

    /// Subtracts 1 from `field`; returns the id and the new value.
    async fn decrement_field(&self, id: &str, field: &str) -> Result<Document> {
        self.collection().adjust_counter(id, field, -1).await
    }
}

/// Atomic append to an array selected by a caller-supplied key.
#[async_trait]
pub trait ArrayAppends: Send + Sync {
    fn collection(&self) -> &DocumentCollection;

    /// Appends `element` to `field.key`; returns the id and the element under `alias`.
    async fn append_element(
        &self,
        id: &str,
        field: &str,
        key: &str,
        element: Value,
        alias: &str,
    ) -> Result<Document> {
        self.collection()
            .append_to_array(id, field, key, element, alias)
            .await
    }
}
