use super::{CounterMutations, DocumentCollection, EntityKind};
use crate::core::{Document, Result};
use std::ops::Deref;

/// Counter of users enrolled in a project.
pub const ENROLLMENTS_COUNT: &str = "enrollments_count";

/// Per-project aggregate records.
#[derive(Clone)]
pub struct Stats {
    collection: DocumentCollection,
}

impl Stats {
    pub(crate) fn new(collection: DocumentCollection) -> Self {
        debug_assert_eq!(collection.kind(), EntityKind::Stats);
        Self { collection }
    }

    /// Returns `{"id": id, "enrollments_count": <new value>}`.
    pub async fn add_one_to_enrollments_count(&self, id: &str) -> Result<Document> {
        self.increment_field(id, ENROLLMENTS_COUNT).await
    }

    /// Returns `{"id": id, "enrollments_count": <new value>}`.
    pub async fn remove_one_from_enrollments_count(&self, id: &str) -> Result<Document> {
        self.decrement_field(id, ENROLLMENTS_COUNT).await
    }
}

impl Deref for Stats {
    type Target = DocumentCollection;

    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}

impl CounterMutations for Stats {
    fn collection(&self) -> &DocumentCollection {
        &self.collection
    }
}
