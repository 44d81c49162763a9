use super::{ArrayAppends, CounterMutations, DocumentCollection, EntityKind};
use crate::core::{Document, JsonObject, Result};
use serde_json::Value;
use std::ops::Deref;

/// Counter of contributions made to a project.
pub const CONTRIBUTIONS_COUNT: &str = "contributions_count";

/// Object holding one array of submissions per answer category.
pub const RESULTS_FIELD: &str = "results";

/// Key the appended submission is returned under.
pub const LOCATION_ALIAS: &str = "location";

/// Per-project result records.
#[derive(Clone)]
pub struct Results {
    collection: DocumentCollection,
}

impl Results {
    pub(crate) fn new(collection: DocumentCollection) -> Self {
        debug_assert_eq!(collection.kind(), EntityKind::Result);
        Self { collection }
    }

    /// Adds 1 to the contributions count of the result `id`.
    ///
    /// Returns `{"id": id, "contributions_count": <new value>}`.
    pub async fn add_one_to_contributions_count(&self, id: &str) -> Result<Document> {
        self.increment_field(id, CONTRIBUTIONS_COUNT).await
    }

    /// Records a submission for a single-question template: appends `location`
    /// to `results.<answer>`.
    ///
    /// Returns `{"id": id, "location": <appended object>}`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bucketlink::{BucketClient, BucketConfig, JsonObject, MemoryCluster};
    /// # use serde_json::json;
    /// # use std::sync::Arc;
    /// # tokio_test::block_on(async {
    /// # let client = BucketClient::connect(Arc::new(MemoryCluster::new()), BucketConfig::default()).unwrap();
    /// let results = client.results();
    /// results.create("r1", JsonObject::new()).await.unwrap();
    ///
    /// let location = json!({"lat": 1, "lng": 2}).as_object().cloned().unwrap();
    /// let doc = results.add_result_for_template("r1", "yes", location).await.unwrap();
    /// assert_eq!(doc.to_json(), json!({"id": "r1", "location": {"lat": 1, "lng": 2}}));
    /// # });
    /// ```
    pub async fn add_result_for_template(
        &self,
        id: &str,
        answer: &str,
        location: JsonObject,
    ) -> Result<Document> {
        self.append_element(
            id,
            RESULTS_FIELD,
            answer,
            Value::Object(location),
            LOCATION_ALIAS,
        )
        .await
    }
}

impl Deref for Results {
    type Target = DocumentCollection;

    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}

impl CounterMutations for Results {
    fn collection(&self) -> &DocumentCollection {
        &self.collection
    }
}

impl ArrayAppends for Results {
    fn collection(&self) -> &DocumentCollection {
        &self.collection
    }
}
