use super::{DocumentCollection, EntityKind};
use crate::classify::{self, Action};
use crate::core::{Document, ID_FIELD, JsonObject, Result};
use serde_json::Value;
use std::ops::Deref;

/// User activity records: plain create/fetch/update/delete.
#[derive(Clone)]
pub struct Activities {
    collection: DocumentCollection,
}

impl Activities {
    pub(crate) fn new(collection: DocumentCollection) -> Self {
        debug_assert_eq!(collection.kind(), EntityKind::Activity);
        Self { collection }
    }

    /// Inserts `value` under the key held in its own `id` field.
    ///
    /// The id is stripped from the stored value like any other create. A
    /// value without a non-empty string `id` fails with `StoreError` before
    /// any store call.
    pub async fn create_from_value(&self, value: JsonObject) -> Result<Document> {
        let id = match value.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                return Err(classify::rejected(
                    EntityKind::Activity,
                    &Action::Create,
                    "",
                    "value carries no string 'id' field",
                ));
            }
        };

        self.collection.create(&id, value).await
    }
}

impl Deref for Activities {
    type Target = DocumentCollection;

    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}
