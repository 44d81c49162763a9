use super::EntityKind;
use crate::classify::{self, Action};
use crate::connection::BucketSession;
use crate::core::{Cas, Document, JsonObject, Result, strip_id};
use crate::policy::ExecutionPolicy;
use crate::query::{Projection, SetExpression, UpdateStatement, validate_segment};
use crate::store::{Bucket, StoreFailure};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Level, event, instrument};

/// Create/fetch/update/delete for one entity kind.
///
/// Every operation runs the same pipeline: connection guard, store call under
/// the execution policy, classification of whatever failure is left, and
/// shaping of the stored value into a [`Document`].
#[derive(Clone)]
pub struct DocumentCollection {
    kind: EntityKind,
    session: Arc<BucketSession>,
    key_policy: ExecutionPolicy,
    query_policy: ExecutionPolicy,
}

impl DocumentCollection {
    pub fn new(
        kind: EntityKind,
        session: Arc<BucketSession>,
        key_policy: ExecutionPolicy,
        query_policy: ExecutionPolicy,
    ) -> Self {
        Self {
            kind,
            session,
            key_policy,
            query_policy,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Inserts a new document. Fails with `AlreadyExists` if `id` is taken.
    #[instrument(
        name = "bucket.document",
        skip_all,
        fields(entity = %self.kind, id = %id, action = "create")
    )]
    pub async fn create(&self, id: &str, content: JsonObject) -> Result<Document> {
        let action = Action::Create;
        let bucket = self.guard(&action, id).await?;
        event!(Level::DEBUG, "adding document");

        let content = strip_id(content);
        let stored = self
            .key_policy
            .run(action.name(), || bucket.insert(id, content.clone()))
            .await
            .map_err(|failure| classify::classify(self.kind, &action, id, failure))?;

        event!(Level::DEBUG, cas = %stored.cas, "document added");
        Ok(Document::new(stored.id, stored.content, Some(stored.cas)))
    }

    /// Reads a document; an absent id yields [`Document::not_found`], not an error.
    #[instrument(
        name = "bucket.document",
        skip_all,
        fields(entity = %self.kind, id = %id, action = "fetch")
    )]
    pub async fn fetch(&self, id: &str) -> Result<Document> {
        let action = Action::Fetch;
        let bucket = self.guard(&action, id).await?;
        event!(Level::DEBUG, "getting document");

        let outcome = self.key_policy.run(action.name(), || bucket.get(id)).await;

        match outcome {
            Ok(Some(stored)) => {
                event!(Level::DEBUG, cas = %stored.cas, "document found");
                Ok(Document::new(stored.id, stored.content, Some(stored.cas)))
            }
            Ok(None) | Err(StoreFailure::KeyNotFound(_)) => {
                event!(Level::DEBUG, "document absent");
                Ok(Document::not_found())
            }
            Err(failure) => Err(classify::classify(self.kind, &action, id, failure)),
        }
    }

    /// Replaces the value of an existing document without a version check.
    pub async fn update(&self, id: &str, content: JsonObject) -> Result<Document> {
        self.replace(id, content, None).await
    }

    /// Replaces the value only if the stored version still equals `cas`.
    pub async fn update_versioned(
        &self,
        id: &str,
        content: JsonObject,
        cas: Cas,
    ) -> Result<Document> {
        self.replace(id, content, Some(cas)).await
    }

    /// Removes a document; the result carries only the id.
    pub async fn delete(&self, id: &str) -> Result<Document> {
        self.remove(id, None).await
    }

    /// Removes a document only if the stored version still equals `cas`.
    pub async fn delete_versioned(&self, id: &str, cas: Cas) -> Result<Document> {
        self.remove(id, Some(cas)).await
    }

    #[instrument(
        name = "bucket.document",
        skip_all,
        fields(entity = %self.kind, id = %id, action = "update")
    )]
    async fn replace(&self, id: &str, content: JsonObject, cas: Option<Cas>) -> Result<Document> {
        let action = Action::Update;
        let bucket = self.guard(&action, id).await?;
        event!(Level::DEBUG, versioned = cas.is_some(), "updating document");

        let content = strip_id(content);
        let stored = self
            .key_policy
            .run(action.name(), || bucket.replace(id, content.clone(), cas))
            .await
            .map_err(|failure| classify::classify(self.kind, &action, id, failure))?;

        event!(Level::DEBUG, cas = %stored.cas, "document updated");
        Ok(Document::new(stored.id, stored.content, Some(stored.cas)))
    }

    #[instrument(
        name = "bucket.document",
        skip_all,
        fields(entity = %self.kind, id = %id, action = "delete")
    )]
    async fn remove(&self, id: &str, cas: Option<Cas>) -> Result<Document> {
        let action = Action::Delete;
        let bucket = self.guard(&action, id).await?;
        event!(Level::DEBUG, versioned = cas.is_some(), "deleting document");

        let removed = self
            .key_policy
            .run(action.name(), || bucket.remove(id, cas))
            .await
            .map_err(|failure| classify::classify(self.kind, &action, id, failure))?;

        event!(Level::DEBUG, "document deleted");
        Ok(Document::id_only(id, Some(removed)))
    }

    /// Adds `delta` to a numeric top-level field in one server-side statement.
    ///
    /// The returned document holds the id and the new value of `field`.
    #[instrument(
        name = "bucket.document",
        skip_all,
        fields(
            entity = %self.kind,
            id = %id,
            action = if delta < 0 { "decrement" } else { "increment" },
            field = %field
        )
    )]
    pub(crate) async fn adjust_counter(&self, id: &str, field: &str, delta: i64) -> Result<Document> {
        let action = if delta < 0 {
            Action::Decrement {
                field: field.to_string(),
            }
        } else {
            Action::Increment {
                field: field.to_string(),
            }
        };

        validate_segment(field)
            .map_err(|reason| classify::rejected(self.kind, &action, id, &reason))?;
        let bucket = self.guard(&action, id).await?;

        let statement = UpdateStatement::new(self.session.bucket_name(), self.kind.alias())
            .use_keys(id)
            .set(field, SetExpression::Add(delta))
            .returning(Projection::field(field))
            .returning(Projection::MetaId);
        event!(Level::DEBUG, statement = %statement, "adjusting counter");

        let row = self
            .mutate(&bucket, &action, id, &statement, &self.key_policy, field)
            .await?;

        event!(Level::DEBUG, value = ?row.get(field), "counter adjusted");
        Ok(Document::new(id, row, None))
    }

    /// Appends `element` to the array at `field.key` in one server-side statement.
    ///
    /// The returned document holds the id and the appended element under `alias`.
    #[instrument(
        name = "bucket.document",
        skip_all,
        fields(entity = %self.kind, id = %id, action = "append", field = %field, key = %key)
    )]
    pub(crate) async fn append_to_array(
        &self,
        id: &str,
        field: &str,
        key: &str,
        element: Value,
        alias: &str,
    ) -> Result<Document> {
        let path = format!("{field}.{key}");
        let action = Action::Append { path: path.clone() };

        validate_segment(field)
            .and_then(|_| validate_segment(key))
            .and_then(|_| validate_segment(alias))
            .map_err(|reason| classify::rejected(self.kind, &action, id, &reason))?;
        let bucket = self.guard(&action, id).await?;

        let statement = UpdateStatement::new(self.session.bucket_name(), self.kind.alias())
            .use_keys(id)
            .set(path.as_str(), SetExpression::ArrayAppend(element))
            .returning(Projection::last_element(path.as_str(), alias))
            .returning(Projection::MetaId);
        event!(Level::DEBUG, statement = %statement, "appending to array");

        let row = self
            .mutate(&bucket, &action, id, &statement, &self.query_policy, alias)
            .await?;

        event!(Level::DEBUG, "array element appended");
        Ok(Document::new(id, row, None))
    }

    /// Runs a mutation statement and keeps the first row carrying `expected`.
    async fn mutate(
        &self,
        bucket: &Arc<dyn Bucket>,
        action: &Action,
        id: &str,
        statement: &UpdateStatement,
        policy: &ExecutionPolicy,
        expected: &str,
    ) -> Result<JsonObject> {
        let rows = policy
            .run(action.name(), || bucket.query(statement))
            .await
            .map_err(|failure| classify::classify(self.kind, action, id, failure))?;

        rows.into_iter()
            .find(|row| row.contains_key(expected))
            .ok_or_else(|| classify::unconfirmed(self.kind, action, id))
    }

    /// Connection guard: an open handle, or `Unavailable` before any store call.
    async fn guard(&self, action: &Action, id: &str) -> Result<Arc<dyn Bucket>> {
        self.session
            .acquire()
            .await
            .map_err(|failure| classify::unavailable(self.kind, action, id, &failure))
    }
}
