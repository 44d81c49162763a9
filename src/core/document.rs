use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved id returned instead of an error when a fetch finds nothing.
pub const EMPTY_JSON_DOC: &str = "EMPTY_JSON_DOC";

/// Field under which the document id is re-attached to a value after a read.
pub const ID_FIELD: &str = "id";

pub type JsonObject = Map<String, Value>;

/// Opaque version stamp; changes on every successful write to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cas(u64);

impl Cas {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A document as handed back to callers.
///
/// `content` always carries the id under [`ID_FIELD`]; the id is never part
/// of what gets written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: String,
    content: JsonObject,
    cas: Option<Cas>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: JsonObject, cas: Option<Cas>) -> Self {
        let id = id.into();
        let content = attach_id(strip_id(content), &id);
        Self { id, content, cas }
    }

    /// The "no such document" sentinel.
    pub fn not_found() -> Self {
        Self::new(EMPTY_JSON_DOC, JsonObject::new(), None)
    }

    /// A document holding nothing but its id, as returned by delete.
    pub fn id_only(id: impl Into<String>, cas: Option<Cas>) -> Self {
        Self::new(id, JsonObject::new(), cas)
    }

    pub fn is_not_found(&self) -> bool {
        self.id == EMPTY_JSON_DOC
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cas(&self) -> Option<Cas> {
        self.cas
    }

    pub fn content(&self) -> &JsonObject {
        &self.content
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.content.get(field)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.content.clone())
    }
}

/// Removes the id field so it is not persisted as part of the value.
pub fn strip_id(mut value: JsonObject) -> JsonObject {
    value.remove(ID_FIELD);
    value
}

pub fn attach_id(mut value: JsonObject, id: &str) -> JsonObject {
    value.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    value
}
