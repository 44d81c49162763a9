pub mod document;
pub mod error;

pub use document::{Cas, Document, EMPTY_JSON_DOC, ID_FIELD, JsonObject, attach_id, strip_id};
pub use error::{AccessError, AccessErrorKind, Result};
