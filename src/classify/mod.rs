//! Maps terminal store failures onto the domain error taxonomy.
//!
//! Only failures that survived the guard and the retry policy get here.
//! Each classified error is logged with entity kind, id and action; the raw
//! failure goes to the log, never into the returned error.

use crate::core::{AccessError, AccessErrorKind};
use crate::entity::EntityKind;
use crate::store::StoreFailure;
use std::fmt;
use tracing::{Level, event};

/// The operation an error is reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Fetch,
    Update,
    Delete,
    Increment { field: String },
    Decrement { field: String },
    Append { path: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Fetch => "fetch",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Increment { .. } => "increment",
            Self::Decrement { .. } => "decrement",
            Self::Append { .. } => "append",
        }
    }

    /// Writes that can lose an optimistic-concurrency race.
    pub fn is_update_class(&self) -> bool {
        !matches!(self, Self::Create | Self::Fetch)
    }

    fn describe(&self, kind: EntityKind, id: &str) -> String {
        match self {
            Self::Create => format!("create {kind} document with id '{id}'"),
            Self::Fetch => format!("get {kind} document with id '{id}'"),
            Self::Update => format!("update {kind} document with id '{id}'"),
            Self::Delete => format!("delete {kind} document with id '{id}'"),
            Self::Increment { field } => {
                format!("add 1 to {field} of {kind} document with id '{id}'")
            }
            Self::Decrement { field } => {
                format!("remove 1 from {field} of {kind} document with id '{id}'")
            }
            Self::Append { path } => {
                format!("append to {path} of {kind} document with id '{id}'")
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies the terminal failure of a store call.
pub fn classify(kind: EntityKind, action: &Action, id: &str, failure: StoreFailure) -> AccessError {
    let attempted = action.describe(kind, id);
    let error = match &failure {
        StoreFailure::DuplicateKey(_) if *action == Action::Create => {
            AccessError::AlreadyExists(format!("failed to {attempted}: id already exists"))
        }
        StoreFailure::KeyNotFound(_) if action.is_update_class() => {
            AccessError::NotFound(format!("failed to {attempted}: id doesn't exist"))
        }
        StoreFailure::VersionMismatch(_) if action.is_update_class() => {
            AccessError::ConcurrencyConflict(format!("failed to {attempted}: CAS value changed"))
        }
        _ => AccessError::StoreError(format!("failed to {attempted}: general store failure")),
    };
    record(kind, action, id, &error, &failure);
    error
}

/// The bucket could not be (re)opened before the call.
pub fn unavailable(
    kind: EntityKind,
    action: &Action,
    id: &str,
    failure: &StoreFailure,
) -> AccessError {
    let error = AccessError::Unavailable(format!(
        "failed to {}: bucket could not be opened",
        action.describe(kind, id)
    ));
    record(kind, action, id, &error, failure);
    error
}

/// A statement ran but returned no row carrying the mutated value.
pub fn unconfirmed(kind: EntityKind, action: &Action, id: &str) -> AccessError {
    let error = AccessError::NotFound(format!(
        "failed to {}: no document confirmed the update",
        action.describe(kind, id)
    ));
    record(kind, action, id, &error, &"statement returned no matching row");
    error
}

/// Caller input that cannot be turned into a statement; no store call was made.
pub fn rejected(kind: EntityKind, action: &Action, id: &str, reason: &str) -> AccessError {
    let error = AccessError::StoreError(format!(
        "failed to {}: {reason}",
        action.describe(kind, id)
    ));
    record(kind, action, id, &error, &reason);
    error
}

fn record(
    kind: EntityKind,
    action: &Action,
    id: &str,
    error: &AccessError,
    cause: &dyn fmt::Display,
) {
    match error.kind() {
        AccessErrorKind::AlreadyExists | AccessErrorKind::NotFound => event!(
            Level::INFO,
            entity = %kind,
            id = %id,
            action = action.name(),
            error_kind = %error.kind(),
            cause = %cause,
            "document operation failed"
        ),
        AccessErrorKind::ConcurrencyConflict => event!(
            Level::WARN,
            entity = %kind,
            id = %id,
            action = action.name(),
            error_kind = %error.kind(),
            cause = %cause,
            "document operation failed"
        ),
        AccessErrorKind::Unavailable | AccessErrorKind::StoreError => event!(
            Level::ERROR,
            entity = %kind,
            id = %id,
            action = action.name(),
            error_kind = %error.kind(),
            cause = %cause,
            "document operation failed"
        ),
    }
}
