use std::fmt;
use thiserror::Error;

/// Domain errors surfaced by every document operation and field mutator.
///
/// The set of kinds is fixed; only the message varies per call site. Low-level
/// store failures never reach callers directly, they are classified into one
/// of these first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

/// Message-free discriminant of [`AccessError`], handy for branching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessErrorKind {
    AlreadyExists,
    NotFound,
    ConcurrencyConflict,
    Unavailable,
    StoreError,
}

impl fmt::Display for AccessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::ConcurrencyConflict => "concurrency_conflict",
            Self::Unavailable => "unavailable",
            Self::StoreError => "store_error",
        };
        write!(f, "{label}")
    }
}

impl AccessError {
    pub fn kind(&self) -> AccessErrorKind {
        match self {
            Self::AlreadyExists(_) => AccessErrorKind::AlreadyExists,
            Self::NotFound(_) => AccessErrorKind::NotFound,
            Self::ConcurrencyConflict(_) => AccessErrorKind::ConcurrencyConflict,
            Self::Unavailable(_) => AccessErrorKind::Unavailable,
            Self::StoreError(_) => AccessErrorKind::StoreError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::AlreadyExists(message)
            | Self::NotFound(message)
            | Self::ConcurrencyConflict(message)
            | Self::Unavailable(message)
            | Self::StoreError(message) => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
