//! Error types for thesia-db.
//!
//! `DatabaseError` covers storage infrastructure failures. `ThesiaError` is
//! what service operations return: the domain taxonomy from `thesia-core`
//! plus storage failures, each preserved transparently so callers can match
//! on the variant they care about.

use thesia_core::errors::CoreError;
use thiserror::Error;

/// Errors from the storage layer itself.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned unparseable data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Unified error surfaced by every service operation.
#[derive(Debug, Error)]
pub enum ThesiaError {
    /// Domain failure (validation, not-found, conflict, guard, transition,
    /// permission).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<libsql::Error> for ThesiaError {
    fn from(e: libsql::Error) -> Self {
        Self::Database(DatabaseError::LibSql(e))
    }
}

impl ThesiaError {
    /// The domain error, if this is one.
    #[must_use]
    pub const fn as_core(&self) -> Option<&CoreError> {
        match self {
            Self::Core(e) => Some(e),
            Self::Database(_) => None,
        }
    }

    /// Whether this is a `NotFound` domain error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(CoreError::NotFound { .. }))
    }

    /// Whether this is a `Conflict` domain error.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Core(CoreError::Conflict(_)))
    }

    /// Whether this is a `GuardFailed` domain error.
    #[must_use]
    pub const fn is_guard_failed(&self) -> bool {
        matches!(self, Self::Core(CoreError::GuardFailed { .. }))
    }

    /// Whether this is an `InvalidTransition` domain error.
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::Core(CoreError::InvalidTransition { .. }))
    }

    /// Whether this is a `Permission` domain error.
    #[must_use]
    pub const fn is_permission(&self) -> bool {
        matches!(self, Self::Core(CoreError::Permission { .. }))
    }

    /// Whether this is a `Validation` domain error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Core(CoreError::Validation(_)))
    }
}
