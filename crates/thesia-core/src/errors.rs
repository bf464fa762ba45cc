//! Cross-cutting error types for Thesia.
//!
//! `CoreError` is the domain-facing taxonomy every service operation can
//! surface. Storage-level failures (`DatabaseError`) are defined in
//! `thesia-db` and wrap into `CoreError` at the service boundary.

use thiserror::Error;

/// Domain errors raised by Thesia operations.
///
/// Retryability varies by variant: `Conflict` means a racing actor got there
/// first and the caller may retry after a refetch; `GuardFailed` is not
/// retryable until the underlying state changes; `InvalidTransition` is a
/// usage error and never retryable.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input — the caller must fix the request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity lookup returned no result, or a precondition row is absent.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// State already mutated by a racing actor.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The transition edge exists but its business guard is unmet.
    #[error("Guard failed: {guard}")]
    GuardFailed { guard: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// The actor is not allowed to perform the action.
    #[error("Permission denied: {actor} may not {action}")]
    Permission { actor: String, action: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Shorthand for a `NotFound` with typed entity name.
    #[must_use]
    pub fn not_found(entity_type: &str, id: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a `GuardFailed` with a described guard.
    #[must_use]
    pub fn guard_failed(guard: impl Into<String>) -> Self {
        Self::GuardFailed { guard: guard.into() }
    }

    /// Shorthand for a `Permission` failure.
    #[must_use]
    pub fn permission(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Permission {
            actor: actor.into(),
            action: action.into(),
        }
    }
}
