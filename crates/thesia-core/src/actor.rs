//! Authenticated actor identity for cross-crate passing.
//!
//! Produced by the (out-of-scope) authentication layer, consumed by the
//! access policy and every mutating service operation. Contains only data
//! fields — no credential or session logic.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated caller.
///
/// Supervisor and committee member are not login roles: both are
/// professors, and which one a professor is for a given thesis is derived
/// from the thesis and invitation rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Professor,
    Student,
    Secretary,
}

impl ActorRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Professor => "professor",
            Self::Student => "student",
            Self::Secretary => "secretary",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller: identity plus role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    #[must_use]
    pub fn professor(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Professor,
        }
    }

    #[must_use]
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Student,
        }
    }

    #[must_use]
    pub fn secretary(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Secretary,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}
