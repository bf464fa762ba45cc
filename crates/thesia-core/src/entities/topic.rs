use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A proposed thesis subject published by a supervisor, available until
/// assigned to a student.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub supervisor_id: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}
