use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ThesisStatus;

/// An append-only record of one committed status transition.
///
/// Rows are never mutated or deleted. `from_status` is `None` only for the
/// initial entry written when the thesis is created.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusHistoryEntry {
    pub id: String,
    pub thesis_id: String,
    pub from_status: Option<ThesisStatus>,
    pub to_status: ThesisStatus,
    pub changed_by: String,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}
