use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{CommitteeRole, InvitationStatus};

/// A committee seat for one professor on one thesis.
///
/// At most one row exists per `(thesis_id, professor_id)` pair. The
/// supervisor's row is created already `accepted`; the two member rows start
/// `pending` and resolve exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CommitteeInvitation {
    pub id: String,
    pub thesis_id: String,
    pub professor_id: String,
    pub role: CommitteeRole,
    pub status: InvitationStatus,
    pub notes: Option<String>,
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}
