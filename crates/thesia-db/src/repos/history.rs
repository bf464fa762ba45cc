//! Status history repository.
//!
//! Append-only entries recording every committed status transition.
//! Rows are inserted inside the same transaction as the status write,
//! never updated or deleted.

use thesia_core::entities::StatusHistoryEntry;
use thesia_core::enums::ThesisStatus;
use thesia_core::errors::CoreError;

use crate::error::{DatabaseError, ThesiaError};
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};
use crate::service::ThesiaService;

/// Append a history entry on the given connection.
///
/// Callers pass their transaction handle so the append commits (or rolls
/// back) together with the status write it records.
pub(crate) async fn append_history(
    conn: &libsql::Connection,
    entry: &StatusHistoryEntry,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO thesis_status_history (id, thesis_id, from_status, to_status, changed_by, reason, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        libsql::params![
            entry.id.as_str(),
            entry.thesis_id.as_str(),
            entry.from_status.map(ThesisStatus::as_str),
            entry.to_status.as_str(),
            entry.changed_by.as_str(),
            entry.reason.as_deref(),
            entry.changed_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

impl ThesiaService {
    /// Full transition history for a thesis, oldest first.
    ///
    /// Ties on `changed_at` break by insertion order so replay matches
    /// commit order.
    ///
    /// # Errors
    ///
    /// Returns `ThesiaError` if the query fails.
    pub async fn status_history(
        &self,
        thesis_id: &str,
    ) -> Result<Vec<StatusHistoryEntry>, ThesiaError> {
        let _guard = self.op_lock().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, thesis_id, from_status, to_status, changed_by, reason, changed_at
                 FROM thesis_status_history WHERE thesis_id = ?1
                 ORDER BY changed_at, rowid",
                [thesis_id],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    /// Reconstruct the current status by folding the history.
    ///
    /// Each entry's `from_status` must match the folded status so far;
    /// a mismatch means the log is corrupt and surfaces as `Conflict`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis has no history at all.
    pub async fn replay_status(&self, thesis_id: &str) -> Result<ThesisStatus, ThesiaError> {
        let entries = self.status_history(thesis_id).await?;
        let mut current: Option<ThesisStatus> = None;
        for entry in &entries {
            if entry.from_status != current {
                return Err(CoreError::Conflict(format!(
                    "history for {thesis_id} is inconsistent at entry {}",
                    entry.id
                ))
                .into());
            }
            current = Some(entry.to_status);
        }
        current.ok_or_else(|| CoreError::not_found("thesis", thesis_id).into())
    }
}

/// Convert a libSQL row to a `StatusHistoryEntry` struct.
fn row_to_entry(row: &libsql::Row) -> Result<StatusHistoryEntry, DatabaseError> {
    let from_status = match get_opt_string(row, 2)? {
        Some(s) => Some(parse_enum(&s)?),
        None => None,
    };
    Ok(StatusHistoryEntry {
        id: row.get::<String>(0)?,
        thesis_id: row.get::<String>(1)?,
        from_status,
        to_status: parse_enum(&row.get::<String>(3)?)?,
        changed_by: row.get::<String>(4)?,
        reason: get_opt_string(row, 5)?,
        changed_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{assigned_thesis, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn replay_matches_initial_status() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let replayed = svc.replay_status(&thesis.id).await.unwrap();
        assert_eq!(replayed, ThesisStatus::UnderAssignment);
    }

    #[tokio::test]
    async fn replay_unknown_thesis_not_found() {
        let svc = test_service().await;
        assert!(svc.replay_status("ths-none").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn history_preserves_nullable_fields() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let entries = svc.status_history(&thesis.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].from_status, None);
        assert_eq!(entries[0].reason, None);
    }

    /// A corrupt log (gap in the chain) must not replay silently.
    #[tokio::test]
    async fn replay_detects_inconsistent_log() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        svc.db()
            .conn()
            .execute(
                "INSERT INTO thesis_status_history (id, thesis_id, from_status, to_status, changed_by, changed_at)
                 VALUES ('hst-bad', ?1, 'active', 'under_examination', 'sec-1', '2099-01-01T00:00:00+00:00')",
                [thesis.id.as_str()],
            )
            .await
            .unwrap();

        assert!(svc.replay_status(&thesis.id).await.unwrap_err().is_conflict());
    }
}
