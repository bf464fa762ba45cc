//! Thesis lifecycle repository.
//!
//! `change_status` is the only writer of `thesis_works.status`. Every
//! transition validates the edge, checks its guard, and commits the status
//! update together with the history append in one transaction. The UPDATE
//! is conditioned on the status read at the start of the transaction, so a
//! racing transition affects zero rows and surfaces as `Conflict`.

use chrono::Utc;

use thesia_core::actor::Actor;
use thesia_core::entities::{GeneralAssembly, StatusHistoryEntry, Thesis, validate_final_grade};
use thesia_core::enums::ThesisStatus;
use thesia_core::errors::CoreError;
use thesia_core::ids::PREFIX_HISTORY;
use thesia_core::policy::{Action, ThesisScope, can_perform};

use crate::error::{DatabaseError, ThesiaError};
use crate::helpers::{
    get_opt_f64, get_opt_i64, get_opt_string, parse_datetime, parse_enum, parse_optional_datetime,
};
use crate::repos::committee::{COMMITTEE_SIZE, count_accepted};
use crate::repos::history::append_history;
use crate::service::ThesiaService;

/// A requested status transition with its edge-specific payload.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub to: ThesisStatus,
    /// Recorded on activation if the secretary has not set it beforehand.
    pub general_assembly: Option<GeneralAssembly>,
    /// Required for `completed`.
    pub final_grade: Option<f64>,
    /// Required for `cancelled`; stored on the history entry.
    pub reason: Option<String>,
}

impl TransitionRequest {
    #[must_use]
    pub const fn new(to: ThesisStatus) -> Self {
        Self {
            to,
            general_assembly: None,
            final_grade: None,
            reason: None,
        }
    }

    #[must_use]
    pub const fn activate() -> Self {
        Self::new(ThesisStatus::Active)
    }

    #[must_use]
    pub fn activate_with_assembly(assembly: GeneralAssembly) -> Self {
        Self {
            general_assembly: Some(assembly),
            ..Self::new(ThesisStatus::Active)
        }
    }

    #[must_use]
    pub const fn start_examination() -> Self {
        Self::new(ThesisStatus::UnderExamination)
    }

    #[must_use]
    pub fn complete(final_grade: f64) -> Self {
        Self {
            final_grade: Some(final_grade),
            ..Self::new(ThesisStatus::Completed)
        }
    }

    #[must_use]
    pub fn cancel(reason: impl Into<String>) -> Self {
        let mut req = Self::new(ThesisStatus::Cancelled);
        req.reason = Some(reason.into());
        req
    }
}

/// Filter criteria for thesis listings.
#[derive(Debug, Default)]
pub struct ThesisFilter {
    pub status: Option<ThesisStatus>,
    pub student_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub limit: Option<u32>,
}

impl ThesiaService {
    /// Execute a status transition.
    ///
    /// Validates the edge against the transition table, checks the edge's
    /// guard, then commits the conditioned status update and the history
    /// entry atomically.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis does not exist, `Permission` if the
    /// policy denies, `InvalidTransition` if the edge is not in the table,
    /// `GuardFailed` if the edge's guard is unmet, and `Conflict` if a
    /// racing transition committed first.
    pub async fn change_status(
        &self,
        actor: &Actor,
        thesis_id: &str,
        request: TransitionRequest,
    ) -> Result<Thesis, ThesiaError> {
        let _guard = self.op_lock().await;
        let tx = self.db().conn().transaction().await?;

        let thesis = fetch_thesis(&tx, thesis_id).await?;
        let from = thesis.status;
        let to = request.to;

        let scope = ThesisScope {
            supervisor_id: &thesis.supervisor_id,
            student_id: &thesis.student_id,
            status: from,
            committee_member_ids: &[],
        };
        if !can_perform(actor, Action::ChangeStatus(to), &scope) {
            return Err(
                CoreError::permission(actor.to_string(), Action::ChangeStatus(to).name()).into(),
            );
        }
        if !from.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                entity_type: "thesis".into(),
                id: thesis_id.into(),
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut updated = thesis.clone();
        updated.status = to;

        // Edge guards and the conditioned write, per target state.
        let affected = match to {
            ThesisStatus::Active => {
                let assembly = request
                    .general_assembly
                    .or(thesis.general_assembly)
                    .ok_or_else(|| CoreError::guard_failed("general assembly not recorded"))?;
                let accepted = count_accepted(&tx, thesis_id).await?;
                if accepted < COMMITTEE_SIZE {
                    return Err(CoreError::guard_failed(format!(
                        "committee incomplete: {accepted}/{COMMITTEE_SIZE} accepted"
                    ))
                    .into());
                }
                updated.activated_at = Some(now);
                updated.general_assembly = Some(assembly);
                tx.execute(
                    "UPDATE thesis_works
                     SET status = 'active', activated_at = ?1,
                         general_assembly_number = ?2, general_assembly_year = ?3
                     WHERE id = ?4 AND status = 'under_assignment'",
                    libsql::params![now.to_rfc3339(), assembly.number, assembly.year, thesis_id],
                )
                .await?
            }
            ThesisStatus::UnderExamination => {
                updated.examination_started_at = Some(now);
                tx.execute(
                    "UPDATE thesis_works
                     SET status = 'under_examination', examination_started_at = ?1
                     WHERE id = ?2 AND status = 'active'",
                    libsql::params![now.to_rfc3339(), thesis_id],
                )
                .await?
            }
            ThesisStatus::Completed => {
                let grade = request
                    .final_grade
                    .ok_or_else(|| CoreError::guard_failed("final grade required"))?;
                validate_final_grade(grade)?;
                updated.completed_at = Some(now);
                updated.final_grade = Some(grade);
                tx.execute(
                    "UPDATE thesis_works
                     SET status = 'completed', completed_at = ?1, final_grade = ?2
                     WHERE id = ?3 AND status = 'under_examination'",
                    libsql::params![now.to_rfc3339(), grade, thesis_id],
                )
                .await?
            }
            ThesisStatus::Cancelled => {
                let reason_ok = request
                    .reason
                    .as_deref()
                    .is_some_and(|r| !r.trim().is_empty());
                if !reason_ok {
                    return Err(CoreError::guard_failed("cancellation reason required").into());
                }
                updated.cancelled_at = Some(now);
                updated.cancelled_by = Some(actor.id.clone());
                tx.execute(
                    "UPDATE thesis_works
                     SET status = 'cancelled', cancelled_at = ?1, cancelled_by = ?2
                     WHERE id = ?3 AND status = ?4",
                    libsql::params![now.to_rfc3339(), actor.id.as_str(), thesis_id, from.as_str()],
                )
                .await?
            }
            ThesisStatus::UnderAssignment => {
                // Unreachable: no edge leads back to under_assignment.
                0
            }
        };
        if affected == 0 {
            return Err(
                CoreError::Conflict(format!("thesis {thesis_id} changed concurrently")).into(),
            );
        }

        let history_id = crate::generate_id_on(&tx, PREFIX_HISTORY).await?;
        append_history(
            &tx,
            &StatusHistoryEntry {
                id: history_id,
                thesis_id: thesis_id.to_string(),
                from_status: Some(from),
                to_status: to,
                changed_by: actor.id.clone(),
                reason: request.reason.clone(),
                changed_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            thesis_id = %thesis_id,
            from = %from,
            to = %to,
            changed_by = %actor.id,
            "thesis status changed"
        );

        Ok(updated)
    }

    /// Get a thesis by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis does not exist.
    pub async fn get_thesis(&self, id: &str) -> Result<Thesis, ThesiaError> {
        let _guard = self.op_lock().await;
        fetch_thesis(self.db().conn(), id).await
    }

    /// Get a thesis, enforcing the view policy for the acting user.
    ///
    /// Accepted committee members count as viewers alongside the student,
    /// the supervisor, and the secretary.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis does not exist, `Permission` if the
    /// actor has no stake in it.
    pub async fn view_thesis(&self, actor: &Actor, id: &str) -> Result<Thesis, ThesiaError> {
        let _guard = self.op_lock().await;
        let thesis = fetch_thesis(self.db().conn(), id).await?;

        let mut member_ids = Vec::new();
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT professor_id FROM thesis_committee_members
                 WHERE thesis_id = ?1 AND status = 'accepted'",
                [id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            member_ids.push(row.get::<String>(0)?);
        }

        let scope = ThesisScope {
            supervisor_id: &thesis.supervisor_id,
            student_id: &thesis.student_id,
            status: thesis.status,
            committee_member_ids: &member_ids,
        };
        if !can_perform(actor, Action::ViewThesis, &scope) {
            return Err(CoreError::permission(actor.to_string(), Action::ViewThesis.name()).into());
        }
        Ok(thesis)
    }

    /// List theses with optional filters.
    ///
    /// # Errors
    ///
    /// Returns `ThesiaError` if the query fails.
    pub async fn list_theses(&self, filter: &ThesisFilter) -> Result<Vec<Thesis>, ThesiaError> {
        let _guard = self.op_lock().await;
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(status) = filter.status {
            params.push(libsql::Value::Text(status.as_str().to_string()));
            conditions.push(format!("status = ?{}", params.len()));
        }
        if let Some(ref student) = filter.student_id {
            params.push(libsql::Value::Text(student.clone()));
            conditions.push(format!("student_id = ?{}", params.len()));
        }
        if let Some(ref supervisor) = filter.supervisor_id {
            params.push(libsql::Value::Text(supervisor.clone()));
            conditions.push(format!("supervisor_id = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or_else(|| self.default_limit());
        let sql = format!(
            "SELECT {THESIS_COLS} FROM thesis_works {where_clause}
             ORDER BY assigned_at DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut theses = Vec::new();
        while let Some(row) = rows.next().await? {
            theses.push(row_to_thesis(&row)?);
        }
        Ok(theses)
    }

    /// Record the general assembly approval while the thesis is still
    /// `under_assignment` (it gates the activation guard).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis does not exist, `Permission` unless
    /// the actor is the secretary, `Conflict` if the thesis is past
    /// assignment.
    pub async fn set_general_assembly(
        &self,
        actor: &Actor,
        thesis_id: &str,
        assembly: GeneralAssembly,
    ) -> Result<Thesis, ThesiaError> {
        let _guard = self.op_lock().await;
        let tx = self.db().conn().transaction().await?;

        let thesis = fetch_thesis(&tx, thesis_id).await?;
        let scope = ThesisScope {
            supervisor_id: &thesis.supervisor_id,
            student_id: &thesis.student_id,
            status: thesis.status,
            committee_member_ids: &[],
        };
        if !can_perform(actor, Action::SetGeneralAssembly, &scope) {
            return Err(
                CoreError::permission(actor.to_string(), Action::SetGeneralAssembly.name()).into(),
            );
        }

        let affected = tx
            .execute(
                "UPDATE thesis_works
                 SET general_assembly_number = ?1, general_assembly_year = ?2
                 WHERE id = ?3 AND status = 'under_assignment'",
                libsql::params![assembly.number, assembly.year, thesis_id],
            )
            .await?;
        if affected == 0 {
            return Err(CoreError::Conflict(format!(
                "thesis {thesis_id} is {}, general assembly is recorded during assignment",
                thesis.status
            ))
            .into());
        }
        tx.commit().await?;

        let mut updated = thesis;
        updated.general_assembly = Some(assembly);
        Ok(updated)
    }

    /// Attach the repository link while the thesis is `active` or
    /// `under_examination`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis does not exist, `Permission` unless
    /// the actor is the thesis's student or the secretary, `Validation` for
    /// a blank link, `Conflict` outside the allowed states.
    pub async fn set_repository_link(
        &self,
        actor: &Actor,
        thesis_id: &str,
        link: &str,
    ) -> Result<Thesis, ThesiaError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(CoreError::Validation("repository link must not be blank".into()).into());
        }

        let _guard = self.op_lock().await;
        let tx = self.db().conn().transaction().await?;

        let thesis = fetch_thesis(&tx, thesis_id).await?;
        let scope = ThesisScope {
            supervisor_id: &thesis.supervisor_id,
            student_id: &thesis.student_id,
            status: thesis.status,
            committee_member_ids: &[],
        };
        if !can_perform(actor, Action::SetRepositoryLink, &scope) {
            return Err(
                CoreError::permission(actor.to_string(), Action::SetRepositoryLink.name()).into(),
            );
        }

        let affected = tx
            .execute(
                "UPDATE thesis_works SET repository_link = ?1
                 WHERE id = ?2 AND status IN ('active', 'under_examination')",
                libsql::params![link, thesis_id],
            )
            .await?;
        if affected == 0 {
            return Err(CoreError::Conflict(format!(
                "thesis {thesis_id} is {}, repository link attaches after activation",
                thesis.status
            ))
            .into());
        }
        tx.commit().await?;

        let mut updated = thesis;
        updated.repository_link = Some(link.to_string());
        Ok(updated)
    }
}

/// Columns of `thesis_works` in `row_to_thesis` order.
const THESIS_COLS: &str = "id, topic_id, student_id, supervisor_id, status, assigned_at, \
     activated_at, examination_started_at, completed_at, cancelled_at, cancelled_by, \
     general_assembly_number, general_assembly_year, final_grade, repository_link";

/// Load a thesis row on the given connection, or `NotFound`.
async fn fetch_thesis(conn: &libsql::Connection, id: &str) -> Result<Thesis, ThesiaError> {
    let mut rows = conn
        .query(
            &format!("SELECT {THESIS_COLS} FROM thesis_works WHERE id = ?1"),
            [id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreError::not_found("thesis", id))?;
    Ok(row_to_thesis(&row)?)
}

/// Convert a libSQL row (in `THESIS_COLS` order) to a `Thesis` struct.
fn row_to_thesis(row: &libsql::Row) -> Result<Thesis, DatabaseError> {
    let general_assembly = match (get_opt_i64(row, 11)?, get_opt_i64(row, 12)?) {
        (Some(number), Some(year)) => Some(GeneralAssembly { number, year }),
        _ => None,
    };
    Ok(Thesis {
        id: row.get::<String>(0)?,
        topic_id: row.get::<String>(1)?,
        student_id: row.get::<String>(2)?,
        supervisor_id: row.get::<String>(3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        assigned_at: parse_datetime(&row.get::<String>(5)?)?,
        activated_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        examination_started_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
        completed_at: parse_optional_datetime(get_opt_string(row, 8)?.as_deref())?,
        cancelled_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
        cancelled_by: get_opt_string(row, 10)?,
        general_assembly,
        final_grade: get_opt_f64(row, 13)?,
        repository_link: get_opt_string(row, 14)?,
    })
}
