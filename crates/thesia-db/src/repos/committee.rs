//! Committee repository.
//!
//! Invitation fan-out, professor responses, and the completeness read the
//! lifecycle guard depends on. Invitation sending is one-shot per thesis:
//! once any seat row exists, a later `send_invitations` fails with
//! `Conflict`. The escape for a rejected committee is cancelling the
//! thesis and re-assigning the topic, which keeps every answer on record.

use chrono::Utc;

use thesia_core::actor::Actor;
use thesia_core::entities::CommitteeInvitation;
use thesia_core::enums::{CommitteeRole, InvitationResponse, InvitationStatus, ThesisStatus};
use thesia_core::errors::CoreError;
use thesia_core::ids::PREFIX_INVITATION;
use thesia_core::policy::{Action, ThesisScope, can_perform};

use crate::error::{DatabaseError, ThesiaError};
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime};
use crate::service::ThesiaService;

/// Seats required before a committee is complete.
pub const COMMITTEE_SIZE: i64 = 3;

/// Committee state for one thesis, computed from committed rows.
#[derive(Debug)]
pub struct CommitteeStatus {
    pub members: Vec<CommitteeInvitation>,
    pub accepted_count: i64,
    pub is_complete: bool,
}

/// A pending invitation enriched with display data for the invited professor.
#[derive(Debug)]
pub struct PendingInvitation {
    pub invitation: CommitteeInvitation,
    pub thesis_status: ThesisStatus,
    pub topic_title: String,
    pub student_id: String,
    pub supervisor_id: String,
}

impl ThesiaService {
    /// Invite two professors to the committee of an `under_assignment` thesis.
    ///
    /// Atomically inserts the supervisor's seat (already `accepted`) and two
    /// `pending` member seats. One-shot: fails with `Conflict` if any seat
    /// row already exists for the thesis.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the member ids are not two distinct non-blank
    /// ids different from the supervisor, `NotFound` if the thesis does not
    /// exist, `Permission` if the actor may not invite, and `Conflict` if
    /// the thesis is past assignment or already has seats.
    pub async fn send_invitations(
        &self,
        actor: &Actor,
        thesis_id: &str,
        professor_ids: &[String; 2],
    ) -> Result<Vec<CommitteeInvitation>, ThesiaError> {
        if professor_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CoreError::Validation("professor ids must not be blank".into()).into());
        }
        if professor_ids[0] == professor_ids[1] {
            return Err(CoreError::Validation(
                "committee members must be two distinct professors".into(),
            )
            .into());
        }

        let _guard = self.op_lock().await;
        let tx = self.db().conn().transaction().await?;

        let (supervisor_id, student_id, status) = load_thesis_scope(&tx, thesis_id).await?;

        let scope = ThesisScope {
            supervisor_id: &supervisor_id,
            student_id: &student_id,
            status,
            committee_member_ids: &[],
        };
        if !can_perform(actor, Action::InviteCommittee, &scope) {
            return Err(
                CoreError::permission(actor.to_string(), Action::InviteCommittee.name()).into(),
            );
        }
        if status != ThesisStatus::UnderAssignment {
            return Err(CoreError::Conflict(format!(
                "thesis {thesis_id} is {status}, committee can only form during assignment"
            ))
            .into());
        }
        if professor_ids.iter().any(|id| *id == supervisor_id) {
            return Err(CoreError::Validation(
                "the supervisor cannot be invited as a committee member".into(),
            )
            .into());
        }

        let existing = {
            let mut rows = tx
                .query(
                    "SELECT COUNT(*) FROM thesis_committee_members WHERE thesis_id = ?1",
                    [thesis_id],
                )
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row.get::<i64>(0)?
        };
        if existing > 0 {
            return Err(CoreError::Conflict(format!(
                "invitations already sent for thesis {thesis_id}"
            ))
            .into());
        }

        let now = Utc::now();
        let mut seats = Vec::with_capacity(3);

        // The supervisor's seat is created pre-accepted so completeness is
        // a plain count of accepted rows.
        let sup_seat = CommitteeInvitation {
            id: crate::generate_id_on(&tx, PREFIX_INVITATION).await?,
            thesis_id: thesis_id.to_string(),
            professor_id: supervisor_id.clone(),
            role: CommitteeRole::Supervisor,
            status: InvitationStatus::Accepted,
            notes: None,
            invited_at: now,
            responded_at: Some(now),
        };
        insert_seat(&tx, &sup_seat).await?;
        seats.push(sup_seat);

        for professor_id in professor_ids {
            let seat = CommitteeInvitation {
                id: crate::generate_id_on(&tx, PREFIX_INVITATION).await?,
                thesis_id: thesis_id.to_string(),
                professor_id: professor_id.clone(),
                role: CommitteeRole::Member,
                status: InvitationStatus::Pending,
                notes: None,
                invited_at: now,
                responded_at: None,
            };
            insert_seat(&tx, &seat).await?;
            seats.push(seat);
        }

        tx.commit().await?;

        tracing::info!(thesis_id = %thesis_id, "committee invitations sent");

        Ok(seats)
    }

    /// Answer a pending invitation as the acting professor.
    ///
    /// The update is conditioned on `status = 'pending'`, so a second
    /// answer (or an answer to a never-sent invitation) affects zero rows
    /// and fails with `NotFound` instead of overwriting the first decision.
    ///
    /// # Errors
    ///
    /// Returns `Permission` if the actor is not a professor, `NotFound` if
    /// no pending invitation exists for `(thesis_id, actor)`.
    pub async fn respond_to_invitation(
        &self,
        actor: &Actor,
        thesis_id: &str,
        response: InvitationResponse,
        notes: Option<&str>,
    ) -> Result<CommitteeInvitation, ThesiaError> {
        let scope = ThesisScope::for_topic("");
        if !can_perform(actor, Action::RespondInvitation, &scope) {
            return Err(
                CoreError::permission(actor.to_string(), Action::RespondInvitation.name()).into(),
            );
        }

        let _guard = self.op_lock().await;
        let tx = self.db().conn().transaction().await?;

        let now = Utc::now();
        let affected = tx
            .execute(
                "UPDATE thesis_committee_members
                 SET status = ?1, notes = COALESCE(?2, notes), responded_at = ?3
                 WHERE thesis_id = ?4 AND professor_id = ?5 AND status = 'pending'",
                libsql::params![
                    response.as_str(),
                    notes,
                    now.to_rfc3339(),
                    thesis_id,
                    actor.id.as_str()
                ],
            )
            .await?;
        if affected == 0 {
            return Err(CoreError::not_found(
                "pending invitation",
                &format!("{thesis_id}/{}", actor.id),
            )
            .into());
        }

        let seat = {
            let mut rows = tx
                .query(
                    &format!(
                        "SELECT {INVITATION_COLS} FROM thesis_committee_members
                         WHERE thesis_id = ?1 AND professor_id = ?2"
                    ),
                    libsql::params![thesis_id, actor.id.as_str()],
                )
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row_to_invitation(&row)?
        };

        tx.commit().await?;

        tracing::info!(
            thesis_id = %thesis_id,
            professor_id = %actor.id,
            response = %response,
            "invitation answered"
        );

        Ok(seat)
    }

    /// Committee state for a thesis: all seats, accepted count, completeness.
    ///
    /// Reads committed rows on the shared connection, so a caller holding
    /// the operation lock observes the same state the activation guard does.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the thesis does not exist.
    pub async fn get_committee_status(
        &self,
        thesis_id: &str,
    ) -> Result<CommitteeStatus, ThesiaError> {
        let _guard = self.op_lock().await;
        load_thesis_scope(self.db().conn(), thesis_id).await?;

        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {INVITATION_COLS} FROM thesis_committee_members
                     WHERE thesis_id = ?1 ORDER BY invited_at, rowid"
                ),
                [thesis_id],
            )
            .await?;
        let mut members = Vec::new();
        while let Some(row) = rows.next().await? {
            members.push(row_to_invitation(&row)?);
        }

        let accepted_count = members
            .iter()
            .filter(|m| m.status == InvitationStatus::Accepted)
            .count() as i64;

        Ok(CommitteeStatus {
            members,
            accepted_count,
            is_complete: accepted_count >= COMMITTEE_SIZE,
        })
    }

    /// Pending invitations addressed to a professor, enriched with thesis
    /// and topic display data.
    ///
    /// # Errors
    ///
    /// Returns `ThesiaError` if the query fails.
    pub async fn pending_invitations_for_professor(
        &self,
        professor_id: &str,
    ) -> Result<Vec<PendingInvitation>, ThesiaError> {
        let _guard = self.op_lock().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT i.id, i.thesis_id, i.professor_id, i.role, i.status, i.notes,
                        i.invited_at, i.responded_at,
                        w.status, w.student_id, w.supervisor_id, t.title
                 FROM thesis_committee_members i
                 JOIN thesis_works w ON w.id = i.thesis_id
                 JOIN thesis_topics t ON t.id = w.topic_id
                 WHERE i.professor_id = ?1 AND i.status = 'pending'
                 ORDER BY i.invited_at DESC",
                [professor_id],
            )
            .await?;

        let mut pending = Vec::new();
        while let Some(row) = rows.next().await? {
            pending.push(PendingInvitation {
                invitation: row_to_invitation(&row)?,
                thesis_status: parse_enum(&row.get::<String>(8)?)?,
                student_id: row.get::<String>(9)?,
                supervisor_id: row.get::<String>(10)?,
                topic_title: row.get::<String>(11)?,
            });
        }
        Ok(pending)
    }
}

/// Columns of `thesis_committee_members` in `row_to_invitation` order.
const INVITATION_COLS: &str =
    "id, thesis_id, professor_id, role, status, notes, invited_at, responded_at";

/// Count accepted seats for a thesis on the given connection.
///
/// The activation guard calls this with its transaction handle so the
/// count and the status write share one snapshot.
pub(crate) async fn count_accepted(
    conn: &libsql::Connection,
    thesis_id: &str,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM thesis_committee_members
             WHERE thesis_id = ?1 AND status = 'accepted'",
            [thesis_id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<i64>(0)?)
}

/// Load `(supervisor_id, student_id, status)` for a thesis, or `NotFound`.
async fn load_thesis_scope(
    conn: &libsql::Connection,
    thesis_id: &str,
) -> Result<(String, String, ThesisStatus), ThesiaError> {
    let mut rows = conn
        .query(
            "SELECT supervisor_id, student_id, status FROM thesis_works WHERE id = ?1",
            [thesis_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreError::not_found("thesis", thesis_id))?;
    Ok((
        row.get::<String>(0)?,
        row.get::<String>(1)?,
        parse_enum(&row.get::<String>(2)?)?,
    ))
}

async fn insert_seat(
    conn: &libsql::Connection,
    seat: &CommitteeInvitation,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO thesis_committee_members (id, thesis_id, professor_id, role, status, notes, invited_at, responded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        libsql::params![
            seat.id.as_str(),
            seat.thesis_id.as_str(),
            seat.professor_id.as_str(),
            seat.role.as_str(),
            seat.status.as_str(),
            seat.notes.as_deref(),
            seat.invited_at.to_rfc3339(),
            seat.responded_at.map(|dt| dt.to_rfc3339()).as_deref()
        ],
    )
    .await?;
    Ok(())
}

/// Convert a libSQL row (in `INVITATION_COLS` order) to a `CommitteeInvitation`.
fn row_to_invitation(row: &libsql::Row) -> Result<CommitteeInvitation, DatabaseError> {
    Ok(CommitteeInvitation {
        id: row.get::<String>(0)?,
        thesis_id: row.get::<String>(1)?,
        professor_id: row.get::<String>(2)?,
        role: parse_enum(&row.get::<String>(3)?)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        notes: get_opt_string(row, 5)?,
        invited_at: parse_datetime(&row.get::<String>(6)?)?,
        responded_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{
        assigned_thesis, member_ids, secretary, student, supervisor, test_service,
    };
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn send_invitations_creates_three_seats() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let seats = svc
            .send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();
        assert_eq!(seats.len(), 3);
        assert_eq!(seats[0].role, CommitteeRole::Supervisor);
        assert_eq!(seats[0].status, InvitationStatus::Accepted);
        assert_eq!(seats[1].status, InvitationStatus::Pending);
        assert_eq!(seats[2].status, InvitationStatus::Pending);

        let committee = svc.get_committee_status(&thesis.id).await.unwrap();
        assert_eq!(committee.accepted_count, 1);
        assert!(!committee.is_complete);
    }

    #[tokio::test]
    async fn student_may_invite_for_own_thesis() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let seats = svc
            .send_invitations(&student(), &thesis.id, &member_ids())
            .await
            .unwrap();
        assert_eq!(seats.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_member_ids_rejected() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let ids = ["prof-m1".to_string(), "prof-m1".to_string()];
        let result = svc.send_invitations(&supervisor(), &thesis.id, &ids).await;
        assert!(result.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn supervisor_cannot_be_invited_as_member() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let ids = ["prof-m1".to_string(), supervisor().id];
        let result = svc.send_invitations(&supervisor(), &thesis.id, &ids).await;
        assert!(result.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn send_invitations_is_one_shot() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();
        let again = svc
            .send_invitations(
                &supervisor(),
                &thesis.id,
                &["prof-m3".to_string(), "prof-m4".to_string()],
            )
            .await;
        assert!(again.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn send_invitations_unknown_thesis_not_found() {
        let svc = test_service().await;
        let result = svc
            .send_invitations(&secretary(), "ths-none", &member_ids())
            .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn foreign_professor_cannot_invite() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;

        let other = Actor::professor("prof-other");
        let result = svc.send_invitations(&other, &thesis.id, &member_ids()).await;
        assert!(result.unwrap_err().is_permission());
    }

    #[tokio::test]
    async fn accept_and_reject_resolve_seats() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;
        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();

        let m1 = Actor::professor("prof-m1");
        let accepted = svc
            .respond_to_invitation(&m1, &thesis.id, InvitationResponse::Accepted, None)
            .await
            .unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);
        assert!(accepted.responded_at.is_some());

        let m2 = Actor::professor("prof-m2");
        let rejected = svc
            .respond_to_invitation(
                &m2,
                &thesis.id,
                InvitationResponse::Rejected,
                Some("schedule conflict"),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, InvitationStatus::Rejected);
        assert_eq!(rejected.notes.as_deref(), Some("schedule conflict"));

        let committee = svc.get_committee_status(&thesis.id).await.unwrap();
        assert_eq!(committee.accepted_count, 2);
        assert!(!committee.is_complete);
    }

    #[tokio::test]
    async fn second_response_is_not_found() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;
        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();

        let m1 = Actor::professor("prof-m1");
        svc.respond_to_invitation(&m1, &thesis.id, InvitationResponse::Accepted, None)
            .await
            .unwrap();

        // The first decision stays; the retry fails instead of overwriting.
        let retry = svc
            .respond_to_invitation(&m1, &thesis.id, InvitationResponse::Rejected, None)
            .await;
        assert!(retry.unwrap_err().is_not_found());

        let committee = svc.get_committee_status(&thesis.id).await.unwrap();
        let seat = committee
            .members
            .iter()
            .find(|m| m.professor_id == "prof-m1")
            .unwrap();
        assert_eq!(seat.status, InvitationStatus::Accepted);
    }

    #[tokio::test]
    async fn uninvited_professor_response_is_not_found() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;
        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();

        let stranger = Actor::professor("prof-stranger");
        let result = svc
            .respond_to_invitation(&stranger, &thesis.id, InvitationResponse::Accepted, None)
            .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn student_cannot_answer_invitations() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;
        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();

        let result = svc
            .respond_to_invitation(&student(), &thesis.id, InvitationResponse::Accepted, None)
            .await;
        assert!(result.unwrap_err().is_permission());
    }

    #[tokio::test]
    async fn both_accept_completes_committee() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;
        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();

        for professor in ["prof-m1", "prof-m2"] {
            svc.respond_to_invitation(
                &Actor::professor(professor),
                &thesis.id,
                InvitationResponse::Accepted,
                None,
            )
            .await
            .unwrap();
        }

        let committee = svc.get_committee_status(&thesis.id).await.unwrap();
        assert_eq!(committee.accepted_count, 3);
        assert!(committee.is_complete);
    }

    #[tokio::test]
    async fn pending_invitations_enriched_with_display_data() {
        let svc = test_service().await;
        let thesis = assigned_thesis(&svc).await;
        svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
            .await
            .unwrap();

        let pending = svc.pending_invitations_for_professor("prof-m1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].invitation.thesis_id, thesis.id);
        assert_eq!(pending[0].thesis_status, ThesisStatus::UnderAssignment);
        assert_eq!(pending[0].student_id, thesis.student_id);
        assert_eq!(pending[0].supervisor_id, thesis.supervisor_id);
        assert!(!pending[0].topic_title.is_empty());

        svc.respond_to_invitation(
            &Actor::professor("prof-m1"),
            &thesis.id,
            InvitationResponse::Accepted,
            None,
        )
        .await
        .unwrap();

        let after = svc.pending_invitations_for_professor("prof-m1").await.unwrap();
        assert!(after.is_empty());
    }
}
