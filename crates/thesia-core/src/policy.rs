//! Pure access policy: (actor, action, resource) → allowed.
//!
//! No persistent state and no I/O. The service layer loads the rows an
//! action touches, builds a [`ThesisScope`] from them, and asks the policy
//! before mutating. Row-level matching that needs storage (e.g., "only the
//! invited professor may answer *this* invitation") stays in the service,
//! keyed on `(thesis_id, professor_id)`.

use crate::actor::{Actor, ActorRole};
use crate::enums::ThesisStatus;

/// Operations gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateTopic,
    AssignTopic,
    InviteCommittee,
    RespondInvitation,
    ChangeStatus(ThesisStatus),
    SetGeneralAssembly,
    SetRepositoryLink,
    ViewThesis,
}

impl Action {
    /// Short name for permission-denied messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateTopic => "create_topic",
            Self::AssignTopic => "assign_topic",
            Self::InviteCommittee => "invite_committee",
            Self::RespondInvitation => "respond_invitation",
            Self::ChangeStatus(_) => "change_status",
            Self::SetGeneralAssembly => "set_general_assembly",
            Self::SetRepositoryLink => "set_repository_link",
            Self::ViewThesis => "view_thesis",
        }
    }
}

/// The slice of a thesis (or topic) the policy needs to decide ownership.
///
/// For topic-level actions (`CreateTopic`, `AssignTopic`) `student_id` is
/// empty and `status` is `UnderAssignment` by convention.
#[derive(Debug, Clone)]
pub struct ThesisScope<'a> {
    pub supervisor_id: &'a str,
    pub student_id: &'a str,
    pub status: ThesisStatus,
    /// Professors with an accepted committee seat, for `ViewThesis`.
    pub committee_member_ids: &'a [String],
}

impl<'a> ThesisScope<'a> {
    /// Scope for actions on a topic that has no thesis yet.
    #[must_use]
    pub const fn for_topic(supervisor_id: &'a str) -> Self {
        Self {
            supervisor_id,
            student_id: "",
            status: ThesisStatus::UnderAssignment,
            committee_member_ids: &[],
        }
    }
}

/// Decide whether `actor` may perform `action` within `scope`.
#[must_use]
pub fn can_perform(actor: &Actor, action: Action, scope: &ThesisScope<'_>) -> bool {
    match actor.role {
        // The secretary can do everything except answer an invitation
        // addressed to a professor.
        ActorRole::Secretary => !matches!(action, Action::RespondInvitation),
        ActorRole::Professor => match action {
            Action::CreateTopic | Action::RespondInvitation => true,
            Action::AssignTopic | Action::InviteCommittee | Action::ChangeStatus(_) => {
                actor.id == scope.supervisor_id
            }
            Action::ViewThesis => {
                actor.id == scope.supervisor_id
                    || scope.committee_member_ids.iter().any(|id| *id == actor.id)
            }
            Action::SetGeneralAssembly | Action::SetRepositoryLink => false,
        },
        ActorRole::Student => match action {
            Action::ViewThesis => actor.id == scope.student_id,
            // Students propose their committee while the thesis is still
            // being assembled.
            Action::InviteCommittee => {
                actor.id == scope.student_id && scope.status == ThesisStatus::UnderAssignment
            }
            Action::SetRepositoryLink => actor.id == scope.student_id,
            _ => false,
        },
    }
}
