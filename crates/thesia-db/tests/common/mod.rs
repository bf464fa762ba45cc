//! Shared fixtures for thesia-db integration tests.

use thesia_core::actor::Actor;
use thesia_core::entities::{GeneralAssembly, Thesis};
use thesia_core::enums::InvitationResponse;
use thesia_db::repos::thesis::TransitionRequest;
use thesia_db::service::ThesiaService;

pub async fn test_service() -> ThesiaService {
    ThesiaService::new_local(":memory:").await.unwrap()
}

pub fn supervisor() -> Actor {
    Actor::professor("prof-sup")
}

#[allow(dead_code)]
pub fn student() -> Actor {
    Actor::student("stu-1")
}

pub fn secretary() -> Actor {
    Actor::secretary("sec-1")
}

pub fn member_ids() -> [String; 2] {
    ["prof-m1".to_string(), "prof-m2".to_string()]
}

pub async fn assigned_thesis(svc: &ThesiaService) -> Thesis {
    let topic = svc
        .create_topic(&supervisor(), "Fixture topic", "Fixture description")
        .await
        .unwrap();
    svc.assign_topic(&supervisor(), &topic.id, &student().id)
        .await
        .unwrap()
}

/// Assigned thesis with invitations sent and both members accepted.
#[allow(dead_code)]
pub async fn thesis_with_accepted_committee(svc: &ThesiaService) -> Thesis {
    let thesis = assigned_thesis(svc).await;
    svc.send_invitations(&supervisor(), &thesis.id, &member_ids())
        .await
        .unwrap();
    for professor in member_ids() {
        svc.respond_to_invitation(
            &Actor::professor(professor),
            &thesis.id,
            InvitationResponse::Accepted,
            None,
        )
        .await
        .unwrap();
    }
    thesis
}

/// Thesis driven all the way to `active`.
#[allow(dead_code)]
pub async fn active_thesis(svc: &ThesiaService) -> Thesis {
    let thesis = thesis_with_accepted_committee(svc).await;
    svc.set_general_assembly(
        &secretary(),
        &thesis.id,
        GeneralAssembly { number: 1, year: 2026 },
    )
    .await
    .unwrap();
    svc.change_status(&secretary(), &thesis.id, TransitionRequest::activate())
        .await
        .unwrap()
}
