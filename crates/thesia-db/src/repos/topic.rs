//! Topic repository.
//!
//! Topic publication and the atomic topic-to-student assignment that
//! creates a thesis.

use chrono::Utc;

use thesia_core::actor::Actor;
use thesia_core::entities::{StatusHistoryEntry, Thesis, Topic};
use thesia_core::enums::ThesisStatus;
use thesia_core::errors::CoreError;
use thesia_core::ids::{PREFIX_HISTORY, PREFIX_THESIS, PREFIX_TOPIC};
use thesia_core::policy::{Action, ThesisScope, can_perform};

use crate::error::ThesiaError;
use crate::helpers::parse_datetime;
use crate::repos::history::append_history;
use crate::service::ThesiaService;

/// Filter criteria for topic listings.
#[derive(Debug, Default)]
pub struct TopicFilter {
    pub supervisor_id: Option<String>,
    pub available_only: bool,
    pub limit: Option<u32>,
}

impl ThesiaService {
    /// Publish a new topic owned by the acting professor.
    ///
    /// # Errors
    ///
    /// Returns `Permission` if the actor may not create topics, `Validation`
    /// if title or description is blank.
    pub async fn create_topic(
        &self,
        actor: &Actor,
        title: &str,
        description: &str,
    ) -> Result<Topic, ThesiaError> {
        let scope = ThesisScope::for_topic(&actor.id);
        if !can_perform(actor, Action::CreateTopic, &scope) {
            return Err(CoreError::permission(actor.to_string(), Action::CreateTopic.name()).into());
        }
        let title = title.trim();
        let description = description.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("topic title must not be blank".into()).into());
        }
        if description.is_empty() {
            return Err(CoreError::Validation("topic description must not be blank".into()).into());
        }

        let _guard = self.op_lock().await;
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_TOPIC).await?;

        self.db()
            .conn()
            .execute(
                "INSERT INTO thesis_topics (id, title, description, supervisor_id, is_available, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                libsql::params![id.as_str(), title, description, actor.id.as_str(), now.to_rfc3339()],
            )
            .await?;

        tracing::debug!(topic_id = %id, supervisor_id = %actor.id, "topic created");

        Ok(Topic {
            id,
            title: title.to_string(),
            description: description.to_string(),
            supervisor_id: actor.id.clone(),
            is_available: true,
            created_at: now,
        })
    }

    /// Get a topic by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the topic does not exist.
    pub async fn get_topic(&self, id: &str) -> Result<Topic, ThesiaError> {
        let _guard = self.op_lock().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, title, description, supervisor_id, is_available, created_at
                 FROM thesis_topics WHERE id = ?1",
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| CoreError::not_found("topic", id))?;
        Ok(row_to_topic(&row)?)
    }

    /// List topics, optionally filtered by supervisor or availability.
    ///
    /// # Errors
    ///
    /// Returns `ThesiaError` if the query fails.
    pub async fn list_topics(&self, filter: &TopicFilter) -> Result<Vec<Topic>, ThesiaError> {
        let _guard = self.op_lock().await;
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref sup) = filter.supervisor_id {
            params.push(libsql::Value::Text(sup.clone()));
            conditions.push(format!("supervisor_id = ?{}", params.len()));
        }
        if filter.available_only {
            conditions.push("is_available = 1".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or_else(|| self.default_limit());
        let sql = format!(
            "SELECT id, title, description, supervisor_id, is_available, created_at
             FROM thesis_topics {where_clause}
             ORDER BY created_at DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next().await? {
            topics.push(row_to_topic(&row)?);
        }
        Ok(topics)
    }

    /// Assign an available topic to a student, creating the thesis.
    ///
    /// Atomically flips the topic to unavailable, inserts the thesis in
    /// `under_assignment`, and appends the initial history entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the topic does not exist, `Permission` if the
    /// actor is neither the topic's supervisor nor the secretary, and
    /// `Conflict` if the topic is already taken or the student already has
    /// an open thesis.
    pub async fn assign_topic(
        &self,
        actor: &Actor,
        topic_id: &str,
        student_id: &str,
    ) -> Result<Thesis, ThesiaError> {
        if student_id.trim().is_empty() {
            return Err(CoreError::Validation("student id must not be blank".into()).into());
        }

        let _guard = self.op_lock().await;
        let tx = self.db().conn().transaction().await?;

        let topic = {
            let mut rows = tx
                .query(
                    "SELECT id, title, description, supervisor_id, is_available, created_at
                     FROM thesis_topics WHERE id = ?1",
                    [topic_id],
                )
                .await?;
            let row = rows
                .next()
                .await?
                .ok_or_else(|| CoreError::not_found("topic", topic_id))?;
            row_to_topic(&row)?
        };

        let scope = ThesisScope::for_topic(&topic.supervisor_id);
        if !can_perform(actor, Action::AssignTopic, &scope) {
            return Err(CoreError::permission(actor.to_string(), Action::AssignTopic.name()).into());
        }
        if !topic.is_available {
            return Err(CoreError::Conflict(format!("topic {topic_id} is not available")).into());
        }

        let open_count = {
            let mut rows = tx
                .query(
                    "SELECT COUNT(*) FROM thesis_works
                     WHERE student_id = ?1 AND status NOT IN ('completed', 'cancelled')",
                    [student_id],
                )
                .await?;
            let row = rows
                .next()
                .await?
                .ok_or(crate::error::DatabaseError::NoResult)?;
            row.get::<i64>(0)?
        };
        if open_count > 0 {
            return Err(CoreError::Conflict(format!(
                "student {student_id} already has an open thesis"
            ))
            .into());
        }

        // Conditioned flip: loses the race if another assignment committed first.
        let flipped = tx
            .execute(
                "UPDATE thesis_topics SET is_available = 0 WHERE id = ?1 AND is_available = 1",
                [topic_id],
            )
            .await?;
        if flipped == 0 {
            return Err(CoreError::Conflict(format!("topic {topic_id} is not available")).into());
        }

        let now = Utc::now();
        let thesis_id = crate::generate_id_on(&tx, PREFIX_THESIS).await?;
        tx.execute(
            "INSERT INTO thesis_works (id, topic_id, student_id, supervisor_id, status, assigned_at)
             VALUES (?1, ?2, ?3, ?4, 'under_assignment', ?5)",
            libsql::params![
                thesis_id.as_str(),
                topic_id,
                student_id,
                topic.supervisor_id.as_str(),
                now.to_rfc3339()
            ],
        )
        .await?;

        let history_id = crate::generate_id_on(&tx, PREFIX_HISTORY).await?;
        append_history(
            &tx,
            &StatusHistoryEntry {
                id: history_id,
                thesis_id: thesis_id.clone(),
                from_status: None,
                to_status: ThesisStatus::UnderAssignment,
                changed_by: actor.id.clone(),
                reason: None,
                changed_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            thesis_id = %thesis_id,
            topic_id = %topic_id,
            student_id = %student_id,
            "topic assigned"
        );

        Ok(Thesis {
            id: thesis_id,
            topic_id: topic_id.to_string(),
            student_id: student_id.to_string(),
            supervisor_id: topic.supervisor_id,
            status: ThesisStatus::UnderAssignment,
            assigned_at: now,
            activated_at: None,
            examination_started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            general_assembly: None,
            final_grade: None,
            repository_link: None,
        })
    }
}

/// Convert a libSQL row to a `Topic` struct.
fn row_to_topic(row: &libsql::Row) -> Result<Topic, crate::error::DatabaseError> {
    Ok(Topic {
        id: row.get::<String>(0)?,
        title: row.get::<String>(1)?,
        description: row.get::<String>(2)?,
        supervisor_id: row.get::<String>(3)?,
        is_available: row.get::<i64>(4)? != 0,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{secretary, student, supervisor, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn create_and_get_topic() {
        let svc = test_service().await;
        let sup = supervisor();

        let topic = svc
            .create_topic(&sup, "Distributed consensus", "Study of Raft variants")
            .await
            .unwrap();
        assert!(topic.is_available);
        assert_eq!(topic.supervisor_id, sup.id);

        let fetched = svc.get_topic(&topic.id).await.unwrap();
        assert_eq!(fetched, topic);
    }

    #[tokio::test]
    async fn create_topic_blank_title_rejected() {
        let svc = test_service().await;
        let result = svc.create_topic(&supervisor(), "  ", "desc").await;
        assert!(result.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn student_cannot_create_topic() {
        let svc = test_service().await;
        let result = svc.create_topic(&student(), "Title", "Desc").await;
        assert!(result.unwrap_err().is_permission());
    }

    #[tokio::test]
    async fn get_topic_missing_is_not_found() {
        let svc = test_service().await;
        assert!(svc.get_topic("top-missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn list_topics_filters() {
        let svc = test_service().await;
        let sup = supervisor();
        let other = thesia_core::actor::Actor::professor("prof-other");

        let t1 = svc.create_topic(&sup, "A", "a").await.unwrap();
        svc.create_topic(&other, "B", "b").await.unwrap();
        svc.assign_topic(&sup, &t1.id, "stu-1").await.unwrap();

        let mine = svc
            .list_topics(&TopicFilter {
                supervisor_id: Some(sup.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, t1.id);

        let available = svc
            .list_topics(&TopicFilter {
                available_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "B");
    }

    #[tokio::test]
    async fn assign_topic_creates_under_assignment_thesis() {
        let svc = test_service().await;
        let sup = supervisor();
        let topic = svc.create_topic(&sup, "T", "d").await.unwrap();

        let thesis = svc.assign_topic(&sup, &topic.id, "stu-1").await.unwrap();
        assert_eq!(thesis.status, ThesisStatus::UnderAssignment);
        assert_eq!(thesis.supervisor_id, sup.id);
        assert!(thesis.general_assembly.is_none());

        let refetched = svc.get_topic(&topic.id).await.unwrap();
        assert!(!refetched.is_available);

        // Initial history entry was appended in the same commit.
        let history = svc.status_history(&thesis.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, ThesisStatus::UnderAssignment);
    }

    #[tokio::test]
    async fn assign_taken_topic_conflicts() {
        let svc = test_service().await;
        let sup = supervisor();
        let topic = svc.create_topic(&sup, "T", "d").await.unwrap();
        svc.assign_topic(&sup, &topic.id, "stu-1").await.unwrap();

        let result = svc.assign_topic(&sup, &topic.id, "stu-2").await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn student_with_open_thesis_cannot_take_second_topic() {
        let svc = test_service().await;
        let sup = supervisor();
        let t1 = svc.create_topic(&sup, "T1", "d").await.unwrap();
        let t2 = svc.create_topic(&sup, "T2", "d").await.unwrap();
        svc.assign_topic(&sup, &t1.id, "stu-1").await.unwrap();

        let result = svc.assign_topic(&sup, &t2.id, "stu-1").await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn foreign_professor_cannot_assign() {
        let svc = test_service().await;
        let topic = svc.create_topic(&supervisor(), "T", "d").await.unwrap();
        let other = thesia_core::actor::Actor::professor("prof-other");

        let result = svc.assign_topic(&other, &topic.id, "stu-1").await;
        assert!(result.unwrap_err().is_permission());
    }

    #[tokio::test]
    async fn secretary_may_assign_any_topic() {
        let svc = test_service().await;
        let topic = svc.create_topic(&supervisor(), "T", "d").await.unwrap();

        let thesis = svc.assign_topic(&secretary(), &topic.id, "stu-1").await.unwrap();
        assert_eq!(thesis.student_id, "stu-1");
    }
}
