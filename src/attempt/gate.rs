// src/attempt/gate.rs

use crate::{
    error::AppError,
    models::attempt::AttemptLookup,
    store::{AssessmentStore, AttemptStore, EnrollmentStore, Store},
    utils::jwt::Session,
};

/// Fails unless the session may view the assessment.
///
/// A missing assessment is reported as `NotFound`, an existing one the learner
/// is not enrolled in as `Forbidden`.
pub(crate) async fn authorize(
    store: &dyn Store,
    session: &Session,
    assessment_id: i64,
) -> Result<(), AppError> {
    if store
        .can_view_assessment(session.learner_id, assessment_id)
        .await?
    {
        return Ok(());
    }

    if store.find_assessment(assessment_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Assessment {} not found",
            assessment_id
        )));
    }

    tracing::warn!(
        "Learner {} is not allowed to view assessment {}",
        session.learner_id,
        assessment_id
    );
    Err(AppError::Forbidden(
        "You are not enrolled in this course".to_string(),
    ))
}

/// Reports whether the learner already has an attempt on the assessment.
///
/// Pure read: attempts are only ever created by `scorer::submit`.
pub async fn check_attempt(
    store: &dyn Store,
    session: &Session,
    assessment_id: i64,
) -> Result<AttemptLookup, AppError> {
    authorize(store, session, assessment_id).await?;

    let attempt = store
        .find_attempt(assessment_id, session.learner_id)
        .await?;

    Ok(AttemptLookup::from(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            assessment::{Level, NewAssessment},
            attempt::NewAttempt,
            question::QuestionDraft,
        },
        store::{AssessmentStore, AttemptStore, MemoryStore, UserStore},
    };

    async fn fixture() -> (MemoryStore, Session, i64) {
        let store = MemoryStore::new();
        let owner = store.create_user("owner", "x").await.unwrap();
        let learner = store.create_user("learner", "x").await.unwrap();
        let course = store.create_course(owner.id);
        let unit = store.create_unit(course);
        store.enroll(learner.id, course);
        let assessment = store
            .insert_assessment(NewAssessment {
                unit_id: unit,
                name: "Quiz".to_string(),
                description: None,
                level: Level::Easy,
                questions: vec![QuestionDraft::OpenEnded {
                    prompt: "Why?".to_string(),
                }],
            })
            .await
            .unwrap();

        let session = Session {
            learner_id: learner.id,
            role: "user".to_string(),
        };
        (store, session, assessment.id)
    }

    #[tokio::test]
    async fn test_absent_then_present() {
        let (store, session, assessment_id) = fixture().await;

        let lookup = check_attempt(&store, &session, assessment_id).await.unwrap();
        assert_eq!(lookup, AttemptLookup::Absent);

        let unit_id = store.find_assessment(assessment_id).await.unwrap().unwrap().unit_id;
        store
            .insert_attempt(NewAttempt {
                assessment_id,
                unit_id,
                level: Level::Easy,
                learner_id: session.learner_id,
                score: 0,
                answers: Vec::new(),
            })
            .await
            .unwrap();

        let first = check_attempt(&store, &session, assessment_id).await.unwrap();
        let second = check_attempt(&store, &session, assessment_id).await.unwrap();
        assert!(matches!(first, AttemptLookup::Present(_)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_check_does_not_create_attempts() {
        let (store, session, assessment_id) = fixture().await;
        check_attempt(&store, &session, assessment_id).await.unwrap();
        check_attempt(&store, &session, assessment_id).await.unwrap();
        assert_eq!(store.attempt_count(assessment_id, session.learner_id), 0);
    }

    #[tokio::test]
    async fn test_stranger_is_forbidden_and_missing_is_not_found() {
        let (store, _, assessment_id) = fixture().await;
        let stranger = store.create_user("stranger", "x").await.unwrap();
        let session = Session {
            learner_id: stranger.id,
            role: "user".to_string(),
        };

        assert!(matches!(
            check_attempt(&store, &session, assessment_id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_attempt(&store, &session, 424242).await,
            Err(AppError::NotFound(_))
        ));
    }
}
