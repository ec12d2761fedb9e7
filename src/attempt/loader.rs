// src/attempt/loader.rs

use crate::{
    attempt::gate::authorize,
    error::AppError,
    models::assessment::QuestionSet,
    store::{AssessmentStore, Store},
    utils::jwt::Session,
};

/// Loads an assessment for first-time taking: metadata plus questions, answer keys stripped.
pub async fn load_questions(
    store: &dyn Store,
    session: &Session,
    assessment_id: i64,
) -> Result<QuestionSet, AppError> {
    authorize(store, session, assessment_id).await?;

    let assessment = store
        .find_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {} not found", assessment_id)))?;

    tracing::debug!(
        "Loaded {} questions of assessment {} for learner {}",
        assessment.questions.len(),
        assessment_id,
        session.learner_id
    );

    Ok(assessment.to_question_set())
}
