// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    attempt::{self, reconcile},
    error::AppError,
    models::attempt::{AttemptLookup, Submission},
    state::AppState,
    store::{AssessmentStore, AttemptStore, DynStore},
    utils::jwt::Session,
};

/// Reports whether the learner already attempted the assessment.
///
/// Always 200: `{"status":"absent"}` or `{"status":"present","attempt":{..}}`.
pub async fn check_attempt(
    State(store): State<DynStore>,
    session: Session,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lookup = attempt::check_attempt(store.as_ref(), &session, assessment_id).await?;
    Ok(Json(lookup))
}

/// Grades the submission and records it as the learner's only attempt.
/// Returns 201 with the graded attempt, 409 if one already exists.
pub async fn submit_attempt(
    State(state): State<AppState>,
    session: Session,
    Path(assessment_id): Path<i64>,
    Json(submission): Json<Submission>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = attempt::submit(
        state.store.as_ref(),
        state.grader.as_ref(),
        &session,
        assessment_id,
        &submission,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Correctness view of the learner's stored attempt.
pub async fn review_attempt(
    State(store): State<DynStore>,
    session: Session,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = match attempt::check_attempt(store.as_ref(), &session, assessment_id).await? {
        AttemptLookup::Present(attempt) => attempt,
        AttemptLookup::Absent => {
            return Err(AppError::NotFound(
                "No attempt to review yet".to_string(),
            ));
        }
    };

    let assessment = store
        .find_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {} not found", assessment_id)))?;

    Ok(Json(reconcile(&assessment.to_question_set(), &attempt)))
}

/// Lists the current learner's attempts, newest first.
pub async fn list_my_attempts(
    State(store): State<DynStore>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let list = store.list_attempts(session.learner_id).await?;
    Ok(Json(list))
}
