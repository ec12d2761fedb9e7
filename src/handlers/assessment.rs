// src/handlers/assessment.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    attempt,
    error::AppError,
    generation::generate_assessment,
    models::assessment::GenerateAssessmentRequest,
    state::AppState,
    store::DynStore,
    utils::jwt::Session,
};

/// Returns the assessment's questions without answer keys.
pub async fn get_questions(
    State(store): State<DynStore>,
    session: Session,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = attempt::load_questions(store.as_ref(), &session, assessment_id).await?;
    Ok(Json(questions))
}

/// Asks the generation service for a new assessment in the unit.
/// Course owner only; the unit needs at least one material.
pub async fn create_assessment(
    State(state): State<AppState>,
    session: Session,
    Path(unit_id): Path<i64>,
    Json(payload): Json<GenerateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let assessment = generate_assessment(
        state.store.as_ref(),
        state.generator.as_deref(),
        &session,
        unit_id,
        payload,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(assessment)))
}
