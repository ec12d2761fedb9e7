// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    store::{AttemptStore, DynStore, EnrollmentStore},
    utils::jwt::Session,
};

/// The learner's standing in a unit. `progress` is null before the first attempt.
pub async fn get_unit_progress(
    State(store): State<DynStore>,
    session: Session,
    Path(unit_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.unit_exists(unit_id).await? {
        return Err(AppError::NotFound(format!("Unit {} not found", unit_id)));
    }
    if !store.can_view_unit(session.learner_id, unit_id).await? {
        return Err(AppError::Forbidden(
            "You are not enrolled in this course".to_string(),
        ));
    }

    let progress = store.find_progress(session.learner_id, unit_id).await?;
    Ok(Json(json!({
        "unit_id": unit_id,
        "progress": progress
    })))
}
