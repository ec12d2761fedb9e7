// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest},
    store::{DynStore, UserStore},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(store): State<DynStore>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let user = store.create_user(&payload.username, &hashed_password).await?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// The token's subject is the learner id every attempt operation is keyed on.
pub async fn login(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user_id": user.id
    })))
}
