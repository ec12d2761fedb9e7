// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// An account row. Its id is the `learner_id` attempts and progress are keyed on,
/// and the owner id of the courses it created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash. Never serialized.
    #[serde(skip)]
    pub password: String,

    /// Carried into the session token; every account registers as "user".
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
