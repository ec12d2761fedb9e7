// src/store/mod.rs

//! Storage seams.
//!
//! Every core operation reaches persistence through these traits, so handlers
//! and tests can swap the Postgres backend for the in-memory one.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, NewAssessment},
        attempt::{Attempt, AttemptSummary, NewAttempt},
        progress::Progress,
        user::User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

/// Enrollment and ownership checks.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// True when the learner owns the assessment's course or is enrolled in it.
    /// False for assessments that do not exist.
    async fn can_view_assessment(&self, learner_id: i64, assessment_id: i64)
    -> Result<bool, AppError>;

    /// True when the user owns the course the unit belongs to.
    async fn can_manage_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError>;

    /// True when the user owns or is enrolled in the unit's course.
    async fn can_view_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError>;

    async fn unit_exists(&self, unit_id: i64) -> Result<bool, AppError>;

    /// Number of uploaded materials in the unit.
    async fn material_count(&self, unit_id: i64) -> Result<i64, AppError>;
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Loads the assessment with its question definitions in order.
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<Assessment>, AppError>;

    async fn insert_assessment(&self, new: NewAssessment) -> Result<Assessment, AppError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Looks up the attempt for the exact (assessment, learner) pair.
    async fn find_attempt(
        &self,
        assessment_id: i64,
        learner_id: i64,
    ) -> Result<Option<Attempt>, AppError>;

    /// Persists the attempt, its answers and the learner's unit progress in one step.
    ///
    /// Fails with `AppError::Conflict` if an attempt already exists for the pair;
    /// nothing is written in that case.
    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt, AppError>;

    /// Newest first.
    async fn list_attempts(&self, learner_id: i64) -> Result<Vec<AttemptSummary>, AppError>;

    async fn find_progress(
        &self,
        learner_id: i64,
        unit_id: i64,
    ) -> Result<Option<Progress>, AppError>;
}

pub trait Store: UserStore + EnrollmentStore + AssessmentStore + AttemptStore {}

impl<T> Store for T where T: UserStore + EnrollmentStore + AssessmentStore + AttemptStore {}

pub type DynStore = Arc<dyn Store>;

pub(crate) fn attempt_conflict(assessment_id: i64, learner_id: i64) -> AppError {
    AppError::Conflict(format!(
        "Learner {} already has an attempt for assessment {}",
        learner_id, assessment_id
    ))
}
