// src/client/mod.rs

//! Learner-side access to the attempt API and the attempt state machine.

pub mod flow;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::{
    attempt::ReviewView,
    models::{
        assessment::QuestionSet,
        attempt::{Attempt, AttemptLookup, Submission},
    },
};

pub use flow::{AttemptFlow, FlowState};
pub use http::HttpAssessmentApi;

/// Errors surfaced to the learner-facing side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No session, or not enrolled. Leave the view.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The assessment or unit is gone. Leave the view.
    #[error("not found: {0}")]
    NotFound(String),

    /// An attempt already exists for this learner and assessment.
    #[error("attempt already exists: {0}")]
    Conflict(String),

    /// Transport failure. Never retried automatically.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The server rejected the payload.
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// A submission is already in flight.
    #[error("a submission is already in progress")]
    Busy,

    #[error("this assessment has already been graded")]
    AlreadyGraded,
}

impl ClientError {
    /// Errors after which the current view cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::NotAuthorized(_) | ClientError::NotFound(_))
    }
}

/// The learner's session, passed explicitly to every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    /// Server root. A path prefix such as `/learning` is kept in every request.
    pub base_url: Url,
    pub token: String,
    pub learner_id: i64,
}

/// Remote operations the attempt lifecycle depends on.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    async fn check_attempt(
        &self,
        session: &ClientSession,
        assessment_id: i64,
    ) -> Result<AttemptLookup, ClientError>;

    async fn load_questions(
        &self,
        session: &ClientSession,
        assessment_id: i64,
    ) -> Result<QuestionSet, ClientError>;

    /// Single shot: a failure is returned as-is, never retried.
    async fn submit(
        &self,
        session: &ClientSession,
        submission: &Submission,
    ) -> Result<Attempt, ClientError>;

    async fn review(
        &self,
        session: &ClientSession,
        assessment_id: i64,
    ) -> Result<ReviewView, ClientError>;
}
