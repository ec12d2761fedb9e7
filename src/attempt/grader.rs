// src/attempt/grader.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::AppError, models::assessment::Assessment};

const GRADER_TIMEOUT_SECS: u64 = 60;

/// One open-ended response handed to the external grader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenEndedResponse {
    pub question_id: i64,
    pub prompt: String,
    pub user_response: String,
}

/// What the external grader returns for the open-ended part of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OpenEndedGrade {
    /// Percentage earned over the open-ended questions. `None` leaves them ungraded.
    #[serde(default)]
    pub score: Option<i64>,
    /// Feedback text keyed by question id.
    #[serde(default)]
    pub feedback: HashMap<i64, String>,
}

/// Grades free-text answers. How it does so is up to the implementation.
#[async_trait]
pub trait OpenEndedGrader: Send + Sync {
    async fn grade(
        &self,
        assessment: &Assessment,
        responses: &[OpenEndedResponse],
    ) -> Result<OpenEndedGrade, AppError>;
}

/// Leaves open-ended answers without a score or feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct UngradedOpenEnded;

#[async_trait]
impl OpenEndedGrader for UngradedOpenEnded {
    async fn grade(
        &self,
        _assessment: &Assessment,
        _responses: &[OpenEndedResponse],
    ) -> Result<OpenEndedGrade, AppError> {
        Ok(OpenEndedGrade::default())
    }
}

#[derive(Serialize)]
struct GradeRequest<'a> {
    assessment_id: i64,
    assessment_name: &'a str,
    level: crate::models::assessment::Level,
    answers: &'a [OpenEndedResponse],
}

/// Posts open-ended answers to an external grading service.
pub struct HttpOpenEndedGrader {
    client: reqwest::Client,
    url: Url,
}

impl HttpOpenEndedGrader {
    pub fn new(url: Url) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GRADER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl OpenEndedGrader for HttpOpenEndedGrader {
    async fn grade(
        &self,
        assessment: &Assessment,
        responses: &[OpenEndedResponse],
    ) -> Result<OpenEndedGrade, AppError> {
        if responses.is_empty() {
            return Ok(OpenEndedGrade::default());
        }

        let body = GradeRequest {
            assessment_id: assessment.id,
            assessment_name: &assessment.name,
            level: assessment.level,
            answers: responses,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Grader request failed: {:?}", e);
                AppError::ServiceUnavailable("Open-ended grader unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!("Grader answered with status {}", response.status());
            return Err(AppError::ServiceUnavailable(
                "Open-ended grader failed".to_string(),
            ));
        }

        response.json::<OpenEndedGrade>().await.map_err(|e| {
            tracing::error!("Grader returned an unreadable body: {:?}", e);
            AppError::ServiceUnavailable("Open-ended grader returned garbage".to_string())
        })
    }
}
