// src/client/http.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use url::Url;

use crate::{
    attempt::ReviewView,
    client::{AssessmentApi, ClientError, ClientSession},
    models::{
        assessment::QuestionSet,
        attempt::{Attempt, AttemptLookup, Submission},
    },
};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user_id: i64,
}

/// `AssessmentApi` over the JSON HTTP API.
#[derive(Clone)]
pub struct HttpAssessmentApi {
    client: reqwest::Client,
}

impl HttpAssessmentApi {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Logs in and returns the session to thread through later calls.
    pub async fn login(
        &self,
        base_url: &Url,
        username: &str,
        password: &str,
    ) -> Result<ClientSession, ClientError> {
        let base_url = with_trailing_slash(base_url);
        let response = self
            .client
            .post(endpoint(&base_url, "api/auth/login")?)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(network)?;

        let login: LoginResponse = decode(response).await?;
        Ok(ClientSession {
            base_url,
            token: login.token,
            learner_id: login.user_id,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        session: &ClientSession,
        path: &str,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .get(endpoint(&session.base_url, path)?)
            .bearer_auth(&session.token)
            .send()
            .await
            .map_err(network)?;

        decode(response).await
    }
}

/// The base URL as a directory, so relative joins keep any path prefix.
fn with_trailing_slash(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Resolves an API path under the base URL, keeping its path prefix.
fn endpoint(base_url: &Url, path: &str) -> Result<Url, ClientError> {
    with_trailing_slash(base_url)
        .join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::Invalid(format!("bad endpoint {}: {}", path, e)))
}

fn network(err: reqwest::Error) -> ClientError {
    tracing::warn!("Request failed: {}", err);
    ClientError::NetworkError(err.to_string())
}

/// Maps the response status onto the client error taxonomy.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(network);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::NotAuthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Invalid(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl AssessmentApi for HttpAssessmentApi {
    async fn check_attempt(
        &self,
        session: &ClientSession,
        assessment_id: i64,
    ) -> Result<AttemptLookup, ClientError> {
        self.get(session, &format!("api/assessments/{}/attempt", assessment_id))
            .await
    }

    async fn load_questions(
        &self,
        session: &ClientSession,
        assessment_id: i64,
    ) -> Result<QuestionSet, ClientError> {
        self.get(session, &format!("api/assessments/{}/questions", assessment_id))
            .await
    }

    async fn submit(
        &self,
        session: &ClientSession,
        submission: &Submission,
    ) -> Result<Attempt, ClientError> {
        let path = format!("api/assessments/{}/attempt", submission.assessment_id);
        let response = self
            .client
            .post(endpoint(&session.base_url, &path)?)
            .bearer_auth(&session.token)
            .json(submission)
            .send()
            .await
            .map_err(network)?;

        decode(response).await
    }

    async fn review(
        &self,
        session: &ClientSession,
        assessment_id: i64,
    ) -> Result<ReviewView, ClientError> {
        self.get(session, &format!("api/assessments/{}/review", assessment_id))
            .await
    }
}
