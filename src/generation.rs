// src/generation.rs

//! Bridge to the external assessment generation service.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, GenerateAssessmentRequest, Level, NewAssessment},
        question::QuestionDraft,
    },
    store::{AssessmentStore, EnrollmentStore, Store},
    utils::jwt::Session,
};

const GENERATOR_TIMEOUT_SECS: u64 = 180;

/// Option labels are short keys such as "A" or "b".
static OPTION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,4}$").expect("valid option label regex"));

/// How many questions of each variant to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionCounts {
    pub multiple_choice: u32,
    pub true_false: u32,
    pub open_ended: u32,
}

/// Produces questions for a unit from its uploaded materials.
#[async_trait]
pub trait AssessmentGenerator: Send + Sync {
    async fn generate(
        &self,
        unit_id: i64,
        level: Level,
        counts: QuestionCounts,
    ) -> Result<Vec<QuestionDraft>, AppError>;
}

#[derive(Serialize)]
struct GenerateRequest {
    unit_id: i64,
    level: Level,
    counts: QuestionCounts,
}

#[derive(Deserialize)]
struct GenerateResponse {
    questions: Vec<QuestionDraft>,
}

/// Calls a generation service over HTTP.
pub struct HttpAssessmentGenerator {
    client: reqwest::Client,
    url: Url,
}

impl HttpAssessmentGenerator {
    pub fn new(url: Url) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATOR_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl AssessmentGenerator for HttpAssessmentGenerator {
    async fn generate(
        &self,
        unit_id: i64,
        level: Level,
        counts: QuestionCounts,
    ) -> Result<Vec<QuestionDraft>, AppError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&GenerateRequest {
                unit_id,
                level,
                counts,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Generator request failed: {:?}", e);
                AppError::ServiceUnavailable("Assessment generator unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!("Generator answered with status {}", response.status());
            return Err(AppError::ServiceUnavailable(
                "Assessment generator failed".to_string(),
            ));
        }

        let body = response.json::<GenerateResponse>().await.map_err(|e| {
            tracing::error!("Generator returned an unreadable body: {:?}", e);
            AppError::ServiceUnavailable("Assessment generator returned garbage".to_string())
        })?;

        Ok(body.questions)
    }
}

/// Checks generated questions before they are frozen into an assessment.
pub fn validate_drafts(drafts: &[QuestionDraft]) -> Result<(), AppError> {
    if drafts.is_empty() {
        return Err(AppError::ServiceUnavailable(
            "Assessment generator produced no questions".to_string(),
        ));
    }

    for (index, draft) in drafts.iter().enumerate() {
        let position = index + 1;
        if draft.prompt().trim().is_empty() {
            return Err(invalid_draft(position, "empty prompt"));
        }

        if let QuestionDraft::MultipleChoice {
            options, correct, ..
        } = draft
        {
            if options.len() < 2 {
                return Err(invalid_draft(position, "fewer than two options"));
            }
            if let Some(label) = options.keys().find(|l| !OPTION_LABEL.is_match(l)) {
                return Err(invalid_draft(
                    position,
                    &format!("bad option label '{}'", label),
                ));
            }
            let matching = options
                .keys()
                .filter(|l| l.eq_ignore_ascii_case(correct.trim()))
                .count();
            if matching != 1 {
                return Err(invalid_draft(position, "correct label is not exactly one option"));
            }
        }
    }

    Ok(())
}

fn invalid_draft(position: usize, reason: &str) -> AppError {
    tracing::warn!("Rejecting generated question {}: {}", position, reason);
    AppError::ServiceUnavailable(format!(
        "Assessment generator produced an invalid question #{}: {}",
        position, reason
    ))
}

/// Generates and stores a new assessment for a unit the caller owns.
///
/// The unit must have at least one uploaded material.
pub async fn generate_assessment(
    store: &dyn Store,
    generator: Option<&dyn AssessmentGenerator>,
    session: &Session,
    unit_id: i64,
    request: GenerateAssessmentRequest,
) -> Result<Assessment, AppError> {
    if !store.unit_exists(unit_id).await? {
        return Err(AppError::NotFound(format!("Unit {} not found", unit_id)));
    }
    if !store.can_manage_unit(session.learner_id, unit_id).await? {
        return Err(AppError::Forbidden(
            "Only the course owner can create assessments".to_string(),
        ));
    }
    if request.total_questions() == 0 {
        return Err(AppError::BadRequest(
            "At least one question must be requested".to_string(),
        ));
    }
    if store.material_count(unit_id).await? == 0 {
        return Err(AppError::BadRequest(
            "Upload at least one material before generating an assessment".to_string(),
        ));
    }

    let generator = generator.ok_or_else(|| {
        AppError::ServiceUnavailable("Assessment generation is not configured".to_string())
    })?;

    let counts = QuestionCounts {
        multiple_choice: request.multiple_choice,
        true_false: request.true_false,
        open_ended: request.open_ended,
    };
    let drafts = generator.generate(unit_id, request.level, counts).await?;
    validate_drafts(&drafts)?;

    let assessment = store
        .insert_assessment(NewAssessment {
            unit_id,
            name: request.name,
            description: request.description,
            level: request.level,
            questions: drafts,
        })
        .await?;

    tracing::info!(
        "Generated assessment {} with {} questions for unit {}",
        assessment.id,
        assessment.questions.len(),
        unit_id
    );

    Ok(assessment)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::question::TruthValue;

    fn mc(options: &[&str], correct: &str) -> QuestionDraft {
        QuestionDraft::MultipleChoice {
            prompt: "Pick".to_string(),
            options: options
                .iter()
                .map(|l| (l.to_string(), format!("option {}", l)))
                .collect::<BTreeMap<_, _>>(),
            correct: correct.to_string(),
        }
    }

    #[test]
    fn test_valid_drafts_pass() {
        let drafts = vec![
            mc(&["a", "b", "c", "d"], "c"),
            QuestionDraft::TrueFalse {
                prompt: "Yes?".to_string(),
                correct: TruthValue::False,
            },
            QuestionDraft::OpenEnded {
                prompt: "Why?".to_string(),
            },
        ];
        assert!(validate_drafts(&drafts).is_ok());
    }

    #[test]
    fn test_correct_label_must_be_an_option() {
        assert!(validate_drafts(&[mc(&["A", "B"], "E")]).is_err());
        assert!(validate_drafts(&[mc(&["A", "B"], "b")]).is_ok());
    }

    #[test]
    fn test_rejects_bad_labels_and_empty_prompts() {
        assert!(validate_drafts(&[mc(&["A", "option two"], "A")]).is_err());
        assert!(validate_drafts(&[QuestionDraft::OpenEnded {
            prompt: "   ".to_string()
        }])
        .is_err());
        assert!(validate_drafts(&[]).is_err());
    }
}
