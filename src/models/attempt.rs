// src/models/attempt.rs

use serde::{Deserialize, Serialize};

use crate::models::assessment::Level;
use crate::models::question::{QuestionKind, QuestionRef};

/// One question's recorded response within an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Raw learner response. An empty string means "left blank".
    #[serde(default)]
    pub user_response: String,
    /// Copied from the question at grading time. Always `None` for open-ended answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Binary verdict for multiple-choice and true/false answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl Answer {
    pub fn question_ref(&self) -> QuestionRef {
        QuestionRef {
            kind: self.kind,
            question_id: self.question_id,
        }
    }
}

/// The single, permanent record of one learner's submission to one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub assessment_id: i64,
    pub learner_id: i64,
    /// Integer percentage, 0..=100.
    pub score: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub answers: Vec<Answer>,
}

/// Outcome of the attempt gate: either no attempt exists or exactly one does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "attempt", rename_all = "snake_case")]
pub enum AttemptLookup {
    Absent,
    Present(Attempt),
}

impl AttemptLookup {
    pub fn into_attempt(self) -> Option<Attempt> {
        match self {
            AttemptLookup::Absent => None,
            AttemptLookup::Present(attempt) => Some(attempt),
        }
    }
}

impl From<Option<Attempt>> for AttemptLookup {
    fn from(value: Option<Attempt>) -> Self {
        match value {
            Some(attempt) => AttemptLookup::Present(attempt),
            None => AttemptLookup::Absent,
        }
    }
}

/// One entry of the submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub prompt: String,
    /// Required; a blank answer is sent as "".
    pub user_response: String,
    /// Accepted for wire compatibility; the answer key is always looked up server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_value: Option<String>,
}

impl SubmittedAnswer {
    pub fn question_ref(&self) -> QuestionRef {
        QuestionRef {
            kind: self.kind,
            question_id: self.question_id,
        }
    }
}

/// DTO for submitting an attempt: exactly one answer per loaded question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub assessment_id: i64,
    pub learner_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}

/// A graded attempt ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub assessment_id: i64,
    pub unit_id: i64,
    pub level: Level,
    pub learner_id: i64,
    pub score: i64,
    pub answers: Vec<Answer>,
}

/// One row of a learner's attempt history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub assessment_id: i64,
    pub assessment_name: String,
    pub unit_id: i64,
    /// Assessment level at the time of the attempt.
    pub level: Level,
    pub score: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
