// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::MAX_GENERATED_PER_KIND;
use crate::models::question::{PublicQuestion, Question, QuestionDraft, QuestionKind};

/// Difficulty level. Stored as 1/2/3 in `assessments.level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub fn as_i16(&self) -> i16 {
        match self {
            Level::Easy => 1,
            Level::Medium => 2,
            Level::Hard => 3,
        }
    }

    pub fn from_i16(raw: i16) -> Option<Self> {
        match raw {
            1 => Some(Level::Easy),
            2 => Some(Level::Medium),
            3 => Some(Level::Hard),
            _ => None,
        }
    }

    /// The level a learner moves to after passing this one. Hard is the ceiling.
    pub fn next(&self) -> Self {
        match self {
            Level::Easy => Level::Medium,
            Level::Medium | Level::Hard => Level::Hard,
        }
    }
}

/// An assessment with its immutable, ordered question definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub id: i64,
    pub unit_id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub level: Level,
    pub questions: Vec<Question>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Assessment {
    pub fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            id: self.id,
            unit_id: self.unit_id,
            course_id: self.course_id,
            name: self.name.clone(),
            description: self.description.clone(),
            level: self.level,
        }
    }

    /// Pre-submission view of the assessment: metadata and questions without answer keys.
    pub fn to_question_set(&self) -> QuestionSet {
        QuestionSet {
            assessment: self.summary(),
            questions: self.questions.iter().map(Question::to_public).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: i64,
    pub unit_id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub level: Level,
}

/// What a learner receives before taking an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub assessment: AssessmentSummary,
    #[serde(default)]
    pub questions: Vec<PublicQuestion>,
}

impl QuestionSet {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Questions of one variant, in assessment order. Empty when the variant is absent.
    pub fn of_kind(&self, kind: QuestionKind) -> impl Iterator<Item = &PublicQuestion> {
        self.questions.iter().filter(move |q| q.kind() == kind)
    }
}

/// A freshly generated assessment, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub unit_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub level: Level,
    pub questions: Vec<QuestionDraft>,
}

/// DTO for asking the generation service for a new assessment.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateAssessmentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub level: Level,
    #[serde(default)]
    #[validate(range(max = MAX_GENERATED_PER_KIND))]
    pub multiple_choice: u32,
    #[serde(default)]
    #[validate(range(max = MAX_GENERATED_PER_KIND))]
    pub true_false: u32,
    #[serde(default)]
    #[validate(range(max = MAX_GENERATED_PER_KIND))]
    pub open_ended: u32,
}

impl GenerateAssessmentRequest {
    pub fn total_questions(&self) -> u32 {
        self.multiple_choice + self.true_false + self.open_ended
    }
}
