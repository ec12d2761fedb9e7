// src/models/question.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The three question variants an assessment can contain.
/// Serialized as the `type` tag on the wire and stored as text in `questions.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    OpenEnded,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::OpenEnded => "open_ended",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "multiple_choice" => Some(QuestionKind::MultipleChoice),
            "true_false" => Some(QuestionKind::TrueFalse),
            "open_ended" => Some(QuestionKind::OpenEnded),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correct value of a true/false question. Wire labels are "V" and "F".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruthValue {
    #[serde(rename = "V")]
    True,
    #[serde(rename = "F")]
    False,
}

impl TruthValue {
    /// Both values in display order.
    pub const ALL: [TruthValue; 2] = [TruthValue::True, TruthValue::False];

    pub fn label(&self) -> &'static str {
        match self {
            TruthValue::True => "V",
            TruthValue::False => "F",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            TruthValue::True => "True",
            TruthValue::False => "False",
        }
    }

    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("V") {
            Some(TruthValue::True)
        } else if raw.eq_ignore_ascii_case("F") {
            Some(TruthValue::False)
        } else {
            None
        }
    }
}

/// Join key between a loaded question, its submitted answer and its review entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRef {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question_id: i64,
}

/// Full question definition, answer key included. Never sent to a learner
/// before their attempt exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    MultipleChoice {
        id: i64,
        prompt: String,
        /// Option label (e.g. "A") to option text.
        options: BTreeMap<String, String>,
        /// Label of the single correct option.
        correct: String,
    },
    TrueFalse {
        id: i64,
        prompt: String,
        correct: TruthValue,
    },
    OpenEnded {
        id: i64,
        prompt: String,
    },
}

impl Question {
    pub fn id(&self) -> i64 {
        match self {
            Question::MultipleChoice { id, .. }
            | Question::TrueFalse { id, .. }
            | Question::OpenEnded { id, .. } => *id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice { prompt, .. }
            | Question::TrueFalse { prompt, .. }
            | Question::OpenEnded { prompt, .. } => prompt,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            Question::TrueFalse { .. } => QuestionKind::TrueFalse,
            Question::OpenEnded { .. } => QuestionKind::OpenEnded,
        }
    }

    pub fn question_ref(&self) -> QuestionRef {
        QuestionRef {
            kind: self.kind(),
            question_id: self.id(),
        }
    }

    /// The machine-checkable correct value, if the variant has one.
    pub fn answer_key(&self) -> Option<String> {
        match self {
            Question::MultipleChoice { correct, .. } => Some(correct.clone()),
            Question::TrueFalse { correct, .. } => Some(correct.label().to_string()),
            Question::OpenEnded { .. } => None,
        }
    }

    /// Strips the answer key for the pre-submission payload.
    pub fn to_public(&self) -> PublicQuestion {
        match self {
            Question::MultipleChoice {
                id,
                prompt,
                options,
                ..
            } => PublicQuestion::MultipleChoice {
                id: *id,
                prompt: prompt.clone(),
                options: options.clone(),
            },
            Question::TrueFalse { id, prompt, .. } => PublicQuestion::TrueFalse {
                id: *id,
                prompt: prompt.clone(),
            },
            Question::OpenEnded { id, prompt } => PublicQuestion::OpenEnded {
                id: *id,
                prompt: prompt.clone(),
            },
        }
    }

    pub fn from_draft(id: i64, draft: QuestionDraft) -> Self {
        match draft {
            QuestionDraft::MultipleChoice {
                prompt,
                options,
                correct,
            } => Question::MultipleChoice {
                id,
                prompt,
                options,
                correct,
            },
            QuestionDraft::TrueFalse { prompt, correct } => {
                Question::TrueFalse { id, prompt, correct }
            }
            QuestionDraft::OpenEnded { prompt } => Question::OpenEnded { id, prompt },
        }
    }
}

/// DTO for sending a question to the learner (excludes the answer key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublicQuestion {
    MultipleChoice {
        id: i64,
        prompt: String,
        options: BTreeMap<String, String>,
    },
    TrueFalse {
        id: i64,
        prompt: String,
    },
    OpenEnded {
        id: i64,
        prompt: String,
    },
}

impl PublicQuestion {
    pub fn id(&self) -> i64 {
        match self {
            PublicQuestion::MultipleChoice { id, .. }
            | PublicQuestion::TrueFalse { id, .. }
            | PublicQuestion::OpenEnded { id, .. } => *id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            PublicQuestion::MultipleChoice { prompt, .. }
            | PublicQuestion::TrueFalse { prompt, .. }
            | PublicQuestion::OpenEnded { prompt, .. } => prompt,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            PublicQuestion::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            PublicQuestion::TrueFalse { .. } => QuestionKind::TrueFalse,
            PublicQuestion::OpenEnded { .. } => QuestionKind::OpenEnded,
        }
    }

    pub fn question_ref(&self) -> QuestionRef {
        QuestionRef {
            kind: self.kind(),
            question_id: self.id(),
        }
    }
}

/// A question as produced by the generation service, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionDraft {
    MultipleChoice {
        prompt: String,
        options: BTreeMap<String, String>,
        correct: String,
    },
    TrueFalse {
        prompt: String,
        correct: TruthValue,
    },
    OpenEnded {
        prompt: String,
    },
}

impl QuestionDraft {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionDraft::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionDraft::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuestionDraft::OpenEnded { .. } => QuestionKind::OpenEnded,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            QuestionDraft::MultipleChoice { prompt, .. }
            | QuestionDraft::TrueFalse { prompt, .. }
            | QuestionDraft::OpenEnded { prompt } => prompt,
        }
    }
}
