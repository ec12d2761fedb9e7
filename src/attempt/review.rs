// src/attempt/review.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    attempt::scorer::matches_key,
    models::{
        assessment::{AssessmentSummary, QuestionSet},
        attempt::{Answer, Attempt},
        question::{PublicQuestion, QuestionRef, TruthValue},
    },
};

/// Marker shown next to an option in the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Correct,
    Wrong,
}

impl Marker {
    pub fn symbol(&self) -> &'static str {
        match self {
            Marker::Correct => "✔",
            Marker::Wrong => "✖",
        }
    }
}

/// Review state of one selectable option (a multiple-choice label or V/F).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionReview {
    pub label: String,
    pub text: String,
    /// This option is the answer key.
    pub is_correct_option: bool,
    /// The learner picked this option.
    pub is_selected: bool,
    /// The learner picked this option and it is not the answer key.
    pub is_wrong_selection: bool,
}

impl OptionReview {
    fn new(label: &str, text: &str, response: &str, key: Option<&str>) -> Self {
        let is_correct_option = key.is_some_and(|k| matches_key(label, k));
        let is_selected = matches_key(response, label);
        Self {
            label: label.to_string(),
            text: text.to_string(),
            is_correct_option,
            is_selected,
            is_wrong_selection: is_selected && !is_correct_option,
        }
    }

    pub fn marker(&self) -> Option<Marker> {
        if self.is_correct_option {
            Some(Marker::Correct)
        } else if self.is_wrong_selection {
            Some(Marker::Wrong)
        } else {
            None
        }
    }
}

/// Display-ready review of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewItem {
    MultipleChoice {
        question_id: i64,
        prompt: String,
        user_response: String,
        is_correct: bool,
        options: Vec<OptionReview>,
    },
    TrueFalse {
        question_id: i64,
        prompt: String,
        user_response: String,
        is_correct: bool,
        options: Vec<OptionReview>,
    },
    /// No verdict: the raw response and any grader feedback, verbatim.
    OpenEnded {
        question_id: i64,
        prompt: String,
        user_response: String,
        feedback: Option<String>,
    },
}

impl ReviewItem {
    pub fn question_id(&self) -> i64 {
        match self {
            ReviewItem::MultipleChoice { question_id, .. }
            | ReviewItem::TrueFalse { question_id, .. }
            | ReviewItem::OpenEnded { question_id, .. } => *question_id,
        }
    }

    /// Option list for the choice variants; empty for open-ended questions.
    pub fn options(&self) -> &[OptionReview] {
        match self {
            ReviewItem::MultipleChoice { options, .. } | ReviewItem::TrueFalse { options, .. } => {
                options
            }
            ReviewItem::OpenEnded { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewView {
    pub assessment: AssessmentSummary,
    pub score: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub items: Vec<ReviewItem>,
}

/// Merges a graded attempt with the question definitions into a review.
///
/// Answer keys come from the attempt, so the answer-free question set the
/// learner loaded is enough. Pure: the same inputs always give the same view.
pub fn reconcile(questions: &QuestionSet, attempt: &Attempt) -> ReviewView {
    let answers: HashMap<QuestionRef, &Answer> = attempt
        .answers
        .iter()
        .map(|a| (a.question_ref(), a))
        .collect();

    let items = questions
        .questions
        .iter()
        .map(|question| {
            let answer = answers.get(&question.question_ref()).copied();
            review_question(question, answer)
        })
        .collect();

    ReviewView {
        assessment: questions.assessment.clone(),
        score: attempt.score,
        submitted_at: attempt.created_at,
        items,
    }
}

fn review_question(question: &PublicQuestion, answer: Option<&Answer>) -> ReviewItem {
    let user_response = answer.map(|a| a.user_response.clone()).unwrap_or_default();
    let key = answer.and_then(|a| a.correct_value.as_deref());

    match question {
        PublicQuestion::MultipleChoice {
            id,
            prompt,
            options,
        } => {
            let options: Vec<OptionReview> = options
                .iter()
                .map(|(label, text)| OptionReview::new(label, text, &user_response, key))
                .collect();
            ReviewItem::MultipleChoice {
                question_id: *id,
                prompt: prompt.clone(),
                is_correct: verdict(answer, &options),
                user_response,
                options,
            }
        }
        PublicQuestion::TrueFalse { id, prompt } => {
            let options: Vec<OptionReview> = TruthValue::ALL
                .iter()
                .map(|v| OptionReview::new(v.label(), v.text(), &user_response, key))
                .collect();
            ReviewItem::TrueFalse {
                question_id: *id,
                prompt: prompt.clone(),
                is_correct: verdict(answer, &options),
                user_response,
                options,
            }
        }
        PublicQuestion::OpenEnded { id, prompt } => ReviewItem::OpenEnded {
            question_id: *id,
            prompt: prompt.clone(),
            user_response,
            feedback: answer.and_then(|a| a.feedback.clone()),
        },
    }
}

/// The stored verdict wins; otherwise a correct option must be the selected one.
fn verdict(answer: Option<&Answer>, options: &[OptionReview]) -> bool {
    answer
        .and_then(|a| a.is_correct)
        .unwrap_or_else(|| options.iter().any(|o| o.is_correct_option && o.is_selected))
}
