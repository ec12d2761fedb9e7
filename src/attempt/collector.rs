// src/attempt/collector.rs

use std::collections::HashMap;

use crate::models::{
    assessment::QuestionSet,
    attempt::{Submission, SubmittedAnswer},
    question::QuestionRef,
};

/// In-progress learner responses, keyed by question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Responses {
    inner: HashMap<QuestionRef, String>,
}

impl Responses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or replaces) the response to a question.
    pub fn set(&mut self, question: QuestionRef, response: impl Into<String>) {
        self.inner.insert(question, response.into());
    }

    pub fn clear(&mut self, question: &QuestionRef) {
        self.inner.remove(question);
    }

    pub fn get(&self, question: &QuestionRef) -> Option<&str> {
        self.inner.get(question).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Builds the wire payload: one answer per loaded question, in question order.
///
/// Unanswered questions are sent as an empty string, never dropped.
/// Responses to questions outside the set are ignored.
pub fn build_submission(
    learner_id: i64,
    questions: &QuestionSet,
    responses: &Responses,
) -> Submission {
    let answers = questions
        .questions
        .iter()
        .map(|q| {
            let question_ref = q.question_ref();
            SubmittedAnswer {
                question_id: question_ref.question_id,
                kind: question_ref.kind,
                prompt: q.prompt().to_string(),
                user_response: responses.get(&question_ref).unwrap_or_default().to_string(),
                correct_value: None,
            }
        })
        .collect();

    Submission {
        assessment_id: questions.assessment.id,
        learner_id,
        answers,
    }
}
