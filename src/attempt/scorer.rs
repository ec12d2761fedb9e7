// src/attempt/scorer.rs

use std::collections::HashMap;

use crate::{
    attempt::{
        gate::authorize,
        grader::{OpenEndedGrade, OpenEndedGrader, OpenEndedResponse},
    },
    error::AppError,
    models::{
        assessment::Assessment,
        attempt::{Answer, Attempt, NewAttempt, Submission, SubmittedAnswer},
        question::{Question, QuestionRef},
    },
    store::{AssessmentStore, AttemptStore, Store, attempt_conflict},
    utils::jwt::Session,
};

/// Case-insensitive match of a learner response against an answer key.
/// A blank response never matches.
pub fn matches_key(response: &str, key: &str) -> bool {
    let response = response.trim();
    !response.is_empty() && response.eq_ignore_ascii_case(key.trim())
}

/// Overall percentage.
///
/// Each machine-graded question weighs one. Open-ended questions join the
/// denominator only when the grader produced a score for them.
pub fn compute_score(
    correct: usize,
    gradable: usize,
    open_ended: usize,
    open_ended_score: Option<i64>,
) -> i64 {
    let (earned, total) = match open_ended_score {
        Some(pct) if open_ended > 0 => {
            let pct = pct.clamp(0, 100) as f64;
            (
                correct as f64 + open_ended as f64 * pct / 100.0,
                (gradable + open_ended) as f64,
            )
        }
        _ => (correct as f64, gradable as f64),
    };

    if total == 0.0 {
        return 0;
    }

    ((earned / total) * 100.0).round().clamp(0.0, 100.0) as i64
}

/// Pairs every question with its submitted answer, in question order.
///
/// Rejects submissions that are not exactly one answer per question.
pub fn match_answers<'a>(
    assessment: &'a Assessment,
    submission: &'a Submission,
) -> Result<Vec<(&'a Question, &'a SubmittedAnswer)>, AppError> {
    let mut by_ref: HashMap<QuestionRef, &SubmittedAnswer> = HashMap::new();
    for answer in &submission.answers {
        if by_ref.insert(answer.question_ref(), answer).is_some() {
            return Err(AppError::BadRequest(format!(
                "Question {} ({}) answered more than once",
                answer.question_id, answer.kind
            )));
        }
    }

    let known: HashMap<QuestionRef, &Question> = assessment
        .questions
        .iter()
        .map(|q| (q.question_ref(), q))
        .collect();

    if let Some(stray) = submission
        .answers
        .iter()
        .find(|a| !known.contains_key(&a.question_ref()))
    {
        let same_id = assessment
            .questions
            .iter()
            .any(|q| q.id() == stray.question_id);
        return Err(AppError::BadRequest(if same_id {
            format!(
                "Question {} is not of type {}",
                stray.question_id, stray.kind
            )
        } else {
            format!(
                "Question {} does not belong to assessment {}",
                stray.question_id, assessment.id
            )
        }));
    }

    assessment
        .questions
        .iter()
        .map(|q| {
            by_ref
                .get(&q.question_ref())
                .map(|a| (q, *a))
                .ok_or_else(|| {
                    AppError::BadRequest(format!("Question {} has no answer entry", q.id()))
                })
        })
        .collect()
}

/// Graded form of a submission, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graded {
    pub score: i64,
    pub answers: Vec<Answer>,
}

/// Grades matched answers. Pure: open-ended results are passed in.
pub fn grade(matched: &[(&Question, &SubmittedAnswer)], open: &OpenEndedGrade) -> Graded {
    let mut correct = 0;
    let mut gradable = 0;
    let mut open_ended = 0;

    let answers = matched
        .iter()
        .map(|(question, submitted)| {
            let user_response = submitted.user_response.clone();
            match question.answer_key() {
                Some(key) => {
                    gradable += 1;
                    let is_correct = matches_key(&user_response, &key);
                    if is_correct {
                        correct += 1;
                    }
                    Answer {
                        question_id: question.id(),
                        kind: question.kind(),
                        user_response,
                        correct_value: Some(key),
                        feedback: None,
                        is_correct: Some(is_correct),
                    }
                }
                None => {
                    open_ended += 1;
                    Answer {
                        question_id: question.id(),
                        kind: question.kind(),
                        user_response,
                        correct_value: None,
                        feedback: open.feedback.get(&question.id()).cloned(),
                        is_correct: None,
                    }
                }
            }
        })
        .collect();

    Graded {
        score: compute_score(correct, gradable, open_ended, open.score),
        answers,
    }
}

/// Grades a submission and records it as the learner's one attempt.
///
/// Fails with `Conflict` when an attempt already exists for the pair; the
/// store's uniqueness check is what decides between concurrent submissions.
pub async fn submit(
    store: &dyn Store,
    grader: &dyn OpenEndedGrader,
    session: &Session,
    assessment_id: i64,
    submission: &Submission,
) -> Result<Attempt, AppError> {
    if submission.learner_id != session.learner_id {
        return Err(AppError::Forbidden(
            "Submission belongs to another learner".to_string(),
        ));
    }
    if submission.assessment_id != assessment_id {
        return Err(AppError::BadRequest(format!(
            "Submission targets assessment {}, not {}",
            submission.assessment_id, assessment_id
        )));
    }

    authorize(store, session, assessment_id).await?;

    let assessment = store
        .find_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {} not found", assessment_id)))?;

    // Skip grading work when the outcome is already known.
    if store
        .find_attempt(assessment_id, session.learner_id)
        .await?
        .is_some()
    {
        return Err(attempt_conflict(assessment_id, session.learner_id));
    }

    let matched = match_answers(&assessment, submission)?;

    let open_responses: Vec<OpenEndedResponse> = matched
        .iter()
        .filter(|(q, _)| matches!(q, Question::OpenEnded { .. }))
        .map(|(q, a)| OpenEndedResponse {
            question_id: q.id(),
            prompt: q.prompt().to_string(),
            user_response: a.user_response.clone(),
        })
        .collect();

    let open_grade = if open_responses.is_empty() {
        OpenEndedGrade::default()
    } else {
        grader.grade(&assessment, &open_responses).await?
    };

    let graded = grade(&matched, &open_grade);

    let attempt = store
        .insert_attempt(NewAttempt {
            assessment_id,
            unit_id: assessment.unit_id,
            level: assessment.level,
            learner_id: session.learner_id,
            score: graded.score,
            answers: graded.answers,
        })
        .await?;

    tracing::info!(
        "Learner {} scored {} on assessment {}",
        session.learner_id,
        attempt.score,
        assessment_id
    );

    Ok(attempt)
}
