// tests/attempt_tests.rs

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use assessment_backend::{
    attempt::{OpenEndedGrade, OpenEndedGrader, ReviewItem, ReviewView, grader::OpenEndedResponse},
    error::AppError,
    models::{
        assessment::{Assessment, QuestionSet},
        attempt::{Attempt, AttemptLookup},
        question::TruthValue,
    },
};
use async_trait::async_trait;
use common::*;

/// Replies with fixed feedback for every open-ended answer and no score.
struct FeedbackOnlyGrader;

#[async_trait]
impl OpenEndedGrader for FeedbackOnlyGrader {
    async fn grade(
        &self,
        _assessment: &Assessment,
        responses: &[OpenEndedResponse],
    ) -> Result<OpenEndedGrade, AppError> {
        Ok(OpenEndedGrade {
            score: None,
            feedback: responses
                .iter()
                .map(|r| (r.question_id, "Needs an example".to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }
}

async fn quiz_app(app: &TestApp) -> (Learner, Assessment) {
    let owner = app.learner().await;
    let learner = app.learner().await;
    let (course_id, unit_id) = app.course_with_unit(&owner);
    app.store.enroll(learner.id, course_id);

    let assessment = app
        .assessment(
            unit_id,
            vec![
                multiple_choice("Pick the second", "B"),
                multiple_choice("Pick the fourth", "D"),
                true_false("The sky is blue", TruthValue::True),
            ],
        )
        .await;

    (learner, assessment)
}

#[tokio::test]
async fn gate_reports_absent_before_first_submit() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let response = app
        .get(&format!("/api/assessments/{}/attempt", assessment.id), &learner)
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let lookup: AttemptLookup = response.json().await.unwrap();
    assert_eq!(lookup, AttemptLookup::Absent);
}

#[tokio::test]
async fn questions_are_served_without_answer_keys() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let response = app
        .get(&format!("/api/assessments/{}/questions", assessment.id), &learner)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q.get("correct").is_none()));
    assert_eq!(questions[0]["type"], "multiple_choice");
    assert_eq!(questions[2]["type"], "true_false");

    let set: QuestionSet = serde_json::from_value(body).unwrap();
    assert_eq!(set.assessment.id, assessment.id);
}

#[tokio::test]
async fn all_correct_submission_scores_100() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let payload = submission_json(&assessment, &learner, |q| {
        q.answer_key().unwrap().to_lowercase()
    });
    let response = app
        .post(
            &format!("/api/assessments/{}/attempt", assessment.id),
            &learner,
            &payload,
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let attempt: Attempt = response.json().await.unwrap();
    assert_eq!(attempt.score, 100);
    assert_eq!(attempt.learner_id, learner.id);
    assert!(attempt.answers.iter().all(|a| a.is_correct == Some(true)));

    let review: ReviewView = app
        .get(&format!("/api/assessments/{}/review", assessment.id), &learner)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(review.score, 100);
    for item in &review.items {
        let correct: Vec<_> = item.options().iter().filter(|o| o.is_correct_option).collect();
        assert_eq!(correct.len(), 1);
        assert!(correct[0].is_selected);
        assert!(item.options().iter().all(|o| !o.is_wrong_selection));
    }
}

#[tokio::test]
async fn blank_submission_scores_zero_and_selects_nothing() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let payload = submission_json(&assessment, &learner, |_| String::new());
    let response = app
        .post(
            &format!("/api/assessments/{}/attempt", assessment.id),
            &learner,
            &payload,
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let attempt: Attempt = response.json().await.unwrap();
    assert_eq!(attempt.score, 0);
    assert!(attempt.answers.iter().all(|a| a.user_response.is_empty()));

    let review: ReviewView = app
        .get(&format!("/api/assessments/{}/review", assessment.id), &learner)
        .await
        .json()
        .await
        .unwrap();
    for item in &review.items {
        assert!(item.options().iter().all(|o| !o.is_selected));
        assert_eq!(item.options().iter().filter(|o| o.is_correct_option).count(), 1);
    }
}

#[tokio::test]
async fn second_submission_is_rejected_and_first_attempt_kept() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;
    let path = format!("/api/assessments/{}/attempt", assessment.id);

    let first = submission_json(&assessment, &learner, |q| q.answer_key().unwrap());
    let response = app.post(&path, &learner, &first).await;
    assert_eq!(response.status().as_u16(), 201);

    let second = submission_json(&assessment, &learner, |_| "A".to_string());
    let response = app.post(&path, &learner, &second).await;
    assert_eq!(response.status().as_u16(), 409);

    let lookup: AttemptLookup = app.get(&path, &learner).await.json().await.unwrap();
    let stored = lookup.into_attempt().expect("attempt should be present");
    assert_eq!(stored.score, 100);
    assert_eq!(app.store.attempt_count(assessment.id, learner.id), 1);
}

#[tokio::test]
async fn concurrent_submissions_store_exactly_one_attempt() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;
    let path = format!("/api/assessments/{}/attempt", assessment.id);
    let payload = submission_json(&assessment, &learner, |q| q.answer_key().unwrap());

    let (a, b) = tokio::join!(
        app.post(&path, &learner, &payload),
        app.post(&path, &learner, &payload)
    );

    let mut statuses = [a.status().as_u16(), b.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, [201, 409]);
    assert_eq!(app.store.attempt_count(assessment.id, learner.id), 1);
}

#[tokio::test]
async fn open_ended_blank_answer_is_accepted_and_feedback_shown() {
    let app = spawn_app_with(Collaborators {
        grader: Some(Arc::new(FeedbackOnlyGrader)),
        ..Default::default()
    })
    .await;
    let owner = app.learner().await;
    let learner = app.learner().await;
    let (course_id, unit_id) = app.course_with_unit(&owner);
    app.store.enroll(learner.id, course_id);
    let assessment = app
        .assessment(
            unit_id,
            vec![
                multiple_choice("Pick A", "A"),
                open_ended("Explain ownership"),
            ],
        )
        .await;

    let payload = submission_json(&assessment, &learner, |q| match q.answer_key() {
        Some(key) => key,
        None => String::new(),
    });
    let response = app
        .post(
            &format!("/api/assessments/{}/attempt", assessment.id),
            &learner,
            &payload,
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let attempt: Attempt = response.json().await.unwrap();
    // The ungraded open-ended answer stays out of the denominator.
    assert_eq!(attempt.score, 100);

    let review: ReviewView = app
        .get(&format!("/api/assessments/{}/review", assessment.id), &learner)
        .await
        .json()
        .await
        .unwrap();
    match &review.items[1] {
        ReviewItem::OpenEnded {
            user_response,
            feedback,
            ..
        } => {
            assert_eq!(user_response, "");
            assert_eq!(feedback.as_deref(), Some("Needs an example"));
        }
        other => panic!("expected an open-ended item, got {:?}", other),
    }
}

#[tokio::test]
async fn incomplete_submission_is_rejected() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let mut payload = submission_json(&assessment, &learner, |q| q.answer_key().unwrap());
    payload["answers"].as_array_mut().unwrap().pop();

    let response = app
        .post(
            &format!("/api/assessments/{}/attempt", assessment.id),
            &learner,
            &payload,
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.store.attempt_count(assessment.id, learner.id), 0);
}

#[tokio::test]
async fn answer_without_user_response_is_rejected() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let mut payload = submission_json(&assessment, &learner, |_| String::new());
    payload["answers"][0]
        .as_object_mut()
        .unwrap()
        .remove("user_response");

    let response = app
        .post(
            &format!("/api/assessments/{}/attempt", assessment.id),
            &learner,
            &payload,
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(app.store.attempt_count(assessment.id, learner.id), 0);
}

#[tokio::test]
async fn submission_for_another_learner_is_forbidden() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;
    let other = app.learner().await;

    let payload = submission_json(&assessment, &other, |q| q.answer_key().unwrap());
    let response = app
        .post(
            &format!("/api/assessments/{}/attempt", assessment.id),
            &learner,
            &payload,
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn unenrolled_learner_is_forbidden() {
    let app = spawn_app().await;
    let (_, assessment) = quiz_app(&app).await;
    let stranger = app.learner().await;

    for path in ["attempt", "questions", "review"] {
        let response = app
            .get(
                &format!("/api/assessments/{}/{}", assessment.id, path),
                &stranger,
            )
            .await;
        assert_eq!(response.status().as_u16(), 403, "GET {}", path);
    }
}

#[tokio::test]
async fn unknown_assessment_is_not_found() {
    let app = spawn_app().await;
    let learner = app.learner().await;

    let response = app.get("/api/assessments/9999/attempt", &learner).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deleted_assessment_is_not_found_even_after_an_attempt() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;
    let path = format!("/api/assessments/{}/attempt", assessment.id);

    let payload = submission_json(&assessment, &learner, |q| q.answer_key().unwrap());
    assert_eq!(app.post(&path, &learner, &payload).await.status().as_u16(), 201);

    app.store.delete_assessment(assessment.id);
    assert_eq!(app.get(&path, &learner).await.status().as_u16(), 404);
}

#[tokio::test]
async fn review_before_any_attempt_is_not_found() {
    let app = spawn_app().await;
    let (learner, assessment) = quiz_app(&app).await;

    let response = app
        .get(&format!("/api/assessments/{}/review", assessment.id), &learner)
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/assessments/1/attempt"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(app.url("/api/attempts/me"))
        .bearer_auth("garbage")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}
