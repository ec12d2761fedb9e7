// tests/postgres_tests.rs
//
// Run against a scratch database: DATABASE_URL=postgres://... cargo test
// Every test returns early when DATABASE_URL is unset.

mod common;

use assessment_backend::{
    models::{
        assessment::Level,
        attempt::{Answer, AttemptLookup, NewAttempt},
        progress::ProgressStatus,
        question::{QuestionKind, TruthValue},
    },
    store::{AttemptStore, EnrollmentStore},
};
use common::*;

#[tokio::test]
async fn pg_concurrent_submissions_store_exactly_one_attempt() {
    let Some(app) = spawn_pg_app().await else {
        return;
    };
    let owner = app.learner().await;
    let learner = app.learner().await;
    let (course_id, unit_id) = app.course_with_unit(&owner).await;
    app.enroll(&learner, course_id).await;
    let assessment = app
        .assessment(
            unit_id,
            vec![
                multiple_choice("Pick B", "B"),
                true_false("Yes?", TruthValue::True),
            ],
        )
        .await;

    let path = format!("/api/assessments/{}/attempt", assessment.id);
    let payload = submission_json(&assessment, &learner, |q| q.answer_key().unwrap());

    let (a, b) = tokio::join!(
        app.post(&path, &learner, &payload),
        app.post(&path, &learner, &payload)
    );

    let mut statuses = [a.status().as_u16(), b.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, [201, 409]);
    assert_eq!(app.attempt_count(assessment.id, learner.id).await, 1);
}

#[tokio::test]
async fn pg_second_submission_conflicts_and_first_attempt_kept() {
    let Some(app) = spawn_pg_app().await else {
        return;
    };
    let owner = app.learner().await;
    let learner = app.learner().await;
    let (course_id, unit_id) = app.course_with_unit(&owner).await;
    app.enroll(&learner, course_id).await;
    let assessment = app
        .assessment(unit_id, vec![multiple_choice("Pick C", "C")])
        .await;
    let path = format!("/api/assessments/{}/attempt", assessment.id);

    let first = submission_json(&assessment, &learner, |_| "c".to_string());
    assert_eq!(app.post(&path, &learner, &first).await.status().as_u16(), 201);

    let second = submission_json(&assessment, &learner, |_| "A".to_string());
    assert_eq!(app.post(&path, &learner, &second).await.status().as_u16(), 409);

    let lookup: AttemptLookup = app.get(&path, &learner).await.json().await.unwrap();
    let stored = lookup.into_attempt().expect("attempt should be present");
    assert_eq!(stored.score, 100);
    assert_eq!(stored.answers[0].user_response, "c");
    assert_eq!(app.attempt_count(assessment.id, learner.id).await, 1);
}

#[tokio::test]
async fn pg_answers_round_trip_through_find_attempt() {
    let Some(app) = spawn_pg_app().await else {
        return;
    };
    let owner = app.learner().await;
    let learner = app.learner().await;
    let (course_id, unit_id) = app.course_with_unit(&owner).await;
    app.enroll(&learner, course_id).await;
    let assessment = app
        .assessment(
            unit_id,
            vec![
                multiple_choice("Pick A", "A"),
                true_false("No?", TruthValue::False),
                open_ended("Explain"),
            ],
        )
        .await;
    assert!(
        app.store
            .can_view_assessment(learner.id, assessment.id)
            .await
            .unwrap()
    );

    let ids: Vec<i64> = assessment.questions.iter().map(|q| q.id()).collect();
    let answers = vec![
        Answer {
            question_id: ids[0],
            kind: QuestionKind::MultipleChoice,
            user_response: "a".to_string(),
            correct_value: Some("A".to_string()),
            feedback: None,
            is_correct: Some(true),
        },
        Answer {
            question_id: ids[1],
            kind: QuestionKind::TrueFalse,
            user_response: "V".to_string(),
            correct_value: Some("F".to_string()),
            feedback: None,
            is_correct: Some(false),
        },
        Answer {
            question_id: ids[2],
            kind: QuestionKind::OpenEnded,
            user_response: String::new(),
            correct_value: None,
            feedback: Some("Write something next time".to_string()),
            is_correct: None,
        },
    ];

    let inserted = app
        .store
        .insert_attempt(NewAttempt {
            assessment_id: assessment.id,
            unit_id,
            level: Level::Medium,
            learner_id: learner.id,
            score: 50,
            answers: answers.clone(),
        })
        .await
        .unwrap();

    let found = app
        .store
        .find_attempt(assessment.id, learner.id)
        .await
        .unwrap()
        .expect("attempt should be stored");
    assert_eq!(found, inserted);
    assert_eq!(found.answers, answers);

    let history = app.store.list_attempts(learner.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].level, Level::Medium);
    assert_eq!(history[0].score, 50);
}

#[tokio::test]
async fn pg_concurrent_first_attempts_fold_into_progress() {
    let Some(app) = spawn_pg_app().await else {
        return;
    };
    let owner = app.learner().await;

    for round in 0..10 {
        let learner = app.learner().await;
        let (course_id, unit_id) = app.course_with_unit(&owner).await;
        app.enroll(&learner, course_id).await;
        let first = app.assessment(unit_id, vec![open_ended("One")]).await;
        let second = app.assessment(unit_id, vec![open_ended("Two")]).await;

        let attempt = |assessment_id: i64, score: i64| NewAttempt {
            assessment_id,
            unit_id,
            level: Level::Easy,
            learner_id: learner.id,
            score,
            answers: Vec::new(),
        };

        let (a, b) = tokio::join!(
            app.store.insert_attempt(attempt(first.id, 90)),
            app.store.insert_attempt(attempt(second.id, 10))
        );
        a.unwrap();
        b.unwrap();

        let progress = app
            .store
            .find_progress(learner.id, unit_id)
            .await
            .unwrap()
            .expect("progress should exist");
        assert_eq!(progress.attempts, 2, "round {}", round);
        assert_eq!(progress.best_score, 90, "round {}", round);
        assert_eq!(progress.status, ProgressStatus::Passed, "round {}", round);
        assert_eq!(progress.current_level, Level::Medium, "round {}", round);
    }
}
