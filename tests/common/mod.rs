// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use assessment_backend::{
    attempt::OpenEndedGrader,
    config::Config,
    generation::AssessmentGenerator,
    models::{
        assessment::{Assessment, Level, NewAssessment},
        question::{QuestionDraft, TruthValue},
    },
    routes,
    state::AppState,
    store::{AssessmentStore, DynStore, MemoryStore, PgStore, UserStore},
    utils::jwt::sign_jwt,
};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

#[derive(Default)]
pub struct Collaborators {
    pub grader: Option<Arc<dyn OpenEndedGrader>>,
    pub generator: Option<Arc<dyn AssessmentGenerator>>,
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Collaborators::default()).await
}

pub async fn spawn_app_with(collaborators: Collaborators) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: DynStore = store.clone();

    let mut state = AppState::new(dyn_store, Config::for_tests(JWT_SECRET));
    if let Some(grader) = collaborators.grader {
        state = state.with_grader(grader);
    }
    if let Some(generator) = collaborators.generator {
        state = state.with_generator(generator);
    }

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

/// Same app on `PgStore`, for when `DATABASE_URL` points at a scratch database.
pub struct PgTestApp {
    pub address: String,
    pub store: PgStore,
    pub client: reqwest::Client,
}

/// Spawns the app against Postgres. `None` (test skipped) when `DATABASE_URL` is unset.
pub async fn spawn_pg_app() -> Option<PgTestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let store = PgStore::new(pool);
    let dyn_store: DynStore = Arc::new(store.clone());
    let app = routes::create_router(AppState::new(dyn_store, Config::for_tests(JWT_SECRET)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(PgTestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    })
}

impl PgTestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn learner(&self) -> Learner {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let user = self
            .store
            .create_user(&username, "not-a-real-hash")
            .await
            .expect("Failed to create user");
        let token = sign_jwt(user.id, "user", JWT_SECRET, 600).unwrap();
        Learner { id: user.id, token }
    }

    /// Course owned by `owner` with one unit; returns (course_id, unit_id).
    pub async fn course_with_unit(&self, owner: &Learner) -> (i64, i64) {
        let course_id: i64 = sqlx::query_scalar(
            "INSERT INTO courses (name, owner_id) VALUES ('Course', $1) RETURNING id",
        )
        .bind(owner.id)
        .fetch_one(self.store.pool())
        .await
        .expect("Failed to insert course");

        let unit_id: i64 = sqlx::query_scalar(
            "INSERT INTO units (course_id, name) VALUES ($1, 'Unit') RETURNING id",
        )
        .bind(course_id)
        .fetch_one(self.store.pool())
        .await
        .expect("Failed to insert unit");

        (course_id, unit_id)
    }

    pub async fn enroll(&self, learner: &Learner, course_id: i64) {
        sqlx::query("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2)")
            .bind(learner.id)
            .bind(course_id)
            .execute(self.store.pool())
            .await
            .expect("Failed to enroll");
    }

    pub async fn assessment(&self, unit_id: i64, questions: Vec<QuestionDraft>) -> Assessment {
        self.store
            .insert_assessment(NewAssessment {
                unit_id,
                name: "Unit quiz".to_string(),
                description: None,
                level: Level::Easy,
                questions,
            })
            .await
            .expect("Failed to insert assessment")
    }

    pub async fn attempt_count(&self, assessment_id: i64, learner_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE assessment_id = $1 AND user_id = $2")
            .bind(assessment_id)
            .bind(learner_id)
            .fetch_one(self.store.pool())
            .await
            .expect("Failed to count attempts")
    }

    pub async fn post(
        &self,
        path: &str,
        learner: &Learner,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&learner.token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, learner: &Learner) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&learner.token)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// A registered learner with a signed token.
pub struct Learner {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn learner(&self) -> Learner {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let user = self
            .store
            .create_user(&username, "not-a-real-hash")
            .await
            .expect("Failed to create user");
        let token = sign_jwt(user.id, "user", JWT_SECRET, 600).unwrap();
        Learner { id: user.id, token }
    }

    /// Course owned by `owner` with one unit; returns (course_id, unit_id).
    pub fn course_with_unit(&self, owner: &Learner) -> (i64, i64) {
        let course_id = self.store.create_course(owner.id);
        let unit_id = self.store.create_unit(course_id);
        (course_id, unit_id)
    }

    pub async fn assessment(&self, unit_id: i64, questions: Vec<QuestionDraft>) -> Assessment {
        self.store
            .insert_assessment(NewAssessment {
                unit_id,
                name: "Unit quiz".to_string(),
                description: None,
                level: Level::Easy,
                questions,
            })
            .await
            .expect("Failed to insert assessment")
    }

    pub async fn get(&self, path: &str, learner: &Learner) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&learner.token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(
        &self,
        path: &str,
        learner: &Learner,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&learner.token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn multiple_choice(prompt: &str, correct: &str) -> QuestionDraft {
    QuestionDraft::MultipleChoice {
        prompt: prompt.to_string(),
        options: BTreeMap::from([
            ("A".to_string(), "first".to_string()),
            ("B".to_string(), "second".to_string()),
            ("C".to_string(), "third".to_string()),
            ("D".to_string(), "fourth".to_string()),
        ]),
        correct: correct.to_string(),
    }
}

pub fn true_false(prompt: &str, correct: TruthValue) -> QuestionDraft {
    QuestionDraft::TrueFalse {
        prompt: prompt.to_string(),
        correct,
    }
}

pub fn open_ended(prompt: &str) -> QuestionDraft {
    QuestionDraft::OpenEnded {
        prompt: prompt.to_string(),
    }
}

/// Submission payload answering every question of `assessment` with `pick`.
pub fn submission_json(
    assessment: &Assessment,
    learner: &Learner,
    pick: impl Fn(&assessment_backend::models::question::Question) -> String,
) -> serde_json::Value {
    let answers: Vec<serde_json::Value> = assessment
        .questions
        .iter()
        .map(|q| {
            serde_json::json!({
                "question_id": q.id(),
                "type": q.kind(),
                "prompt": q.prompt(),
                "user_response": pick(q),
            })
        })
        .collect();

    serde_json::json!({
        "assessment_id": assessment.id,
        "learner_id": learner.id,
        "answers": answers,
    })
}
