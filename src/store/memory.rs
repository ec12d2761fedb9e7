// src/store/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, Level, NewAssessment},
        attempt::{Attempt, AttemptSummary, NewAttempt},
        progress::Progress,
        question::Question,
        user::User,
    },
    store::{AssessmentStore, AttemptStore, EnrollmentStore, UserStore, attempt_conflict},
};

struct Course {
    owner_id: i64,
}

struct Unit {
    course_id: i64,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    users: HashMap<i64, User>,
    courses: HashMap<i64, Course>,
    enrollments: HashSet<(i64, i64)>,
    units: HashMap<i64, Unit>,
    materials: HashMap<i64, i64>,
    assessments: BTreeMap<i64, Assessment>,
    attempts: HashMap<(i64, i64), Attempt>,
    /// Assessment level at attempt time, by attempt id.
    attempt_levels: HashMap<i64, Level>,
    progress: HashMap<(i64, i64), Progress>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn can_view_course(&self, user_id: i64, course_id: i64) -> bool {
        let owns = self
            .courses
            .get(&course_id)
            .is_some_and(|c| c.owner_id == user_id);
        owns || self.enrollments.contains(&(user_id, course_id))
    }
}

/// Process-local store. Backs the test suite and runs the server when no
/// `DATABASE_URL` is configured.
///
/// The attempt map is keyed by (assessment, learner) and written under the
/// same lock that checks it, which gives the at-most-one-attempt guarantee.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates a course owned by `owner_id` and returns its id.
    pub fn create_course(&self, owner_id: i64) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.courses.insert(id, Course { owner_id });
        id
    }

    pub fn create_unit(&self, course_id: i64) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.units.insert(id, Unit { course_id });
        id
    }

    pub fn enroll(&self, user_id: i64, course_id: i64) {
        self.lock().enrollments.insert((user_id, course_id));
    }

    pub fn add_material(&self, unit_id: i64) {
        *self.lock().materials.entry(unit_id).or_insert(0) += 1;
    }

    /// Drops an assessment and, with it, every attempt on it.
    pub fn delete_assessment(&self, assessment_id: i64) {
        let mut inner = self.lock();
        inner.assessments.remove(&assessment_id);
        inner.attempts.retain(|(a, _), _| *a != assessment_id);
    }

    /// Number of stored attempts for the pair. Used by tests to check the uniqueness invariant.
    pub fn attempt_count(&self, assessment_id: i64, learner_id: i64) -> usize {
        self.lock()
            .attempts
            .keys()
            .filter(|key| **key == (assessment_id, learner_id))
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        let id = inner.next_id();
        let user = User {
            id,
            username: username.to_string(),
            password: password_hash.to_string(),
            role: "user".to_string(),
            created_at: Some(chrono::Utc::now()),
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn can_view_assessment(
        &self,
        learner_id: i64,
        assessment_id: i64,
    ) -> Result<bool, AppError> {
        let inner = self.lock();
        Ok(inner
            .assessments
            .get(&assessment_id)
            .is_some_and(|a| inner.can_view_course(learner_id, a.course_id)))
    }

    async fn can_manage_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError> {
        let inner = self.lock();
        Ok(inner
            .units
            .get(&unit_id)
            .and_then(|u| inner.courses.get(&u.course_id))
            .is_some_and(|c| c.owner_id == user_id))
    }

    async fn can_view_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError> {
        let inner = self.lock();
        Ok(inner
            .units
            .get(&unit_id)
            .is_some_and(|u| inner.can_view_course(user_id, u.course_id)))
    }

    async fn unit_exists(&self, unit_id: i64) -> Result<bool, AppError> {
        Ok(self.lock().units.contains_key(&unit_id))
    }

    async fn material_count(&self, unit_id: i64) -> Result<i64, AppError> {
        Ok(self.lock().materials.get(&unit_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<Assessment>, AppError> {
        Ok(self.lock().assessments.get(&assessment_id).cloned())
    }

    async fn insert_assessment(&self, new: NewAssessment) -> Result<Assessment, AppError> {
        let mut inner = self.lock();
        let course_id = inner
            .units
            .get(&new.unit_id)
            .map(|u| u.course_id)
            .ok_or_else(|| AppError::NotFound(format!("Unit {} not found", new.unit_id)))?;

        let id = inner.next_id();
        let questions = new
            .questions
            .into_iter()
            .map(|draft| {
                let question_id = inner.next_id();
                Question::from_draft(question_id, draft)
            })
            .collect();

        let assessment = Assessment {
            id,
            unit_id: new.unit_id,
            course_id,
            name: new.name,
            description: new.description,
            level: new.level,
            questions,
            created_at: Some(chrono::Utc::now()),
        };
        inner.assessments.insert(id, assessment.clone());
        Ok(assessment)
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn find_attempt(
        &self,
        assessment_id: i64,
        learner_id: i64,
    ) -> Result<Option<Attempt>, AppError> {
        Ok(self
            .lock()
            .attempts
            .get(&(assessment_id, learner_id))
            .cloned())
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt, AppError> {
        let mut inner = self.lock();
        let key = (new.assessment_id, new.learner_id);
        if inner.attempts.contains_key(&key) {
            return Err(attempt_conflict(new.assessment_id, new.learner_id));
        }

        let now = chrono::Utc::now();
        let attempt = Attempt {
            id: inner.next_id(),
            assessment_id: new.assessment_id,
            learner_id: new.learner_id,
            score: new.score,
            created_at: now,
            answers: new.answers,
        };
        inner.attempts.insert(key, attempt.clone());
        inner.attempt_levels.insert(attempt.id, new.level);

        let progress_key = (new.learner_id, new.unit_id);
        let progress = Progress::record(
            inner.progress.get(&progress_key),
            new.learner_id,
            new.unit_id,
            new.level,
            new.score,
            now,
        );
        inner.progress.insert(progress_key, progress);

        Ok(attempt)
    }

    async fn list_attempts(&self, learner_id: i64) -> Result<Vec<AttemptSummary>, AppError> {
        let inner = self.lock();
        let mut list: Vec<AttemptSummary> = inner
            .attempts
            .values()
            .filter(|a| a.learner_id == learner_id)
            .filter_map(|a| {
                let assessment = inner.assessments.get(&a.assessment_id)?;
                Some(AttemptSummary {
                    id: a.id,
                    assessment_id: a.assessment_id,
                    assessment_name: assessment.name.clone(),
                    unit_id: assessment.unit_id,
                    level: inner
                        .attempt_levels
                        .get(&a.id)
                        .copied()
                        .unwrap_or(assessment.level),
                    score: a.score,
                    created_at: a.created_at,
                })
            })
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn find_progress(
        &self,
        learner_id: i64,
        unit_id: i64,
    ) -> Result<Option<Progress>, AppError> {
        Ok(self.lock().progress.get(&(learner_id, unit_id)).cloned())
    }
}
