// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, Level, NewAssessment},
        attempt::{Answer, Attempt, AttemptSummary, NewAttempt},
        progress::{Progress, ProgressStatus},
        question::{Question, QuestionDraft, QuestionKind, TruthValue},
        user::User,
    },
    store::{AssessmentStore, AttemptStore, EnrollmentStore, UserStore, attempt_conflict},
};

/// Postgres-backed store. The `attempts` table carries
/// `UNIQUE (assessment_id, user_id)`, which is what makes a second submission
/// for the same pair fail.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn corrupt(what: &str, id: i64) -> AppError {
    AppError::InternalServerError(format!("Corrupt {} row {}", what, id))
}

#[derive(FromRow)]
struct AssessmentRow {
    id: i64,
    unit_id: i64,
    course_id: i64,
    name: String,
    description: Option<String>,
    level: i16,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    kind: String,
    prompt: String,
    options: Option<Json<BTreeMap<String, String>>>,
    correct: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let kind = QuestionKind::parse(&row.kind).ok_or_else(|| corrupt("question", row.id))?;
        let question = match kind {
            QuestionKind::MultipleChoice => Question::MultipleChoice {
                id: row.id,
                prompt: row.prompt,
                options: row.options.map(|o| o.0).unwrap_or_default(),
                correct: row.correct.ok_or_else(|| corrupt("question", row.id))?,
            },
            QuestionKind::TrueFalse => Question::TrueFalse {
                id: row.id,
                prompt: row.prompt,
                correct: row
                    .correct
                    .as_deref()
                    .and_then(TruthValue::from_label)
                    .ok_or_else(|| corrupt("question", row.id))?,
            },
            QuestionKind::OpenEnded => Question::OpenEnded {
                id: row.id,
                prompt: row.prompt,
            },
        };
        Ok(question)
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    assessment_id: i64,
    user_id: i64,
    score: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(FromRow)]
struct AttemptSummaryRow {
    id: i64,
    assessment_id: i64,
    assessment_name: String,
    unit_id: i64,
    level: i16,
    score: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<AttemptSummaryRow> for AttemptSummary {
    type Error = AppError;

    fn try_from(row: AttemptSummaryRow) -> Result<Self, Self::Error> {
        Ok(AttemptSummary {
            id: row.id,
            assessment_id: row.assessment_id,
            assessment_name: row.assessment_name,
            unit_id: row.unit_id,
            level: Level::from_i16(row.level).ok_or_else(|| corrupt("attempt", row.id))?,
            score: row.score,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AnswerRow {
    question_id: i64,
    kind: String,
    user_response: String,
    correct_value: Option<String>,
    feedback: Option<String>,
    is_correct: Option<bool>,
}

impl TryFrom<AnswerRow> for Answer {
    type Error = AppError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        Ok(Answer {
            question_id: row.question_id,
            kind: QuestionKind::parse(&row.kind).ok_or_else(|| corrupt("answer", row.question_id))?,
            user_response: row.user_response,
            correct_value: row.correct_value,
            feedback: row.feedback,
            is_correct: row.is_correct,
        })
    }
}

#[derive(FromRow)]
struct ProgressRow {
    user_id: i64,
    unit_id: i64,
    current_level: i16,
    best_score: i64,
    attempts: i64,
    status: String,
    last_attempt_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ProgressRow> for Progress {
    type Error = AppError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(Progress {
            learner_id: row.user_id,
            unit_id: row.unit_id,
            current_level: Level::from_i16(row.current_level)
                .ok_or_else(|| corrupt("progress", row.unit_id))?,
            best_score: row.best_score,
            attempts: row.attempts,
            status: ProgressStatus::parse(&row.status)
                .ok_or_else(|| corrupt("progress", row.unit_id))?,
            last_attempt_at: row.last_attempt_at,
        })
    }
}

const SELECT_PROGRESS: &str = r#"
    SELECT user_id, unit_id, current_level, best_score, attempts, status, last_attempt_at
    FROM progress
    WHERE user_id = $1 AND unit_id = $2
"#;

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl EnrollmentStore for PgStore {
    async fn can_view_assessment(
        &self,
        learner_id: i64,
        assessment_id: i64,
    ) -> Result<bool, AppError> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM assessments a
                JOIN units u ON u.id = a.unit_id
                JOIN courses c ON c.id = u.course_id
                WHERE a.id = $1
                  AND (c.owner_id = $2
                       OR EXISTS (SELECT 1 FROM enrollments e
                                  WHERE e.course_id = c.id AND e.user_id = $2))
            )
            "#,
        )
        .bind(assessment_id)
        .bind(learner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }

    async fn can_manage_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM units u JOIN courses c ON c.id = u.course_id
                WHERE u.id = $1 AND c.owner_id = $2
            )
            "#,
        )
        .bind(unit_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }

    async fn can_view_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM units u JOIN courses c ON c.id = u.course_id
                WHERE u.id = $1
                  AND (c.owner_id = $2
                       OR EXISTS (SELECT 1 FROM enrollments e
                                  WHERE e.course_id = c.id AND e.user_id = $2))
            )
            "#,
        )
        .bind(unit_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }

    async fn unit_exists(&self, unit_id: i64) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM units WHERE id = $1)")
                .bind(unit_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn material_count(&self, unit_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM materials WHERE unit_id = $1")
            .bind(unit_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<Assessment>, AppError> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT a.id, a.unit_id, u.course_id, a.name, a.description, a.level, a.created_at
            FROM assessments a
            JOIN units u ON u.id = a.unit_id
            WHERE a.id = $1
            "#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, kind, prompt, options, correct
            FROM questions
            WHERE assessment_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Question::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Assessment {
            id: row.id,
            unit_id: row.unit_id,
            course_id: row.course_id,
            name: row.name,
            description: row.description,
            level: Level::from_i16(row.level).ok_or_else(|| corrupt("assessment", row.id))?,
            questions,
            created_at: row.created_at,
        }))
    }

    async fn insert_assessment(&self, new: NewAssessment) -> Result<Assessment, AppError> {
        let mut tx = self.pool.begin().await?;

        let course_id = sqlx::query_scalar::<_, i64>("SELECT course_id FROM units WHERE id = $1")
            .bind(new.unit_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unit {} not found", new.unit_id)))?;

        let (assessment_id, created_at) =
            sqlx::query_as::<_, (i64, Option<chrono::DateTime<chrono::Utc>>)>(
                r#"
                INSERT INTO assessments (unit_id, name, description, level)
                VALUES ($1, $2, $3, $4)
                RETURNING id, created_at
                "#,
            )
            .bind(new.unit_id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.level.as_i16())
            .fetch_one(&mut *tx)
            .await?;

        let mut questions = Vec::with_capacity(new.questions.len());
        for (position, draft) in new.questions.into_iter().enumerate() {
            let (options, correct) = match &draft {
                QuestionDraft::MultipleChoice {
                    options, correct, ..
                } => (Some(Json(options.clone())), Some(correct.clone())),
                QuestionDraft::TrueFalse { correct, .. } => (None, Some(correct.label().to_string())),
                QuestionDraft::OpenEnded { .. } => (None, None),
            };

            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO questions (assessment_id, position, kind, prompt, options, correct)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(assessment_id)
            .bind(position as i32)
            .bind(draft.kind().as_str())
            .bind(draft.prompt())
            .bind(options)
            .bind(correct)
            .fetch_one(&mut *tx)
            .await?;

            questions.push(Question::from_draft(id, draft));
        }

        tx.commit().await?;

        Ok(Assessment {
            id: assessment_id,
            unit_id: new.unit_id,
            course_id,
            name: new.name,
            description: new.description,
            level: new.level,
            questions,
            created_at,
        })
    }
}

impl PgStore {
    async fn load_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError> {
        sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT question_id, kind, user_response, correct_value, feedback, is_correct
            FROM attempt_answers
            WHERE attempt_id = $1
            ORDER BY position
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Answer::try_from)
        .collect()
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn find_attempt(
        &self,
        assessment_id: i64,
        learner_id: i64,
    ) -> Result<Option<Attempt>, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT id, assessment_id, user_id, score, created_at
            FROM attempts
            WHERE assessment_id = $1 AND user_id = $2
            "#,
        )
        .bind(assessment_id)
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let answers = self.load_answers(row.id).await?;
        Ok(Some(Attempt {
            id: row.id,
            assessment_id: row.assessment_id,
            learner_id: row.user_id,
            score: row.score,
            created_at: row.created_at,
            answers,
        }))
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt, AppError> {
        let mut tx = self.pool.begin().await?;

        // The unique constraint decides the winner; a losing insert returns no row.
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO attempts (assessment_id, user_id, score, level)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (assessment_id, user_id) DO NOTHING
            RETURNING id, assessment_id, user_id, score, created_at
            "#,
        )
        .bind(new.assessment_id)
        .bind(new.learner_id)
        .bind(new.score)
        .bind(new.level.as_i16())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(attempt_conflict(new.assessment_id, new.learner_id));
        };

        for (position, answer) in new.answers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO attempt_answers
                    (attempt_id, position, question_id, kind, user_response,
                     correct_value, feedback, is_correct)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(answer.question_id)
            .bind(answer.kind.as_str())
            .bind(&answer.user_response)
            .bind(&answer.correct_value)
            .bind(&answer.feedback)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        // Make sure the row exists so FOR UPDATE below has something to lock.
        // A concurrent first attempt on the same unit waits here until we commit.
        sqlx::query(
            r#"
            INSERT INTO progress (user_id, unit_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, unit_id) DO NOTHING
            "#,
        )
        .bind(new.learner_id)
        .bind(new.unit_id)
        .execute(&mut *tx)
        .await?;

        let previous = sqlx::query_as::<_, ProgressRow>(&format!("{} FOR UPDATE", SELECT_PROGRESS))
            .bind(new.learner_id)
            .bind(new.unit_id)
            .fetch_one(&mut *tx)
            .await?;

        // A freshly seeded row carries no attempts yet.
        let previous = match previous.attempts {
            0 => None,
            _ => Some(Progress::try_from(previous)?),
        };

        let progress = Progress::record(
            previous.as_ref(),
            new.learner_id,
            new.unit_id,
            new.level,
            new.score,
            row.created_at,
        );

        sqlx::query(
            r#"
            UPDATE progress
            SET current_level = $3,
                best_score = $4,
                attempts = $5,
                status = $6,
                last_attempt_at = $7
            WHERE user_id = $1 AND unit_id = $2
            "#,
        )
        .bind(progress.learner_id)
        .bind(progress.unit_id)
        .bind(progress.current_level.as_i16())
        .bind(progress.best_score)
        .bind(progress.attempts)
        .bind(progress.status.as_str())
        .bind(progress.last_attempt_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Attempt {
            id: row.id,
            assessment_id: row.assessment_id,
            learner_id: row.user_id,
            score: row.score,
            created_at: row.created_at,
            answers: new.answers,
        })
    }

    async fn list_attempts(&self, learner_id: i64) -> Result<Vec<AttemptSummary>, AppError> {
        sqlx::query_as::<_, AttemptSummaryRow>(
            r#"
            SELECT
                t.id, t.assessment_id, a.name AS assessment_name, a.unit_id,
                t.level, t.score, t.created_at
            FROM attempts t
            JOIN assessments a ON a.id = t.assessment_id
            WHERE t.user_id = $1
            ORDER BY t.created_at DESC, t.id DESC
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttemptSummary::try_from)
        .collect()
    }

    async fn find_progress(
        &self,
        learner_id: i64,
        unit_id: i64,
    ) -> Result<Option<Progress>, AppError> {
        sqlx::query_as::<_, ProgressRow>(SELECT_PROGRESS)
            .bind(learner_id)
            .bind(unit_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Progress::try_from)
            .transpose()
    }
}
