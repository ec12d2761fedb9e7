// src/models/progress.rs

use serde::{Deserialize, Serialize};

use crate::config::PASSING_SCORE_PERCENTAGE;
use crate::models::assessment::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Passed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Passed => "passed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "in_progress" => Some(ProgressStatus::InProgress),
            "passed" => Some(ProgressStatus::Passed),
            _ => None,
        }
    }
}

/// A learner's standing in one unit, updated with every graded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub learner_id: i64,
    pub unit_id: i64,
    pub current_level: Level,
    pub best_score: i64,
    pub attempts: i64,
    pub status: ProgressStatus,
    pub last_attempt_at: chrono::DateTime<chrono::Utc>,
}

impl Progress {
    /// Folds one graded attempt into the previous standing.
    ///
    /// Passing an assessment at the learner's current level moves them one level up.
    pub fn record(
        previous: Option<&Progress>,
        learner_id: i64,
        unit_id: i64,
        level: Level,
        score: i64,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Progress {
        let passed = score >= PASSING_SCORE_PERCENTAGE;
        let (current_level, best_score, attempts) = match previous {
            Some(p) => (p.current_level, p.best_score.max(score), p.attempts + 1),
            None => (Level::Easy, score, 1),
        };

        let current_level = if passed && level == current_level {
            current_level.next()
        } else {
            current_level
        };

        let status = if best_score >= PASSING_SCORE_PERCENTAGE {
            ProgressStatus::Passed
        } else {
            ProgressStatus::InProgress
        };

        Progress {
            learner_id,
            unit_id,
            current_level,
            best_score,
            attempts,
            status,
            last_attempt_at: at,
        }
    }
}
