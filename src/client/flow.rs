// src/client/flow.rs

use std::sync::Arc;

use crate::{
    attempt::{Responses, ReviewView, build_submission, reconcile},
    client::{AssessmentApi, ClientError, ClientSession},
    models::{assessment::QuestionSet, attempt::AttemptLookup},
};

/// Where a learner stands on one assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// No attempt yet; the questions are loaded.
    Unattempted { questions: QuestionSet },
    /// A submission is in flight. Not re-entrant.
    Submitting { questions: QuestionSet },
    /// Terminal.
    Graded { review: ReviewView },
}

/// Drives one learner through one assessment:
/// `Unattempted -> Submitting -> Graded`, back to `Unattempted` on failure.
pub struct AttemptFlow {
    api: Arc<dyn AssessmentApi>,
    session: ClientSession,
    assessment_id: i64,
    state: FlowState,
}

impl AttemptFlow {
    /// Asks the gate first. An existing attempt goes straight to its review
    /// without loading the questions for taking.
    pub async fn open(
        api: Arc<dyn AssessmentApi>,
        session: ClientSession,
        assessment_id: i64,
    ) -> Result<Self, ClientError> {
        let state = match api.check_attempt(&session, assessment_id).await? {
            AttemptLookup::Present(_) => FlowState::Graded {
                review: api.review(&session, assessment_id).await?,
            },
            AttemptLookup::Absent => FlowState::Unattempted {
                questions: api.load_questions(&session, assessment_id).await?,
            },
        };

        Ok(Self {
            api,
            session,
            assessment_id,
            state,
        })
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn assessment_id(&self) -> i64 {
        self.assessment_id
    }

    /// True while a submission is outstanding; the submit control should be disabled.
    ///
    /// `submit` takes `&mut self`, so a second call cannot overlap a running one.
    /// The flow only stays busy when a `submit` future was dropped mid-flight;
    /// `refresh` settles it.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, FlowState::Submitting { .. })
    }

    pub fn questions(&self) -> Option<&QuestionSet> {
        match &self.state {
            FlowState::Unattempted { questions } | FlowState::Submitting { questions } => {
                Some(questions)
            }
            FlowState::Graded { .. } => None,
        }
    }

    pub fn review(&self) -> Option<&ReviewView> {
        match &self.state {
            FlowState::Graded { review } => Some(review),
            _ => None,
        }
    }

    /// Submits the responses once.
    ///
    /// A `Conflict` means another submission won: the gate is re-queried and
    /// the flow moves to the stored attempt. Any other failure returns the
    /// flow to `Unattempted` and is handed back to the caller.
    pub async fn submit(&mut self, responses: &Responses) -> Result<ReviewView, ClientError> {
        let questions = match &self.state {
            FlowState::Unattempted { questions } => questions.clone(),
            FlowState::Submitting { .. } => return Err(ClientError::Busy),
            FlowState::Graded { .. } => return Err(ClientError::AlreadyGraded),
        };

        self.state = FlowState::Submitting {
            questions: questions.clone(),
        };

        let submission = build_submission(self.session.learner_id, &questions, responses);
        match self.api.submit(&self.session, &submission).await {
            Ok(attempt) => {
                let review = reconcile(&questions, &attempt);
                self.state = FlowState::Graded {
                    review: review.clone(),
                };
                Ok(review)
            }
            Err(ClientError::Conflict(message)) => {
                tracing::info!(
                    "Assessment {} already attempted, switching to review",
                    self.assessment_id
                );
                self.state = FlowState::Unattempted { questions };
                match self.refresh().await? {
                    FlowState::Graded { review } => Ok(review.clone()),
                    _ => Err(ClientError::Conflict(message)),
                }
            }
            Err(err) => {
                self.state = FlowState::Unattempted { questions };
                Err(err)
            }
        }
    }

    /// Re-checks attempt existence, e.g. after a submission timed out.
    ///
    /// Moves to `Graded` if the server has the attempt; otherwise leaves the
    /// flow ready for another deliberate submit.
    pub async fn refresh(&mut self) -> Result<&FlowState, ClientError> {
        if matches!(self.state, FlowState::Graded { .. }) {
            return Ok(&self.state);
        }

        match self
            .api
            .check_attempt(&self.session, self.assessment_id)
            .await?
        {
            AttemptLookup::Present(_) => {
                let review = self.api.review(&self.session, self.assessment_id).await?;
                self.state = FlowState::Graded { review };
            }
            AttemptLookup::Absent => {
                if let FlowState::Submitting { questions } = &self.state {
                    self.state = FlowState::Unattempted {
                        questions: questions.clone(),
                    };
                }
            }
        }

        Ok(&self.state)
    }
}
