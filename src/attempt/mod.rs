// src/attempt/mod.rs

//! The assessment attempt lifecycle: deciding whether a learner may start,
//! loading the questions, collecting answers, grading exactly once and
//! rebuilding the correctness view afterwards.

pub mod collector;
pub mod gate;
pub mod grader;
pub mod loader;
pub mod review;
pub mod scorer;

pub use collector::{Responses, build_submission};
pub use gate::check_attempt;
pub use grader::{HttpOpenEndedGrader, OpenEndedGrade, OpenEndedGrader, UngradedOpenEnded};
pub use loader::load_questions;
pub use review::{ReviewItem, ReviewView, reconcile};
pub use scorer::submit;
