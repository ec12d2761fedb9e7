// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    attempt::{OpenEndedGrader, UngradedOpenEnded},
    config::Config,
    generation::AssessmentGenerator,
    store::DynStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Config,
    pub grader: Arc<dyn OpenEndedGrader>,
    /// `None` when no generation service is configured.
    pub generator: Option<Arc<dyn AssessmentGenerator>>,
}

impl AppState {
    /// State without external collaborators: open-ended answers stay ungraded
    /// and generation is disabled.
    pub fn new(store: DynStore, config: Config) -> Self {
        Self {
            store,
            config,
            grader: Arc::new(UngradedOpenEnded),
            generator: None,
        }
    }

    pub fn with_grader(mut self, grader: Arc<dyn OpenEndedGrader>) -> Self {
        self.grader = grader;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn AssessmentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
