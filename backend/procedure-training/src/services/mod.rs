use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::models::case_study::CaseStudyReport;
use crate::models::injection::{InjectionAttempt, SimulationResults, UserInput};
use crate::models::quiz::QuizSettings;
use crate::models::DifficultyLevel;

use content_service::ContentRepository;
use decision_tree_service::DecisionTreeRunner;
use outcome_service::{OutcomeAggregator, PracticeSession};
use quiz_service::AdaptiveQuizEngine;
use scoring_service::ScoringEngine;

/// Entry point that wires the engines to a content source.
///
/// Sessions it hands out are owned by the caller; the engine itself keeps
/// no per-learner state and can be shared freely.
#[derive(Clone)]
pub struct TrainingEngine {
    config: EngineConfig,
    content: Arc<dyn ContentRepository>,
    scoring: ScoringEngine,
    aggregator: OutcomeAggregator,
}

impl TrainingEngine {
    pub fn new(config: EngineConfig, content: Arc<dyn ContentRepository>) -> Self {
        let scoring = ScoringEngine::new(config.scoring.clone());
        let aggregator =
            OutcomeAggregator::new(config.scoring.clone(), config.achievements.clone());

        Self {
            config,
            content,
            scoring,
            aggregator,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn content(&self) -> &dyn ContentRepository {
        self.content.as_ref()
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn aggregator(&self) -> &OutcomeAggregator {
        &self.aggregator
    }

    pub fn start_practice(
        &self,
        region_name: &str,
        difficulty: DifficultyLevel,
        started_at: DateTime<Utc>,
    ) -> EngineResult<PracticeSession> {
        let region = self.content.anatomy_region(region_name)?;
        Ok(PracticeSession::new(
            region,
            difficulty,
            started_at,
            self.config.scoring.success_threshold,
        ))
    }

    pub fn perform_injection(
        &self,
        session: &mut PracticeSession,
        site_name: &str,
        input: UserInput,
        timestamp: DateTime<Utc>,
    ) -> EngineResult<InjectionAttempt> {
        session
            .perform(&self.scoring, site_name, input, timestamp)
            .cloned()
    }

    pub fn finalize_practice(
        &self,
        session: &mut PracticeSession,
        finished_at: DateTime<Utc>,
    ) -> SimulationResults {
        session.finalize(&self.aggregator, finished_at)
    }

    pub fn start_case_study(
        &self,
        case_id: &str,
        started_at: DateTime<Utc>,
    ) -> EngineResult<DecisionTreeRunner> {
        let tree = self.content.case_study(case_id)?;
        Ok(DecisionTreeRunner::start(
            tree,
            self.config.case_study.clone(),
            started_at,
        ))
    }

    pub fn complete_case_study(
        &self,
        runner: &DecisionTreeRunner,
        finished_at: DateTime<Utc>,
    ) -> EngineResult<CaseStudyReport> {
        runner.complete(&self.aggregator, finished_at)
    }

    /// Starts a quiz over the question bank of `settings.category`.
    pub fn start_quiz(
        &self,
        settings: QuizSettings,
        started_at: DateTime<Utc>,
    ) -> EngineResult<AdaptiveQuizEngine> {
        let bank = self.content.question_bank(&settings.category)?;
        let mut quiz = AdaptiveQuizEngine::new(settings, self.config.quiz.clone());
        quiz.start(bank.questions, started_at)?;
        Ok(quiz)
    }
}

pub mod content_service;
pub mod decision_tree_service;
pub mod outcome_service;
pub mod quiz_service;
pub mod scoring_service;
