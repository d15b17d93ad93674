//! Scoring and adaptive-assessment engines for procedure training:
//! injection-technique scoring, practice-session outcomes, case-study
//! decision trees and adaptive quizzes.
//!
//! Every engine is synchronous and deterministic. Content comes in through a
//! [`services::content_service::ContentRepository`]; results are plain serde
//! values for the caller to render or persist.

pub mod config;
pub mod error;
pub mod fixtures;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use services::content_service::{ContentRepository, InMemoryContentRepository};
pub use services::decision_tree_service::{DecisionTree, DecisionTreeRunner, RunnerState};
pub use services::outcome_service::{OutcomeAggregator, PracticeSession};
pub use services::quiz_service::{AdaptiveQuizEngine, PresentedQuestion, QuizState};
pub use services::scoring_service::ScoringEngine;
pub use services::TrainingEngine;
