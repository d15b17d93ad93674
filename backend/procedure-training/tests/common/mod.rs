#![allow(dead_code)]

use std::sync::Arc;

use procedure_training::fixtures;
use procedure_training::models::injection::UserInput;
use procedure_training::models::quiz::{AnswerSubmission, QuizQuestion, SelectedAnswer};
use procedure_training::models::Vector3;
use procedure_training::{EngineConfig, InMemoryContentRepository, TrainingEngine};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn create_test_engine() -> TrainingEngine {
    create_test_engine_with(EngineConfig::default())
}

pub fn create_test_engine_with(config: EngineConfig) -> TrainingEngine {
    init_tracing();

    let repo = InMemoryContentRepository::from_bundle(fixtures::demo_bundle())
        .expect("Failed to load demo content");
    TrainingEngine::new(config, Arc::new(repo))
}

/// A textbook attempt at "Frontalis - Central" (angle 90, depth 4, dosage 4).
pub fn ideal_frontalis_input() -> UserInput {
    UserInput {
        angle: 90.0,
        depth: 4.0,
        velocity: 5.0,
        volume: 0.4,
        approach_vector: Vector3::new(0.0, 0.0, 0.0),
        hand_stability: 100.0,
        preparation_time: 30.0,
    }
}

pub fn answer(selected: SelectedAnswer, seconds: f64) -> AnswerSubmission {
    AnswerSubmission {
        selected,
        time_taken_seconds: seconds,
        confidence_level: 75.0,
        hint_used: false,
        flagged_for_review: false,
        explanation_viewed: false,
    }
}

pub fn text(value: &str) -> SelectedAnswer {
    SelectedAnswer::Single(value.to_string())
}

/// Clones `template` under a fresh id so a bank can hold many copies.
pub fn question_copy(template: &QuizQuestion, id: usize) -> QuizQuestion {
    QuizQuestion {
        id: format!("{}-{}", template.id, id),
        ..template.clone()
    }
}
