use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

use crate::models::DifficultyLevel;

/// Hand-tuned constants used by the engines.
///
/// Every field has a default, so a partial TOML file or a single
/// environment override is enough to adjust one threshold.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub achievements: AchievementConfig,
    pub case_study: CaseStudyConfig,
    pub quiz: QuizConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// mm/s
    pub optimal_velocity: f64,
    pub prep_time_beginner_seconds: f64,
    pub prep_time_default_seconds: f64,
    pub prep_time_expert_seconds: f64,
    /// Used when a site's typical dosage yields no volume.
    pub fallback_volume: f64,
    /// An attempt counts as successful above this accuracy.
    pub success_threshold: f64,
    pub excellent_threshold: f64,
    pub vascular_proximity_limit: f64,
    pub depth_overshoot_ratio: f64,
    pub max_velocity: f64,
    pub volume_overshoot_ratio: f64,
    pub min_hand_stability: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            optimal_velocity: 5.0,
            prep_time_beginner_seconds: 60.0,
            prep_time_default_seconds: 30.0,
            prep_time_expert_seconds: 15.0,
            fallback_volume: 0.1,
            success_threshold: 70.0,
            excellent_threshold: 90.0,
            vascular_proximity_limit: 0.3,
            depth_overshoot_ratio: 1.5,
            max_velocity: 10.0,
            volume_overshoot_ratio: 2.0,
            min_hand_stability: 60.0,
        }
    }
}

impl ScoringConfig {
    pub fn expected_prep_time(&self, difficulty: DifficultyLevel) -> f64 {
        match difficulty {
            DifficultyLevel::Beginner => self.prep_time_beginner_seconds,
            DifficultyLevel::Expert => self.prep_time_expert_seconds,
            DifficultyLevel::Intermediate | DifficultyLevel::Advanced => {
                self.prep_time_default_seconds
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AchievementConfig {
    pub master_injector_score: f64,
    pub safety_expert_score: f64,
    pub consistency_streak: u32,
    pub accuracy_improvement_below: f64,
    pub safety_improvement_below: f64,
    pub technique_improvement_below: f64,
    pub consistency_improvement_below: f64,
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            master_injector_score: 90.0,
            safety_expert_score: 95.0,
            consistency_streak: 5,
            accuracy_improvement_below: 80.0,
            safety_improvement_below: 85.0,
            technique_improvement_below: 75.0,
            consistency_improvement_below: 70.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaseStudyConfig {
    pub optimal_rate: f64,
    pub optimal_confidence: f64,
    pub acceptable_rate: f64,
    pub suboptimal_rate: f64,
}

impl Default for CaseStudyConfig {
    fn default() -> Self {
        Self {
            optimal_rate: 0.9,
            optimal_confidence: 80.0,
            acceptable_rate: 0.7,
            suboptimal_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizConfig {
    pub fast_answer_seconds: f64,
    pub slow_answer_seconds: f64,
    pub certification_threshold: u32,
    pub seconds_per_question: u32,
    pub knowledge_gap_ratio: f64,
    pub strength_ratio: f64,
    pub practice_question_cap: usize,
    pub certification_question_cap: usize,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            fast_answer_seconds: 30.0,
            slow_answer_seconds: 90.0,
            certification_threshold: 80,
            seconds_per_question: 90,
            knowledge_gap_ratio: 0.7,
            strength_ratio: 0.8,
            practice_question_cap: 10,
            certification_question_cap: 20,
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables, e.g. APP__QUIZ__CERTIFICATION_THRESHOLD
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read engine configuration for environment {}", env))?;

        let loaded: EngineConfig = settings
            .try_deserialize()
            .context("Failed to deserialize engine configuration")?;
        tracing::info!(
            "Engine configuration loaded for environment: {} (certification threshold={})",
            env,
            loaded.quiz.certification_threshold
        );
        Ok(loaded)
    }
}
