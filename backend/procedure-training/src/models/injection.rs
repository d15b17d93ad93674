use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::{DifficultyLevel, RiskLevel, Vector3};
use crate::error::{ensure_finite, EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DangerZone {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub coordinates: Vector3,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub avoidance_technique: String,
}

/// Reference data for one anatomical injection point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionSiteSpec {
    pub name: String,
    #[serde(default)]
    pub coordinates: Vector3,
    /// Degrees from perpendicular.
    pub angle: f64,
    #[serde(alias = "depth")]
    pub depth_mm: f64,
    /// Units.
    pub typical_dosage: f64,
    #[serde(default)]
    pub danger_zones: Vec<DangerZone>,
    #[serde(default)]
    pub anatomical_landmarks: Vec<String>,
    #[serde(default)]
    pub technique_notes: Vec<String>,
}

impl InjectionSiteSpec {
    /// Authoring checks; a site that fails them cannot be scored against.
    pub fn validate_content(&self) -> EngineResult<()> {
        if !(self.angle.is_finite() && (0.0..=90.0).contains(&self.angle)) {
            return Err(EngineError::malformed(format!(
                "site `{}` angle {} is outside 0-90 degrees",
                self.name, self.angle
            )));
        }
        if !(self.depth_mm.is_finite() && self.depth_mm > 0.0) {
            return Err(EngineError::malformed(format!(
                "site `{}` depth must be positive",
                self.name
            )));
        }
        if !(self.typical_dosage.is_finite() && self.typical_dosage >= 0.0) {
            return Err(EngineError::malformed(format!(
                "site `{}` typical dosage must be non-negative",
                self.name
            )));
        }
        if let Some(zone) = self.danger_zones.iter().find(|z| !z.coordinates.is_finite()) {
            return Err(EngineError::malformed(format!(
                "danger zone `{}` of site `{}` has non-finite coordinates",
                zone.name, self.name
            )));
        }
        Ok(())
    }

    /// Dosage converted to an injectable volume.
    pub fn optimal_volume(&self, fallback: f64) -> f64 {
        let volume = self.typical_dosage / 10.0;
        if volume > 0.0 {
            volume
        } else {
            fallback
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnatomyRegion {
    pub name: String,
    #[serde(default)]
    pub key_structures: Vec<String>,
    pub injection_sites: Vec<InjectionSiteSpec>,
}

impl AnatomyRegion {
    pub fn site(&self, name: &str) -> Option<&InjectionSiteSpec> {
        self.injection_sites.iter().find(|site| site.name == name)
    }
}

/// One learner trial as captured by the simulator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct UserInput {
    #[validate(range(min = 0.0, max = 90.0, message = "angle must be within 0-90 degrees"))]
    pub angle: f64,
    #[validate(range(exclusive_min = 0.0, message = "depth must be positive"))]
    pub depth: f64,
    #[validate(range(min = 0.0, message = "velocity must not be negative"))]
    pub velocity: f64,
    #[validate(range(min = 0.0, message = "volume must not be negative"))]
    pub volume: f64,
    pub approach_vector: Vector3,
    #[validate(range(min = 0.0, max = 100.0, message = "hand stability must be within 0-100"))]
    pub hand_stability: f64,
    #[validate(range(min = 0.0, message = "preparation time must not be negative"))]
    pub preparation_time: f64,
}

impl UserInput {
    pub fn check(&self) -> EngineResult<()> {
        ensure_finite("angle", self.angle)?;
        ensure_finite("depth", self.depth)?;
        ensure_finite("velocity", self.velocity)?;
        ensure_finite("volume", self.volume)?;
        ensure_finite("hand_stability", self.hand_stability)?;
        ensure_finite("preparation_time", self.preparation_time)?;
        if !self.approach_vector.is_finite() {
            return Err(EngineError::invalid_input(
                "approach_vector",
                "must be a finite number",
            ));
        }
        self.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Complication {
    VascularInjuryRisk,
    OverInjectionDepth,
    TooRapid,
    ExcessiveVolume,
    PoorNeedleControl,
}

impl Complication {
    pub fn label(&self) -> &'static str {
        match self {
            Complication::VascularInjuryRisk => "vascular injury risk",
            Complication::OverInjectionDepth => "over-injection depth",
            Complication::TooRapid => "too rapid",
            Complication::ExcessiveVolume => "excessive volume",
            Complication::PoorNeedleControl => "poor needle control",
        }
    }
}

impl fmt::Display for Complication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AccuracyBreakdown {
    pub angle: f64,
    pub depth: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub accuracy_score: f64,
    pub accuracy_breakdown: AccuracyBreakdown,
    pub safety_score: f64,
    pub technique_score: f64,
    /// 0-10 simulated patient discomfort.
    pub pain_level: f64,
    pub efficacy_prediction: f64,
    pub danger_proximity: f64,
    pub complications_detected: Vec<Complication>,
    pub feedback_points: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub precision: f64,
    pub consistency: f64,
    pub confidence: f64,
    pub timing: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionAttempt {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub site_name: String,
    pub difficulty: DifficultyLevel,
    pub user_input: UserInput,
    pub simulation_result: SimulationResult,
    pub performance_metrics: PerformanceMetrics,
}

/// Running figures a practice session keeps after every appended attempt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RunningMetrics {
    pub attempts_made: u32,
    pub success_rate: f64,
    pub average_score: f64,
    pub best_score: f64,
    pub current_streak: u32,
    pub total_practice_time: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentScores {
    pub accuracy: f64,
    pub safety: f64,
    pub technique: f64,
    pub efficacy: f64,
    pub pain_level: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    MasterInjector,
    PerfectSession,
    SafetyExpert,
    ConsistencyChampion,
}

impl Achievement {
    pub fn label(&self) -> &'static str {
        match self {
            Achievement::MasterInjector => "Master Injector",
            Achievement::PerfectSession => "Perfect Session",
            Achievement::SafetyExpert => "Safety Expert",
            Achievement::ConsistencyChampion => "Consistency Champion",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementArea {
    InjectionAccuracy,
    SafetyAwareness,
    TechniqueRefinement,
    HandStability,
}

impl ImprovementArea {
    pub fn label(&self) -> &'static str {
        match self {
            ImprovementArea::InjectionAccuracy => "Injection Accuracy",
            ImprovementArea::SafetyAwareness => "Safety Awareness",
            ImprovementArea::TechniqueRefinement => "Technique Refinement",
            ImprovementArea::HandStability => "Hand Stability",
        }
    }
}

/// Reduction of a sequence of attempts; all-zero for an empty sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub total_attempts: u32,
    pub successful_attempts: u32,
    /// Mean accuracy across every attempt, successful or not.
    pub overall_score: f64,
    pub component_scores: ComponentScores,
    pub final_streak: u32,
    pub achievements: Vec<Achievement>,
    pub areas_for_improvement: Vec<ImprovementArea>,
    pub next_recommendations: Vec<String>,
}

/// Session-level report produced once a practice session is finalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResults {
    pub session_id: String,
    pub anatomy_region: String,
    pub difficulty: DifficultyLevel,
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub attempts: Vec<InjectionAttempt>,
    pub practice_time_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
