use crate::config::ScoringConfig;
use crate::error::EngineResult;
use crate::metrics::{COMPLICATIONS_DETECTED_TOTAL, INJECTION_ATTEMPTS_SCORED_TOTAL};
use crate::models::injection::{
    AccuracyBreakdown, Complication, DangerZone, InjectionSiteSpec, PerformanceMetrics,
    SimulationResult, UserInput,
};
use crate::models::{DifficultyLevel, Vector3};
use crate::utils::stats::clamp_score;

/// Scores a single simulated injection against its target site.
///
/// Evaluation is a pure function of `(site, input, difficulty)` and the
/// configured constants; it never clamps raw inputs, only the scores.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        site: &InjectionSiteSpec,
        input: &UserInput,
        difficulty: DifficultyLevel,
    ) -> EngineResult<SimulationResult> {
        site.validate_content()?;
        if let Err(e) = input.check() {
            tracing::warn!("Rejected injection input for site={}: {}", site.name, e);
            return Err(e);
        }

        let breakdown = self.accuracy_breakdown(site, input);
        let accuracy_score =
            clamp_score((breakdown.angle + breakdown.depth + breakdown.velocity) / 3.0);

        let danger_proximity = danger_proximity(&input.approach_vector, &site.danger_zones);
        let safety_score = clamp_score(100.0 - danger_proximity * 20.0);

        let technique_score = self.technique_score(site, input, difficulty);
        let pain_level = self.pain_level(site, input);
        let efficacy_prediction = clamp_score((accuracy_score + technique_score) / 2.0);

        let complications = self.detect_complications(site, input, danger_proximity);
        let feedback_points = self.feedback(site, input, accuracy_score, safety_score);
        let improvement_suggestions = self.suggestions(site, input, &breakdown);

        let outcome = if accuracy_score > self.config.success_threshold {
            "successful"
        } else {
            "unsuccessful"
        };
        INJECTION_ATTEMPTS_SCORED_TOTAL
            .with_label_values(&[outcome])
            .inc();
        for complication in &complications {
            COMPLICATIONS_DETECTED_TOTAL
                .with_label_values(&[complication.label()])
                .inc();
        }

        tracing::debug!(
            "Scored injection: site={}, accuracy={:.1}, safety={:.1}, technique={:.1}, pain={:.2}, complications={}",
            site.name,
            accuracy_score,
            safety_score,
            technique_score,
            pain_level,
            complications.len()
        );

        Ok(SimulationResult {
            accuracy_score,
            accuracy_breakdown: breakdown,
            safety_score,
            technique_score,
            pain_level,
            efficacy_prediction,
            danger_proximity,
            complications_detected: complications,
            feedback_points,
            improvement_suggestions,
        })
    }

    /// Secondary per-attempt metrics; consistency feeds the session report.
    pub fn performance_metrics(
        &self,
        input: &UserInput,
        result: &SimulationResult,
    ) -> PerformanceMetrics {
        let velocity_control =
            100.0 - (input.velocity - self.config.optimal_velocity).abs() * 10.0;

        PerformanceMetrics {
            precision: result.accuracy_score,
            consistency: clamp_score(input.hand_stability + velocity_control),
            confidence: clamp_score(100.0 - input.preparation_time * 2.0 + input.hand_stability),
            timing: clamp_score(
                100.0 - (input.preparation_time - self.config.prep_time_default_seconds).abs(),
            ),
        }
    }

    fn accuracy_breakdown(&self, site: &InjectionSiteSpec, input: &UserInput) -> AccuracyBreakdown {
        AccuracyBreakdown {
            angle: (100.0 - (input.angle - site.angle).abs() * 2.0).max(0.0),
            depth: (100.0 - (input.depth - site.depth_mm).abs() * 5.0).max(0.0),
            velocity: (100.0 - (input.velocity - self.config.optimal_velocity).abs() * 10.0)
                .max(0.0),
        }
    }

    fn technique_score(
        &self,
        site: &InjectionSiteSpec,
        input: &UserInput,
        difficulty: DifficultyLevel,
    ) -> f64 {
        let expected_prep = self.config.expected_prep_time(difficulty);

        let mut score = 100.0;
        score -= (100.0 - input.hand_stability) * 0.5;
        score -= (input.preparation_time - expected_prep).abs() * 0.5;

        let optimal_volume = site.optimal_volume(self.config.fallback_volume);
        let volume_accuracy = (100.0 - (input.volume - optimal_volume).abs() * 100.0).max(0.0);

        clamp_score((score + volume_accuracy) / 2.0)
    }

    fn pain_level(&self, site: &InjectionSiteSpec, input: &UserInput) -> f64 {
        let pain = input.velocity * 0.1
            + (input.angle - site.angle).abs() * 0.05
            + (input.depth - site.depth_mm).abs() * 0.1
            + (100.0 - input.hand_stability) * 0.02;

        pain.clamp(0.0, 10.0)
    }

    /// Rules fire independently; output keeps rule order.
    fn detect_complications(
        &self,
        site: &InjectionSiteSpec,
        input: &UserInput,
        danger_proximity: f64,
    ) -> Vec<Complication> {
        let cfg = &self.config;
        let optimal_volume = site.optimal_volume(cfg.fallback_volume);
        let mut complications = Vec::new();

        if danger_proximity < cfg.vascular_proximity_limit {
            complications.push(Complication::VascularInjuryRisk);
        }
        if input.depth > site.depth_mm * cfg.depth_overshoot_ratio {
            complications.push(Complication::OverInjectionDepth);
        }
        if input.velocity > cfg.max_velocity {
            complications.push(Complication::TooRapid);
        }
        if input.volume > optimal_volume * cfg.volume_overshoot_ratio {
            complications.push(Complication::ExcessiveVolume);
        }
        if input.hand_stability < cfg.min_hand_stability {
            complications.push(Complication::PoorNeedleControl);
        }

        complications
    }

    fn feedback(
        &self,
        site: &InjectionSiteSpec,
        input: &UserInput,
        accuracy_score: f64,
        safety_score: f64,
    ) -> Vec<String> {
        let excellent = self.config.excellent_threshold;
        let mut feedback = Vec::new();

        if accuracy_score > excellent {
            feedback.push("Excellent accuracy! Your injection placement was precise.".to_string());
        } else if accuracy_score >= self.config.success_threshold {
            feedback.push("Good accuracy. Minor adjustments will improve precision.".to_string());
        } else {
            feedback.push("Work on accuracy. Review optimal injection parameters.".to_string());
        }

        if safety_score > excellent {
            feedback.push("Outstanding safety awareness. No danger zones compromised.".to_string());
        } else if safety_score < self.config.success_threshold {
            feedback.push("Safety concern: Too close to danger zones. Review anatomy.".to_string());
        }

        if input.hand_stability > excellent {
            feedback.push("Excellent hand stability and needle control.".to_string());
        }

        if (input.angle - site.angle).abs() < 5.0 {
            feedback.push("Perfect injection angle achieved.".to_string());
        }

        feedback
    }

    fn suggestions(
        &self,
        site: &InjectionSiteSpec,
        input: &UserInput,
        breakdown: &AccuracyBreakdown,
    ) -> Vec<String> {
        let mut suggestions = Vec::new();

        if breakdown.angle < 80.0 {
            suggestions.push(format!(
                "Adjust injection angle: aim for {}° from perpendicular",
                site.angle
            ));
        }
        if breakdown.depth < 80.0 {
            suggestions.push(format!(
                "Optimize injection depth: target {}mm",
                site.depth_mm
            ));
        }
        if breakdown.velocity < 80.0 {
            suggestions
                .push("Moderate injection velocity: slower, more controlled delivery".to_string());
        }
        if input.hand_stability < 80.0 {
            suggestions
                .push("Practice hand stability exercises and proper grip technique".to_string());
        }
        if input.preparation_time < 10.0 {
            suggestions
                .push("Take more time for preparation and anatomical assessment".to_string());
        }

        suggestions
    }
}

/// Normalized distance to the nearest danger zone, in [0, 1].
/// With no zones the approach is treated as maximally distant.
pub fn danger_proximity(approach: &Vector3, zones: &[DangerZone]) -> f64 {
    zones
        .iter()
        .map(|zone| approach.distance_to(&zone.coordinates) / 10.0)
        .fold(1.0, f64::min)
        .clamp(0.0, 1.0)
}
