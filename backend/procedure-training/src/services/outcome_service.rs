use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{AchievementConfig, ScoringConfig};
use crate::error::{EngineError, EngineResult};
use crate::metrics::PRACTICE_SESSIONS_FINALIZED_TOTAL;
use crate::models::case_study::{DecisionPathEntry, DecisionSummary};
use crate::models::injection::{
    Achievement, AnatomyRegion, ComponentScores, ImprovementArea, InjectionAttempt,
    RunningMetrics, SessionSummary, SimulationResults, UserInput,
};
use crate::models::{DifficultyLevel, SessionStatus};
use crate::services::scoring_service::ScoringEngine;
use crate::utils::stats::{mean, ratio};

/// Reduces attempts or decision paths into session-level figures.
#[derive(Debug, Clone, Default)]
pub struct OutcomeAggregator {
    scoring: ScoringConfig,
    achievements: AchievementConfig,
}

impl OutcomeAggregator {
    pub fn new(scoring: ScoringConfig, achievements: AchievementConfig) -> Self {
        Self {
            scoring,
            achievements,
        }
    }

    pub fn is_successful(&self, attempt: &InjectionAttempt) -> bool {
        attempt.simulation_result.accuracy_score > self.scoring.success_threshold
    }

    pub fn summarize(&self, attempts: &[InjectionAttempt]) -> SessionSummary {
        if attempts.is_empty() {
            return SessionSummary {
                next_recommendations: self.recommendations(0.0, 0.0),
                ..SessionSummary::default()
            };
        }

        let successful_attempts = attempts.iter().filter(|a| self.is_successful(a)).count() as u32;
        let component_scores = ComponentScores {
            accuracy: mean(attempts.iter().map(|a| a.simulation_result.accuracy_score)),
            safety: mean(attempts.iter().map(|a| a.simulation_result.safety_score)),
            technique: mean(attempts.iter().map(|a| a.simulation_result.technique_score)),
            efficacy: mean(attempts.iter().map(|a| a.simulation_result.efficacy_prediction)),
            pain_level: mean(attempts.iter().map(|a| a.simulation_result.pain_level)),
            consistency: mean(attempts.iter().map(|a| a.performance_metrics.consistency)),
        };
        let overall_score = component_scores.accuracy;
        let final_streak = self.trailing_streak(attempts);

        let cfg = &self.achievements;
        let mut achievements = Vec::new();
        if overall_score > cfg.master_injector_score {
            achievements.push(Achievement::MasterInjector);
        }
        if successful_attempts as usize == attempts.len() {
            achievements.push(Achievement::PerfectSession);
        }
        if component_scores.safety > cfg.safety_expert_score {
            achievements.push(Achievement::SafetyExpert);
        }
        if final_streak > cfg.consistency_streak {
            achievements.push(Achievement::ConsistencyChampion);
        }

        let mut areas_for_improvement = Vec::new();
        if component_scores.accuracy < cfg.accuracy_improvement_below {
            areas_for_improvement.push(ImprovementArea::InjectionAccuracy);
        }
        if component_scores.safety < cfg.safety_improvement_below {
            areas_for_improvement.push(ImprovementArea::SafetyAwareness);
        }
        if component_scores.technique < cfg.technique_improvement_below {
            areas_for_improvement.push(ImprovementArea::TechniqueRefinement);
        }
        if component_scores.consistency < cfg.consistency_improvement_below {
            areas_for_improvement.push(ImprovementArea::HandStability);
        }

        SessionSummary {
            total_attempts: attempts.len() as u32,
            successful_attempts,
            overall_score,
            component_scores,
            final_streak,
            achievements,
            areas_for_improvement,
            next_recommendations: self.recommendations(overall_score, component_scores.safety),
        }
    }

    pub fn summarize_decisions(&self, path: &[DecisionPathEntry]) -> DecisionSummary {
        if path.is_empty() {
            return DecisionSummary::default();
        }

        let correct_decisions = path.iter().filter(|entry| entry.is_correct).count() as u32;
        DecisionSummary {
            total_decisions: path.len() as u32,
            correct_decisions,
            correct_rate: ratio(correct_decisions, path.len() as u32),
            average_confidence: mean(path.iter().map(|entry| entry.confidence_level)),
            average_time_seconds: mean(path.iter().map(|entry| entry.time_taken_seconds)),
        }
    }

    /// Successful attempts counted back from the most recent one.
    fn trailing_streak(&self, attempts: &[InjectionAttempt]) -> u32 {
        attempts
            .iter()
            .rev()
            .take_while(|a| self.is_successful(a))
            .count() as u32
    }

    fn recommendations(&self, overall_score: f64, safety: f64) -> Vec<String> {
        let technique = if overall_score < self.scoring.success_threshold {
            "Continue practicing basic injection techniques"
        } else {
            "Advance to more complex procedures"
        };
        let anatomy = if safety < self.scoring.excellent_threshold {
            "Review anatomical danger zones"
        } else {
            "Explore advanced safety protocols"
        };

        vec![
            technique.to_string(),
            anatomy.to_string(),
            "Practice with different injection sites and volumes".to_string(),
        ]
    }
}

/// Ordered run of attempts against one anatomy region.
///
/// Attempts can only be appended; once finalized the session is frozen and
/// repeated finalization hands back the same report.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    id: String,
    region: AnatomyRegion,
    difficulty: DifficultyLevel,
    started_at: DateTime<Utc>,
    attempts: Vec<InjectionAttempt>,
    metrics: RunningMetrics,
    success_threshold: f64,
    results: Option<SimulationResults>,
}

impl PracticeSession {
    pub fn new(
        region: AnatomyRegion,
        difficulty: DifficultyLevel,
        started_at: DateTime<Utc>,
        success_threshold: f64,
    ) -> Self {
        let id = format!("session_{}", Uuid::new_v4());
        tracing::info!(
            "Practice session started: id={}, region={}, difficulty={}",
            id,
            region.name,
            difficulty.as_str()
        );

        Self {
            id,
            region,
            difficulty,
            started_at,
            attempts: Vec::new(),
            metrics: RunningMetrics::default(),
            success_threshold,
            results: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region(&self) -> &AnatomyRegion {
        &self.region
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    pub fn attempts(&self) -> &[InjectionAttempt] {
        &self.attempts
    }

    pub fn metrics(&self) -> &RunningMetrics {
        &self.metrics
    }

    pub fn status(&self) -> SessionStatus {
        if self.results.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        }
    }

    /// Scores `input` against a site of this session's region and appends the attempt.
    pub fn perform(
        &mut self,
        engine: &ScoringEngine,
        site_name: &str,
        input: UserInput,
        timestamp: DateTime<Utc>,
    ) -> EngineResult<&InjectionAttempt> {
        self.ensure_active()?;

        let site = self
            .region
            .site(site_name)
            .ok_or_else(|| EngineError::NotFound {
                kind: "injection site",
                id: site_name.to_string(),
            })?;
        let simulation_result = engine.evaluate(site, &input, self.difficulty)?;
        let performance_metrics = engine.performance_metrics(&input, &simulation_result);

        let attempt = InjectionAttempt {
            id: format!("attempt_{}", Uuid::new_v4()),
            timestamp,
            site_name: site.name.clone(),
            difficulty: self.difficulty,
            user_input: input,
            simulation_result,
            performance_metrics,
        };
        self.record(attempt)?;

        self.attempts
            .last()
            .ok_or_else(|| EngineError::invalid_state("attempt was not recorded"))
    }

    /// Appends an already scored attempt.
    pub fn record(&mut self, attempt: InjectionAttempt) -> EngineResult<()> {
        self.ensure_active()?;

        let accuracy = attempt.simulation_result.accuracy_score;
        let successful = accuracy > self.success_threshold;
        let previous = self.metrics.attempts_made as f64;
        let made = previous + 1.0;

        let m = &mut self.metrics;
        m.success_rate = (m.success_rate * previous + if successful { 100.0 } else { 0.0 }) / made;
        m.average_score = (m.average_score * previous + accuracy) / made;
        m.best_score = m.best_score.max(accuracy);
        m.current_streak = if successful { m.current_streak + 1 } else { 0 };
        m.total_practice_time += attempt.user_input.preparation_time;
        m.attempts_made += 1;

        tracing::debug!(
            "Attempt recorded: session={}, site={}, accuracy={:.1}, streak={}",
            self.id,
            attempt.site_name,
            accuracy,
            m.current_streak
        );

        self.attempts.push(attempt);
        Ok(())
    }

    /// Freezes the session into its report. Later calls return the stored report.
    pub fn finalize(
        &mut self,
        aggregator: &OutcomeAggregator,
        finished_at: DateTime<Utc>,
    ) -> SimulationResults {
        if let Some(results) = &self.results {
            return results.clone();
        }

        let summary = aggregator.summarize(&self.attempts);
        let result_label = if self.attempts.is_empty() {
            "empty"
        } else {
            "completed"
        };
        PRACTICE_SESSIONS_FINALIZED_TOTAL
            .with_label_values(&[result_label])
            .inc();

        tracing::info!(
            "Practice session finalized: id={}, attempts={}, successful={}, overall={:.1}",
            self.id,
            summary.total_attempts,
            summary.successful_attempts,
            summary.overall_score
        );

        let results = SimulationResults {
            session_id: self.id.clone(),
            anatomy_region: self.region.name.clone(),
            difficulty: self.difficulty,
            summary,
            attempts: self.attempts.clone(),
            practice_time_seconds: (finished_at - self.started_at).num_seconds().max(0),
            started_at: self.started_at,
            completed_at: finished_at,
        };
        self.results = Some(results.clone());
        results
    }

    fn ensure_active(&self) -> EngineResult<()> {
        if self.results.is_some() {
            return Err(EngineError::invalid_state(format!(
                "practice session {} is already finalized",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::injection::{
        AccuracyBreakdown, InjectionSiteSpec, PerformanceMetrics, SimulationResult,
    };
    use crate::models::Vector3;
    use chrono::Duration;

    fn region() -> AnatomyRegion {
        AnatomyRegion {
            name: "upper face".to_string(),
            key_structures: vec![],
            injection_sites: vec![InjectionSiteSpec {
                name: "glabella".to_string(),
                coordinates: Vector3::default(),
                angle: 90.0,
                depth_mm: 4.0,
                typical_dosage: 20.0,
                danger_zones: vec![],
                anatomical_landmarks: vec![],
                technique_notes: vec![],
            }],
        }
    }

    fn input() -> UserInput {
        UserInput {
            angle: 90.0,
            depth: 4.0,
            velocity: 5.0,
            volume: 2.0,
            approach_vector: Vector3::default(),
            hand_stability: 100.0,
            preparation_time: 30.0,
        }
    }

    fn attempt(accuracy: f64, safety: f64) -> InjectionAttempt {
        InjectionAttempt {
            id: "a".to_string(),
            timestamp: Utc::now(),
            site_name: "glabella".to_string(),
            difficulty: DifficultyLevel::Intermediate,
            user_input: input(),
            simulation_result: SimulationResult {
                accuracy_score: accuracy,
                accuracy_breakdown: AccuracyBreakdown {
                    angle: accuracy,
                    depth: accuracy,
                    velocity: accuracy,
                },
                safety_score: safety,
                technique_score: 80.0,
                pain_level: 1.0,
                efficacy_prediction: 80.0,
                danger_proximity: 1.0,
                complications_detected: vec![],
                feedback_points: vec![],
                improvement_suggestions: vec![],
            },
            performance_metrics: PerformanceMetrics {
                precision: accuracy,
                consistency: 90.0,
                confidence: 80.0,
                timing: 100.0,
            },
        }
    }

    #[test]
    fn empty_summary_is_all_zero() {
        let summary = OutcomeAggregator::default().summarize(&[]);

        assert_eq!(summary.total_attempts, 0);
        assert_eq!(summary.overall_score, 0.0);
        assert_eq!(summary.component_scores, ComponentScores::default());
        assert!(summary.achievements.is_empty());
        assert!(summary.areas_for_improvement.is_empty());
        assert_eq!(summary.next_recommendations.len(), 3);
    }

    #[test]
    fn overall_score_averages_every_attempt() {
        let attempts = vec![
            attempt(90.0, 80.0),
            attempt(80.0, 80.0),
            attempt(60.0, 80.0),
            attempt(75.0, 80.0),
            attempt(95.0, 80.0),
        ];
        let summary = OutcomeAggregator::default().summarize(&attempts);

        assert_eq!(summary.total_attempts, 5);
        assert_eq!(summary.successful_attempts, 4);
        assert_eq!(summary.overall_score, 80.0);
        assert_eq!(summary.final_streak, 2);
        assert!(!summary.achievements.contains(&Achievement::PerfectSession));
    }

    #[test]
    fn achievements_and_improvement_areas_use_thresholds() {
        let attempts: Vec<_> = (0..6).map(|_| attempt(96.0, 99.0)).collect();
        let summary = OutcomeAggregator::default().summarize(&attempts);

        assert_eq!(
            summary.achievements,
            vec![
                Achievement::MasterInjector,
                Achievement::PerfectSession,
                Achievement::SafetyExpert,
                Achievement::ConsistencyChampion,
            ]
        );
        assert!(summary.areas_for_improvement.is_empty());
        assert_eq!(summary.next_recommendations[0], "Advance to more complex procedures");

        let weak = OutcomeAggregator::default().summarize(&[attempt(50.0, 50.0)]);
        assert_eq!(
            weak.areas_for_improvement,
            vec![ImprovementArea::InjectionAccuracy, ImprovementArea::SafetyAwareness]
        );
    }

    #[test]
    fn decision_summary_of_empty_path_is_zero() {
        let summary = OutcomeAggregator::default().summarize_decisions(&[]);
        assert_eq!(summary, DecisionSummary::default());
    }

    #[test]
    fn session_tracks_running_metrics() {
        let engine = ScoringEngine::default();
        let mut session = PracticeSession::new(
            region(),
            DifficultyLevel::Intermediate,
            Utc::now(),
            70.0,
        );

        session
            .perform(&engine, "glabella", input(), Utc::now())
            .unwrap();
        let mut poor = input();
        poor.angle = 40.0;
        session.perform(&engine, "glabella", poor, Utc::now()).unwrap();

        let metrics = session.metrics();
        assert_eq!(metrics.attempts_made, 2);
        assert_eq!(metrics.success_rate, 50.0);
        assert_eq!(metrics.best_score, 100.0);
        assert_eq!(metrics.current_streak, 0);
        assert_eq!(metrics.total_practice_time, 60.0);
    }

    #[test]
    fn unknown_site_is_not_found() {
        let mut session =
            PracticeSession::new(region(), DifficultyLevel::Beginner, Utc::now(), 70.0);
        let err = session
            .perform(&ScoringEngine::default(), "crow's feet", input(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert!(session.attempts().is_empty());
    }

    #[test]
    fn finalize_is_one_way() {
        let started = Utc::now();
        let aggregator = OutcomeAggregator::default();
        let mut session =
            PracticeSession::new(region(), DifficultyLevel::Expert, started, 70.0);
        session.record(attempt(85.0, 90.0)).unwrap();

        let first = session.finalize(&aggregator, started + Duration::seconds(120));
        let second = session.finalize(&aggregator, started + Duration::seconds(900));

        assert_eq!(first, second);
        assert_eq!(first.practice_time_seconds, 120);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(matches!(
            session.record(attempt(90.0, 90.0)),
            Err(EngineError::InvalidState(_))
        ));
        assert_eq!(session.attempts().len(), 1);
    }
}
