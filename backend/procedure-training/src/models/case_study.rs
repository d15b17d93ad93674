use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DifficultyLevel, RiskLevel};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionOption {
    pub option_id: String,
    pub option_text: String,
    pub is_optimal: bool,
    pub risk_level: RiskLevel,
    pub consequence: String,
    /// `None` ends the case.
    #[serde(default)]
    pub leads_to_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionNode {
    pub node_id: String,
    #[serde(default)]
    pub is_root: bool,
    pub scenario: String,
    #[serde(default)]
    pub hints: Vec<String>,
    pub options: Vec<DecisionOption>,
}

impl DecisionNode {
    pub fn option(&self, option_id: &str) -> Option<&DecisionOption> {
        self.options.iter().find(|opt| opt.option_id == option_id)
    }
}

/// Authored case-study content before structural checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseStudyRecord {
    pub case_id: String,
    pub title: String,
    #[serde(default)]
    pub clinical_presentation: String,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    pub decision_tree: Vec<DecisionNode>,
}

/// Learner input for one step through a decision tree.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct DecisionChoice {
    pub option_id: String,
    #[validate(range(min = 0.0, message = "time taken must not be negative"))]
    pub time_taken_seconds: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "confidence must be within 0-100"))]
    pub confidence_level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionPathEntry {
    pub node_id: String,
    pub selected_option_id: String,
    pub is_correct: bool,
    pub time_taken_seconds: f64,
    pub confidence_level: f64,
    pub consequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_notes: Option<String>,
}

/// Reduction of a decision path's correctness flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DecisionSummary {
    pub total_decisions: u32,
    pub correct_decisions: u32,
    /// 0-1; 0 for an empty path.
    pub correct_rate: f64,
    pub average_confidence: f64,
    pub average_time_seconds: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    Optimal,
    Acceptable,
    Suboptimal,
    Adverse,
}

impl OutcomeType {
    pub fn description(&self) -> &'static str {
        match self {
            OutcomeType::Optimal => "Excellent clinical decision-making resulted in optimal patient outcomes with high satisfaction and minimal complications.",
            OutcomeType::Acceptable => "Good clinical judgment led to satisfactory results with minor areas for improvement.",
            OutcomeType::Suboptimal => "Decision-making showed room for improvement. Patient outcomes were acceptable but not optimal.",
            OutcomeType::Adverse => "Clinical decisions resulted in suboptimal outcomes. Significant learning opportunities identified.",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseOutcome {
    pub outcome_type: OutcomeType,
    pub patient_satisfaction: f64,
    pub treatment_efficacy: f64,
    pub safety_score: f64,
    pub cost_effectiveness: f64,
    pub complications: Vec<String>,
    pub follow_up_required: Vec<String>,
    pub outcome_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseStudyReport {
    pub case_id: String,
    pub session_id: String,
    pub total_decisions: u32,
    pub correct_decisions: u32,
    /// 0-100
    pub percentage_correct: f64,
    pub average_confidence: f64,
    pub decision_path: Vec<DecisionPathEntry>,
    pub final_outcome: CaseOutcome,
    pub learning_points: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub expert_feedback: Vec<String>,
    pub clinical_reasoning_score: f64,
    pub completion_time_seconds: f64,
}
