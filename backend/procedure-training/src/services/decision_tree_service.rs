use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::config::CaseStudyConfig;
use crate::error::{ensure_finite, EngineError, EngineResult};
use crate::metrics::{bool_label, CASE_DECISIONS_RECORDED_TOTAL};
use crate::models::case_study::{
    CaseOutcome, CaseStudyRecord, CaseStudyReport, DecisionChoice, DecisionNode,
    DecisionPathEntry, DecisionSummary, OutcomeType,
};
use crate::services::outcome_service::OutcomeAggregator;
use validator::Validate;

const STRONG_REASONING_RATE: f64 = 0.8;
const CONFIDENT_DECISION: f64 = 90.0;
const HESITANT_DECISION: f64 = 60.0;
const QUICK_DECISION_SECONDS: f64 = 30.0;
const SLOW_DECISION_SECONDS: f64 = 120.0;

/// A case study whose graph passed structural checks.
///
/// Construction rejects duplicate ids, a missing or repeated root, dangling
/// `leads_to_node` references and cycles, so any walk from the root ends
/// in at most `node_count()` steps.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    record: CaseStudyRecord,
    index: HashMap<String, usize>,
    root: usize,
}

impl DecisionTree {
    pub fn new(record: CaseStudyRecord) -> EngineResult<Self> {
        let case_id = record.case_id.clone();
        Self::build(record).inspect_err(|e| {
            tracing::warn!("Rejected decision tree for case={}: {}", case_id, e);
        })
    }

    fn build(record: CaseStudyRecord) -> EngineResult<Self> {
        if record.decision_tree.is_empty() {
            return Err(EngineError::malformed(format!(
                "case `{}` has no decision nodes",
                record.case_id
            )));
        }

        let mut index = HashMap::with_capacity(record.decision_tree.len());
        for (pos, node) in record.decision_tree.iter().enumerate() {
            if index.insert(node.node_id.clone(), pos).is_some() {
                return Err(EngineError::malformed(format!(
                    "duplicate node id `{}`",
                    node.node_id
                )));
            }
        }

        let roots: Vec<usize> = record
            .decision_tree
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_root)
            .map(|(pos, _)| pos)
            .collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => {
                return Err(EngineError::malformed(format!(
                    "case `{}` has no root node",
                    record.case_id
                )))
            }
            _ => {
                return Err(EngineError::malformed(format!(
                    "case `{}` has {} root nodes",
                    record.case_id,
                    roots.len()
                )))
            }
        };

        for node in &record.decision_tree {
            check_node(node, &index)?;
        }

        let tree = Self {
            record,
            index,
            root,
        };
        tree.ensure_acyclic()?;
        Ok(tree)
    }

    pub fn case_id(&self) -> &str {
        &self.record.case_id
    }

    pub fn record(&self) -> &CaseStudyRecord {
        &self.record
    }

    pub fn root(&self) -> &DecisionNode {
        &self.record.decision_tree[self.root]
    }

    pub fn node(&self, node_id: &str) -> Option<&DecisionNode> {
        self.index
            .get(node_id)
            .map(|&pos| &self.record.decision_tree[pos])
    }

    pub fn node_count(&self) -> usize {
        self.record.decision_tree.len()
    }

    /// Iterative three-colour DFS over every node, not only those reachable from the root.
    fn ensure_acyclic(&self) -> EngineResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let nodes = &self.record.decision_tree;
        let mut marks = vec![Mark::Unvisited; nodes.len()];

        for start in 0..nodes.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            // (node, next option to inspect)
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::InProgress;

            while let Some((pos, next_option)) = stack.pop() {
                let node = &nodes[pos];
                let Some(option) = node.options.get(next_option) else {
                    marks[pos] = Mark::Done;
                    continue;
                };
                stack.push((pos, next_option + 1));

                let Some(target) = option.leads_to_node.as_deref() else {
                    continue;
                };
                let Some(&target_pos) = self.index.get(target) else {
                    continue;
                };
                match marks[target_pos] {
                    Mark::InProgress => {
                        return Err(EngineError::malformed(format!(
                            "cycle through node `{}` via option `{}`",
                            target, option.option_id
                        )))
                    }
                    Mark::Unvisited => {
                        marks[target_pos] = Mark::InProgress;
                        stack.push((target_pos, 0));
                    }
                    Mark::Done => {}
                }
            }
        }

        Ok(())
    }
}

fn check_node(node: &DecisionNode, index: &HashMap<String, usize>) -> EngineResult<()> {
    if node.options.is_empty() {
        return Err(EngineError::malformed(format!(
            "node `{}` offers no options",
            node.node_id
        )));
    }

    let mut seen = HashSet::new();
    for option in &node.options {
        if !seen.insert(option.option_id.as_str()) {
            return Err(EngineError::malformed(format!(
                "duplicate option id `{}` in node `{}`",
                option.option_id, node.node_id
            )));
        }
        if let Some(target) = &option.leads_to_node {
            if !index.contains_key(target) {
                return Err(EngineError::malformed(format!(
                    "option `{}` of node `{}` leads to missing node `{}`",
                    option.option_id, node.node_id, target
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    AtNode(String),
    Terminated,
}

/// Walks one learner through a decision tree, recording the path.
#[derive(Debug, Clone)]
pub struct DecisionTreeRunner {
    session_id: String,
    tree: DecisionTree,
    config: CaseStudyConfig,
    state: RunnerState,
    path: Vec<DecisionPathEntry>,
    started_at: DateTime<Utc>,
}

impl DecisionTreeRunner {
    pub fn start(tree: DecisionTree, config: CaseStudyConfig, started_at: DateTime<Utc>) -> Self {
        let session_id = format!("case_{}", Uuid::new_v4());
        let state = RunnerState::AtNode(tree.root().node_id.clone());
        tracing::info!(
            "Case study started: session={}, case={}, nodes={}",
            session_id,
            tree.case_id(),
            tree.node_count()
        );

        Self {
            session_id,
            tree,
            config,
            state,
            path: Vec::new(),
            started_at,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn path(&self) -> &[DecisionPathEntry] {
        &self.path
    }

    pub fn is_terminated(&self) -> bool {
        self.state == RunnerState::Terminated
    }

    pub fn current_node(&self) -> Option<&DecisionNode> {
        match &self.state {
            RunnerState::AtNode(node_id) => self.tree.node(node_id),
            RunnerState::Terminated => None,
        }
    }

    /// Applies one choice at the current node. Nothing is recorded when it fails.
    pub fn advance(&mut self, choice: DecisionChoice) -> EngineResult<&RunnerState> {
        let RunnerState::AtNode(node_id) = &self.state else {
            return Err(EngineError::invalid_state(format!(
                "case session {} has already terminated",
                self.session_id
            )));
        };

        ensure_finite("time_taken_seconds", choice.time_taken_seconds)?;
        ensure_finite("confidence_level", choice.confidence_level)?;
        choice.validate()?;

        let node = self.tree.node(node_id).ok_or_else(|| {
            EngineError::malformed(format!("current node `{}` is missing", node_id))
        })?;
        let option = node.option(&choice.option_id).ok_or_else(|| {
            EngineError::invalid_input(
                "option_id",
                format!("`{}` is not an option of node `{}`", choice.option_id, node_id),
            )
        })?;

        let next_state = match &option.leads_to_node {
            Some(target) if self.tree.node(target).is_some() => RunnerState::AtNode(target.clone()),
            Some(target) => {
                return Err(EngineError::malformed(format!(
                    "option `{}` leads to missing node `{}`",
                    option.option_id, target
                )))
            }
            None => RunnerState::Terminated,
        };

        let entry = DecisionPathEntry {
            node_id: node.node_id.clone(),
            selected_option_id: option.option_id.clone(),
            is_correct: option.is_optimal,
            time_taken_seconds: choice.time_taken_seconds,
            confidence_level: choice.confidence_level,
            consequence: option.consequence.clone(),
            reasoning: choice.reasoning,
            expert_notes: option.expert_notes.clone(),
        };

        CASE_DECISIONS_RECORDED_TOTAL
            .with_label_values(&[bool_label(entry.is_correct)])
            .inc();
        tracing::debug!(
            "Decision recorded: session={}, node={}, option={}, correct={}",
            self.session_id,
            entry.node_id,
            entry.selected_option_id,
            entry.is_correct
        );

        self.path.push(entry);
        self.state = next_state;
        if self.is_terminated() {
            tracing::info!(
                "Case study terminated: session={}, decisions={}",
                self.session_id,
                self.path.len()
            );
        }
        Ok(&self.state)
    }

    /// Grades the finished path. Only valid once the runner has terminated.
    pub fn complete(
        &self,
        aggregator: &OutcomeAggregator,
        finished_at: DateTime<Utc>,
    ) -> EngineResult<CaseStudyReport> {
        if !self.is_terminated() {
            return Err(EngineError::invalid_state(format!(
                "case session {} has not reached a terminal option",
                self.session_id
            )));
        }

        let summary = aggregator.summarize_decisions(&self.path);
        let final_outcome = self.outcome(&summary);

        Ok(CaseStudyReport {
            case_id: self.tree.case_id().to_string(),
            session_id: self.session_id.clone(),
            total_decisions: summary.total_decisions,
            correct_decisions: summary.correct_decisions,
            percentage_correct: summary.correct_rate * 100.0,
            average_confidence: summary.average_confidence,
            decision_path: self.path.clone(),
            learning_points: self.learning_points(&summary),
            areas_for_improvement: self.improvement_areas(&summary),
            expert_feedback: expert_feedback(final_outcome.outcome_type),
            clinical_reasoning_score: clinical_reasoning_score(&summary),
            completion_time_seconds: (finished_at - self.started_at).num_milliseconds().max(0)
                as f64
                / 1000.0,
            final_outcome,
        })
    }

    fn outcome(&self, summary: &DecisionSummary) -> CaseOutcome {
        let rate = summary.correct_rate;
        let confidence = summary.average_confidence;
        let cfg = &self.config;

        let outcome_type = if rate >= cfg.optimal_rate && confidence >= cfg.optimal_confidence {
            OutcomeType::Optimal
        } else if rate >= cfg.acceptable_rate {
            OutcomeType::Acceptable
        } else if rate >= cfg.suboptimal_rate {
            OutcomeType::Suboptimal
        } else {
            OutcomeType::Adverse
        };

        let complications = if rate < cfg.acceptable_rate {
            vec!["Minor bruising".to_string(), "Asymmetry".to_string()]
        } else {
            Vec::new()
        };
        let follow_up_required = if rate < STRONG_REASONING_RATE {
            vec![
                "2-week assessment".to_string(),
                "Touch-up consultation".to_string(),
            ]
        } else {
            vec!["Standard follow-up".to_string()]
        };

        CaseOutcome {
            outcome_type,
            patient_satisfaction: (rate * 100.0).round(),
            treatment_efficacy: ((rate * 0.7 + confidence / 100.0 * 0.3) * 100.0).round(),
            safety_score: (rate * 95.0 + 5.0).round(),
            cost_effectiveness: (rate * 90.0 + 10.0).round(),
            complications,
            follow_up_required,
            outcome_description: outcome_type.description().to_string(),
        }
    }

    fn learning_points(&self, summary: &DecisionSummary) -> Vec<String> {
        let mut points = Vec::new();
        if summary.correct_rate >= STRONG_REASONING_RATE {
            points.push("Demonstrated strong clinical reasoning and decision-making skills".to_string());
        }
        if self
            .path
            .iter()
            .any(|entry| entry.confidence_level >= CONFIDENT_DECISION)
        {
            points.push("Showed appropriate confidence in clinical decisions".to_string());
        }
        if self
            .path
            .iter()
            .any(|entry| entry.time_taken_seconds < QUICK_DECISION_SECONDS)
        {
            points.push("Efficient decision-making under pressure".to_string());
        }
        points.push("Understanding of patient-centered care principles".to_string());
        points.push("Knowledge of procedure-specific considerations".to_string());
        points
    }

    fn improvement_areas(&self, summary: &DecisionSummary) -> Vec<String> {
        let mut areas = Vec::new();
        if summary.correct_rate < self.config.acceptable_rate {
            areas.push("Clinical decision-making accuracy".to_string());
        }
        if self
            .path
            .iter()
            .any(|entry| entry.confidence_level < HESITANT_DECISION)
        {
            areas.push("Clinical confidence and assertiveness".to_string());
        }
        if self
            .path
            .iter()
            .any(|entry| entry.time_taken_seconds > SLOW_DECISION_SECONDS)
        {
            areas.push("Decision-making efficiency".to_string());
        }
        areas
    }
}

fn expert_feedback(outcome: OutcomeType) -> Vec<String> {
    let (first, second) = match outcome {
        OutcomeType::Optimal => (
            "Excellent work! Your systematic approach to clinical decision-making is commendable.",
            "You demonstrated thorough understanding of patient safety and treatment efficacy.",
        ),
        OutcomeType::Acceptable => (
            "Good overall performance with room for refinement in specific areas.",
            "Consider spending more time on differential diagnosis and risk assessment.",
        ),
        OutcomeType::Suboptimal | OutcomeType::Adverse => (
            "This case highlights important learning opportunities.",
            "Review contraindications and patient selection criteria for better outcomes.",
        ),
    };

    vec![
        first.to_string(),
        second.to_string(),
        "Continue practicing with similar cases to build expertise and confidence.".to_string(),
    ]
}

/// Weighted blend of accuracy, confidence and speed, rounded to a whole score.
fn clinical_reasoning_score(summary: &DecisionSummary) -> f64 {
    let accuracy = summary.correct_rate * 100.0;
    let speed = (100.0 - summary.average_time_seconds).max(0.0);
    (accuracy * 0.4 + summary.average_confidence * 0.3 + speed * 0.3).round()
}
