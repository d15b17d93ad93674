use chrono::{Duration, Utc};

use procedure_training::fixtures::{self, DEMO_CASE};
use procedure_training::models::case_study::{DecisionChoice, OutcomeType};
use procedure_training::models::content::ContentBundle;
use procedure_training::{EngineError, InMemoryContentRepository, RunnerState};

mod common;

fn choice(option_id: &str, confidence: f64, seconds: f64) -> DecisionChoice {
    DecisionChoice {
        option_id: option_id.to_string(),
        time_taken_seconds: seconds,
        confidence_level: confidence,
        reasoning: None,
    }
}

#[test]
fn test_optimal_path_reaches_optimal_outcome() {
    let engine = common::create_test_engine();
    let started = Utc::now();
    let mut runner = engine.start_case_study(DEMO_CASE, started).unwrap();
    assert_eq!(runner.current_node().unwrap().node_id, "root");

    let state = runner.advance(choice("opt1", 90.0, 20.0)).unwrap();
    assert_eq!(state, &RunnerState::AtNode("node2".to_string()));
    let state = runner.advance(choice("opt3", 80.0, 40.0)).unwrap();
    assert_eq!(state, &RunnerState::Terminated);

    let report = engine
        .complete_case_study(&runner, started + Duration::seconds(90))
        .unwrap();

    assert_eq!(report.case_id, DEMO_CASE);
    assert_eq!(report.total_decisions, 2);
    assert_eq!(report.correct_decisions, 2);
    assert_eq!(report.percentage_correct, 100.0);
    assert_eq!(report.average_confidence, 85.0);
    assert_eq!(report.final_outcome.outcome_type, OutcomeType::Optimal);
    assert_eq!(report.final_outcome.patient_satisfaction, 100.0);
    assert!(report.final_outcome.complications.is_empty());
    assert_eq!(
        report.final_outcome.follow_up_required,
        vec!["Standard follow-up".to_string()]
    );
    // 0.4 * 100 + 0.3 * 85 + 0.3 * (100 - 30) = 86.5
    assert_eq!(report.clinical_reasoning_score, 87.0);
    assert_eq!(report.completion_time_seconds, 90.0);
    assert!(report.areas_for_improvement.is_empty());
}

#[test]
fn test_detour_path_is_suboptimal() {
    let engine = common::create_test_engine();
    let mut runner = engine.start_case_study(DEMO_CASE, Utc::now()).unwrap();

    runner.advance(choice("opt2", 50.0, 150.0)).unwrap();
    assert_eq!(runner.current_node().unwrap().node_id, "node3");
    runner.advance(choice("opt4", 70.0, 60.0)).unwrap();

    let report = engine.complete_case_study(&runner, Utc::now()).unwrap();
    assert_eq!(report.final_outcome.outcome_type, OutcomeType::Suboptimal);
    assert_eq!(report.final_outcome.complications.len(), 2);
    assert!(report
        .areas_for_improvement
        .contains(&"Clinical decision-making accuracy".to_string()));
    assert!(report
        .areas_for_improvement
        .contains(&"Clinical confidence and assertiveness".to_string()));
    assert!(report
        .areas_for_improvement
        .contains(&"Decision-making efficiency".to_string()));
    assert_eq!(
        report.expert_feedback[0],
        "This case highlights important learning opportunities."
    );
}

#[test]
fn test_complete_before_termination_is_invalid_state() {
    let engine = common::create_test_engine();
    let mut runner = engine.start_case_study(DEMO_CASE, Utc::now()).unwrap();
    runner.advance(choice("opt1", 80.0, 10.0)).unwrap();

    let err = engine.complete_case_study(&runner, Utc::now()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[test]
fn test_advance_after_termination_is_invalid_state() {
    let engine = common::create_test_engine();
    let mut runner = engine.start_case_study(DEMO_CASE, Utc::now()).unwrap();
    runner.advance(choice("opt1", 80.0, 10.0)).unwrap();
    runner.advance(choice("opt3", 80.0, 10.0)).unwrap();

    let err = runner.advance(choice("opt3", 80.0, 10.0)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(runner.path().len(), 2);
}

#[test]
fn test_option_from_another_node_is_rejected() {
    let engine = common::create_test_engine();
    let mut runner = engine.start_case_study(DEMO_CASE, Utc::now()).unwrap();

    let err = runner.advance(choice("opt3", 80.0, 10.0)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "option_id"));
    assert!(runner.path().is_empty());
    assert_eq!(runner.current_node().unwrap().node_id, "root");
}

#[test]
fn test_unknown_case_is_not_found() {
    let engine = common::create_test_engine();
    let err = engine
        .start_case_study("case_missing", Utc::now())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "case study", .. }));
}

#[test]
fn test_cyclic_case_is_rejected_at_load() {
    common::init_tracing();

    let mut case = fixtures::botox_consult_case();
    case.decision_tree[1].options[0].leads_to_node = Some("root".to_string());
    let bundle = ContentBundle {
        anatomy_regions: vec![],
        case_studies: vec![case],
        question_banks: vec![],
    };

    let err = InMemoryContentRepository::from_bundle(bundle).unwrap_err();
    assert!(matches!(err, EngineError::MalformedContent(_)));
}
