//! Demo content and randomized learner behaviour for tests, demos and load runs.
//!
//! Nothing in the scoring or grading code depends on this module; every
//! generator takes an explicit RNG so runs can be reproduced from a seed.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::models::case_study::{
    CaseStudyRecord, DecisionChoice, DecisionNode, DecisionOption,
};
use crate::models::content::ContentBundle;
use crate::models::injection::{AnatomyRegion, DangerZone, InjectionSiteSpec, UserInput};
use crate::models::quiz::{
    AnswerSubmission, QuestionBank, QuestionKind, QuizQuestion, SelectedAnswer,
};
use crate::models::{DifficultyLevel, RiskLevel, Vector3};

pub const DEMO_REGION: &str = "Upper Face";
pub const DEMO_CASE: &str = "case_botox_consult";
pub const DEMO_CATEGORY: &str = "aesthetics";

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn demo_bundle() -> ContentBundle {
    ContentBundle {
        anatomy_regions: vec![upper_face()],
        case_studies: vec![botox_consult_case()],
        question_banks: vec![aesthetics_bank()],
    }
}

pub fn upper_face() -> AnatomyRegion {
    let brow_depressor = DangerZone {
        name: "Brow depressor area".to_string(),
        description: "Risk of brow ptosis if injected too low".to_string(),
        coordinates: Vector3::new(0.0, -20.0, 5.0),
        risk_level: RiskLevel::High,
        avoidance_technique: "Stay at least 1cm above the orbital rim".to_string(),
    };
    let supratrochlear = DangerZone {
        name: "Supratrochlear artery".to_string(),
        description: "Vascular occlusion risk near the medial brow".to_string(),
        coordinates: Vector3::new(8.0, -12.0, 3.0),
        risk_level: RiskLevel::Critical,
        avoidance_technique: "Aspirate and inject slowly, stay superficial".to_string(),
    };

    AnatomyRegion {
        name: DEMO_REGION.to_string(),
        key_structures: vec![
            "Frontalis muscle".to_string(),
            "Corrugator supercilii".to_string(),
            "Procerus muscle".to_string(),
        ],
        injection_sites: vec![
            InjectionSiteSpec {
                name: "Frontalis - Central".to_string(),
                coordinates: Vector3::default(),
                angle: 90.0,
                depth_mm: 4.0,
                typical_dosage: 4.0,
                danger_zones: vec![brow_depressor.clone()],
                anatomical_landmarks: vec!["Hairline".to_string(), "Midline".to_string()],
                technique_notes: vec![
                    "Inject perpendicular to skin".to_string(),
                    "Avoid over-injection centrally".to_string(),
                ],
            },
            InjectionSiteSpec {
                name: "Glabella - Procerus".to_string(),
                coordinates: Vector3::new(0.0, -10.0, 2.0),
                angle: 75.0,
                depth_mm: 5.0,
                typical_dosage: 10.0,
                danger_zones: vec![brow_depressor, supratrochlear],
                anatomical_landmarks: vec!["Nasion".to_string(), "Medial brow".to_string()],
                technique_notes: vec!["Pinch the procerus before injecting".to_string()],
            },
        ],
    }
}

fn option(
    id: &str,
    text: &str,
    is_optimal: bool,
    risk_level: RiskLevel,
    consequence: &str,
    leads_to_node: Option<&str>,
    expert_notes: &str,
) -> DecisionOption {
    DecisionOption {
        option_id: id.to_string(),
        option_text: text.to_string(),
        is_optimal,
        risk_level,
        consequence: consequence.to_string(),
        leads_to_node: leads_to_node.map(str::to_string),
        expert_notes: Some(expert_notes.to_string()),
    }
}

pub fn botox_consult_case() -> CaseStudyRecord {
    CaseStudyRecord {
        case_id: DEMO_CASE.to_string(),
        title: "Facial rejuvenation consultation".to_string(),
        clinical_presentation: "Patient seeking facial rejuvenation".to_string(),
        difficulty_level: DifficultyLevel::Intermediate,
        learning_objectives: vec![
            "Proper patient assessment".to_string(),
            "Safe injection technique".to_string(),
            "Managing expectations".to_string(),
        ],
        decision_tree: vec![
            DecisionNode {
                node_id: "root".to_string(),
                is_root: true,
                scenario: "Patient presents for facial rejuvenation consultation. How do you proceed?"
                    .to_string(),
                hints: vec![
                    "Consider patient age and skin type".to_string(),
                    "Evaluate medical history".to_string(),
                ],
                options: vec![
                    option(
                        "opt1",
                        "Recommend Botox for dynamic wrinkles",
                        true,
                        RiskLevel::Low,
                        "Good choice for initial treatment",
                        Some("node2"),
                        "Botox is a safe starting point for most patients",
                    ),
                    option(
                        "opt2",
                        "Suggest dermal fillers immediately",
                        false,
                        RiskLevel::Medium,
                        "May be too aggressive for first-time patients",
                        Some("node3"),
                        "Consider starting with less invasive options",
                    ),
                ],
            },
            DecisionNode {
                node_id: "node2".to_string(),
                is_root: false,
                scenario: "Patient is interested in Botox. What areas do you recommend treating first?"
                    .to_string(),
                hints: vec![
                    "Start conservatively".to_string(),
                    "Focus on most bothersome areas".to_string(),
                ],
                options: vec![option(
                    "opt3",
                    "Start with crow's feet and forehead lines",
                    true,
                    RiskLevel::Low,
                    "Natural-looking results",
                    None,
                    "Conservative approach builds trust",
                )],
            },
            DecisionNode {
                node_id: "node3".to_string(),
                is_root: false,
                scenario: "Patient hesitates about fillers. How do you address their concerns?"
                    .to_string(),
                hints: vec![
                    "Education is key".to_string(),
                    "Address specific concerns".to_string(),
                ],
                options: vec![option(
                    "opt4",
                    "Explain the safety profile and reversibility of HA fillers",
                    true,
                    RiskLevel::Low,
                    "Patient feels more informed and comfortable",
                    None,
                    "Education builds confidence",
                )],
            },
        ],
    }
}

fn texts(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn aesthetics_bank() -> QuestionBank {
    let contraindications = texts(&[
        "Pregnancy",
        "Active skin infection at injection site",
        "Myasthenia gravis",
        "Previous allergic reaction to botulinum toxin",
        "Age over 65",
    ]);

    QuestionBank {
        id: "bank_aesthetics_core".to_string(),
        category: DEMO_CATEGORY.to_string(),
        questions: vec![
            QuizQuestion {
                id: "q1".to_string(),
                question_text: "What is the optimal injection depth for nasolabial fold treatment with hyaluronic acid fillers?".to_string(),
                kind: QuestionKind::MultipleChoice {
                    options: texts(&[
                        "Superficial dermal (1-2mm)",
                        "Mid-dermal (2-4mm)",
                        "Deep dermal (4-6mm)",
                        "Subcutaneous (6-8mm)",
                    ]),
                    correct: "Mid-dermal (2-4mm)".to_string(),
                },
                difficulty_level: DifficultyLevel::Intermediate,
                knowledge_area: "Injection Technique".to_string(),
                points: 10,
                explanation: "Mid-dermal injection (2-4mm) provides optimal volumization and natural appearance for nasolabial folds while minimizing risks of Tyndall effect or vascular compromise.".to_string(),
                hint: Some("Consider the anatomy of the nasolabial fold and the goal of natural volumization.".to_string()),
            },
            QuizQuestion {
                id: "q2".to_string(),
                question_text: "Which of the following are contraindications for botulinum toxin treatment? (Select all that apply)".to_string(),
                kind: QuestionKind::MultipleSelect {
                    correct: contraindications[..4].iter().cloned().collect(),
                    options: contraindications,
                },
                difficulty_level: DifficultyLevel::Intermediate,
                knowledge_area: "Patient Safety".to_string(),
                points: 15,
                explanation: "Age over 65 is not a contraindication, but requires careful assessment. The other options represent absolute or relative contraindications.".to_string(),
                hint: Some("Consider both absolute and relative contraindications for neurotoxin therapy.".to_string()),
            },
            QuizQuestion {
                id: "q3".to_string(),
                question_text: "Rate the importance of obtaining informed consent before aesthetic procedures (1-10 scale):".to_string(),
                kind: QuestionKind::Scale {
                    min: 1,
                    max: 10,
                    correct: 10,
                },
                difficulty_level: DifficultyLevel::Beginner,
                knowledge_area: "Ethics and Legal".to_string(),
                points: 5,
                explanation: "Informed consent is absolutely critical (10/10) for all aesthetic procedures, both legally and ethically.".to_string(),
                hint: Some("Consider the legal and ethical imperatives in aesthetic medicine.".to_string()),
            },
            QuizQuestion {
                id: "q4".to_string(),
                question_text: "A 45-year-old patient presents with asymmetric lip augmentation performed 2 weeks ago. What is your immediate management approach?".to_string(),
                kind: QuestionKind::Scenario {
                    options: texts(&[
                        "Immediate hyaluronidase injection",
                        "Wait 4-6 weeks for complete healing",
                        "Massage and ice therapy",
                        "Additional filler to balance the left side",
                    ]),
                    correct: "Wait 4-6 weeks for complete healing".to_string(),
                },
                difficulty_level: DifficultyLevel::Advanced,
                knowledge_area: "Complication Management".to_string(),
                points: 20,
                explanation: "At 2 weeks post-injection, swelling is normal and asymmetry often resolves. Evaluation should occur after complete healing (4-6 weeks) before any corrective measures.".to_string(),
                hint: Some("Consider the normal healing timeline and when final results are typically visible.".to_string()),
            },
        ],
    }
}

/// A plausible attempt at `site`; `skill` in 0-1 shrinks every deviation.
pub fn random_user_input<R: Rng + ?Sized>(
    rng: &mut R,
    site: &InjectionSiteSpec,
    skill: f64,
) -> UserInput {
    let skill = skill.clamp(0.0, 1.0);
    let spread = 1.0 - skill;
    let optimal_volume = site.optimal_volume(0.1);

    UserInput {
        angle: (site.angle + rng.random_range(-30.0..=30.0) * spread).clamp(0.0, 90.0),
        depth: (site.depth_mm + rng.random_range(-3.0..=3.0) * spread).max(0.1),
        velocity: (5.0 + rng.random_range(-5.0..=8.0) * spread).max(0.0),
        volume: (optimal_volume + rng.random_range(-0.5..=0.5) * spread).max(0.0),
        approach_vector: Vector3::new(
            site.coordinates.x + rng.random_range(-5.0..=5.0),
            site.coordinates.y + rng.random_range(-5.0..=5.0),
            site.coordinates.z + rng.random_range(-5.0..=5.0),
        ),
        hand_stability: (60.0 + 40.0 * skill + rng.random_range(-10.0..=10.0)).clamp(0.0, 100.0),
        preparation_time: rng.random_range(5.0..=60.0),
    }
}

/// Picks an option at `node`, preferring the optimal one with probability `skill`.
pub fn random_choice<R: Rng + ?Sized>(rng: &mut R, node: &DecisionNode, skill: f64) -> DecisionChoice {
    let optimal = node.options.iter().find(|opt| opt.is_optimal);
    let picked = match optimal {
        Some(opt) if rng.random_bool(skill.clamp(0.0, 1.0)) => Some(opt),
        _ => node.options.choose(rng),
    };

    DecisionChoice {
        option_id: picked.map(|opt| opt.option_id.clone()).unwrap_or_default(),
        time_taken_seconds: rng.random_range(5.0..=150.0),
        confidence_level: rng.random_range(40.0..=100.0),
        reasoning: None,
    }
}

/// Answers `question` correctly with probability `skill`.
pub fn random_answer<R: Rng + ?Sized>(
    rng: &mut R,
    question: &QuizQuestion,
    skill: f64,
) -> AnswerSubmission {
    let knows = rng.random_bool(skill.clamp(0.0, 1.0));
    let selected = match &question.kind {
        QuestionKind::MultipleChoice { options, correct }
        | QuestionKind::Scenario { options, correct } => {
            let answer = if knows {
                Some(correct)
            } else {
                options.choose(rng)
            };
            SelectedAnswer::Single(answer.cloned().unwrap_or_default())
        }
        QuestionKind::MultipleSelect { options, correct } => {
            let answers = if knows {
                correct.iter().cloned().collect()
            } else {
                options
                    .iter()
                    .filter(|_| rng.random_bool(0.5))
                    .cloned()
                    .collect()
            };
            SelectedAnswer::Multiple(answers)
        }
        QuestionKind::Scale { min, max, correct } => {
            if knows {
                SelectedAnswer::Scale(*correct)
            } else {
                SelectedAnswer::Scale(rng.random_range(*min..=*max))
            }
        }
    };

    AnswerSubmission {
        selected,
        time_taken_seconds: rng.random_range(5.0..=120.0),
        confidence_level: rng.random_range(30.0..=100.0),
        hint_used: rng.random_bool(0.2),
        flagged_for_review: false,
        explanation_viewed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::content_service::{ContentRepository, InMemoryContentRepository};

    #[test]
    fn demo_bundle_passes_content_checks() {
        assert!(InMemoryContentRepository::from_bundle(demo_bundle()).is_ok());
    }

    #[test]
    fn demo_bundle_round_trips_through_json() {
        let json = serde_json::to_string(&demo_bundle()).unwrap();
        let repo = InMemoryContentRepository::from_json_str(&json).unwrap();
        assert!(repo.case_study_ids().contains(&DEMO_CASE.to_string()));
    }

    #[test]
    fn generated_inputs_are_valid_and_reproducible() {
        let site = &upper_face().injection_sites[1];
        let mut a = seeded_rng(7);
        let mut b = seeded_rng(7);

        for _ in 0..50 {
            let input = random_user_input(&mut a, site, 0.4);
            assert!(input.check().is_ok(), "invalid generated input: {:?}", input);
            assert_eq!(input, random_user_input(&mut b, site, 0.4));
        }
    }

    #[test]
    fn skilled_learner_always_answers_correctly() {
        let mut rng = seeded_rng(11);
        let bank = aesthetics_bank();
        let q2 = &bank.questions[1];
        let answer = random_answer(&mut rng, q2, 1.0);
        assert_eq!(
            answer.selected,
            SelectedAnswer::Multiple(texts(&[
                "Active skin infection at injection site",
                "Myasthenia gravis",
                "Pregnancy",
                "Previous allergic reaction to botulinum toxin",
            ]))
        );
    }
}
