use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use validator::Validate;

use super::DifficultyLevel;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    MultipleSelect,
    Scale,
    Scenario,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::MultipleSelect => "multiple_select",
            QuestionType::Scale => "scale",
            QuestionType::Scenario => "scenario",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correct answer as authored; its shape depends on the question type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(i64),
    Text(String),
    List(Vec<String>),
}

/// Question as authored in content files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionRecord {
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_max: Option<i32>,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    pub knowledge_area: String,
    pub points: u32,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct: String,
    },
    MultipleSelect {
        options: Vec<String>,
        correct: BTreeSet<String>,
    },
    Scale {
        min: i32,
        max: i32,
        correct: i32,
    },
    Scenario {
        options: Vec<String>,
        correct: String,
    },
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::MultipleSelect { .. } => QuestionType::MultipleSelect,
            QuestionKind::Scale { .. } => QuestionType::Scale,
            QuestionKind::Scenario { .. } => QuestionType::Scenario,
        }
    }
}

/// Quiz question with its answer key checked against its type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct QuizQuestion {
    pub id: String,
    pub question_text: String,
    pub kind: QuestionKind,
    pub difficulty_level: DifficultyLevel,
    pub knowledge_area: String,
    pub points: u32,
    pub explanation: String,
    pub hint: Option<String>,
}

impl QuizQuestion {
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }
}

const DEFAULT_SCALE_MIN: i32 = 1;
const DEFAULT_SCALE_MAX: i32 = 10;

fn choice_answer(record: &QuestionRecord) -> Result<String, EngineError> {
    if record.options.is_empty() {
        return Err(EngineError::malformed(format!(
            "question `{}` has no options",
            record.id
        )));
    }
    match &record.correct_answer {
        AnswerValue::Text(answer) if record.options.contains(answer) => Ok(answer.clone()),
        AnswerValue::Text(answer) => Err(EngineError::malformed(format!(
            "question `{}` answer `{}` is not one of its options",
            record.id, answer
        ))),
        _ => Err(EngineError::malformed(format!(
            "question `{}` of type {} needs a single text answer",
            record.id, record.question_type
        ))),
    }
}

impl TryFrom<QuestionRecord> for QuizQuestion {
    type Error = EngineError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let kind = match record.question_type {
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice {
                correct: choice_answer(&record)?,
                options: record.options.clone(),
            },
            QuestionType::Scenario => QuestionKind::Scenario {
                correct: choice_answer(&record)?,
                options: record.options.clone(),
            },
            QuestionType::MultipleSelect => {
                let answers = match &record.correct_answer {
                    AnswerValue::List(answers) if !answers.is_empty() => answers,
                    _ => {
                        return Err(EngineError::malformed(format!(
                            "question `{}` of type multiple_select needs a non-empty answer list",
                            record.id
                        )))
                    }
                };
                if let Some(unknown) = answers.iter().find(|a| !record.options.contains(a)) {
                    return Err(EngineError::malformed(format!(
                        "question `{}` answer `{}` is not one of its options",
                        record.id, unknown
                    )));
                }
                let correct: BTreeSet<String> = answers.iter().cloned().collect();
                if correct.len() != answers.len() {
                    return Err(EngineError::malformed(format!(
                        "question `{}` lists a correct answer twice",
                        record.id
                    )));
                }
                QuestionKind::MultipleSelect {
                    options: record.options.clone(),
                    correct,
                }
            }
            QuestionType::Scale => {
                let min = record.scale_min.unwrap_or(DEFAULT_SCALE_MIN);
                let max = record.scale_max.unwrap_or(DEFAULT_SCALE_MAX);
                let correct = match &record.correct_answer {
                    AnswerValue::Number(value) => i32::try_from(*value).ok(),
                    AnswerValue::Text(value) => value.trim().parse::<i32>().ok(),
                    AnswerValue::List(_) => None,
                }
                .ok_or_else(|| {
                    EngineError::malformed(format!(
                        "question `{}` of type scale needs an integer answer",
                        record.id
                    ))
                })?;
                if min > max || !(min..=max).contains(&correct) {
                    return Err(EngineError::malformed(format!(
                        "question `{}` scale answer {} is outside {}-{}",
                        record.id, correct, min, max
                    )));
                }
                QuestionKind::Scale { min, max, correct }
            }
        };

        Ok(QuizQuestion {
            id: record.id,
            question_text: record.question_text,
            kind,
            difficulty_level: record.difficulty_level,
            knowledge_area: record.knowledge_area,
            points: record.points,
            explanation: record.explanation,
            hint: record.hint,
        })
    }
}

impl From<QuizQuestion> for QuestionRecord {
    fn from(question: QuizQuestion) -> Self {
        let question_type = question.question_type();
        let (options, correct_answer, scale_min, scale_max) = match question.kind {
            QuestionKind::MultipleChoice { options, correct }
            | QuestionKind::Scenario { options, correct } => {
                (options, AnswerValue::Text(correct), None, None)
            }
            QuestionKind::MultipleSelect { options, correct } => (
                options,
                AnswerValue::List(correct.into_iter().collect()),
                None,
                None,
            ),
            QuestionKind::Scale { min, max, correct } => (
                Vec::new(),
                AnswerValue::Number(correct as i64),
                Some(min),
                Some(max),
            ),
        };

        QuestionRecord {
            id: question.id,
            question_text: question.question_text,
            question_type,
            options,
            correct_answer,
            scale_min,
            scale_max,
            difficulty_level: question.difficulty_level,
            knowledge_area: question.knowledge_area,
            points: question.points,
            explanation: question.explanation,
            hint: question.hint,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionBank {
    pub id: String,
    pub category: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SelectedAnswer {
    Scale(i32),
    Single(String),
    Multiple(Vec<String>),
}

fn default_confidence() -> f64 {
    75.0
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct AnswerSubmission {
    pub selected: SelectedAnswer,
    #[validate(range(min = 0.0, message = "time taken must not be negative"))]
    pub time_taken_seconds: f64,
    #[serde(default = "default_confidence")]
    #[validate(range(min = 0.0, max = 100.0, message = "confidence must be within 0-100"))]
    pub confidence_level: f64,
    #[serde(default)]
    pub hint_used: bool,
    #[serde(default)]
    pub flagged_for_review: bool,
    #[serde(default)]
    pub explanation_viewed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionResponse {
    pub question_id: String,
    pub question_type: QuestionType,
    pub selected_answer: SelectedAnswer,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub time_taken_seconds: f64,
    pub confidence_level: f64,
    pub hint_used: bool,
    pub flagged_for_review: bool,
    pub explanation_viewed: bool,
    /// Difficulty the question was presented at, after adaptive nudging.
    pub difficulty_level: DifficultyLevel,
    pub knowledge_area: String,
}

fn default_adaptive() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizSettings {
    pub category: String,
    #[serde(default = "default_adaptive")]
    pub adaptive_mode: bool,
    #[serde(default)]
    pub certification_mode: bool,
    /// Overrides the certification countdown; also makes a practice quiz timed.
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    /// Case-insensitive fragment matched against each question's knowledge area.
    #[serde(default)]
    pub procedure_type: Option<String>,
    /// Requested set size; never above the mode's configured cap.
    #[serde(default)]
    pub question_count: Option<usize>,
}

impl QuizSettings {
    pub fn practice(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            adaptive_mode: true,
            certification_mode: false,
            time_limit_seconds: None,
            procedure_type: None,
            question_count: None,
        }
    }

    pub fn certification(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            adaptive_mode: false,
            certification_mode: true,
            time_limit_seconds: None,
            procedure_type: None,
            question_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    AllAnswered,
    Submitted,
    TimeExpired,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionReason::AllAnswered => "all_answered",
            CompletionReason::Submitted => "submitted",
            CompletionReason::TimeExpired => "time_expired",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AreaStats {
    pub answered: u32,
    pub correct: u32,
}

impl AreaStats {
    pub fn accuracy(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SpeedAnalysis {
    pub avg_time_per_question: f64,
    /// 0 when nothing was answered correctly.
    pub fastest_correct: f64,
    pub slowest_correct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceBreakdown {
    pub knowledge_areas: BTreeMap<String, AreaStats>,
    pub question_types: BTreeMap<QuestionType, u32>,
    pub difficulty_performance: BTreeMap<DifficultyLevel, u32>,
    pub speed_analysis: SpeedAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptiveInsights {
    pub recommended_difficulty: DifficultyLevel,
    pub knowledge_gaps: Vec<String>,
    pub strength_areas: Vec<String>,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResults {
    pub session_id: String,
    pub category: String,
    pub total_questions: u32,
    pub questions_answered: u32,
    pub correct_answers: u32,
    /// Rounded percentage of all questions in the set.
    pub score: u32,
    pub points_earned: u32,
    pub points_possible: u32,
    pub time_spent_seconds: f64,
    pub responses: Vec<QuestionResponse>,
    pub breakdown: PerformanceBreakdown,
    pub insights: AdaptiveInsights,
    pub certification_eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    pub improvement_suggestions: Vec<String>,
    pub expert_feedback: Vec<String>,
    pub completion_reason: CompletionReason,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
