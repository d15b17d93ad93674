use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;
use validator::Validate;

use crate::config::QuizConfig;
use crate::error::{ensure_finite, EngineError, EngineResult};
use crate::metrics::{bool_label, CERTIFICATIONS_TOTAL, QUIZ_ANSWERS_TOTAL, QUIZ_COMPLETIONS_TOTAL};
use crate::models::quiz::{
    AdaptiveInsights, AnswerSubmission, AreaStats, CompletionReason, PerformanceBreakdown,
    QuestionKind, QuestionResponse, QuizQuestion, QuizResults, QuizSettings, SelectedAnswer,
    SpeedAnalysis,
};
use crate::models::timer::{QuizClock, TimeExpired, TimerEvent, TimerTick};
use crate::models::DifficultyLevel;
use crate::utils::stats::{max_or_zero, mean, min_or_zero};

const ADVANCED_SCORE: u32 = 90;
const STRONG_SCORE: u32 = 80;
const PASSING_SCORE: u32 = 70;
const LOW_CONFIDENCE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    NotStarted,
    InProgress(usize),
    Completed,
}

/// The question currently on screen, with its adaptive difficulty tag.
#[derive(Debug, Clone, Copy)]
pub struct PresentedQuestion<'a> {
    pub index: usize,
    pub question: &'a QuizQuestion,
    pub difficulty: DifficultyLevel,
}

/// Runs one quiz session: grading, adaptive difficulty and certification.
///
/// The countdown of a timed quiz only moves through [`AdaptiveQuizEngine::tick`];
/// the engine never reads a clock of its own.
#[derive(Debug, Clone)]
pub struct AdaptiveQuizEngine {
    session_id: String,
    settings: QuizSettings,
    config: QuizConfig,
    state: QuizState,
    questions: Vec<QuizQuestion>,
    presented: Vec<DifficultyLevel>,
    responses: Vec<QuestionResponse>,
    clock: Option<QuizClock>,
    started_at: DateTime<Utc>,
    results: Option<QuizResults>,
}

impl AdaptiveQuizEngine {
    pub fn new(settings: QuizSettings, config: QuizConfig) -> Self {
        Self {
            session_id: format!("quiz_{}", Uuid::new_v4()),
            settings,
            config,
            state: QuizState::NotStarted,
            questions: Vec::new(),
            presented: Vec::new(),
            responses: Vec::new(),
            clock: None,
            started_at: Utc::now(),
            results: None,
        }
    }

    pub fn start(
        &mut self,
        questions: Vec<QuizQuestion>,
        started_at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.state != QuizState::NotStarted {
            return Err(EngineError::invalid_state(format!(
                "quiz {} has already started",
                self.session_id
            )));
        }
        if questions.is_empty() {
            return Err(EngineError::malformed(format!(
                "quiz category `{}` has no questions",
                self.settings.category
            )));
        }
        let mut ids = HashSet::new();
        for question in &questions {
            if !ids.insert(question.id.clone()) {
                return Err(EngineError::malformed(format!(
                    "question id `{}` appears twice",
                    question.id
                )));
            }
        }
        if self.settings.time_limit_seconds == Some(0) {
            return Err(EngineError::invalid_input(
                "time_limit_seconds",
                "time limit must be positive",
            ));
        }
        if self.settings.question_count == Some(0) {
            return Err(EngineError::invalid_input(
                "question_count",
                "question count must be positive",
            ));
        }

        let questions = self.select_questions(questions)?;
        self.clock = match self.settings.time_limit_seconds {
            Some(limit) => Some(QuizClock::new(limit)),
            None if self.settings.certification_mode => {
                let total = u32::try_from(questions.len())
                    .ok()
                    .and_then(|count| count.checked_mul(self.config.seconds_per_question))
                    .ok_or_else(|| {
                        EngineError::invalid_input(
                            "seconds_per_question",
                            "certification countdown does not fit in u32 seconds",
                        )
                    })?;
                Some(QuizClock::new(total))
            }
            None => None,
        };
        self.presented = questions.iter().map(|q| q.difficulty_level).collect();
        self.questions = questions;
        self.started_at = started_at;
        self.state = QuizState::InProgress(0);

        tracing::info!(
            "Quiz started: session={}, category={}, questions={}, adaptive={}, certification={}, time_limit={:?}",
            self.session_id,
            self.settings.category,
            self.questions.len(),
            self.settings.adaptive_mode,
            self.settings.certification_mode,
            self.clock.map(|c| c.total_seconds)
        );
        Ok(())
    }

    /// Narrows the bank to the requested procedure type and caps its size.
    fn select_questions(&self, questions: Vec<QuizQuestion>) -> EngineResult<Vec<QuizQuestion>> {
        let cap = if self.settings.certification_mode {
            self.config.certification_question_cap
        } else {
            self.config.practice_question_cap
        };
        let limit = self.settings.question_count.map_or(cap, |count| count.min(cap));

        let fragment = self
            .settings
            .procedure_type
            .as_deref()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty());
        let selected: Vec<QuizQuestion> = questions
            .into_iter()
            .filter(|q| match &fragment {
                Some(fragment) => q.knowledge_area.to_lowercase().contains(fragment.as_str()),
                None => true,
            })
            .take(limit)
            .collect();

        if selected.is_empty() {
            return Err(EngineError::invalid_input(
                "procedure_type",
                format!(
                    "no question in category `{}` matches `{}`",
                    self.settings.category,
                    fragment.unwrap_or_default()
                ),
            ));
        }
        Ok(selected)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn responses(&self) -> &[QuestionResponse] {
        &self.responses
    }

    pub fn results(&self) -> Option<&QuizResults> {
        self.results.as_ref()
    }

    pub fn remaining_time_seconds(&self) -> Option<u32> {
        self.clock.map(|c| c.remaining_seconds)
    }

    pub fn current_question(&self) -> Option<PresentedQuestion<'_>> {
        let QuizState::InProgress(index) = self.state else {
            return None;
        };
        Some(PresentedQuestion {
            index,
            question: self.questions.get(index)?,
            difficulty: *self.presented.get(index)?,
        })
    }

    /// Grades the current question and moves on; the last answer completes the
    /// quiz with `answered_at` as its completion time.
    pub fn answer(
        &mut self,
        submission: AnswerSubmission,
        answered_at: DateTime<Utc>,
    ) -> EngineResult<&QuestionResponse> {
        let QuizState::InProgress(index) = self.state else {
            return Err(EngineError::invalid_state(format!(
                "quiz {} is not in progress",
                self.session_id
            )));
        };

        ensure_finite("time_taken_seconds", submission.time_taken_seconds)?;
        ensure_finite("confidence_level", submission.confidence_level)?;
        submission.validate()?;
        if self.settings.certification_mode {
            if submission.hint_used {
                return Err(EngineError::invalid_input(
                    "hint_used",
                    "hints are not available in certification mode",
                ));
            }
            if submission.explanation_viewed {
                return Err(EngineError::invalid_input(
                    "explanation_viewed",
                    "explanations are not available in certification mode",
                ));
            }
        }

        let question = self.questions.get(index).ok_or_else(|| {
            EngineError::invalid_state(format!("question index {} is out of range", index))
        })?;
        let is_correct = grade(question, &submission.selected)?;
        let question_type = question.question_type();

        let response = QuestionResponse {
            question_id: question.id.clone(),
            question_type,
            selected_answer: submission.selected,
            is_correct,
            points_awarded: if is_correct { question.points } else { 0 },
            time_taken_seconds: submission.time_taken_seconds,
            confidence_level: submission.confidence_level,
            hint_used: submission.hint_used,
            flagged_for_review: submission.flagged_for_review,
            explanation_viewed: submission.explanation_viewed,
            difficulty_level: self.presented[index],
            knowledge_area: question.knowledge_area.clone(),
        };

        QUIZ_ANSWERS_TOTAL
            .with_label_values(&[question_type.as_str(), bool_label(is_correct)])
            .inc();
        tracing::debug!(
            "Quiz answer graded: session={}, question={}, type={}, correct={}, time={:.1}s",
            self.session_id,
            response.question_id,
            question_type,
            is_correct,
            response.time_taken_seconds
        );

        let next = index + 1;
        if self.settings.adaptive_mode && next < self.questions.len() {
            self.nudge_difficulty(next, &response);
        }
        self.responses.push(response);

        if next >= self.questions.len() {
            self.complete(CompletionReason::AllAnswered, answered_at);
        } else {
            self.state = QuizState::InProgress(next);
        }

        self.responses
            .last()
            .ok_or_else(|| EngineError::invalid_state("response was not recorded"))
    }

    /// Advances the countdown of a timed quiz. Reaching zero submits what has been answered.
    pub fn tick(
        &mut self,
        elapsed_seconds: u32,
        ticked_at: DateTime<Utc>,
    ) -> EngineResult<Option<TimerEvent>> {
        match self.state {
            QuizState::NotStarted => {
                return Err(EngineError::invalid_state(format!(
                    "quiz {} has not started",
                    self.session_id
                )))
            }
            QuizState::Completed => return Ok(None),
            QuizState::InProgress(_) => {}
        }
        let Some(clock) = self.clock.as_mut() else {
            return Ok(None);
        };

        let remaining_seconds = clock.tick(elapsed_seconds);
        let total_seconds = clock.total_seconds;
        if remaining_seconds > 0 {
            return Ok(Some(TimerEvent::TimerTick(TimerTick {
                session_id: self.session_id.clone(),
                remaining_seconds,
                elapsed_seconds: clock.elapsed_seconds(),
                total_seconds,
            })));
        }

        tracing::warn!(
            "Quiz time expired: session={}, answered={}/{}",
            self.session_id,
            self.responses.len(),
            self.questions.len()
        );
        self.complete(CompletionReason::TimeExpired, ticked_at);
        Ok(Some(TimerEvent::TimeExpired(TimeExpired {
            session_id: self.session_id.clone(),
            total_seconds,
            message: "Time is up! Your answers have been submitted automatically.".to_string(),
        })))
    }

    /// Ends the quiz early; unanswered questions count as incorrect.
    pub fn submit(&mut self, finished_at: DateTime<Utc>) -> EngineResult<&QuizResults> {
        if !matches!(self.state, QuizState::InProgress(_)) {
            return Err(EngineError::invalid_state(format!(
                "quiz {} is not in progress",
                self.session_id
            )));
        }
        self.complete(CompletionReason::Submitted, finished_at);
        self.results
            .as_ref()
            .ok_or_else(|| EngineError::invalid_state("quiz results were not produced"))
    }

    fn nudge_difficulty(&mut self, next: usize, last: &QuestionResponse) {
        let adjusted = if last.is_correct && last.time_taken_seconds < self.config.fast_answer_seconds
        {
            Some(DifficultyLevel::Advanced)
        } else if !last.is_correct || last.time_taken_seconds > self.config.slow_answer_seconds {
            Some(DifficultyLevel::Beginner)
        } else {
            None
        };

        if let Some(level) = adjusted {
            tracing::debug!(
                "Adaptive difficulty: session={}, question_index={}, level={}",
                self.session_id,
                next,
                level.as_str()
            );
            self.presented[next] = level;
        }
    }

    fn complete(&mut self, reason: CompletionReason, finished_at: DateTime<Utc>) {
        let results = self.build_results(reason, finished_at);

        QUIZ_COMPLETIONS_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
        if self.settings.certification_mode {
            let label = if results.certification_eligible {
                "passed"
            } else {
                "failed"
            };
            CERTIFICATIONS_TOTAL.with_label_values(&[label]).inc();
        }
        tracing::info!(
            "Quiz completed: session={}, reason={}, score={}, answered={}/{}, certification_eligible={}",
            self.session_id,
            reason.as_str(),
            results.score,
            results.questions_answered,
            results.total_questions,
            results.certification_eligible
        );

        self.results = Some(results);
        self.state = QuizState::Completed;
    }

    fn build_results(&self, reason: CompletionReason, finished_at: DateTime<Utc>) -> QuizResults {
        let responses = &self.responses;
        let total_questions = self.questions.len() as u32;
        let correct_answers = responses.iter().filter(|r| r.is_correct).count() as u32;
        let score = if total_questions == 0 {
            0
        } else {
            (correct_answers as f64 / total_questions as f64 * 100.0).round() as u32
        };

        let breakdown = self.breakdown();
        let knowledge_gaps: Vec<String> = breakdown
            .knowledge_areas
            .iter()
            .filter(|(_, stats)| stats.accuracy() < self.config.knowledge_gap_ratio)
            .map(|(area, _)| area.clone())
            .collect();
        let strength_areas: Vec<String> = breakdown
            .knowledge_areas
            .iter()
            .filter(|(_, stats)| stats.accuracy() >= self.config.strength_ratio)
            .map(|(area, _)| area.clone())
            .collect();

        let recommended_difficulty = if score >= ADVANCED_SCORE {
            DifficultyLevel::Advanced
        } else if score >= PASSING_SCORE {
            DifficultyLevel::Intermediate
        } else {
            DifficultyLevel::Beginner
        };

        let certification_eligible =
            self.settings.certification_mode && score >= self.config.certification_threshold;
        let certificate_id = certification_eligible
            .then(|| format!("Certificate_{}_{}", self.settings.category, Uuid::new_v4()));

        let answer_time: f64 = responses.iter().map(|r| r.time_taken_seconds).sum();
        let time_spent_seconds = match self.clock {
            Some(clock) => answer_time.max(clock.elapsed_seconds() as f64),
            None => answer_time,
        };

        QuizResults {
            session_id: self.session_id.clone(),
            category: self.settings.category.clone(),
            total_questions,
            questions_answered: responses.len() as u32,
            correct_answers,
            score,
            points_earned: responses.iter().map(|r| r.points_awarded).sum(),
            points_possible: self.questions.iter().map(|q| q.points).sum(),
            time_spent_seconds,
            responses: responses.clone(),
            breakdown,
            insights: AdaptiveInsights {
                recommended_difficulty,
                next_steps: next_steps(score, &knowledge_gaps),
                knowledge_gaps: knowledge_gaps.clone(),
                strength_areas,
            },
            certification_eligible,
            certificate_id,
            improvement_suggestions: self.improvement_suggestions(),
            expert_feedback: expert_feedback(score, &knowledge_gaps),
            completion_reason: reason,
            started_at: self.started_at,
            completed_at: finished_at.max(self.started_at),
        }
    }

    fn breakdown(&self) -> PerformanceBreakdown {
        let mut knowledge_areas: BTreeMap<String, AreaStats> = BTreeMap::new();
        let mut question_types = BTreeMap::new();
        let mut difficulty_performance = BTreeMap::new();

        for response in &self.responses {
            let correct = u32::from(response.is_correct);
            let area = knowledge_areas
                .entry(response.knowledge_area.clone())
                .or_default();
            area.answered += 1;
            area.correct += correct;
            *question_types.entry(response.question_type).or_insert(0) += correct;
            *difficulty_performance
                .entry(response.difficulty_level)
                .or_insert(0) += correct;
        }

        let correct_times = || {
            self.responses
                .iter()
                .filter(|r| r.is_correct)
                .map(|r| r.time_taken_seconds)
        };

        PerformanceBreakdown {
            knowledge_areas,
            question_types,
            difficulty_performance,
            speed_analysis: SpeedAnalysis {
                avg_time_per_question: mean(self.responses.iter().map(|r| r.time_taken_seconds)),
                fastest_correct: min_or_zero(correct_times()),
                slowest_correct: max_or_zero(correct_times()),
            },
        }
    }

    fn improvement_suggestions(&self) -> Vec<String> {
        let total = self.responses.len() as f64;
        let slow = self
            .responses
            .iter()
            .filter(|r| r.time_taken_seconds > self.config.slow_answer_seconds)
            .count() as f64;
        let hinted = self.responses.iter().filter(|r| r.hint_used).count() as f64;
        let hesitant = self
            .responses
            .iter()
            .filter(|r| r.confidence_level < LOW_CONFIDENCE)
            .count() as f64;

        let mut suggestions = Vec::new();
        if slow > total * 0.3 {
            suggestions.push("Work on decision-making speed through practice scenarios".to_string());
        }
        if hinted > total * 0.5 {
            suggestions.push("Review core concepts to reduce dependency on hints".to_string());
        }
        if hesitant > total * 0.3 {
            suggestions.push("Build confidence through additional practice and study".to_string());
        }
        suggestions
    }
}

/// Type-specific comparator. Shape mismatches are the caller's fault.
fn grade(question: &QuizQuestion, selected: &SelectedAnswer) -> EngineResult<bool> {
    match (&question.kind, selected) {
        (
            QuestionKind::MultipleChoice { correct, .. } | QuestionKind::Scenario { correct, .. },
            SelectedAnswer::Single(answer),
        ) => Ok(answer == correct),
        (QuestionKind::MultipleSelect { correct, .. }, SelectedAnswer::Multiple(answers)) => {
            let chosen: BTreeSet<&String> = answers.iter().collect();
            Ok(answers.len() == correct.len() && chosen.into_iter().eq(correct.iter()))
        }
        (QuestionKind::MultipleSelect { correct, .. }, SelectedAnswer::Single(answer)) => {
            Ok(correct.len() == 1 && correct.contains(answer))
        }
        (QuestionKind::Scale { min, max, correct }, answer) => {
            let value = match answer {
                SelectedAnswer::Scale(value) => *value,
                SelectedAnswer::Single(text) => text.trim().parse::<i32>().map_err(|_| {
                    EngineError::invalid_input("selected", "scale answer must be an integer")
                })?,
                SelectedAnswer::Multiple(_) => {
                    return Err(EngineError::invalid_input(
                        "selected",
                        "scale question takes a single value",
                    ))
                }
            };
            if !(*min..=*max).contains(&value) {
                return Err(EngineError::invalid_input(
                    "selected",
                    format!("scale answer {} is outside {}-{}", value, min, max),
                ));
            }
            Ok((value - correct).abs() <= 1)
        }
        (kind, _) => Err(EngineError::invalid_input(
            "selected",
            format!("answer shape does not fit a {} question", kind.question_type()),
        )),
    }
}

fn next_steps(score: u32, gaps: &[String]) -> Vec<String> {
    let (first, second) = if score >= ADVANCED_SCORE {
        (
            "Consider advancing to expert-level content",
            "Explore specialized procedure modules",
        )
    } else if score >= PASSING_SCORE {
        (
            "Review knowledge gaps in specific areas",
            "Practice with case studies",
        )
    } else {
        (
            "Revisit fundamental concepts",
            "Complete prerequisite modules",
        )
    };

    let mut steps = vec![first.to_string(), second.to_string()];
    if !gaps.is_empty() {
        steps.push(format!("Focus on improving: {}", gaps.join(", ")));
    }
    steps
}

fn expert_feedback(score: u32, gaps: &[String]) -> Vec<String> {
    let (first, second) = if score >= ADVANCED_SCORE {
        (
            "Excellent performance! You demonstrate mastery of the subject matter.",
            "Your consistent accuracy shows strong foundational knowledge.",
        )
    } else if score >= STRONG_SCORE {
        (
            "Strong performance with room for minor improvements.",
            "Focus on areas where you lost points to achieve mastery.",
        )
    } else if score >= PASSING_SCORE {
        (
            "Good understanding with several areas needing attention.",
            "Review the explanations for missed questions carefully.",
        )
    } else {
        (
            "Consider additional study before retaking the assessment.",
            "Focus on fundamental concepts before advancing.",
        )
    };

    let mut feedback = vec![first.to_string(), second.to_string()];
    if !gaps.is_empty() {
        feedback.push(format!("Priority review areas: {}", gaps.join(", ")));
    }
    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuestionType;

    fn choice_question(id: &str, area: &str) -> QuizQuestion {
        QuizQuestion {
            id: id.to_string(),
            question_text: format!("Question {}", id),
            kind: QuestionKind::MultipleChoice {
                options: vec!["a".to_string(), "b".to_string()],
                correct: "a".to_string(),
            },
            difficulty_level: DifficultyLevel::Intermediate,
            knowledge_area: area.to_string(),
            points: 10,
            explanation: String::new(),
            hint: None,
        }
    }

    fn scale_question() -> QuizQuestion {
        QuizQuestion {
            kind: QuestionKind::Scale {
                min: 1,
                max: 10,
                correct: 7,
            },
            ..choice_question("scale", "Consent")
        }
    }

    fn select_question() -> QuizQuestion {
        QuizQuestion {
            kind: QuestionKind::MultipleSelect {
                options: vec!["x".into(), "y".into(), "z".into()],
                correct: ["x".to_string(), "y".to_string()].into_iter().collect(),
            },
            ..choice_question("select", "Safety")
        }
    }

    fn submission(selected: SelectedAnswer, seconds: f64) -> AnswerSubmission {
        AnswerSubmission {
            selected,
            time_taken_seconds: seconds,
            confidence_level: 80.0,
            hint_used: false,
            flagged_for_review: false,
            explanation_viewed: false,
        }
    }

    fn single(answer: &str) -> SelectedAnswer {
        SelectedAnswer::Single(answer.to_string())
    }

    fn multiple(answers: &[&str]) -> SelectedAnswer {
        SelectedAnswer::Multiple(answers.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn scale_tolerance_is_one_point() {
        let q = scale_question();
        assert!(grade(&q, &SelectedAnswer::Scale(6)).unwrap());
        assert!(grade(&q, &SelectedAnswer::Scale(8)).unwrap());
        assert!(!grade(&q, &SelectedAnswer::Scale(5)).unwrap());
        assert!(grade(&q, &single("7")).unwrap());
        assert!(grade(&q, &SelectedAnswer::Scale(11)).is_err());
    }

    #[test]
    fn multiple_select_needs_exact_set() {
        let q = select_question();
        assert!(grade(&q, &multiple(&["y", "x"])).unwrap());
        assert!(!grade(&q, &multiple(&["x"])).unwrap());
        assert!(!grade(&q, &multiple(&["x", "y", "z"])).unwrap());
        assert!(!grade(&q, &multiple(&["x", "x"])).unwrap());
        assert!(!grade(&q, &single("x")).unwrap());
    }

    #[test]
    fn choice_rejects_list_answers() {
        let q = choice_question("q", "Anatomy");
        assert!(grade(&q, &single("a")).unwrap());
        assert!(!grade(&q, &single("c")).unwrap());
        assert!(matches!(
            grade(&q, &multiple(&["a"])),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn empty_question_set_is_malformed() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        assert!(matches!(
            quiz.start(vec![], Utc::now()),
            Err(EngineError::MalformedContent(_))
        ));
        assert_eq!(quiz.state(), QuizState::NotStarted);
    }

    #[test]
    fn answering_before_start_is_invalid_state() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        let err = quiz.answer(submission(single("a"), 5.0), Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn fast_correct_answer_bumps_next_question() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(
            vec![
                choice_question("q1", "Anatomy"),
                choice_question("q2", "Anatomy"),
                choice_question("q3", "Anatomy"),
            ],
            Utc::now(),
        )
        .unwrap();

        quiz.answer(submission(single("a"), 12.0), Utc::now()).unwrap();
        assert_eq!(quiz.current_question().unwrap().difficulty, DifficultyLevel::Advanced);

        quiz.answer(submission(single("a"), 60.0), Utc::now()).unwrap();
        // neither fast nor slow: the authored tag stays
        assert_eq!(
            quiz.current_question().unwrap().difficulty,
            DifficultyLevel::Intermediate
        );
    }

    #[test]
    fn wrong_answer_drops_next_question_to_beginner() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(
            vec![choice_question("q1", "Anatomy"), choice_question("q2", "Anatomy")],
            Utc::now(),
        )
        .unwrap();
        quiz.answer(submission(single("b"), 5.0), Utc::now()).unwrap();
        assert_eq!(quiz.current_question().unwrap().difficulty, DifficultyLevel::Beginner);
    }

    #[test]
    fn non_adaptive_quiz_keeps_authored_difficulty() {
        let mut settings = QuizSettings::practice("botox");
        settings.adaptive_mode = false;
        let mut quiz = AdaptiveQuizEngine::new(settings, QuizConfig::default());
        quiz.start(
            vec![choice_question("q1", "Anatomy"), choice_question("q2", "Anatomy")],
            Utc::now(),
        )
        .unwrap();
        quiz.answer(submission(single("a"), 5.0), Utc::now()).unwrap();
        assert_eq!(
            quiz.current_question().unwrap().difficulty,
            DifficultyLevel::Intermediate
        );
    }

    #[test]
    fn no_correct_answers_gives_zero_speed_extremes() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(
            vec![choice_question("q1", "Anatomy"), choice_question("q2", "Safety")],
            Utc::now(),
        )
        .unwrap();
        quiz.answer(submission(single("b"), 20.0), Utc::now()).unwrap();
        quiz.answer(submission(single("b"), 40.0), Utc::now()).unwrap();

        let results = quiz.results().unwrap();
        assert_eq!(quiz.state(), QuizState::Completed);
        assert_eq!(results.score, 0);
        assert_eq!(results.breakdown.speed_analysis.fastest_correct, 0.0);
        assert_eq!(results.breakdown.speed_analysis.slowest_correct, 0.0);
        assert_eq!(results.breakdown.speed_analysis.avg_time_per_question, 30.0);
        assert_eq!(results.insights.recommended_difficulty, DifficultyLevel::Beginner);
        assert_eq!(results.insights.knowledge_gaps, vec!["Anatomy", "Safety"]);
        assert_eq!(results.completion_reason, CompletionReason::AllAnswered);
    }

    #[test]
    fn breakdown_counts_correct_answers_by_type() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("fillers"), QuizConfig::default());
        quiz.start(
            vec![choice_question("q1", "Anatomy"), scale_question(), select_question()],
            Utc::now(),
        )
        .unwrap();
        quiz.answer(submission(single("a"), 10.0), Utc::now()).unwrap();
        quiz.answer(submission(SelectedAnswer::Scale(8), 10.0), Utc::now()).unwrap();
        quiz.answer(submission(multiple(&["x"]), 10.0), Utc::now()).unwrap();

        let results = quiz.results().unwrap();
        assert_eq!(results.correct_answers, 2);
        assert_eq!(results.score, 67);
        assert_eq!(results.points_earned, 20);
        assert_eq!(results.points_possible, 30);
        assert_eq!(results.breakdown.question_types[&QuestionType::Scale], 1);
        assert_eq!(results.breakdown.question_types[&QuestionType::MultipleSelect], 0);
        assert_eq!(results.insights.strength_areas, vec!["Anatomy", "Consent"]);
        assert_eq!(results.insights.knowledge_gaps, vec!["Safety"]);
    }

    #[test]
    fn submit_scores_unanswered_as_incorrect() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(
            (1..=4)
                .map(|i| choice_question(&format!("q{}", i), "Anatomy"))
                .collect(),
            Utc::now(),
        )
        .unwrap();
        quiz.answer(submission(single("a"), 10.0), Utc::now()).unwrap();

        let results = quiz.submit(Utc::now()).unwrap();
        assert_eq!(results.questions_answered, 1);
        assert_eq!(results.score, 25);
        assert_eq!(results.completion_reason, CompletionReason::Submitted);
        assert!(quiz.submit(Utc::now()).is_err());
    }

    #[test]
    fn certification_countdown_auto_submits() {
        let mut quiz =
            AdaptiveQuizEngine::new(QuizSettings::certification("botox"), QuizConfig::default());
        quiz.start(
            vec![choice_question("q1", "Anatomy"), choice_question("q2", "Anatomy")],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(quiz.remaining_time_seconds(), Some(180));

        quiz.answer(submission(single("a"), 30.0), Utc::now()).unwrap();
        let tick = quiz.tick(100, Utc::now()).unwrap().unwrap();
        assert_eq!(tick.event_name(), "timer-tick");

        let expired = quiz.tick(100, Utc::now()).unwrap().unwrap();
        assert!(expired.is_expired());
        assert_eq!(quiz.state(), QuizState::Completed);

        let results = quiz.results().unwrap();
        assert_eq!(results.completion_reason, CompletionReason::TimeExpired);
        assert_eq!(results.score, 50);
        assert_eq!(results.time_spent_seconds, 180.0);
        assert!(!results.certification_eligible);
        assert!(quiz.tick(10, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn practice_quiz_is_untimed() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(vec![choice_question("q1", "Anatomy")], Utc::now())
            .unwrap();
        assert_eq!(quiz.remaining_time_seconds(), None);
        assert!(quiz.tick(1_000, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn feedback_follows_score_bands() {
        assert!(expert_feedback(95, &[])[0].starts_with("Excellent performance"));
        assert!(expert_feedback(80, &[])[0].starts_with("Strong performance"));
        assert!(expert_feedback(70, &[])[0].starts_with("Good understanding"));
        let low = expert_feedback(40, &["Safety".to_string()]);
        assert_eq!(low.last().unwrap(), "Priority review areas: Safety");
    }

    #[test]
    fn huge_answer_time_completes_without_overflow() {
        let started = Utc::now();
        let finished = started + chrono::Duration::seconds(42);
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(vec![choice_question("q1", "Anatomy")], started)
            .unwrap();

        let response = quiz
            .answer(submission(single("a"), 1.0e15), finished)
            .unwrap();
        assert!(response.is_correct);

        let results = quiz.results().unwrap();
        assert_eq!(quiz.state(), QuizState::Completed);
        assert_eq!(results.time_spent_seconds, 1.0e15);
        assert_eq!(results.completed_at, finished);
        assert_eq!(quiz.responses().len(), 1);
    }

    #[test]
    fn completion_time_comes_from_caller() {
        let started = Utc::now();
        let finished = started + chrono::Duration::minutes(3);
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(
            vec![choice_question("q1", "Anatomy"), choice_question("q2", "Anatomy")],
            started,
        )
        .unwrap();
        quiz.answer(submission(single("a"), 10.0), started).unwrap();

        let results = quiz.submit(finished).unwrap();
        assert_eq!(results.started_at, started);
        assert_eq!(results.completed_at, finished);
    }

    #[test]
    fn procedure_type_filters_by_knowledge_area() {
        let mut settings = QuizSettings::practice("botox");
        settings.procedure_type = Some("SAFETY".to_string());
        let mut quiz = AdaptiveQuizEngine::new(settings, QuizConfig::default());
        quiz.start(
            vec![
                choice_question("q1", "Anatomy"),
                choice_question("q2", "Patient Safety"),
                choice_question("q3", "Safety Protocols"),
            ],
            Utc::now(),
        )
        .unwrap();

        assert_eq!(quiz.current_question().unwrap().question.id, "q2");
        quiz.answer(submission(single("a"), 10.0), Utc::now()).unwrap();
        quiz.answer(submission(single("a"), 10.0), Utc::now()).unwrap();
        assert_eq!(quiz.results().unwrap().total_questions, 2);
    }

    #[test]
    fn unmatched_procedure_type_is_rejected() {
        let mut settings = QuizSettings::practice("botox");
        settings.procedure_type = Some("fillers".to_string());
        let mut quiz = AdaptiveQuizEngine::new(settings, QuizConfig::default());
        let err = quiz
            .start(vec![choice_question("q1", "Anatomy")], Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "procedure_type"));
        assert_eq!(quiz.state(), QuizState::NotStarted);
    }

    #[test]
    fn question_set_is_capped_per_mode() {
        let bank: Vec<QuizQuestion> = (1..=25)
            .map(|i| choice_question(&format!("q{}", i), "Anatomy"))
            .collect();

        let mut practice =
            AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        practice.start(bank.clone(), Utc::now()).unwrap();
        practice.submit(Utc::now()).unwrap();
        assert_eq!(practice.results().unwrap().total_questions, 10);

        let mut certification =
            AdaptiveQuizEngine::new(QuizSettings::certification("botox"), QuizConfig::default());
        certification.start(bank.clone(), Utc::now()).unwrap();
        assert_eq!(certification.remaining_time_seconds(), Some(20 * 90));

        let mut settings = QuizSettings::practice("botox");
        settings.question_count = Some(3);
        let mut short = AdaptiveQuizEngine::new(settings, QuizConfig::default());
        short.start(bank.clone(), Utc::now()).unwrap();
        short.submit(Utc::now()).unwrap();
        assert_eq!(short.results().unwrap().total_questions, 3);

        let mut settings = QuizSettings::practice("botox");
        settings.question_count = Some(0);
        let mut empty = AdaptiveQuizEngine::new(settings, QuizConfig::default());
        assert!(matches!(
            empty.start(bank, Utc::now()),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn certification_rejects_hints_and_explanations() {
        let mut quiz =
            AdaptiveQuizEngine::new(QuizSettings::certification("botox"), QuizConfig::default());
        quiz.start(vec![choice_question("q1", "Anatomy")], Utc::now())
            .unwrap();

        let mut hinted = submission(single("a"), 10.0);
        hinted.hint_used = true;
        let err = quiz.answer(hinted, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "hint_used"));

        let mut explained = submission(single("a"), 10.0);
        explained.explanation_viewed = true;
        let err = quiz.answer(explained, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "explanation_viewed"));

        assert!(quiz.responses().is_empty());
        assert_eq!(quiz.state(), QuizState::InProgress(0));
    }

    #[test]
    fn practice_allows_hints() {
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::practice("botox"), QuizConfig::default());
        quiz.start(vec![choice_question("q1", "Anatomy")], Utc::now())
            .unwrap();
        let mut hinted = submission(single("a"), 10.0);
        hinted.hint_used = true;
        assert!(quiz.answer(hinted, Utc::now()).unwrap().hint_used);
    }

    #[test]
    fn oversized_certification_countdown_is_rejected() {
        let config = QuizConfig {
            seconds_per_question: u32::MAX,
            ..QuizConfig::default()
        };
        let mut quiz = AdaptiveQuizEngine::new(QuizSettings::certification("botox"), config);
        let err = quiz
            .start(
                vec![choice_question("q1", "Anatomy"), choice_question("q2", "Anatomy")],
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "seconds_per_question"));
    }
}
