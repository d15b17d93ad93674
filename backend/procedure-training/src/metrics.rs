use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    // Injection simulator
    pub static ref INJECTION_ATTEMPTS_SCORED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "injection_attempts_scored_total",
        "Total number of scored injection attempts",
        &["outcome"]
    )
    .unwrap();

    pub static ref COMPLICATIONS_DETECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "complications_detected_total",
        "Total number of complications flagged on injection attempts",
        &["kind"]
    )
    .unwrap();

    pub static ref PRACTICE_SESSIONS_FINALIZED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "practice_sessions_finalized_total",
        "Total number of finalized practice sessions",
        &["result"]
    )
    .unwrap();

    // Case studies
    pub static ref CASE_DECISIONS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "case_decisions_recorded_total",
        "Total number of decisions recorded on case-study paths",
        &["correct"]
    )
    .unwrap();

    // Quizzes
    pub static ref QUIZ_ANSWERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_answers_total",
        "Total number of graded quiz answers",
        &["question_type", "correct"]
    )
    .unwrap();

    pub static ref QUIZ_COMPLETIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_completions_total",
        "Total number of completed quizzes",
        &["reason"]
    )
    .unwrap();

    pub static ref CERTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "certifications_total",
        "Certification-mode quiz outcomes",
        &["result"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

pub fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
