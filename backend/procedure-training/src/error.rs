use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures surfaced by the training engines.
///
/// Learner-caused problems (`InvalidInput`) are kept apart from authoring
/// problems (`MalformedContent`) so callers can route them differently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input for `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("malformed content: {0}")]
    MalformedContent(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
}

impl EngineError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        EngineError::MalformedContent(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        EngineError::InvalidState(message.into())
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first offending field; field order is stable per struct.
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        match fields.first() {
            Some((field, errs)) => {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "value out of range".to_string());
                EngineError::invalid_input(field.to_string(), reason)
            }
            None => EngineError::invalid_input("input", errors.to_string()),
        }
    }
}

/// Rejects NaN and infinities, which range rules let through.
pub fn ensure_finite(field: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid_input(field, "must be a finite number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = 0.0, max = 100.0, message = "must be within 0-100"))]
        confidence: f64,
    }

    #[test]
    fn validation_errors_map_to_invalid_input() {
        let err: EngineError = Probe { confidence: 140.0 }.validate().unwrap_err().into();
        assert_eq!(
            err,
            EngineError::invalid_input("confidence", "must be within 0-100")
        );
    }

    #[test]
    fn ensure_finite_rejects_nan() {
        assert!(ensure_finite("depth", f64::NAN).is_err());
        assert!(ensure_finite("depth", f64::INFINITY).is_err());
        assert!(ensure_finite("depth", 4.0).is_ok());
    }
}
