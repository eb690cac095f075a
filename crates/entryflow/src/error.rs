//! Error types for entryflow.

use thiserror::Error;

use crate::handler::FlowId;
use crate::schema::ValidationErrors;

/// A `Result` alias with [`enum@FlowError`] as the error type.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors surfaced by flow manager operations.
///
/// All variants are caller errors — bad request data or stale references —
/// and are never process-fatal. A transport layer maps them to status codes
/// via [`FlowError::is_not_found`].
#[derive(Debug, Error)]
pub enum FlowError {
    /// No handler factory is registered for the requested domain.
    #[error("no flow handler registered for domain: {0}")]
    UnknownHandler(String),

    /// The flow's handler exposes no operation for the requested step.
    #[error("flow handler does not support step: {0}")]
    UnknownStep(String),

    /// The flow id does not name an in-progress flow.
    ///
    /// Returned both for ids that never existed and for flows that already
    /// reached their terminal transition.
    #[error("unknown flow: {0}")]
    UnknownFlow(FlowId),

    /// Submitted data was rejected by schema validation.
    ///
    /// Raised before the step operation runs (user input against the active
    /// form schema) or before an entry is accepted (payload against the
    /// handler's entry schema). Flow state is left untouched.
    #[error("user input malformed: {0}")]
    MalformedInput(ValidationErrors),
}

impl FlowError {
    /// Whether the error refers to a missing resource rather than rejected
    /// request data.
    ///
    /// `UnknownHandler` and `UnknownFlow` are not-found conditions (404 at an
    /// HTTP boundary); `UnknownStep` and `MalformedInput` are bad requests.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FlowError::UnknownHandler(_) | FlowError::UnknownFlow(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(FlowError::UnknownHandler("hub".into()).is_not_found());
        assert!(FlowError::UnknownFlow(FlowId::new("gone")).is_not_found());
        assert!(!FlowError::UnknownStep("init".into()).is_not_found());
        assert!(!FlowError::MalformedInput(ValidationErrors::default()).is_not_found());
    }

    #[test]
    fn malformed_input_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.insert("port", "expected an integer");

        let rendered = FlowError::MalformedInput(errors).to_string();
        assert!(rendered.contains("port: expected an integer"));
    }
}
