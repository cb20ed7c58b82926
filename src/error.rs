use thiserror::Error;

/// Errors raised by the quiz engine. All of them are contract violations by
/// the caller, not runtime faults: a well-behaved host that respects the
/// session state never sees them outside of tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("operation '{operation}' is not valid in state '{state}'")]
    InvalidOperation {
        operation: &'static str,
        state: &'static str,
    },

    #[error("option index {index} is out of range for a question with {arity} options")]
    InvalidOption { index: usize, arity: usize },

    #[error("malformed quiz content: {0}")]
    QuizShape(String),
}

impl EngineError {
    pub(crate) fn invalid_op(operation: &'static str, state: &'static str) -> Self {
        Self::InvalidOperation { operation, state }
    }
}
