//! Error taxonomy for interpolation parsing and evaluation.
//!
//! The set is closed: every failure the engine can produce maps onto exactly
//! one variant, so callers can match on the failure class instead of parsing
//! message strings.

/// Errors raised while parsing or evaluating an interpolated value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolationError {
    /// Lexer or parser recognition failure (unmatched braces, bad quoting,
    /// illegal character in a bareword).
    #[error("syntax error: {message}")]
    Syntax { message: String },

    /// The parser reported a grammar ambiguity.
    #[error("ambiguous interpolation: {message}")]
    Ambiguity { message: String },

    /// The parser dropped to full-context prediction.
    #[error("full-context prediction required: {message}")]
    AttemptingFullContext { message: String },

    /// The parser detected context-sensitive prediction.
    #[error("context-sensitive prediction: {message}")]
    ContextSensitivity { message: String },

    /// Type mismatch during evaluation: a non-string used as a key segment
    /// or resolver name, `NaN` as a dictionary key, a non-hashable
    /// dictionary key.
    #[error("type error: {message}")]
    Type { message: String },

    /// Dispatch to a resolver name that is not registered.
    #[error("unsupported resolver '{name}'")]
    UnsupportedResolver { name: String },

    /// A dotted path does not exist in the container (or an environment
    /// variable is not set and no default was given).
    #[error("key not found: {message}")]
    KeyNotFound { message: String },

    /// Resolver-level validation failure (bad default type, duplicate
    /// registration, wrong argument count).
    #[error("{message}")]
    Validation { message: String },

    /// A mandatory value marked `???` was accessed.
    #[error("missing mandatory value: {key}")]
    MissingValue { key: String },

    /// The same node is already being resolved higher up the stack.
    #[error("circular interpolation while resolving '{path}'")]
    Cycle { path: String },
}

impl InterpolationError {
    pub fn syntax(message: impl Into<String>) -> Self {
        InterpolationError::Syntax {
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        InterpolationError::Type {
            message: message.into(),
        }
    }

    pub fn key_not_found(message: impl Into<String>) -> Self {
        InterpolationError::KeyNotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        InterpolationError::Validation {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the resolution class that
    /// `throw_on_resolution_failure = false` converts into a sentinel.
    ///
    /// Parse and type errors are never suppressed.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            InterpolationError::UnsupportedResolver { .. }
                | InterpolationError::KeyNotFound { .. }
                | InterpolationError::Validation { .. }
                | InterpolationError::Cycle { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;
