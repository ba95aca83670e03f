//! Diagnostic message types.

use rowan::TextRange;
use weft_core::InterpolationError;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The parse-failure category a diagnostic belongs to. Each category maps
/// onto one variant of the typed error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticCategory {
    /// Lexer or parser recognition failure.
    #[default]
    Syntax,
    /// Grammar ambiguity detected during prediction.
    Ambiguity,
    /// The parser had to attempt full-context prediction.
    AttemptingFullContext,
    /// Context-sensitive prediction detected.
    ContextSensitivity,
}

impl DiagnosticCategory {
    /// Converts the category into the corresponding typed error.
    pub fn into_error(self, message: String) -> InterpolationError {
        match self {
            DiagnosticCategory::Syntax => InterpolationError::Syntax { message },
            DiagnosticCategory::Ambiguity => InterpolationError::Ambiguity { message },
            DiagnosticCategory::AttemptingFullContext => {
                InterpolationError::AttemptingFullContext { message }
            }
            DiagnosticCategory::ContextSensitivity => {
                InterpolationError::ContextSensitivity { message }
            }
        }
    }
}

/// A diagnostic with location, message, severity and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub(crate) severity: Severity,
    pub(crate) category: DiagnosticCategory,
    pub(crate) range: TextRange,
    pub(crate) message: String,
}

impl Diagnostic {
    pub(crate) fn error(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category: DiagnosticCategory::Syntax,
            range,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> DiagnosticCategory {
        self.category
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity,
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message
        )
    }
}
