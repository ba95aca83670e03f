//! Parse diagnostics.
//!
//! The parser is strict (the first recognition failure aborts), but failures
//! are recorded here first so they carry a span, a category, and can be
//! rendered as an annotated snippet before being collapsed into a typed
//! error.

mod message;
mod printer;

use rowan::TextRange;
use weft_core::InterpolationError;

pub use message::{Diagnostic, DiagnosticCategory, Severity};
pub use printer::DiagnosticsPrinter;

/// Collection of diagnostics from one parse.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

/// Builder for constructing a diagnostic.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>, range: TextRange) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic::error(range, msg),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    /// Collapses the first error into its typed form, with a one-line
    /// location hint appended to the message.
    pub fn into_error(self, source: &str) -> InterpolationError {
        match self.messages.into_iter().find(|d| d.is_error()) {
            Some(diag) => {
                let start = usize::from(diag.range.start()).min(source.len());
                let end = usize::from(diag.range.end()).min(source.len());
                let offending = &source[start..end];
                let message = if offending.is_empty() {
                    format!("{} at offset {start} in `{source}`", diag.message)
                } else {
                    format!("{} at `{offending}` (offset {start}) in `{source}`", diag.message)
                };
                diag.category.into_error(message)
            }
            None => InterpolationError::syntax(format!("cannot parse `{source}`")),
        }
    }

    pub fn printer<'a>(&'a self, source: &'a str) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter::new(&self.messages, source)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn category(mut self, category: DiagnosticCategory) -> Self {
        self.message.category = category;
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
