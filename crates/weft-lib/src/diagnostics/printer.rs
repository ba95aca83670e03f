//! Renders diagnostics as annotated snippets.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use super::message::{Diagnostic, Severity};

/// Builder-pattern printer for rendering diagnostics against their source.
pub struct DiagnosticsPrinter<'a> {
    diagnostics: &'a [Diagnostic],
    source: &'a str,
    colored: bool,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub(super) fn new(diagnostics: &'a [Diagnostic], source: &'a str) -> Self {
        Self {
            diagnostics,
            source,
            colored: false,
        }
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            let range = adjust_range(diag.range(), self.source.len());

            let snippet = Snippet::source(self.source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range)
                    .label(diag.message()),
            );

            let level = severity_to_level(diag.severity());
            let report = [level.primary_title(diag.message()).element(snippet)];

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn adjust_range(range: rowan::TextRange, limit: usize) -> std::ops::Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();

    // Zero-width ranges (e.g. "expected `}`" at EOF) still need a visible
    // caret.
    if start == end {
        if limit == 0 {
            return 0..0;
        }
        let start = start.min(limit - 1);
        return start..start + 1;
    }

    start..end
}
