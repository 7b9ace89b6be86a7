//! Text output for diagnostics.

use crate::diagnostic::Diagnostic;
use crate::label::LabelStyle;
use crate::severity::Severity;
use std::fmt::Write;

/// Turns a diagnostic into display text.
pub trait DiagnosticRenderer {
    /// Multi-line text ending in a newline.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Compiler-style console output:
///
/// ```text
/// error[E102]: required connection `req` has no partner
///   --> connection `req` in `user`
///    - module `dram`: candidate partner
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Emit ANSI escapes around the severity.
    pub color: bool,
}

impl TerminalRenderer {
    /// Renderer with or without ANSI color.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity(&self, severity: Severity) -> String {
        if !self.color {
            return severity.as_str().to_string();
        }
        let ansi = match severity {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
            Severity::Note => "1;36",
        };
        format!("\x1b[{ansi}m{}\x1b[0m", severity.as_str())
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}[{}]: {}", self.severity(diag.severity), diag.code, diag.message);
        if !diag.subject.is_none() {
            let _ = writeln!(out, "  --> {}", diag.subject);
        }
        for label in &diag.labels {
            let marker = match label.style {
                LabelStyle::Primary => '^',
                LabelStyle::Secondary => '-',
            };
            let _ = writeln!(out, "   {marker} {}: {}", label.subject, label.message);
        }
        for (kind, lines) in [("note", &diag.notes), ("help", &diag.help)] {
            for line in lines {
                let _ = writeln!(out, "   = {kind}: {line}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};
    use crate::label::Label;
    use crate::subject::Subject;

    #[test]
    fn plain_error_layout() {
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Error, 102),
            "required connection `req` has no partner",
            Subject::Connection {
                module: "user".into(),
                name: "req".into(),
            },
        )
        .with_label(Label::secondary(Subject::Module("dram".into()), "candidate partner"))
        .with_help("add a matching receive to `dram`");

        let text = TerminalRenderer::new(false).render(&diag);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "error[E102]: required connection `req` has no partner");
        assert_eq!(lines[1], "  --> connection `req` in `user`");
        assert_eq!(lines[2], "   - module `dram`: candidate partner");
        assert_eq!(lines[3], "   = help: add a matching receive to `dram`");
    }

    #[test]
    fn no_subject_line_without_subject() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 101), "trimmed", Subject::None)
            .with_note("nothing receives `dbg`");
        let text = TerminalRenderer::new(false).render(&diag);
        assert_eq!(text, "warning[W101]: trimmed\n   = note: nothing receives `dbg`\n");
    }

    #[test]
    fn color_escapes_only_the_severity() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Placement, 103), "infeasible", Subject::None);
        let text = TerminalRenderer::new(true).render(&diag);
        assert_eq!(text, "\x1b[1;31merror\x1b[0m[P103]: infeasible\n");
    }
}
