//! The diagnostic record.

use crate::code::DiagnosticCode;
use crate::label::Label;
use crate::severity::Severity;
use crate::subject::Subject;
use serde::{Deserialize, Serialize};

/// One reported problem.
///
/// Built with [`error`](Self::error), [`warning`](Self::warning) or
/// [`note`](Self::note) and then decorated with the `with_*` methods.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Level.
    pub severity: Severity,
    /// Stable identifier.
    pub code: DiagnosticCode,
    /// Headline.
    pub message: String,
    /// What the headline is about.
    pub subject: Subject,
    /// Other entities involved.
    pub labels: Vec<Label>,
    /// Extra context lines.
    pub notes: Vec<String>,
    /// Suggested fixes.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn at(severity: Severity, code: DiagnosticCode, message: impl Into<String>, subject: Subject) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            subject,
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// An error about `subject`.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, subject: Subject) -> Self {
        Self::at(Severity::Error, code, message, subject)
    }

    /// A warning about `subject`.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, subject: Subject) -> Self {
        Self::at(Severity::Warning, code, message, subject)
    }

    /// A note about `subject`.
    pub fn note(code: DiagnosticCode, message: impl Into<String>, subject: Subject) -> Self {
        Self::at(Severity::Note, code, message, subject)
    }

    /// Appends a related entity.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Appends a context line.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Appends a suggested fix.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    const MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);

    #[test]
    fn constructors_set_severity() {
        let subject = || Subject::Module("fetch".into());
        assert_eq!(Diagnostic::error(MISMATCH, "m", subject()).severity, Severity::Error);
        assert_eq!(Diagnostic::warning(MISMATCH, "m", subject()).severity, Severity::Warning);
        assert_eq!(Diagnostic::note(MISMATCH, "m", subject()).severity, Severity::Note);
    }

    #[test]
    fn decorations_accumulate_in_order() {
        let diag = Diagnostic::error(MISMATCH, "type mismatch on `req`", Subject::Module("fetch".into()))
            .with_label(Label::secondary(Subject::Module("decode".into()), "receives `req`"))
            .with_note("sender type Bit#(32)")
            .with_note("receiver type Bit#(64)")
            .with_help("make both declarations agree");
        assert_eq!(diag.labels[0].message, "receives `req`");
        assert_eq!(diag.notes, vec!["sender type Bit#(32)", "receiver type Bit#(64)"]);
        assert_eq!(diag.help.len(), 1);
    }
}
