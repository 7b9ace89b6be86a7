//! How bad a diagnostic is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic level; variants compare in increasing order of badness.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Context only.
    Note,
    /// Reported but does not fail the run.
    Warning,
    /// Fails the run.
    Error,
}

impl Severity {
    /// `true` for [`Severity::Error`].
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Lowercase label used by the renderers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_of_a_batch() {
        let worst = [Severity::Warning, Severity::Note, Severity::Error, Severity::Note]
            .into_iter()
            .max();
        assert_eq!(worst, Some(Severity::Error));
    }

    #[test]
    fn labels() {
        assert_eq!(format!("{}: x", Severity::Warning), "warning: x");
        assert!(Severity::Error.is_error());
        assert!(!Severity::Note.is_error());
    }
}
