//! Collects diagnostics while the linker runs.

use crate::diagnostic::Diagnostic;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Collected {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

/// Shared by reference across graph assembly, partitioning and placement.
///
/// The error tally counts every error ever emitted, including ones already
/// handed out by [`take_all`](Self::take_all).
#[derive(Default)]
pub struct DiagnosticSink {
    inner: Mutex<Collected>,
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        let mut inner = self.lock();
        if diag.severity.is_error() {
            inner.errors += 1;
        }
        inner.diagnostics.push(diag);
    }

    /// Errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.lock().errors
    }

    /// `true` once any error was emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Copy of everything recorded and not yet taken.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().diagnostics.clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.lock().diagnostics)
    }
}
