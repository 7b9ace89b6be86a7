//! Linker diagnostics.
//!
//! A [`Diagnostic`] carries a [`Severity`], a [`DiagnosticCode`] and the
//! [`Subject`] (module, connection, area group or input line) it concerns.
//! Stages push them into a [`DiagnosticSink`]; the CLI prints them with a
//! [`TerminalRenderer`] once the command finishes.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;
pub mod subject;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
pub use subject::Subject;
