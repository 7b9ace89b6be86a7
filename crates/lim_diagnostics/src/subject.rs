//! The entity a diagnostic is about.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names the input entity a diagnostic points at.
///
/// The linker has no source text to underline; every problem is located by
/// the name of the module, connection or area group that caused it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Subject {
    /// No specific entity.
    None,
    /// A module in the link graph.
    Module(String),
    /// A connection, identified by owning module and logical name.
    Connection {
        /// Owning module.
        module: String,
        /// Logical connection name.
        name: String,
    },
    /// An area group.
    AreaGroup(String),
    /// A line in an input file.
    Line {
        /// File path as given on the command line.
        file: String,
        /// 1-based line number.
        line: usize,
    },
}

impl Subject {
    /// Returns `true` if this is [`Subject::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Subject::None)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::None => Ok(()),
            Subject::Module(name) => write!(f, "module `{name}`"),
            Subject::Connection { module, name } => write!(f, "connection `{name}` in `{module}`"),
            Subject::AreaGroup(name) => write!(f, "area group `{name}`"),
            Subject::Line { file, line } => write!(f, "{file}:{line}"),
        }
    }
}
