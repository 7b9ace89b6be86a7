//! Errors raised while extracting, matching and merging connections.

/// Errors from graph assembly.
///
/// Every variant except [`GraphError::Unmatched`] is a configuration defect
/// in the input and aborts the link.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A module name appears twice when merging graphs.
    #[error("module `{name}` is already part of the graph")]
    DuplicateModule {
        /// The repeated module name.
        name: String,
    },

    /// Two same-named connections declare different raw types.
    #[error(
        "connection `{name}` has mismatched types: `{first_type}` in `{first_module}` vs `{second_type}` in `{second_module}`"
    )]
    TypeMismatch {
        /// Shared logical name.
        name: String,
        /// Module owning the first connection.
        first_module: String,
        /// Raw type of the first connection.
        first_type: String,
        /// Module owning the second connection.
        second_module: String,
        /// Raw type of the second connection.
        second_type: String,
    },

    /// A dangling-connection record could not be parsed.
    #[error("malformed connection record on line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the log.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// Required connections were left without a partner and the caller did
    /// not tolerate a partial graph.
    #[error("{count} required connection(s) have no partner")]
    Unmatched {
        /// Number of unmatched required connections.
        count: usize,
    },
}
