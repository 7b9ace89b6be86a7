//! Errors raised while elaborating and solving a floorplan.

/// Errors from area-group placement.
#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    /// A constraint statement could not be parsed.
    #[error("constraint line {line}: {message}")]
    Parse {
        /// 1-based line number of the statement.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The constraints are well-formed but contradictory.
    #[error("placement configuration error: {0}")]
    Config(String),

    /// No batch size produced a feasible placement.
    #[error("placement infeasible: {0}")]
    Infeasible(String),

    /// The solver failed for a reason other than infeasibility.
    #[error("solver failure: {0}")]
    Solver(String),

    /// Reading or writing solver files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
