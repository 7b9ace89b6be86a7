//! Errors raised while building the merge tree.

use lim_common::InternalError;
use lim_graph::GraphError;

/// Errors from tree construction.
#[derive(Debug, thiserror::Error)]
pub enum TreeCutError {
    /// The graph has no modules; there is nothing to compile at the root.
    #[error("cannot partition a graph with no modules")]
    EmptyGraph,

    /// Reconciliation found a configuration defect, such as two chain ends
    /// with the same name and different types.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A partitioning invariant was violated. Always a logic defect.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
