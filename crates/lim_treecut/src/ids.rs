//! Handles into the merge-tree arena.

lim_common::define_id!(
    /// Handle of a node in a [`ModuleTree`](crate::ModuleTree).
    NodeId
);
