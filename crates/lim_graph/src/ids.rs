//! Opaque handles into the graph's module and connection arenas.

lim_common::define_id!(
    /// Handle of a module in an [`LiGraph`](crate::LiGraph).
    ModuleId
);

lim_common::define_id!(
    /// Handle of a connection in an [`LiGraph`](crate::LiGraph).
    ///
    /// Partner references are connection handles, never owning pointers.
    ConnectionId
);
