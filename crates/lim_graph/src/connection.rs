//! Channel and chain endpoints and the matching predicate.

use crate::error::GraphError;
use crate::ids::ConnectionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction and family of a connection endpoint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// Channel producer.
    Send,
    /// Channel consumer.
    Recv,
    /// Outgoing end of a chain segment.
    ChainSrc,
    /// Incoming end of a chain segment.
    ChainSink,
    /// Chain end forwarded across a module-tree boundary, producer side.
    ChainRoutingSend,
    /// Chain end forwarded across a module-tree boundary, consumer side.
    ChainRoutingRecv,
}

impl ConnectionKind {
    /// Returns `true` for the chain family (including routing endpoints).
    pub fn is_chain(self) -> bool {
        !matches!(self, ConnectionKind::Send | ConnectionKind::Recv)
    }

    /// Returns `true` if data leaves the owning module through this endpoint.
    ///
    /// Graph edges are derived from matched source endpoints.
    pub fn is_source(self) -> bool {
        matches!(
            self,
            ConnectionKind::Send | ConnectionKind::ChainSrc | ConnectionKind::ChainRoutingSend
        )
    }

    /// Returns `true` if the two kinds may be paired.
    ///
    /// Symmetric: `a.complements(b) == b.complements(a)`.
    pub fn complements(self, other: ConnectionKind) -> bool {
        use ConnectionKind::*;
        matches!(
            (self, other),
            (Send, Recv)
                | (Recv, Send)
                | (ChainSrc, ChainSink)
                | (ChainSink, ChainSrc)
                | (ChainSrc, ChainRoutingRecv)
                | (ChainRoutingRecv, ChainSrc)
                | (ChainSink, ChainRoutingSend)
                | (ChainRoutingSend, ChainSink)
                | (ChainRoutingSend, ChainRoutingRecv)
                | (ChainRoutingRecv, ChainRoutingSend)
        )
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionKind::Send => "Send",
            ConnectionKind::Recv => "Recv",
            ConnectionKind::ChainSrc => "ChainSrc",
            ConnectionKind::ChainSink => "ChainSink",
            ConnectionKind::ChainRoutingSend => "ChainRoutingSend",
            ConnectionKind::ChainRoutingRecv => "ChainRoutingRecv",
        };
        f.write_str(s)
    }
}

/// A dangling channel or chain endpoint.
///
/// Created once per build pass from extracted log data. `partner` is a
/// handle into the arena of the graph that matched it and is meaningless
/// outside that graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Direction and family.
    pub kind: ConnectionKind,
    /// Logical name shared by both ends.
    pub name: String,
    /// Type as printed by the compiler; equal names must carry equal types.
    pub raw_type: String,
    /// Width in bits.
    pub bitwidth: u32,
    /// Position of this endpoint's bits in the module's packed interface.
    pub index: u32,
    /// Optional endpoints may stay unmatched.
    pub optional: bool,
    /// Name of the owning module.
    pub module_name: String,
    /// Module where a chain originates, if the compiler recorded one.
    pub chain_root: Option<String>,
    /// Traffic estimate; accumulated into edge weights.
    pub activity: f64,
    /// Whether a partner has been assigned.
    pub matched: bool,
    /// The assigned partner.
    pub partner: Option<ConnectionId>,
}

impl Connection {
    /// Creates an unmatched, required connection with unit activity.
    pub fn new(
        kind: ConnectionKind,
        name: impl Into<String>,
        raw_type: impl Into<String>,
        bitwidth: u32,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            raw_type: raw_type.into(),
            bitwidth,
            index: 0,
            optional: false,
            module_name: module_name.into(),
            chain_root: None,
            activity: 1.0,
            matched: false,
            partner: None,
        }
    }

    /// Marks the connection optional.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Sets the chain root.
    pub fn with_chain_root(mut self, root: impl Into<String>) -> Self {
        self.chain_root = Some(root.into());
        self
    }

    /// Sets the traffic estimate.
    pub fn with_activity(mut self, activity: f64) -> Self {
        self.activity = activity;
        self
    }

    /// Clears match state.
    pub fn unmatch(&mut self) {
        self.matched = false;
        self.partner = None;
    }
}

/// Decides whether two connections can be paired.
///
/// Returns `Ok(true)` iff the names are equal, the kinds complement each
/// other and neither side is already matched. Equal names with different raw
/// types are a configuration defect and return
/// [`GraphError::TypeMismatch`] whatever the direction, optionality or match
/// state. The result is symmetric in `a` and `b`.
pub fn matches(a: &Connection, b: &Connection) -> Result<bool, GraphError> {
    if a.name != b.name {
        return Ok(false);
    }
    if a.raw_type != b.raw_type {
        // Order the report so that matches(a, b) and matches(b, a) agree.
        let (first, second) = if (&a.module_name, &a.raw_type) <= (&b.module_name, &b.raw_type) {
            (a, b)
        } else {
            (b, a)
        };
        return Err(GraphError::TypeMismatch {
            name: a.name.clone(),
            first_module: first.module_name.clone(),
            first_type: first.raw_type.clone(),
            second_module: second.module_name.clone(),
            second_type: second.raw_type.clone(),
        });
    }
    if a.matched || b.matched {
        return Ok(false);
    }
    Ok(a.kind.complements(b.kind))
}
