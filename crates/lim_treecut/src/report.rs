//! Serializable summary of a merge tree for the wrapper emitter.

use crate::tree::{Link, ModuleTree, NodeKind, Port};
use lim_graph::{ConnectionKind, LiGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open connection counts on a node's interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceArity {
    /// Incoming channels.
    pub in_channels: usize,
    /// Outgoing channels.
    pub out_channels: usize,
    /// Incoming chain ends.
    pub in_chains: usize,
    /// Outgoing chain ends.
    pub out_chains: usize,
}

impl InterfaceArity {
    /// Counts the given ports by direction.
    pub fn of<'p>(ports: impl IntoIterator<Item = &'p Port>) -> Self {
        let mut arity = Self::default();
        for port in ports {
            match port.conn.kind {
                ConnectionKind::Recv => arity.in_channels += 1,
                ConnectionKind::Send => arity.out_channels += 1,
                ConnectionKind::ChainSink | ConnectionKind::ChainRoutingRecv => {
                    arity.in_chains += 1
                }
                ConnectionKind::ChainSrc | ConnectionKind::ChainRoutingSend => {
                    arity.out_chains += 1
                }
            }
        }
        arity
    }

    /// Total open connections.
    pub fn total(&self) -> usize {
        self.in_channels + self.out_channels + self.in_chains + self.out_chains
    }
}

/// One node of the report, in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    /// Node name.
    pub name: String,
    /// Slash-separated path from the root.
    pub path: String,
    /// Child names, empty for leaves.
    pub children: Vec<String>,
    /// Source module for module leaves.
    pub module: Option<String>,
    /// `true` for empty filler leaves.
    pub placeholder: bool,
    /// Whether this node is a synthesis boundary.
    pub boundary: bool,
    /// Rules pushed to the enclosing boundary.
    pub exported_rule_count: usize,
    /// Open interface.
    pub arity: InterfaceArity,
    /// Connections resolved at this node.
    pub links: Vec<Link>,
    /// Object artifacts of a module leaf, by kind.
    pub artifacts: BTreeMap<String, Vec<String>>,
}

/// A connection left open at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualPort {
    /// Logical name.
    pub name: String,
    /// Endpoint kind.
    pub kind: ConnectionKind,
    /// Raw type as printed by the compiler.
    pub raw_type: String,
    /// Width in bits.
    pub bitwidth: u32,
    /// Module that declared it.
    pub module: String,
    /// Whether it may stay open.
    pub optional: bool,
}

/// Whole-tree summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeReport {
    /// Root node name.
    pub root: String,
    /// Longest root-to-leaf edge count.
    pub depth: usize,
    /// Every node, pre-order.
    pub nodes: Vec<NodeReport>,
    /// Connections open at the root.
    pub residual: Vec<ResidualPort>,
}

impl TreeReport {
    /// Names of the synthesis boundaries in pre-order.
    pub fn boundaries(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.boundary)
            .map(|n| n.name.as_str())
    }
}

impl ModuleTree {
    /// Summarizes the tree.
    pub fn report(&self, graph: &LiGraph) -> TreeReport {
        let nodes = self
            .preorder()
            .into_iter()
            .map(|id| {
                let node = self.node(id);
                let (module, artifacts) = match node.kind {
                    NodeKind::Module(m) => {
                        let module = graph.module(m);
                        (Some(module.name.clone()), module.object_artifacts.clone())
                    }
                    _ => (None, BTreeMap::new()),
                };
                NodeReport {
                    name: node.name.clone(),
                    path: self.path(id),
                    children: node
                        .children()
                        .iter()
                        .map(|&c| self.node(c).name.clone())
                        .collect(),
                    module,
                    placeholder: matches!(node.kind, NodeKind::Placeholder),
                    boundary: node.boundary,
                    exported_rule_count: node.exported_rule_count,
                    arity: InterfaceArity::of(node.ports()),
                    links: node.links.clone(),
                    artifacts,
                }
            })
            .collect();
        let residual = self
            .residual()
            .map(|p| {
                let origin = graph.connection(p.origin);
                ResidualPort {
                    name: p.conn.name.clone(),
                    kind: p.conn.kind,
                    raw_type: p.conn.raw_type.clone(),
                    bitwidth: p.conn.bitwidth,
                    module: origin.module_name.clone(),
                    optional: p.conn.optional,
                }
            })
            .collect();
        TreeReport {
            root: self.node(self.root()).name.clone(),
            depth: self.depth(),
            nodes,
            residual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_tree, CutOptions, NoHints};
    use lim_graph::Connection;

    fn graph() -> LiGraph {
        let mut g = LiGraph::new(vec![
            Connection::new(ConnectionKind::Send, "x", "Bit#(4)", 4, "a"),
            Connection::new(ConnectionKind::Recv, "x", "Bit#(4)", 4, "b"),
            Connection::new(ConnectionKind::Recv, "host_in", "Bit#(4)", 4, "b"),
            Connection::new(ConnectionKind::ChainSrc, "dbg", "Bit#(1)", 1, "b"),
        ])
        .unwrap();
        let a = g.module_by_name("a").unwrap();
        g.module_mut(a).add_artifact("ngc", "a.ngc");
        g
    }

    #[test]
    fn report_describes_boundaries_and_residual() {
        let g = graph();
        let tree = build_tree(&g, &NoHints, &CutOptions::default()).unwrap();
        let report = tree.report(&g);
        assert_eq!(report.boundaries().collect::<Vec<_>>(), vec![report.root.as_str()]);
        let root = &report.nodes[0];
        assert_eq!(root.name, report.root);
        assert_eq!(
            root.arity,
            InterfaceArity {
                in_channels: 1,
                out_channels: 0,
                in_chains: 0,
                out_chains: 1,
            }
        );
        assert_eq!(root.arity.total(), 2);
        assert_eq!(report.residual.len(), 2);
        assert!(report.residual.iter().all(|r| r.module == "b"));

        let a = report.nodes.iter().find(|n| n.name == "a").unwrap();
        assert_eq!(a.artifacts["ngc"], vec!["a.ngc".to_string()]);
        assert_eq!(a.module.as_deref(), Some("a"));
    }

    #[test]
    fn report_json_roundtrip() {
        let g = graph();
        let tree = build_tree(&g, &NoHints, &CutOptions::default()).unwrap();
        let report = tree.report(&g);
        let json = serde_json::to_string(&report).unwrap();
        let back: TreeReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
