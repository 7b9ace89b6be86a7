//! The binary merge tree.

use crate::ids::NodeId;
use lim_common::{Arena, InternalError, LimResult};
use lim_graph::{Connection, ConnectionId, ConnectionKind, LiGraph, ModuleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A connection exposed on a tree node's interface.
///
/// `conn` is a fresh, unmatched copy renamed to the exposing node; `origin`
/// is the connection it was copied from in the source graph.
#[derive(Debug, Clone)]
pub struct Port {
    /// Exposed copy.
    pub conn: Connection,
    /// Source-graph connection this port stands for.
    pub origin: ConnectionId,
}

/// Family of a reconciled link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// Point-to-point channel.
    Channel,
    /// Chain segment.
    Chain,
}

/// A connection resolved inside a merge node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Channel or chain.
    pub kind: LinkKind,
    /// Logical name.
    pub name: String,
    /// Child node on the source side.
    pub from: String,
    /// Child node on the sink side.
    pub to: String,
    /// Original module on the source side.
    pub from_module: String,
    /// Original module on the sink side.
    pub to_module: String,
    /// Whether a pipeline buffer was spent on this link.
    pub buffered: bool,
}

/// What a tree node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A module of the source graph.
    Module(ModuleId),
    /// An empty, uniquely named filler leaf.
    Placeholder,
    /// A merge of exactly two children.
    Merge([NodeId; 2]),
}

/// A node of the merge tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Unique name: the module name for module leaves.
    pub name: String,
    /// Leaf or merge.
    pub kind: NodeKind,
    /// Enclosing merge node, `None` for the root.
    pub parent: Option<NodeId>,
    /// Channels still open at this node.
    pub channels: Vec<Port>,
    /// Chain ends still open at this node.
    pub chains: Vec<Port>,
    /// Connections resolved between the two children.
    pub links: Vec<Link>,
    /// Open connections exposed by this node itself.
    pub local_rule_count: usize,
    /// Rules this node pushes onto the next synthesis boundary above it.
    pub exported_rule_count: usize,
    /// Whether this node is compiled as its own synthesis boundary.
    pub boundary: bool,
}

impl TreeNode {
    /// Children of a merge node, empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Merge(children) => children,
            _ => &[],
        }
    }

    /// Returns `true` for module and placeholder leaves.
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Merge(_))
    }

    /// All open ports, channels first.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.channels.iter().chain(self.chains.iter())
    }

    /// Root module of the chain whose incoming end is open here.
    pub fn chain_root_in(&self, chain: &str) -> Option<&str> {
        self.chain_end(chain, |k| {
            matches!(k, ConnectionKind::ChainSink | ConnectionKind::ChainRoutingRecv)
        })
    }

    /// Root module of the chain whose outgoing end is open here.
    pub fn chain_root_out(&self, chain: &str) -> Option<&str> {
        self.chain_end(chain, |k| {
            matches!(k, ConnectionKind::ChainSrc | ConnectionKind::ChainRoutingSend)
        })
    }

    fn chain_end(&self, chain: &str, want: impl Fn(ConnectionKind) -> bool) -> Option<&str> {
        self.chains
            .iter()
            .find(|p| p.conn.name == chain && want(p.conn.kind))
            .and_then(|p| p.conn.chain_root.as_deref())
    }
}

/// A finished merge tree.
#[derive(Debug, Clone)]
pub struct ModuleTree {
    nodes: Arena<NodeId, TreeNode>,
    root: NodeId,
}

impl ModuleTree {
    pub(crate) fn new(nodes: Arena<NodeId, TreeNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// Looks up a node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has a root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Nodes in pre-order, children left to right.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id].children().iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    /// Synthesis boundaries in pre-order; the root comes first.
    pub fn boundaries(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].boundary)
            .collect()
    }

    /// Longest root-to-leaf edge count.
    pub fn depth(&self) -> usize {
        self.preorder()
            .into_iter()
            .map(|id| self.ancestors(id).len())
            .max()
            .unwrap_or(0)
    }

    /// Connections still open at the root.
    pub fn residual(&self) -> impl Iterator<Item = &Port> {
        self.nodes[self.root].ports()
    }

    /// Slash-separated node names from the root down to `id`.
    pub fn path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .map(|a| self.nodes[a].name.as_str())
            .collect();
        names.reverse();
        names.push(&self.nodes[id].name);
        names.join("/")
    }

    /// Hierarchical path of every module leaf, keyed by module name.
    pub fn module_paths(&self) -> BTreeMap<String, String> {
        self.leaves()
            .into_iter()
            .filter(|&id| matches!(self.nodes[id].kind, NodeKind::Module(_)))
            .map(|id| (self.nodes[id].name.clone(), self.path(id)))
            .collect()
    }

    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.nodes[p].parent;
        }
        out
    }

    /// Verifies the shape against the graph it was cut from: every merge
    /// node has two children whose parent points back, every graph module
    /// appears as exactly one leaf and node names are unique.
    pub fn validate(&self, graph: &LiGraph) -> LimResult<()> {
        if self.nodes[self.root].parent.is_some() {
            return Err(InternalError::new("root has a parent"));
        }
        let mut names = BTreeMap::new();
        let mut seen_modules = BTreeMap::new();
        for id in self.preorder() {
            let node = &self.nodes[id];
            if names.insert(node.name.as_str(), id).is_some() {
                return Err(InternalError::new(format!(
                    "node name `{}` is used twice",
                    node.name
                )));
            }
            match node.kind {
                NodeKind::Merge(children) => {
                    for child in children {
                        if self.nodes[child].parent != Some(id) {
                            return Err(InternalError::new(format!(
                                "child `{}` of `{}` does not point back",
                                self.nodes[child].name, node.name
                            )));
                        }
                    }
                }
                NodeKind::Module(m) => {
                    if seen_modules.insert(m, id).is_some() {
                        return Err(InternalError::new(format!(
                            "module `{}` appears twice",
                            node.name
                        )));
                    }
                }
                NodeKind::Placeholder => {}
            }
        }
        if seen_modules.len() != graph.module_count() {
            return Err(InternalError::new(format!(
                "tree holds {} modules, graph has {}",
                seen_modules.len(),
                graph.module_count()
            )));
        }
        Ok(())
    }
}
