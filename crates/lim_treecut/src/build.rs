//! Recursive bisection and reconciliation.

use crate::error::TreeCutError;
use crate::hints::PlacementHints;
use crate::ids::NodeId;
use crate::mincut::global_min_cut;
use crate::names::NameSupply;
use crate::tree::{Link, LinkKind, ModuleTree, NodeKind, Port, TreeNode};
use lim_common::{Arena, InternalError};
use lim_graph::{matches, LiGraph, ModuleId};
use std::collections::{BTreeMap, BTreeSet};

/// Partitioner settings.
#[derive(Debug, Clone)]
pub struct CutOptions {
    /// A non-root node whose accumulated rule count exceeds this becomes a
    /// synthesis boundary.
    pub rule_threshold: usize,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self {
            rule_threshold: 250,
        }
    }
}

/// Builds the merge tree for a whole graph.
pub fn build_tree(
    graph: &LiGraph,
    hints: &dyn PlacementHints,
    options: &CutOptions,
) -> Result<ModuleTree, TreeCutError> {
    let members: Vec<ModuleId> = graph.module_ids().collect();
    let mut builder = TreeBuilder::new(graph, hints, options.clone());
    let root = builder.cut_recurse(&members, true)?;
    let tree = ModuleTree::new(builder.nodes, root);
    tree.validate(graph)?;
    tracing::info!(
        modules = graph.module_count(),
        nodes = tree.len(),
        depth = tree.depth(),
        boundaries = tree.boundaries().len(),
        residual = tree.residual().count(),
        "built merge tree"
    );
    Ok(tree)
}

/// Build context: owns the node arena and the name supply for one run.
pub struct TreeBuilder<'a> {
    graph: &'a LiGraph,
    hints: &'a dyn PlacementHints,
    options: CutOptions,
    names: NameSupply,
    nodes: Arena<NodeId, TreeNode>,
}

/// Outcome of reconciling two siblings.
struct Reconciled {
    channels: Vec<Port>,
    chains: Vec<Port>,
    links: Vec<Link>,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder; module names are reserved in the name supply.
    pub fn new(graph: &'a LiGraph, hints: &'a dyn PlacementHints, options: CutOptions) -> Self {
        let reserved: Vec<String> = graph
            .module_ids()
            .map(|m| graph.module(m).name.clone())
            .collect();
        Self {
            graph,
            hints,
            options,
            names: NameSupply::new(reserved),
            nodes: Arena::new(),
        }
    }

    /// Builds the subtree for `members` (in name order) and returns its root.
    pub fn cut_recurse(
        &mut self,
        members: &[ModuleId],
        is_root: bool,
    ) -> Result<NodeId, TreeCutError> {
        match members {
            [] if is_root => Err(TreeCutError::EmptyGraph),
            [] => Ok(self.placeholder()),
            [only] if is_root => {
                // A lone module still needs a sibling so the root is a merge.
                let leaf = self.leaf(*only);
                let empty = self.placeholder();
                self.merge(leaf, empty, true, 0)
            }
            [only] => Ok(self.leaf(*only)),
            _ => {
                let labels = self.bisect(members)?;
                let (zero, one): (Vec<_>, Vec<_>) = members
                    .iter()
                    .zip(&labels)
                    .partition(|(_, label)| **label == 0);
                let zero: Vec<ModuleId> = zero.into_iter().map(|(m, _)| *m).collect();
                let one: Vec<ModuleId> = one.into_iter().map(|(m, _)| *m).collect();
                tracing::debug!(
                    members = members.len(),
                    left = zero.len(),
                    right = one.len(),
                    "bisected"
                );
                let budget = {
                    let left = self.module_names(&zero);
                    let right = self.module_names(&one);
                    self.hints.buffer_budget(&left, &right)
                };
                let left = self.cut_recurse(&zero, false)?;
                let right = self.cut_recurse(&one, false)?;
                self.merge(left, right, is_root, budget)
            }
        }
    }

    fn module_names(&self, members: &[ModuleId]) -> Vec<&'a str> {
        let graph = self.graph;
        members
            .iter()
            .map(|&m| graph.module(m).name.as_str())
            .collect()
    }

    /// Splits `members` in two, preferring the placement oracle.
    fn bisect(&self, members: &[ModuleId]) -> Result<Vec<u8>, TreeCutError> {
        let position: BTreeMap<ModuleId, usize> =
            members.iter().enumerate().map(|(i, &m)| (m, i)).collect();
        let traffic: Vec<(usize, usize, f64)> = self
            .graph
            .edges()
            .into_iter()
            .filter_map(|(a, b, w)| Some((*position.get(&a)?, *position.get(&b)?, w)))
            .collect();

        let names = self.module_names(members);
        if let Some(labels) = self.hints.bisect(&names, &traffic) {
            if is_proper_split(&labels, members.len()) {
                return Ok(labels);
            }
            tracing::debug!(
                members = members.len(),
                "placement split leaves a side empty, using min cut"
            );
        }

        let cut = global_min_cut(members.len(), &traffic).ok_or_else(|| {
            InternalError::new(format!("min cut requested for {} modules", members.len()))
        })?;
        Ok(cut.labels)
    }

    fn leaf(&mut self, module: ModuleId) -> NodeId {
        let m = self.graph.module(module);
        let port = |id| {
            let mut conn = self.graph.connection(id).clone();
            conn.unmatch();
            if conn.kind.is_chain() && conn.chain_root.is_none() {
                conn.chain_root = Some(m.name.clone());
            }
            Port { conn, origin: id }
        };
        let channels: Vec<Port> = m.channels.iter().map(|&c| port(c)).collect();
        let chains: Vec<Port> = m.chains.iter().map(|&c| port(c)).collect();
        let local = channels.len() + chains.len();
        self.nodes.alloc(TreeNode {
            name: m.name.clone(),
            kind: NodeKind::Module(module),
            parent: None,
            channels,
            chains,
            links: Vec::new(),
            local_rule_count: local,
            exported_rule_count: 0,
            boundary: false,
        })
    }

    fn placeholder(&mut self) -> NodeId {
        let name = self.names.placeholder();
        self.nodes.alloc(TreeNode {
            name,
            kind: NodeKind::Placeholder,
            parent: None,
            channels: Vec::new(),
            chains: Vec::new(),
            links: Vec::new(),
            local_rule_count: 0,
            exported_rule_count: 0,
            boundary: false,
        })
    }

    fn merge(
        &mut self,
        left: NodeId,
        right: NodeId,
        is_root: bool,
        budget: usize,
    ) -> Result<NodeId, TreeCutError> {
        let name = self.names.node();
        let Reconciled {
            mut channels,
            mut chains,
            links,
        } = self.reconcile(left, right, is_root, budget)?;
        for port in channels.iter_mut().chain(chains.iter_mut()) {
            port.conn.module_name = name.clone();
        }

        let local = channels.len() + chains.len();
        let accumulated =
            local + self.nodes[left].exported_rule_count + self.nodes[right].exported_rule_count;
        let boundary = is_root || accumulated > self.options.rule_threshold;
        let exported = if boundary { 0 } else { accumulated };
        tracing::debug!(
            node = %name,
            links = links.len(),
            local,
            exported,
            boundary,
            "merged"
        );

        let id = self.nodes.alloc(TreeNode {
            name,
            kind: NodeKind::Merge([left, right]),
            parent: None,
            channels,
            chains,
            links,
            local_rule_count: local,
            exported_rule_count: exported,
            boundary,
        });
        self.nodes[left].parent = Some(id);
        self.nodes[right].parent = Some(id);
        Ok(id)
    }

    /// Resolves connections between two siblings.
    ///
    /// The graph's channel pairing is authoritative: two channels link here
    /// only when the source graph made them partners, and `matches` on the
    /// node-level copies only confirms the pair is still compatible. Chains
    /// link by name; below the root at most one segment per chain name is closed so the
    /// chain stays open for the rest of the design, while the root also
    /// closes any chain whose both ends are still open into a ring.
    fn reconcile(
        &self,
        left: NodeId,
        right: NodeId,
        is_root: bool,
        budget: usize,
    ) -> Result<Reconciled, TreeCutError> {
        let l = &self.nodes[left];
        let r = &self.nodes[right];
        let mut budget = budget;
        let mut links = Vec::new();

        let mut l_used = vec![false; l.channels.len()];
        let mut r_used = vec![false; r.channels.len()];
        for (i, a) in l.channels.iter().enumerate() {
            for (j, b) in r.channels.iter().enumerate() {
                if l_used[i] || r_used[j] {
                    continue;
                }
                if self.graph.connection(a.origin).partner != Some(b.origin) {
                    continue;
                }
                if !matches(&a.conn, &b.conn)? {
                    return Err(InternalError::new(format!(
                        "paired channel `{}` is not compatible across `{}` and `{}`",
                        a.conn.name, l.name, r.name
                    ))
                    .into());
                }
                l_used[i] = true;
                r_used[j] = true;
                links.push(self.link(LinkKind::Channel, (l, a), (r, b), &mut budget));
            }
        }
        let channels = unused(&l.channels, &l_used)
            .chain(unused(&r.channels, &r_used))
            .collect();

        let mut l_used = vec![false; l.chains.len()];
        let mut r_used = vec![false; r.chains.len()];
        let mut closed = BTreeSet::new();
        for (i, a) in l.chains.iter().enumerate() {
            for (j, b) in r.chains.iter().enumerate() {
                if l_used[i] || r_used[j] || (!is_root && closed.contains(&a.conn.name)) {
                    continue;
                }
                if matches(&a.conn, &b.conn)? {
                    l_used[i] = true;
                    r_used[j] = true;
                    closed.insert(a.conn.name.clone());
                    links.push(self.link(LinkKind::Chain, (l, a), (r, b), &mut budget));
                }
            }
        }

        let mut open: Vec<(&TreeNode, &Port)> = Vec::new();
        open.extend(
            l.chains
                .iter()
                .zip(&l_used)
                .filter(|(_, used)| !**used)
                .map(|(p, _)| (l, p)),
        );
        open.extend(
            r.chains
                .iter()
                .zip(&r_used)
                .filter(|(_, used)| !**used)
                .map(|(p, _)| (r, p)),
        );
        if is_root {
            let mut used = vec![false; open.len()];
            for i in 0..open.len() {
                for j in i + 1..open.len() {
                    if used[i] || used[j] {
                        continue;
                    }
                    if matches(&open[i].1.conn, &open[j].1.conn)? {
                        used[i] = true;
                        used[j] = true;
                        links.push(self.link(LinkKind::Chain, open[i], open[j], &mut budget));
                    }
                }
            }
            open = open
                .into_iter()
                .zip(used)
                .filter(|(_, used)| !*used)
                .map(|(p, _)| p)
                .collect();
        }
        let chains = open.into_iter().map(|(_, p)| p.clone()).collect();

        Ok(Reconciled {
            channels,
            chains,
            links,
        })
    }

    fn link(
        &self,
        kind: LinkKind,
        a: (&TreeNode, &Port),
        b: (&TreeNode, &Port),
        budget: &mut usize,
    ) -> Link {
        let ((src_node, src), (dst_node, dst)) = if a.1.conn.kind.is_source() {
            (a, b)
        } else {
            (b, a)
        };
        let buffered = *budget > 0;
        if buffered {
            *budget -= 1;
        }
        Link {
            kind,
            name: src.conn.name.clone(),
            from: src_node.name.clone(),
            to: dst_node.name.clone(),
            from_module: self.graph.connection(src.origin).module_name.clone(),
            to_module: self.graph.connection(dst.origin).module_name.clone(),
            buffered,
        }
    }
}

fn is_proper_split(labels: &[u8], len: usize) -> bool {
    labels.len() == len
        && labels.iter().all(|&l| l <= 1)
        && labels.contains(&0)
        && labels.contains(&1)
}

fn unused<'p>(ports: &'p [Port], used: &'p [bool]) -> impl Iterator<Item = Port> + 'p {
    ports
        .iter()
        .zip(used)
        .filter(|(_, u)| !**u)
        .map(|(p, _)| p.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::NoHints;
    use lim_graph::{Connection, ConnectionKind};

    fn send(name: &str, module: &str) -> Connection {
        Connection::new(ConnectionKind::Send, name, "Bit#(32)", 32, module)
    }

    fn recv(name: &str, module: &str) -> Connection {
        Connection::new(ConnectionKind::Recv, name, "Bit#(32)", 32, module)
    }

    fn chain(name: &str, module: &str) -> [Connection; 2] {
        [
            Connection::new(ConnectionKind::ChainSrc, name, "Bit#(8)", 8, module),
            Connection::new(ConnectionKind::ChainSink, name, "Bit#(8)", 8, module),
        ]
    }

    fn abc() -> LiGraph {
        LiGraph::new(vec![
            send("x", "a"),
            recv("x", "b"),
            send("y", "b"),
            recv("y", "c"),
        ])
        .unwrap()
    }

    fn build(graph: &LiGraph) -> ModuleTree {
        build_tree(graph, &NoHints, &CutOptions::default()).unwrap()
    }

    struct FixedHints {
        labels: Vec<u8>,
        budget: usize,
    }

    impl PlacementHints for FixedHints {
        fn bisect(&self, members: &[&str], _traffic: &[(usize, usize, f64)]) -> Option<Vec<u8>> {
            (members.len() == self.labels.len()).then(|| self.labels.clone())
        }

        fn buffer_budget(&self, _left: &[&str], _right: &[&str]) -> usize {
            self.budget
        }
    }

    #[test]
    fn abc_builds_two_level_tree() {
        let graph = abc();
        let tree = build(&graph);
        let root = tree.node(tree.root());
        assert!(root.boundary);
        assert_eq!(root.channels.len(), 0);
        assert_eq!(tree.depth(), 2);

        let [left, right] = match root.kind {
            NodeKind::Merge(children) => children,
            _ => panic!("root must be a merge"),
        };
        assert_eq!(tree.node(right).name, "c");
        let inner = tree.node(left);
        let names: Vec<_> = inner
            .children()
            .iter()
            .map(|&c| tree.node(c).name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        // a-b resolved inside, b-c at the root.
        assert_eq!(inner.links.len(), 1);
        assert_eq!(inner.links[0].from, "a");
        assert_eq!(inner.channels.len(), 1);
        assert_eq!(inner.channels[0].conn.module_name, inner.name);
        assert_eq!(root.links.len(), 1);
        assert_eq!(root.links[0].from, inner.name);
        assert_eq!(root.links[0].from_module, "b");
        assert_eq!(root.links[0].to, "c");
    }

    #[test]
    fn every_module_is_one_leaf() {
        let graph = LiGraph::new(vec![
            send("p", "m0"),
            recv("p", "m1"),
            send("q", "m1"),
            recv("q", "m2"),
            send("r", "m2"),
            recv("r", "m3"),
            send("s", "m3"),
            recv("s", "m4"),
        ])
        .unwrap();
        let tree = build(&graph);
        let mut leaves: Vec<_> = tree
            .leaves()
            .into_iter()
            .map(|l| tree.node(l).name.clone())
            .collect();
        leaves.sort();
        assert_eq!(leaves, vec!["m0", "m1", "m2", "m3", "m4"]);
        for id in tree.preorder() {
            let n = tree.node(id).children().len();
            assert!(n == 0 || n == 2);
        }
        assert_eq!(tree.residual().count(), 0);
    }

    #[test]
    fn single_module_gets_placeholder_sibling() {
        let graph = LiGraph::new(vec![send("out", "solo")]).unwrap();
        let tree = build(&graph);
        let root = tree.node(tree.root());
        assert_eq!(root.children().len(), 2);
        let sibling = tree.node(root.children()[1]);
        assert!(matches!(sibling.kind, NodeKind::Placeholder));
        assert!(sibling.name.starts_with("lim_empty"));
        assert_eq!(tree.residual().count(), 1);
    }

    #[test]
    fn empty_graph_is_rejected() {
        let graph = LiGraph::empty();
        let err = build_tree(&graph, &NoHints, &CutOptions::default()).unwrap_err();
        assert!(matches!(err, TreeCutError::EmptyGraph));
    }

    #[test]
    fn placeholder_names_avoid_module_names() {
        let graph = LiGraph::new(vec![send("out", "lim_empty_0")]).unwrap();
        let tree = build(&graph);
        let names: BTreeSet<_> = tree
            .preorder()
            .into_iter()
            .map(|id| tree.node(id).name.clone())
            .collect();
        assert_eq!(names.len(), tree.len());
    }

    #[test]
    fn unmatched_channels_reach_the_root() {
        let graph = LiGraph::new(vec![
            send("x", "a"),
            recv("x", "b"),
            send("dram_req", "b"),
        ])
        .unwrap();
        let tree = build(&graph);
        let residual: Vec<_> = tree.residual().map(|p| p.conn.name.clone()).collect();
        assert_eq!(residual, vec!["dram_req"]);
        let root = tree.node(tree.root());
        assert_eq!(root.local_rule_count, 1);
    }

    #[test]
    fn rule_counts_accumulate_until_threshold() {
        // Four modules each exporting three open channels.
        let mut conns = Vec::new();
        for m in ["a", "b", "c", "d"] {
            for i in 0..3 {
                conns.push(send(&format!("{m}_out{i}"), m));
            }
        }
        conns.push(send("ab", "a"));
        conns.push(recv("ab", "b"));
        conns.push(send("cd", "c"));
        conns.push(recv("cd", "d"));
        let graph = LiGraph::new(conns).unwrap();

        let exported_is_local_plus_children = |tree: &ModuleTree| {
            let mut merges = 0;
            for id in tree.preorder() {
                let node = tree.node(id);
                if node.boundary {
                    assert_eq!(node.exported_rule_count, 0, "{}", node.name);
                    continue;
                }
                if node.is_leaf() {
                    assert_eq!(node.exported_rule_count, 0, "{}", node.name);
                    continue;
                }
                let below: usize = node
                    .children()
                    .iter()
                    .map(|&c| tree.node(c).exported_rule_count)
                    .sum();
                assert_eq!(
                    node.exported_rule_count,
                    node.local_rule_count + below,
                    "{}",
                    node.name
                );
                merges += 1;
            }
            merges
        };

        let tree = build_tree(&graph, &NoHints, &CutOptions { rule_threshold: 1000 }).unwrap();
        assert_eq!(exported_is_local_plus_children(&tree), 2);
        assert_eq!(tree.boundaries(), vec![tree.root()]);
        // a+b and c+d each carry their six open sends upward.
        for &child in tree.node(tree.root()).children() {
            let node = tree.node(child);
            assert_eq!(node.local_rule_count, 6);
            assert_eq!(node.exported_rule_count, 6);
        }

        let tight = build_tree(&graph, &NoHints, &CutOptions { rule_threshold: 3 }).unwrap();
        assert!(tight.boundaries().len() > 1);
        exported_is_local_plus_children(&tight);
        for id in tight.boundaries() {
            assert_eq!(tight.node(id).exported_rule_count, 0);
        }
    }

    #[test]
    fn chain_threads_through_inner_nodes_and_closes_at_root() {
        let mut conns = Vec::new();
        for m in ["a", "b", "c"] {
            conns.extend(chain("stats", m));
        }
        conns.push(send("x", "a"));
        conns.push(recv("x", "b"));
        conns.push(send("y", "b"));
        conns.push(recv("y", "c"));
        let graph = LiGraph::new(conns).unwrap();
        let tree = build(&graph);

        let mut chain_links = 0;
        for id in tree.preorder() {
            let node = tree.node(id);
            let here = node
                .links
                .iter()
                .filter(|l| l.kind == LinkKind::Chain)
                .count();
            if id != tree.root() {
                assert!(here <= 1);
                if !node.is_leaf() {
                    // One end in, one end out remain open.
                    assert_eq!(node.chains.len(), 2);
                    assert!(node.chain_root_in("stats").is_some());
                    assert!(node.chain_root_out("stats").is_some());
                }
            }
            chain_links += here;
        }
        assert_eq!(chain_links, 3);
        assert_eq!(tree.residual().count(), 0);
    }

    #[test]
    fn lone_chain_module_closes_into_ring_at_root() {
        let graph = LiGraph::new(chain("dbg", "solo").to_vec()).unwrap();
        let tree = build(&graph);
        let root = tree.node(tree.root());
        assert_eq!(root.links.len(), 1);
        assert_eq!(root.links[0].from, "solo");
        assert_eq!(root.links[0].to, "solo");
        assert_eq!(tree.residual().count(), 0);
    }

    #[test]
    fn hints_drive_the_split_and_budget() {
        let graph = abc();
        let hints = FixedHints {
            labels: vec![0, 1, 1],
            budget: 1,
        };
        let tree = build_tree(&graph, &hints, &CutOptions::default()).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(tree.node(root.children()[0]).name, "a");
        assert_eq!(root.links.len(), 1);
        assert!(root.links[0].buffered);
    }

    #[test]
    fn improper_hint_falls_back_to_min_cut() {
        let graph = abc();
        let hints = FixedHints {
            labels: vec![1, 1, 1],
            budget: 0,
        };
        let tree = build_tree(&graph, &hints, &CutOptions::default()).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(tree.node(root.children()[1]).name, "c");
        assert!(!root.links[0].buffered);
    }

    #[test]
    fn budget_is_spent_per_link() {
        let graph = LiGraph::new(vec![
            send("x", "a"),
            send("y", "a"),
            recv("x", "b"),
            recv("y", "b"),
        ])
        .unwrap();
        let hints = FixedHints {
            labels: vec![0, 1],
            budget: 1,
        };
        let tree = build_tree(&graph, &hints, &CutOptions::default()).unwrap();
        let root = tree.node(tree.root());
        let buffered = root.links.iter().filter(|l| l.buffered).count();
        assert_eq!(root.links.len(), 2);
        assert_eq!(buffered, 1);
    }

    #[test]
    fn module_paths_follow_the_tree() {
        let graph = abc();
        let tree = build(&graph);
        let paths = tree.module_paths();
        let root = &tree.node(tree.root()).name;
        assert_eq!(paths["c"], format!("{root}/c"));
        assert!(paths["a"].starts_with(root.as_str()));
        assert!(paths["a"].ends_with("/a"));
        assert_eq!(paths["a"].matches('/').count(), 2);
    }
}
