//! The module graph: assembly, matching, merging and edge derivation.

use crate::connection::{matches, Connection};
use crate::error::GraphError;
use crate::ids::{ConnectionId, ModuleId};
use crate::module::LiModule;
use lim_common::Arena;
use lim_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink, Label, Subject};
use petgraph::dot::Dot;
use petgraph::graphmap::DiGraphMap;
use petgraph::Graph;
use std::collections::{BTreeMap, BTreeSet};

/// Diagnostic code for a required connection without a partner.
pub const UNMATCHED_CODE: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);

/// Diagnostic code for an optional connection dropped from an interface.
pub const TRIMMED_CODE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 202);

/// A graph of latency-insensitive modules.
///
/// Owns every module and connection in arenas; partner references are
/// [`ConnectionId`] handles into the same arena. Channels pair greedily in
/// module-name order; each chain name is threaded through every module that
/// carries it, in name order, and closed into a ring. The edge set always
/// satisfies: for distinct modules, an edge `A → B` exists iff some matched
/// connection of `A` is a source whose partner belongs to `B`. Its weight is
/// the summed activity of all such connections.
#[derive(Debug, Clone)]
pub struct LiGraph {
    modules: Arena<ModuleId, LiModule>,
    by_name: BTreeMap<String, ModuleId>,
    connections: Arena<ConnectionId, Connection>,
    edges: DiGraphMap<ModuleId, f64>,
    has_unmatched: bool,
}

impl Default for LiGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl LiGraph {
    /// Creates a graph with no modules.
    pub fn empty() -> Self {
        Self {
            modules: Arena::new(),
            by_name: BTreeMap::new(),
            connections: Arena::new(),
            edges: DiGraphMap::new(),
            has_unmatched: false,
        }
    }

    /// Builds a graph from dangling connections.
    ///
    /// Connections are grouped by owning module (modules are created on
    /// demand), matched pairwise and turned into weighted edges.
    pub fn new(connections: Vec<Connection>) -> Result<Self, GraphError> {
        let mut graph = Self::empty();
        let created = graph.insert_connections(connections);
        graph.match_modules(&created)?;
        graph.refresh_unmatched();
        tracing::debug!(
            modules = graph.module_count(),
            edges = graph.edges.edge_count(),
            unmatched = graph.has_unmatched,
            "assembled module graph"
        );
        Ok(graph)
    }

    /// Adds an empty module with the given kind.
    pub fn add_module(&mut self, name: &str, kind: &str) -> Result<ModuleId, GraphError> {
        if self.by_name.contains_key(name) {
            return Err(GraphError::DuplicateModule {
                name: name.to_string(),
            });
        }
        Ok(self.create_module(LiModule::new(name, kind)))
    }

    /// Merges the modules of another graph into this one.
    ///
    /// Incoming connections are reset to unmatched first. A repeated module
    /// name or a same-named connection with a different raw type is rejected
    /// before anything is modified. Channel matching then runs only over
    /// pairs involving the new modules and keeps existing channel matches;
    /// every chain the new modules carry is rethreaded through all members.
    pub fn merge(&mut self, incoming: LiGraph) -> Result<(), GraphError> {
        if let Some(name) = incoming
            .by_name
            .keys()
            .find(|name| self.by_name.contains_key(*name))
        {
            return Err(GraphError::DuplicateModule { name: name.clone() });
        }
        self.check_types(&incoming)?;

        let LiGraph {
            modules: in_modules,
            by_name: in_by_name,
            connections: in_connections,
            ..
        } = incoming;

        let mut created = BTreeSet::new();
        for &old_id in in_by_name.values() {
            let old = &in_modules[old_id];
            let id = self.create_module(LiModule {
                name: old.name.clone(),
                kind: old.kind.clone(),
                channels: Vec::new(),
                chains: Vec::new(),
                attributes: old.attributes.clone(),
                object_artifacts: old.object_artifacts.clone(),
            });
            for conn_id in old.connection_ids() {
                let mut conn = in_connections[conn_id].clone();
                conn.unmatch();
                self.push_connection(id, conn);
            }
            self.sort_interface(id);
            created.insert(id);
        }

        self.match_modules(&created)?;
        self.refresh_unmatched();
        tracing::debug!(
            merged = created.len(),
            modules = self.module_count(),
            "merged module graphs"
        );
        Ok(())
    }

    /// Returns the module with the given handle.
    pub fn module(&self, id: ModuleId) -> &LiModule {
        &self.modules[id]
    }

    /// Returns a mutable module.
    pub fn module_mut(&mut self, id: ModuleId) -> &mut LiModule {
        &mut self.modules[id]
    }

    /// Looks up a module by name.
    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    /// Module handles in name order.
    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.by_name.values().copied()
    }

    /// Number of modules.
    pub fn module_count(&self) -> usize {
        self.by_name.len()
    }

    /// Returns the connection with the given handle.
    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id]
    }

    /// Module owning the partner of a matched connection.
    pub fn partner_module(&self, id: ConnectionId) -> Option<ModuleId> {
        let partner = self.connections[id].partner?;
        self.module_by_name(&self.connections[partner].module_name)
    }

    /// `true` if some required connection is still unmatched.
    pub fn has_unmatched(&self) -> bool {
        self.has_unmatched
    }

    /// Required connections without a partner, ordered by module then name.
    pub fn unmatched(&self) -> Vec<ConnectionId> {
        self.module_ids()
            .flat_map(|m| self.modules[m].connection_ids())
            .filter(|&c| {
                let conn = &self.connections[c];
                !conn.optional && !conn.matched
            })
            .collect()
    }

    /// Modules carrying each chain name, in the order the chain is threaded.
    pub fn chain_carriers(&self) -> BTreeMap<String, Vec<String>> {
        let mut carriers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in self.module_ids() {
            let module = &self.modules[id];
            for &c in &module.chains {
                let list = carriers.entry(self.connections[c].name.clone()).or_default();
                if list.last() != Some(&module.name) {
                    list.push(module.name.clone());
                }
            }
        }
        carriers
    }

    /// Weight of the directed edge `from → to`, zero if absent.
    pub fn edge_weight(&self, from: ModuleId, to: ModuleId) -> f64 {
        self.edges.edge_weight(from, to).copied().unwrap_or(0.0)
    }

    /// Total traffic between two modules in both directions.
    pub fn traffic(&self, a: ModuleId, b: ModuleId) -> f64 {
        self.edge_weight(a, b) + self.edge_weight(b, a)
    }

    /// All edges as `(from, to, weight)`, sorted by module name pair.
    pub fn edges(&self) -> Vec<(ModuleId, ModuleId, f64)> {
        let mut edges: Vec<_> = self
            .edges
            .all_edges()
            .map(|(a, b, w)| (a, b, *w))
            .collect();
        edges.sort_by(|x, y| {
            let kx = (&self.modules[x.0].name, &self.modules[x.1].name);
            let ky = (&self.modules[y.0].name, &self.modules[y.1].name);
            kx.cmp(&ky)
        });
        edges
    }

    /// Removes unmatched optional connections from module interfaces.
    ///
    /// Returns the removed handles; each is reported to `sink` as a warning.
    pub fn trim_optional(&mut self, sink: &DiagnosticSink) -> Vec<ConnectionId> {
        let mut removed = Vec::new();
        let ids: Vec<ModuleId> = self.module_ids().collect();
        for id in ids {
            let connections = &self.connections;
            let module = &mut self.modules[id];
            let keep = |c: &ConnectionId| {
                let conn = &connections[*c];
                !(conn.optional && !conn.matched)
            };
            for list in [&mut module.channels, &mut module.chains] {
                removed.extend(list.iter().copied().filter(|c| !keep(c)));
                list.retain(keep);
            }
        }
        for &c in &removed {
            let conn = &self.connections[c];
            sink.emit(Diagnostic::warning(
                TRIMMED_CODE,
                format!("optional {} `{}` has no partner and was trimmed", conn.kind, conn.name),
                Subject::Connection {
                    module: conn.module_name.clone(),
                    name: conn.name.clone(),
                },
            ));
        }
        removed
    }

    /// Reports unmatched required connections.
    ///
    /// Each one is emitted to `sink`, as an error unless `tolerate` is set, in
    /// which case they are warnings and the graph is accepted as partial.
    pub fn check_unmatched(&self, sink: &DiagnosticSink, tolerate: bool) -> Result<(), GraphError> {
        let unmatched = self.unmatched();
        for &c in &unmatched {
            let conn = &self.connections[c];
            let message = format!(
                "required {} `{}` ({}) has no partner",
                conn.kind, conn.name, conn.raw_type
            );
            let subject = Subject::Connection {
                module: conn.module_name.clone(),
                name: conn.name.clone(),
            };
            let mut diag = if tolerate {
                Diagnostic::warning(UNMATCHED_CODE, message, subject)
            } else {
                Diagnostic::error(UNMATCHED_CODE, message, subject)
            };
            for other in self.same_direction_peers(c) {
                diag = diag.with_label(Label::secondary(
                    Subject::Module(other),
                    "also declares this endpoint in the same direction",
                ));
            }
            sink.emit(diag);
        }
        if unmatched.is_empty() || tolerate {
            Ok(())
        } else {
            Err(GraphError::Unmatched {
                count: unmatched.len(),
            })
        }
    }

    /// Renders the module graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut graph: Graph<String, f64> = Graph::new();
        let mut index = BTreeMap::new();
        for id in self.module_ids() {
            index.insert(id, graph.add_node(self.modules[id].name.clone()));
        }
        for (a, b, w) in self.edges() {
            graph.add_edge(index[&a], index[&b], w);
        }
        format!("{}", Dot::new(&graph))
    }

    fn same_direction_peers(&self, c: ConnectionId) -> Vec<String> {
        let conn = &self.connections[c];
        self.module_ids()
            .filter(|&m| self.modules[m].name != conn.module_name)
            .filter(|&m| {
                self.modules[m].connection_ids().any(|o| {
                    let other = &self.connections[o];
                    other.name == conn.name && other.kind == conn.kind
                })
            })
            .map(|m| self.modules[m].name.clone())
            .collect()
    }

    /// Compares every incoming connection with every existing one of the
    /// same family so that a mismatch surfaces before the graph changes.
    fn check_types(&self, incoming: &LiGraph) -> Result<(), GraphError> {
        for theirs in incoming.module_ids() {
            for c in incoming.modules[theirs].connection_ids() {
                let new = &incoming.connections[c];
                for ours in self.module_ids() {
                    for o in self.modules[ours].connection_ids() {
                        let old = &self.connections[o];
                        if old.kind.is_chain() == new.kind.is_chain() {
                            matches(old, new)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn create_module(&mut self, module: LiModule) -> ModuleId {
        let name = module.name.clone();
        let id = self.modules.alloc(module);
        self.by_name.insert(name, id);
        self.edges.add_node(id);
        id
    }

    fn push_connection(&mut self, module: ModuleId, conn: Connection) {
        let is_chain = conn.kind.is_chain();
        let id = self.connections.alloc(conn);
        let module = &mut self.modules[module];
        if is_chain {
            module.chains.push(id);
        } else {
            module.channels.push(id);
        }
    }

    fn sort_interface(&mut self, module: ModuleId) {
        let connections = &self.connections;
        let module = &mut self.modules[module];
        // Stable: equal names keep extraction order.
        module
            .channels
            .sort_by(|a, b| connections[*a].name.cmp(&connections[*b].name));
        module
            .chains
            .sort_by(|a, b| connections[*a].name.cmp(&connections[*b].name));
    }

    /// Groups connections by module name, creating modules as needed.
    fn insert_connections(&mut self, connections: Vec<Connection>) -> BTreeSet<ModuleId> {
        let mut grouped: BTreeMap<String, Vec<Connection>> = BTreeMap::new();
        for conn in connections {
            grouped
                .entry(conn.module_name.clone())
                .or_default()
                .push(conn);
        }
        let mut touched = BTreeSet::new();
        for (name, conns) in grouped {
            let id = match self.by_name.get(&name) {
                Some(&id) => id,
                None => self.create_module(LiModule::new(name, "")),
            };
            for conn in conns {
                self.push_connection(id, conn);
            }
            self.sort_interface(id);
            touched.insert(id);
        }
        touched
    }

    /// Matches channels over every unordered module pair that involves at
    /// least one module of `fresh`, in module-name order, then threads every
    /// chain those modules carry and re-derives the edges.
    fn match_modules(&mut self, fresh: &BTreeSet<ModuleId>) -> Result<(), GraphError> {
        let order: Vec<ModuleId> = self.module_ids().collect();
        let mut links = 0usize;
        for (i, &a) in order.iter().enumerate() {
            for &b in &order[i + 1..] {
                if !fresh.contains(&a) && !fresh.contains(&b) {
                    continue;
                }
                let a_channels = self.modules[a].channels.clone();
                let b_channels = self.modules[b].channels.clone();
                links += self.match_lists(&a_channels, &b_channels)?;
            }
        }

        let chain_names: BTreeSet<String> = fresh
            .iter()
            .flat_map(|&m| self.modules[m].chains.iter())
            .map(|&c| self.connections[c].name.clone())
            .collect();
        for name in &chain_names {
            links += self.thread_chain(name)?;
        }

        self.rebuild_edges();
        tracing::debug!(links, chains = chain_names.len(), "matched connections");
        Ok(())
    }

    /// Greedily pairs each connection of `left` with the first compatible
    /// connection of `right`. Every pair is still compared after a match so
    /// that type mismatches surface regardless of match state.
    fn match_lists(
        &mut self,
        left: &[ConnectionId],
        right: &[ConnectionId],
    ) -> Result<usize, GraphError> {
        let mut links = 0;
        for &a in left {
            for &b in right {
                if matches(&self.connections[a], &self.connections[b])? {
                    self.link(a, b);
                    links += 1;
                }
            }
        }
        Ok(links)
    }

    /// Links the chain `name` into a ring over the modules carrying it.
    ///
    /// Earlier links of the chain are dropped. Taking the members in name
    /// order, each outgoing end feeds the first free incoming end of the
    /// next member, wrapping from the last member to the first; a single
    /// member closes onto itself.
    fn thread_chain(&mut self, name: &str) -> Result<usize, GraphError> {
        let members: Vec<Vec<ConnectionId>> = self
            .module_ids()
            .map(|m| {
                self.modules[m]
                    .chains
                    .iter()
                    .copied()
                    .filter(|&c| self.connections[c].name == name)
                    .collect::<Vec<_>>()
            })
            .filter(|ends| !ends.is_empty())
            .collect();

        for (i, ends) in members.iter().enumerate() {
            for later in &members[i + 1..] {
                for &a in ends {
                    for &b in later {
                        matches(&self.connections[a], &self.connections[b])?;
                    }
                }
            }
        }
        for &c in members.iter().flatten() {
            self.connections[c].unmatch();
        }

        let mut links = 0;
        for (i, ends) in members.iter().enumerate() {
            for &out in ends {
                if !self.connections[out].kind.is_source() {
                    continue;
                }
                let next = (1..=members.len())
                    .map(|step| &members[(i + step) % members.len()])
                    .flat_map(|ends| ends.iter().copied())
                    .find(|&candidate| {
                        let (a, b) = (&self.connections[out], &self.connections[candidate]);
                        !a.matched && !b.matched && a.kind.complements(b.kind)
                    });
                if let Some(sink) = next {
                    self.link(out, sink);
                    links += 1;
                }
            }
        }
        Ok(links)
    }

    fn link(&mut self, a: ConnectionId, b: ConnectionId) {
        {
            let ca = &mut self.connections[a];
            ca.matched = true;
            ca.partner = Some(b);
        }
        {
            let cb = &mut self.connections[b];
            cb.matched = true;
            cb.partner = Some(a);
        }
    }

    /// Recomputes every edge from the matched source endpoints.
    fn rebuild_edges(&mut self) {
        let mut edges = DiGraphMap::new();
        for from in self.module_ids() {
            edges.add_node(from);
        }
        for from in self.module_ids() {
            for c in self.modules[from].connection_ids() {
                let conn = &self.connections[c];
                if !conn.matched || !conn.kind.is_source() {
                    continue;
                }
                let Some(to) = self.partner_module(c) else {
                    continue;
                };
                if to == from {
                    continue;
                }
                match edges.edge_weight_mut(from, to) {
                    Some(weight) => *weight += conn.activity,
                    None => {
                        edges.add_edge(from, to, conn.activity);
                    }
                }
            }
        }
        self.edges = edges;
    }

    fn refresh_unmatched(&mut self) {
        self.has_unmatched = !self.unmatched().is_empty();
    }
}
