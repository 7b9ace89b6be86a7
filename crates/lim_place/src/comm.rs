//! Pairwise communication weights between groups.

use lim_graph::LiGraph;
use std::collections::BTreeMap;

/// Undirected traffic between named modules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommTable {
    weights: BTreeMap<(String, String), f64>,
}

impl CommTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Traffic of every graph edge, both directions summed.
    pub fn from_graph(graph: &LiGraph) -> Self {
        let mut table = Self::new();
        for (a, b, w) in graph.edges() {
            table.add(&graph.module(a).name, &graph.module(b).name, w);
        }
        table
    }

    /// Adds traffic between `a` and `b`.
    pub fn add(&mut self, a: &str, b: &str, weight: f64) {
        if a == b {
            return;
        }
        *self.weights.entry(key(a, b)).or_insert(0.0) += weight;
    }

    /// Traffic between `a` and `b`, zero if none.
    pub fn traffic(&self, a: &str, b: &str) -> f64 {
        self.weights.get(&key(a, b)).copied().unwrap_or(0.0)
    }

    /// All pairs with their traffic, in name order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.weights
            .iter()
            .map(|((a, b), w)| (a.as_str(), b.as_str(), *w))
    }

    /// Number of communicating pairs.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// `true` if no pair communicates.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
