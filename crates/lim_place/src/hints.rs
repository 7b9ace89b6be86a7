//! Placement-driven bisection for the tree-cut partitioner.

use crate::group::Floorplan;
use lim_treecut::PlacementHints;
use std::collections::BTreeMap;

/// Partitioning oracle backed by a placed floorplan.
///
/// Module names are looked up as group names. Bisection tries every split
/// of the placed members sorted along x and along y and keeps the cheapest,
/// where cost is cross-cut traffic, a penalty for separating a parent from
/// its child, a penalty per chain segment the cut breaks, and an imbalance
/// term. Members without a placement join the side they talk to most.
#[derive(Debug, Clone)]
pub struct PlacedHints<'a> {
    plan: &'a Floorplan,
    parent_child_weight: f64,
    buffer_distance: f64,
    chains: BTreeMap<String, Vec<String>>,
}

impl<'a> PlacedHints<'a> {
    /// Wraps a placed floorplan.
    pub fn new(plan: &'a Floorplan, parent_child_weight: f64, buffer_distance: f64) -> Self {
        Self {
            plan,
            parent_child_weight,
            buffer_distance,
            chains: BTreeMap::new(),
        }
    }

    /// Sets the chain rings, as carrier module names in threading order
    /// (see `LiGraph::chain_carriers`).
    pub fn with_chains(mut self, chains: BTreeMap<String, Vec<String>>) -> Self {
        self.chains = chains;
        self
    }

    /// Ring segments, restricted to `members`, whose ends land on different
    /// sides.
    fn broken_chain_segments(&self, members: &[&str], labels: &[u8]) -> usize {
        let side: BTreeMap<&str, u8> = members.iter().copied().zip(labels.iter().copied()).collect();
        self.chains
            .values()
            .map(|carriers| {
                let ring: Vec<u8> = carriers
                    .iter()
                    .filter_map(|m| side.get(m.as_str()).copied())
                    .collect();
                if ring.len() < 2 {
                    return 0;
                }
                (0..ring.len())
                    .filter(|&i| ring[i] != ring[(i + 1) % ring.len()])
                    .count()
            })
            .sum()
    }

    fn centroid(&self, name: &str) -> Option<(f64, f64)> {
        self.plan.groups.get(name).and_then(|g| g.centroid())
    }

    fn related(&self, a: &str, b: &str) -> bool {
        let parent_of = |x: &str| self.plan.groups.get(x).and_then(|g| g.parent.as_deref());
        parent_of(a) == Some(b) || parent_of(b) == Some(a)
    }

    fn cost(&self, members: &[&str], labels: &[u8], traffic: &[(usize, usize, f64)]) -> f64 {
        let cross: f64 = traffic
            .iter()
            .filter(|&&(a, b, _)| labels[a] != labels[b])
            .map(|&(_, _, w)| w)
            .sum();
        let mut split_families = 0.0;
        for i in 0..members.len() {
            for j in i + 1..members.len() {
                if labels[i] != labels[j] && self.related(members[i], members[j]) {
                    split_families += self.parent_child_weight;
                }
            }
        }
        let ones = labels.iter().filter(|&&l| l == 1).count();
        let imbalance = (labels.len() as f64 - 2.0 * ones as f64).abs();
        let unit = if traffic.is_empty() {
            1.0
        } else {
            traffic.iter().map(|t| t.2).sum::<f64>() / traffic.len() as f64
        };
        let broken_chains = self.broken_chain_segments(members, labels) as f64;
        cross + split_families + unit * (imbalance + broken_chains)
    }
}

impl PlacementHints for PlacedHints<'_> {
    fn bisect(&self, members: &[&str], traffic: &[(usize, usize, f64)]) -> Option<Vec<u8>> {
        let points: Vec<Option<(f64, f64)>> = members.iter().map(|m| self.centroid(m)).collect();
        let placed: Vec<usize> = (0..members.len()).filter(|&i| points[i].is_some()).collect();
        if placed.len() < 2 {
            return None;
        }

        let mut best: Option<(f64, Vec<u8>)> = None;
        for axis in 0..2 {
            let key = |i: usize| {
                let (x, y) = points[i].unwrap_or_default();
                if axis == 0 {
                    (x, y)
                } else {
                    (y, x)
                }
            };
            let mut order = placed.clone();
            order.sort_by(|&a, &b| {
                let (ka, kb) = (key(a), key(b));
                ka.0.total_cmp(&kb.0)
                    .then(ka.1.total_cmp(&kb.1))
                    .then(a.cmp(&b))
            });
            for k in 1..order.len() {
                let mut labels: Vec<Option<u8>> = vec![None; members.len()];
                for (pos, &i) in order.iter().enumerate() {
                    labels[i] = Some(u8::from(pos >= k));
                }
                let labels = assign_unplaced(labels, traffic);
                let cost = self.cost(members, &labels, traffic);
                let better = match &best {
                    None => true,
                    Some((c, l)) => cost < c - 1e-9 || ((cost - c).abs() <= 1e-9 && labels < *l),
                };
                if better {
                    best = Some((cost, labels));
                }
            }
        }
        best.map(|(cost, labels)| {
            tracing::debug!(members = members.len(), cost, "placement-driven split");
            labels
        })
    }

    fn buffer_budget(&self, left: &[&str], right: &[&str]) -> usize {
        if self.buffer_distance <= 0.0 {
            return 0;
        }
        let center = |names: &[&str]| {
            let pts: Vec<(f64, f64)> = names.iter().filter_map(|n| self.centroid(n)).collect();
            if pts.is_empty() {
                return None;
            }
            let n = pts.len() as f64;
            Some((
                pts.iter().map(|p| p.0).sum::<f64>() / n,
                pts.iter().map(|p| p.1).sum::<f64>() / n,
            ))
        };
        match (center(left), center(right)) {
            (Some((lx, ly)), Some((rx, ry))) => {
                let distance = (lx - rx).abs() + (ly - ry).abs();
                (distance / self.buffer_distance).round() as usize
            }
            _ => 0,
        }
    }
}

/// Gives every unlabelled member the side holding most of its traffic,
/// side 0 on ties.
fn assign_unplaced(labels: Vec<Option<u8>>, traffic: &[(usize, usize, f64)]) -> Vec<u8> {
    let fixed = labels.clone();
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| {
            l.unwrap_or_else(|| {
                let mut pull = [0.0_f64; 2];
                for &(a, b, w) in traffic {
                    let other = if a == i {
                        b
                    } else if b == i {
                        a
                    } else {
                        continue;
                    };
                    if let Some(side) = fixed[other] {
                        pull[side as usize] += w;
                    }
                }
                u8::from(pull[1] > pull[0])
            })
        })
        .collect()
}
