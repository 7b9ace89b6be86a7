//! Global minimum cut over all s–t pairs.
//!
//! Capacities are undirected: the capacity between two nodes is the sum of
//! the edge weights in both directions. For every pair `s < t` a max flow is
//! computed with Edmonds–Karp; the source side of the residual graph gives a
//! cut. The cheapest cut wins, ties broken by the lexicographically smallest
//! label vector, so the result depends only on node order and weights.

use std::collections::VecDeque;

const EPS: f64 = 1e-9;

/// A two-way partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Cut {
    /// Total capacity crossing the cut.
    pub value: f64,
    /// Side of each node; node 0 is always on side 0.
    pub labels: Vec<u8>,
}

/// Finds the global minimum cut of an `n`-node graph.
///
/// `edges` are `(from, to, weight)` triples with indices below `n`. Returns
/// `None` for fewer than two nodes.
pub fn global_min_cut(n: usize, edges: &[(usize, usize, f64)]) -> Option<Cut> {
    if n < 2 {
        return None;
    }
    let mut cap = vec![vec![0.0_f64; n]; n];
    for &(a, b, w) in edges {
        if a != b && a < n && b < n {
            cap[a][b] += w;
            cap[b][a] += w;
        }
    }

    let mut best: Option<Cut> = None;
    for s in 0..n {
        for t in s + 1..n {
            let (value, source_side) = max_flow(&cap, s, t);
            let mut labels: Vec<u8> = source_side.iter().map(|&on| u8::from(!on)).collect();
            if labels[0] == 1 {
                for l in &mut labels {
                    *l ^= 1;
                }
            }
            let better = match &best {
                None => true,
                Some(b) if value < b.value - EPS => true,
                Some(b) => (value - b.value).abs() <= EPS && labels < b.labels,
            };
            if better {
                best = Some(Cut { value, labels });
            }
        }
    }
    best
}

/// Edmonds–Karp on a dense capacity matrix. Returns the flow value and the
/// set of nodes reachable from `s` in the final residual graph.
fn max_flow(cap: &[Vec<f64>], s: usize, t: usize) -> (f64, Vec<bool>) {
    let n = cap.len();
    let mut residual = cap.to_vec();
    let mut flow = 0.0;
    loop {
        let parent = bfs(&residual, s);
        if parent[t].is_none() {
            break;
        }
        let mut bottleneck = f64::INFINITY;
        let mut v = t;
        while v != s {
            let Some(u) = parent[v] else { break };
            bottleneck = bottleneck.min(residual[u][v]);
            v = u;
        }
        let mut v = t;
        while v != s {
            let Some(u) = parent[v] else { break };
            residual[u][v] -= bottleneck;
            residual[v][u] += bottleneck;
            v = u;
        }
        flow += bottleneck;
    }
    let parent = bfs(&residual, s);
    let reachable = (0..n).map(|v| v == s || parent[v].is_some()).collect();
    (flow, reachable)
}

fn bfs(residual: &[Vec<f64>], s: usize) -> Vec<Option<usize>> {
    let n = residual.len();
    let mut parent = vec![None; n];
    let mut seen = vec![false; n];
    seen[s] = true;
    let mut queue = VecDeque::from([s]);
    while let Some(u) = queue.pop_front() {
        for v in 0..n {
            if !seen[v] && residual[u][v] > EPS {
                seen[v] = true;
                parent[v] = Some(u);
                queue.push_back(v);
            }
        }
    }
    parent
}
