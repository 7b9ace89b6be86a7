//! Tour ordering of placed groups by simulated annealing.
//!
//! A closed tour over group centroids is improved with 2-opt segment
//! reversals under a geometric cooling schedule. The random generator is
//! seeded from the configuration, so a given input always yields the same
//! tour.

use crate::group::Floorplan;
use lim_config::TourConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A visiting order and its quality.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    /// Indices into the input points.
    pub order: Vec<usize>,
    /// Negative closed-tour length; higher is better.
    pub score: f64,
}

impl Tour {
    /// Closed-tour length.
    pub fn length(&self) -> f64 {
        -self.score
    }
}

/// Closed Euclidean tour length.
pub fn tour_length(points: &[(f64, f64)], order: &[usize]) -> f64 {
    if order.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for k in 0..order.len() {
        let (x0, y0) = points[order[k]];
        let (x1, y1) = points[order[(k + 1) % order.len()]];
        total += ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    }
    total
}

/// Anneals a tour over `points`, returning the best tour seen.
pub fn anneal_tour(points: &[(f64, f64)], config: &TourConfig) -> Tour {
    let n = points.len();
    let mut current: Vec<usize> = (0..n).collect();
    let mut current_len = tour_length(points, &current);
    let mut best = Tour {
        order: current.clone(),
        score: -current_len,
    };
    if n < 4 {
        return best;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut temperature = config.initial_temperature;
    for _ in 0..config.max_evaluations {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a == b {
            temperature *= config.alpha;
            continue;
        }
        let (i, j) = (a.min(b), a.max(b));
        current[i..=j].reverse();
        let candidate_len = tour_length(points, &current);
        let delta = candidate_len - current_len;

        // Metropolis criterion on the score (negative length).
        if delta <= 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
            current_len = candidate_len;
            if -current_len > best.score {
                best = Tour {
                    order: current.clone(),
                    score: -current_len,
                };
            }
        } else {
            current[i..=j].reverse();
        }
        temperature *= config.alpha;
    }
    tracing::debug!(points = n, length = best.length(), "annealed tour");
    best
}

/// Orders the placed groups of a floorplan; unplaced groups are left out.
pub fn tour_groups(plan: &Floorplan, config: &TourConfig) -> Vec<String> {
    let (names, points): (Vec<&String>, Vec<(f64, f64)>) = plan
        .groups
        .values()
        .filter_map(|g| Some((&g.name, g.centroid()?)))
        .unzip();
    anneal_tour(&points, config)
        .order
        .into_iter()
        .map(|i| names[i].clone())
        .collect()
}
