//! Configuration types deserialized from `lim.toml`.

use serde::Deserialize;

/// The top-level linker configuration parsed from `lim.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkerConfig {
    /// Graph assembly settings.
    pub graph: GraphConfig,
    /// Tree-cut partitioner settings.
    pub treecut: TreeCutConfig,
    /// Area-group placement settings.
    pub placement: PlacementConfig,
    /// Tour ordering (simulated annealing) settings.
    pub tour: TourConfig,
}

/// Settings for building and matching the module graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Accept a graph with unmatched required connections (reported as
    /// warnings instead of errors). Useful for a first extraction pass
    /// before all modules are known.
    pub allow_unmatched: bool,
    /// Drop unmatched optional connections from module interfaces.
    pub trim_optional: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            allow_unmatched: false,
            trim_optional: true,
        }
    }
}

/// Settings for the recursive bisection into a binary merge tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeCutConfig {
    /// A node whose local plus inherited rule count exceeds this becomes a
    /// synthesis boundary.
    pub rule_threshold: usize,
    /// Bisect along placement when placed area groups are available.
    pub use_placement: bool,
}

impl Default for TreeCutConfig {
    fn default() -> Self {
        Self {
            rule_threshold: 250,
            use_placement: true,
        }
    }
}

/// Which ILP backend solves placement models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// The in-process pure Rust solver.
    #[default]
    Builtin,
    /// An external `cbc` process.
    Cbc,
    /// An external `glpsol` process.
    Glpk,
}

/// Side of an anchor group a ruled group is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Directly left of the anchor, same height.
    Left,
    /// Directly right of the anchor, same height.
    Right,
    /// Directly above the anchor, same width.
    Above,
    /// Directly below the anchor, same width.
    Below,
}

/// A special-cased placement applied before the general solver runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementRule {
    /// The group to place.
    pub group: String,
    /// The already-placed group it attaches to.
    pub anchor: String,
    /// Which side of the anchor.
    pub side: Side,
}

/// Settings for the area-group placement solver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    /// Candidate width:height ratios offered to the solver for every free group.
    pub aspect_ratios: Vec<f64>,
    /// Relative area change under which a previous run's dimensions are reused.
    pub area_reuse_tolerance: f64,
    /// Batch sizes tried in order by the incremental solver.
    pub batch_sizes: Vec<usize>,
    /// Objective weight of parent/child distance.
    pub parent_child_weight: f64,
    /// Objective weight per unit of inter-module traffic.
    pub comm_weight: f64,
    /// Chip distance covered by one inter-region buffer stage.
    pub buffer_distance: f64,
    /// ILP backend.
    pub solver: SolverKind,
    /// Wall-clock cap passed to the solver, in seconds.
    pub time_limit_secs: u64,
    /// Special-cased placements keyed by group name.
    pub rules: Vec<PlacementRule>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            aspect_ratios: vec![1.0, 2.0, 0.5],
            area_reuse_tolerance: 0.01,
            batch_sizes: vec![1, 2, 3],
            parent_child_weight: 100.0,
            comm_weight: 1.0,
            buffer_distance: 10.0,
            solver: SolverKind::Builtin,
            time_limit_secs: 60,
            rules: Vec::new(),
        }
    }
}

/// Settings for the simulated-annealing tour heuristic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TourConfig {
    /// Starting temperature.
    pub initial_temperature: f64,
    /// Geometric cooling factor applied after every evaluation.
    pub alpha: f64,
    /// Maximum number of candidate tours evaluated.
    pub max_evaluations: usize,
    /// Fixed RNG seed; repeated runs on identical input are bit-identical.
    pub seed: u64,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 10.0,
            alpha: 0.99995,
            max_evaluations: 25_000,
            seed: 5489,
        }
    }
}
