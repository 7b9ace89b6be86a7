//! Tree-cut partitioner for latency-insensitive module graphs.
//!
//! Recursively bisects an [`LiGraph`](lim_graph::LiGraph) into a binary
//! merge tree so that no single downstream compilation step has to reconcile
//! an unbounded number of connections.
//!
//! # Pipeline
//!
//! 1. **Bisect**: placement-driven split when [`PlacementHints`] provide
//!    one, else the global minimum s–t cut ([`mincut`])
//! 2. **Recurse**: each side becomes a subtree; empty sides are named
//!    placeholders
//! 3. **Reconcile**: channels the graph paired across the two children and
//!    same-named chain ends become [`Link`]s, everything else is exposed on
//!    the new node
//! 4. **Promote**: nodes whose accumulated rule count crosses the
//!    threshold (and the root) become synthesis boundaries
//!
//! # Usage
//!
//! ```ignore
//! use lim_treecut::{build_tree, CutOptions, NoHints};
//!
//! let tree = build_tree(&graph, &NoHints, &CutOptions::default())?;
//! let report = tree.report(&graph);
//! ```

#![warn(missing_docs)]

pub mod build;
pub mod error;
pub mod hints;
pub mod ids;
pub mod mincut;
pub mod names;
pub mod report;
pub mod tree;

pub use build::{build_tree, CutOptions, TreeBuilder};
pub use error::TreeCutError;
pub use hints::{NoHints, PlacementHints};
pub use ids::NodeId;
pub use report::{InterfaceArity, NodeReport, ResidualPort, TreeReport};
pub use tree::{Link, LinkKind, ModuleTree, NodeKind, Port, TreeNode};
