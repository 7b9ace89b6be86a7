//! Area-group placement for the `lim` linker.
//!
//! Assigns every area group a non-overlapping rectangle on the chip,
//! minimising weighted Manhattan distances between groups that communicate
//! or are nested, then orders the placed groups into a tour.
//!
//! # Pipeline
//!
//! 1. **Parse**: [`parse_constraints`] reads the constraint language
//! 2. **Elaborate**: [`elaborate`] merges in resource estimates and
//!    derives aspect-ratio options
//! 3. **Solve**: [`solve_ilp_partial`] applies special rules, then places
//!    free groups in batches through an [`IlpSolver`]
//! 4. **Tour**: [`tour_groups`] orders placed groups by annealing
//!
//! A placed [`Floorplan`] also drives the tree-cut partitioner through
//! [`PlacedHints`].
//!
//! # Usage
//!
//! ```ignore
//! use lim_place::{elaborate, parse_constraints, solve_ilp_partial, solver_for, CommTable};
//!
//! let set = parse_constraints(&text)?;
//! let plan = elaborate(set, &resources, &config.placement)?;
//! let solver = solver_for(&config.placement);
//! let placed = solve_ilp_partial(&plan, &CommTable::from_graph(&graph), &*solver, &config.placement, None)?;
//! ```

#![warn(missing_docs)]

pub mod comm;
pub mod constraints;
pub mod elaborate;
pub mod error;
pub mod formulate;
pub mod group;
pub mod hints;
pub mod lp;
pub mod model;
pub mod rules;
pub mod solve;
pub mod solver;
pub mod tour;

pub use comm::CommTable;
pub use constraints::{parse_constraints, ConstraintSet};
pub use elaborate::{aspect_options, elaborate};
pub use error::PlaceError;
pub use group::{AreaGroup, Chip, Dimension, Floorplan, EMPTY_BOX};
pub use hints::PlacedHints;
pub use rules::apply_rules;
pub use solve::{seed_from_prior, solve_ilp_partial, verify};
pub use solver::{solver_for, ExternalProgram, ExternalSolver, IlpSolver, MicroLpSolver};
pub use tour::{anneal_tour, tour_groups, Tour};
