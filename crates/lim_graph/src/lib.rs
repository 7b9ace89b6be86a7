//! Latency-insensitive module graph: connections, matching and assembly.
//!
//! Independently compiled hardware modules leave behind *dangling
//! connections*: named, typed, directional channel and chain endpoints whose
//! partner lives in some other module. This crate turns the extracted
//! records into an [`LiGraph`]:
//!
//! 1. **Extract**: [`extract::parse_log`] reads dangling-connection records
//!    from a compiler log
//! 2. **Group**: records are grouped by owning module, sorted by name
//! 3. **Match**: [`matches`] pairs complementary endpoints with equal names
//! 4. **Derive edges**: matched source endpoints become weighted edges
//!
//! Several extraction passes (platform and user modules) are combined with
//! [`LiGraph::merge`].
//!
//! # Usage
//!
//! ```ignore
//! use lim_graph::{extract, LiGraph};
//!
//! let records = extract::parse_log(&log_text)?;
//! let graph = LiGraph::new(records)?;
//! assert!(!graph.has_unmatched());
//! ```

#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod extract;
pub mod graph;
pub mod ids;
pub mod module;

pub use connection::{matches, Connection, ConnectionKind};
pub use error::GraphError;
pub use graph::LiGraph;
pub use ids::{ConnectionId, ModuleId};
pub use module::LiModule;
