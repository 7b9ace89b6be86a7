//! Versioned on-disk snapshots of area-group maps.
//!
//! A link run passes through three stages (elaborated, placed, final). Each
//! stage is persisted as an immutable file so that later runs can seed from
//! an earlier placement and downstream tools can read the annotated result.

#![warn(missing_docs)]

pub mod error;
pub mod store;

pub use error::SnapshotError;
pub use store::{Snapshot, SnapshotHeader, SnapshotStore, Stage};
