//! Shared foundational types used across the `lim` linker crates.
//!
//! Handle-addressed storage ([`Arena`] plus [`define_id!`] keys), payload
//! digests for snapshot files, and the error raised when a structural
//! invariant breaks.

#![warn(missing_docs)]

pub mod arena;
pub mod hash;
pub mod ids;
pub mod result;

pub use arena::{Arena, ArenaId};
pub use hash::ContentHash;
pub use result::{InternalError, LimResult};
