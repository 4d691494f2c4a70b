//! # Runner Common
//!
//! Common types, utilities, and shared abstractions for AutoRunner.
//!
//! This crate provides foundational types used across all runner crates:
//! - Rigid transforms and the socket axis convention
//! - ID types (SegmentId, PlacementId, NodeId)
//! - Version information for asset schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod transform;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::transform::*;
    pub use crate::version::*;
}

pub use prelude::*;
