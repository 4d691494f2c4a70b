//! # Runner Track
//!
//! Procedural track generation for AutoRunner.
//!
//! This crate handles:
//! - Segment definitions and the catalog (built-in or loaded from TOML)
//! - Placing segments end to end with clearance probing
//! - Coin, obstacle and decoration placement
//! - Assembling the three rails the character follows
//! - A headless scene/physics world for tools and tests

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod catalog;
pub mod headless;
pub mod items;
pub mod loader;
pub mod path;
pub mod placement;
pub mod presets;
pub mod rng;
pub mod scene;
pub mod segment;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::*;
    pub use crate::headless::*;
    pub use crate::items::*;
    pub use crate::loader::*;
    pub use crate::path::*;
    pub use crate::placement::*;
    pub use crate::rng::*;
    pub use crate::scene::*;
    pub use crate::segment::*;
}

pub use prelude::*;
