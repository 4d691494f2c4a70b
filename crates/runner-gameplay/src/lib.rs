//! # Runner Gameplay
//!
//! Gameplay side of AutoRunner.
//!
//! This crate provides:
//! - The path contract between the track and the character
//! - A reference rail-following runner
//! - Session score and high score bookkeeping
//! - The game controller that keeps the track ahead of the character
//! - Event bus for observers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod character;
pub mod controller;
pub mod events;
pub mod session;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::character::*;
    pub use crate::controller::*;
    pub use crate::events::*;
    pub use crate::session::*;
    pub use runner_track::{RailSide, TurnState};
}

pub use prelude::*;
