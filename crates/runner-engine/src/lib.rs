//! AutoRunner engine - headless host for the track generator.
//!
//! Loads configuration and the segment catalog, then drives the game
//! controller with an autopilot runner on a headless world.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod config;
pub mod timing;
