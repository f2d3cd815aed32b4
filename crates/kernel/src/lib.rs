//! World Kernel: the world context, its configuration and the frame loop.
//!
//! # Invariants
//! - One `World` owns every cache; nothing is global.
//! - Tile writes go through `World::set_tile`, which invalidates the lighting
//!   and render caches for the written chunk.
//! - A frame runs generation, lighting and rendering in that order, and the
//!   despawn sweep last.

mod config;
mod timer;
pub mod world;

pub use config::{ConfigError, WorldConfig};
pub use timer::FrameTimer;
pub use world::{FrameReport, World, WorldError, WorldSummary};

pub fn crate_info() -> &'static str {
    "tileworld-kernel v0.1.0"
}
