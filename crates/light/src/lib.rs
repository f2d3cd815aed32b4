//! Lighting cache: per-tile illumination derived from emissive tiles.
//!
//! # Invariants
//! - `b ∈ forward[a]` iff `a ∈ reverse[b]` after every bake.
//! - Reverse sets are never empty; the last source leaving a tile removes its entry.
//! - A bake whose light-source set did not change never dirties another chunk.
//! - A chunk never re-schedules itself while it is being baked.

mod color;
mod lightmap;

pub use color::{Contribution, Light, falloff, linear_to_srgb, mix_additive, srgb_to_linear};
pub use lightmap::{ChunkBake, LightError, LightMap, LightingPass};

pub fn crate_info() -> &'static str {
    "tileworld-light v0.1.0"
}
