//! Procedural terrain for the tile world.
//!
//! Terrain is layered: grass on the surface row, dirt down to the stone line,
//! stone below. Caves are carved afterwards from a smoothed noise mask.
//!
//! # Invariants
//! - A chunk is materialized at most once per generator.
//! - Generation output depends only on the seed and the chunk, never on the
//!   order in which chunks are generated.
//! - Generating a chunk writes only tiles inside that chunk.

mod generator;

pub use generator::{CAVE_THRESHOLD, TerrainTiles, WorldGenerator};

pub fn crate_info() -> &'static str {
    "tileworld-worldgen v0.1.0"
}
