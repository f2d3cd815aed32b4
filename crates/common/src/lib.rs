//! Shared types for the tile world.
//!
//! # Invariants
//! - `Address::decode(Address::encode(x, y)) == (x, y)` for every `i32` pair.
//! - A `ChunkCoord` origin is a multiple of the chunk size on both axes.

mod address;
mod types;

pub use address::{Address, ChunkCoord, DirtySink, TileCoord};
pub use types::{Bounds, Color, CommonError, Transform};

/// Tile type identifier. `0` is air and is never stored.
pub type TileId = u16;

/// The empty tile.
pub const AIR: TileId = 0;

/// Default chunk edge length in tiles.
pub const DEFAULT_CHUNK_SIZE: i32 = 32;

pub fn crate_info() -> &'static str {
    "tileworld-common v0.1.0"
}
