//! Tile storage: the registry of tile definitions, sparse per-map tile
//! storage, and box collision against tile maps.
//!
//! # Invariants
//! - Air (`0`) is never stored; absence of a key reads as air.
//! - Every effective write reports its owning chunk to the caller's sink.

mod collider;
mod registry;
mod tilemap;

pub use collider::{EDGE_EPSILON, TileCollider};
pub use registry::{RegistryError, TileEntry, TileRegistry};
pub use tilemap::TileMap;

pub fn crate_info() -> &'static str {
    "tileworld-tiles v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tiles"));
    }
}
