use std::collections::HashMap;
use std::path::Path;
use tileworld_common::TileId;
use tileworld_tiles::TileRegistry;

use crate::Raster;

/// Images for tile ids. Tiles without an image render as a fallback
/// checkerboard.
#[derive(Debug, Clone, Default)]
pub struct TileSet {
    images: HashMap<TileId, Raster>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile_id: TileId, image: Raster) {
        self.images.insert(tile_id, image);
    }

    pub fn get(&self, tile_id: TileId) -> Option<&Raster> {
        self.images.get(&tile_id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Load each registry entry's `assetPath` relative to `root`.
    ///
    /// Missing or undecodable files are logged and skipped, so a partial
    /// asset directory still renders.
    pub fn load(registry: &TileRegistry, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut set = Self::new();
        for entry in registry.entries() {
            let path = root.join(&entry.asset_path);
            match Raster::load(&path) {
                Ok(image) => set.insert(entry.tile_id, image),
                Err(e) => tracing::warn!(
                    tile_id = entry.tile_id,
                    path = %path.display(),
                    error = %e,
                    "tile image unavailable, using fallback"
                ),
            }
        }
        tracing::debug!(loaded = set.len(), tiles = registry.len(), "loaded tile set");
        set
    }
}
