use glam::Vec2;
use std::collections::HashMap;
use tileworld_common::{AIR, Bounds, ChunkCoord, DirtySink};
use tileworld_light::{Light, LightMap};
use tileworld_tiles::TileMap;

use crate::raster::{FALLBACK_DARK, FALLBACK_LIGHT};
use crate::{Raster, TileSet};

/// Default ambient floor for unlit tiles.
pub const DEFAULT_AMBIENT: f32 = 0.15;

/// World-to-screen mapping for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Visible world rectangle.
    pub bounds: Bounds,
    /// Screen pixels per world unit, zoom included.
    pub pixels_per_unit: f32,
}

impl View {
    pub fn new(bounds: Bounds, pixels_per_unit: f32) -> Self {
        Self { bounds, pixels_per_unit }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.bounds.min) * self.pixels_per_unit
    }
}

#[derive(Debug, Clone)]
struct ChunkEntry {
    raster: Raster,
    dirty: bool,
}

/// Counters from one [`ChunkCache::render_chunks`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderPass {
    pub visible: usize,
    pub redrawn: usize,
}

/// Memoized chunk rasters.
///
/// Each chunk is drawn once at `tile_resolution` pixels per tile and reused
/// until a tile or lighting change marks it dirty. Screen scale is applied
/// only when blitting, so zooming never redraws. Keys are tile-map local.
#[derive(Debug, Clone)]
pub struct ChunkCache {
    chunk_size: i32,
    tile_resolution: u32,
    ambient: f32,
    entries: HashMap<ChunkCoord, ChunkEntry>,
}

impl DirtySink for ChunkCache {
    fn mark_dirty(&mut self, chunk: ChunkCoord) {
        ChunkCache::mark_dirty(self, chunk);
    }
}

impl ChunkCache {
    pub fn new(chunk_size: i32, tile_resolution: u32) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(tile_resolution > 0, "tile_resolution must be positive");
        Self {
            chunk_size,
            tile_resolution,
            ambient: DEFAULT_AMBIENT,
            entries: HashMap::new(),
        }
    }

    pub fn with_ambient(mut self, ambient: f32) -> Self {
        self.ambient = ambient.clamp(0.0, 1.0);
        self
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn tile_resolution(&self) -> u32 {
        self.tile_resolution
    }

    pub fn ambient(&self) -> f32 {
        self.ambient
    }

    /// Flag an existing entry for redraw. Chunks never drawn are already
    /// implicitly dirty, so no entry is created.
    pub fn mark_dirty(&mut self, chunk: ChunkCoord) {
        if let Some(entry) = self.entries.get_mut(&chunk) {
            entry.dirty = true;
        }
    }

    /// Flag every entry, e.g. after toggling lighting.
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.dirty = true;
        }
    }

    pub fn is_dirty(&self, chunk: ChunkCoord) -> bool {
        self.entries.get(&chunk).is_none_or(|e| e.dirty)
    }

    pub fn raster(&self, chunk: ChunkCoord) -> Option<&Raster> {
        self.entries.get(&chunk).map(|e| &e.raster)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-channel multiplier for a tile's lighting.
    pub fn overlay(&self, light: Light) -> [f32; 3] {
        let lit = light.intensity.clamp(0.0, 1.0);
        light
            .color
            .to_unit()
            .map(|hue| self.ambient + (1.0 - self.ambient) * lit * hue)
    }

    /// Redraw `chunk` if it is dirty. Returns whether a redraw happened.
    ///
    /// `lights` of `None` draws tiles unshaded.
    pub fn refresh(&mut self, chunk: ChunkCoord, tiles: &TileMap, lights: Option<&LightMap>, tileset: &TileSet) -> bool {
        if !self.is_dirty(chunk) {
            return false;
        }
        let raster = self.draw_chunk(chunk, tiles, lights, tileset);
        self.entries.insert(chunk, ChunkEntry { raster, dirty: false });
        tracing::trace!(?chunk, "redrew chunk");
        true
    }

    fn draw_chunk(&self, chunk: ChunkCoord, tiles: &TileMap, lights: Option<&LightMap>, tileset: &TileSet) -> Raster {
        let res = self.tile_resolution;
        let side = self.chunk_size as u32 * res;
        let mut raster = Raster::new(side, side);
        for tile in chunk.tiles(self.chunk_size) {
            let id = tiles.get_local(tile);
            if id == AIR {
                continue;
            }
            let x = (tile.x as i64 - chunk.x as i64) * res as i64;
            let y = (tile.y as i64 - chunk.y as i64) * res as i64;
            match tileset.get(id) {
                Some(image) => raster.draw_scaled(image, x, y, res, res),
                None => raster.checkerboard(x, y, res, res, FALLBACK_DARK, FALLBACK_LIGHT),
            }
            if let Some(lights) = lights {
                let light = lights.get_lighting(tile).unwrap_or(Light::DARK);
                raster.tint_rect(x, y, res, res, self.overlay(light));
            }
        }
        raster
    }

    /// Refresh and blit every chunk overlapping the view into `target`.
    pub fn render_chunks(
        &mut self,
        tiles: &TileMap,
        lights: Option<&LightMap>,
        tileset: &TileSet,
        view: &View,
        target: &mut Raster,
    ) -> RenderPass {
        let _span = tracing::info_span!("render_chunks").entered();
        let origin = tiles.origin();
        let offset = Vec2::new(origin.x as f32, origin.y as f32);
        let local = Bounds::new(view.bounds.min - offset, view.bounds.max - offset);
        let visible = ChunkCoord::covering(local, self.chunk_size);
        let extent = Vec2::splat(self.chunk_size as f32 * view.pixels_per_unit);

        let mut pass = RenderPass {
            visible: visible.len(),
            redrawn: 0,
        };
        for chunk in visible {
            if self.refresh(chunk, tiles, lights, tileset) {
                pass.redrawn += 1;
            }
            let Some(raster) = self.raster(chunk) else {
                continue;
            };
            let world = Vec2::new(chunk.x as f32, chunk.y as f32) + offset;
            target.blit_scaled(raster, view.world_to_screen(world), extent);
        }
        tracing::debug!(visible = pass.visible, redrawn = pass.redrawn, "rendered chunks");
        pass
    }
}
