use glam::Vec2;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tileworld_common::{Bounds, TileCoord, TileId, Transform};
use tileworld_ecs::{Camera, EcsError, EntityId, Scene, Terrain};
use tileworld_input::{InputEvent, InputState};
use tileworld_light::{LightError, LightMap};
use tileworld_render::{ChunkCache, Raster, RenderError, RenderPass, TRANSPARENT, TileSet, TileView};
use tileworld_tiles::{RegistryError, TileCollider, TileMap, TileRegistry};
use tileworld_worldgen::WorldGenerator;

use crate::{ConfigError, FrameTimer, WorldConfig};

/// Errors surfaced by the world context.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("lighting graph corrupted: {0}")]
    Light(#[from] LightError),
    #[error(transparent)]
    Ecs(#[from] EcsError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What one [`World::frame`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub tick: u64,
    /// Chunks materialized by the generator.
    pub generated: usize,
    /// Chunk bakes run by the lighting cache.
    pub baked: usize,
    /// Chunks still waiting for a bake because of the bake budget.
    pub lights_pending: usize,
    /// Present when a target was drawn.
    pub render: Option<RenderPass>,
    /// Entities removed by the end-of-frame sweep.
    pub swept: usize,
}

/// Point-in-time counters for logging and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSummary {
    pub tick: u64,
    pub seed: u32,
    pub tiles: usize,
    pub generated_chunks: usize,
    pub light_sources: usize,
    pub lit_tiles: usize,
    pub dirty_light_chunks: usize,
    pub cached_chunks: usize,
    pub entities: usize,
    pub average_frame: Duration,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== World (tick={}, seed={}) ===", self.tick, self.seed)?;
        writeln!(f, "Tiles: {} ({} chunks generated)", self.tiles, self.generated_chunks)?;
        writeln!(
            f,
            "Lighting: {} sources, {} lit tiles, {} chunks dirty",
            self.light_sources, self.lit_tiles, self.dirty_light_chunks
        )?;
        writeln!(f, "Render cache: {} chunks", self.cached_chunks)?;
        writeln!(f, "Entities: {}", self.entities)?;
        write!(f, "Frame time: {:?} avg", self.average_frame)
    }
}

/// The world context: owns every subsystem and runs frames.
///
/// There is no global instance. Build one with [`World::new`], feed it input
/// and frames, and drop it when done. Per frame the order is fixed: entity
/// updates, terrain generation for the camera's view, lighting bake, chunk
/// rendering, entity rendering, then the despawn sweep.
pub struct World {
    config: WorldConfig,
    registry: TileRegistry,
    tileset: TileSet,
    tiles: TileMap,
    lights: LightMap,
    chunks: ChunkCache,
    generator: Option<WorldGenerator>,
    scene: Scene,
    input: InputState,
    timer: FrameTimer,
    tick: u64,
}

impl World {
    pub fn new(config: WorldConfig, registry: TileRegistry) -> Result<Self, WorldError> {
        config.validate()?;
        let size = config.chunk_size;
        let world = Self {
            registry,
            tileset: TileSet::new(),
            tiles: TileMap::new(size),
            lights: LightMap::new(size).with_bake_budget(config.bake_budget),
            chunks: ChunkCache::new(size, config.tile_resolution).with_ambient(config.ambient_light),
            generator: Some(WorldGenerator::new(config.seed, size).with_terrain(config.terrain)),
            scene: Scene::new(),
            input: InputState::new(),
            timer: FrameTimer::default(),
            tick: 0,
            config,
        };
        tracing::info!(
            seed = world.config.seed,
            chunk_size = size,
            tiles = world.registry.len(),
            "world created"
        );
        Ok(world)
    }

    /// Stop materializing terrain; the tile map then only changes through
    /// [`World::set_tile`].
    pub fn without_generation(mut self) -> Self {
        self.generator = None;
        self
    }

    pub fn with_tileset(mut self, tileset: TileSet) -> Self {
        self.tileset = tileset;
        self.chunks.invalidate_all();
        self
    }

    /// Load tile images named by the registry from `root`.
    pub fn load_tileset(&mut self, root: impl AsRef<Path>) {
        self.tileset = TileSet::load(&self.registry, root);
        self.chunks.invalidate_all();
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn lights(&self) -> &LightMap {
        &self.lights
    }

    pub fn chunks(&self) -> &ChunkCache {
        &self.chunks
    }

    pub fn generator(&self) -> Option<&WorldGenerator> {
        self.generator.as_ref()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Write a tile and invalidate its chunk in the lighting and render caches.
    pub fn set_tile(&mut self, world: TileCoord, tile: TileId) -> bool {
        self.tiles.set_tile(world, tile, &mut (&mut self.lights, &mut self.chunks))
    }

    pub fn get_tile(&self, world: TileCoord) -> TileId {
        self.tiles.get_tile(world)
    }

    /// Switch lighting on or off. Cached rasters are redrawn either way
    /// because their shading changes.
    pub fn set_lighting_enabled(&mut self, enabled: bool) {
        if self.config.lighting_enabled != enabled {
            self.config.lighting_enabled = enabled;
            self.chunks.invalidate_all();
            tracing::debug!(enabled, "lighting toggled");
        }
    }

    /// Spawn an entity with a [`Camera`] at `position` and make it active.
    pub fn spawn_camera(&mut self, position: Vec2) -> Result<EntityId, WorldError> {
        let id = self.scene.spawn(Transform::from_position(position));
        self.scene.add_component(id, Camera::new(self.config.pixels_per_unit))?;
        self.scene.set_camera(id)?;
        Ok(id)
    }

    /// Update input state, then route the event to components.
    pub fn handle_input(&mut self, event: &InputEvent) {
        self.input.apply(event);
        self.scene.dispatch(event, &self.input);
    }

    /// Paint the tile under a screen position. Returns the painted tile, or
    /// `None` without an active camera.
    pub fn paint_at_screen(&mut self, screen: Vec2, viewport: Vec2, tile: TileId) -> Option<TileCoord> {
        let world = self.scene.screen_to_world(viewport, screen)?;
        let coord = TileCoord::from_world(world);
        self.set_tile(coord, tile);
        Some(coord)
    }

    pub fn is_colliding(&self, collider: &TileCollider) -> bool {
        collider.colliding([&self.tiles], &self.registry)
    }

    pub fn is_grounded(&self, collider: &TileCollider) -> bool {
        collider.grounded([&self.tiles], &self.registry)
    }

    /// Materialize terrain for a world rectangle without a camera.
    pub fn generate_region(&mut self, bounds: Bounds) -> usize {
        let Some(generator) = self.generator.as_mut() else {
            return 0;
        };
        generator
            .generate_visible(bounds, &mut self.tiles, &mut (&mut self.lights, &mut self.chunks))
            .len()
    }

    /// Drain the lighting queue (subject to the bake budget).
    pub fn bake_lighting(&mut self) -> Result<usize, WorldError> {
        if !self.config.lighting_enabled {
            return Ok(0);
        }
        let pass = self
            .lights
            .update_dirty_chunks(&self.tiles, &self.registry, &mut self.chunks)?;
        Ok(pass.baked.len())
    }

    /// Check the lighting dependency graph end to end.
    pub fn verify_lighting(&self) -> Result<(), WorldError> {
        Ok(self.lights.verify_graph()?)
    }

    /// Read-only view for stateless renderers.
    pub fn tile_view(&self, bounds: Bounds) -> TileView<'_> {
        TileView {
            tiles: &self.tiles,
            lights: self.config.lighting_enabled.then_some(&self.lights),
            registry: &self.registry,
            bounds,
        }
    }

    /// Run one frame. `viewport` is the target size in pixels; `target`,
    /// when given, is cleared and redrawn from the active camera.
    pub fn frame(&mut self, dt: f32, viewport: Vec2, target: Option<&mut Raster>) -> Result<FrameReport, WorldError> {
        let _span = tracing::info_span!("frame", tick = self.tick).entered();
        let started = Instant::now();
        let mut report = FrameReport {
            tick: self.tick,
            ..FrameReport::default()
        };

        let terrain = Terrain {
            tiles: &self.tiles,
            registry: &self.registry,
        };
        self.scene.update_with_terrain(dt, &self.input, Some(terrain));

        match self.scene.camera_bounds(viewport) {
            Some(bounds) => report.generated = self.generate_region(bounds),
            None => tracing::trace!("no active camera, skipping generation"),
        }

        if self.config.lighting_enabled {
            let pass = self
                .lights
                .update_dirty_chunks(&self.tiles, &self.registry, &mut self.chunks)?;
            report.baked = pass.baked.len();
            report.lights_pending = pass.remaining;
        }

        if let (Some(target), Some(view)) = (target, self.scene.camera_view(viewport)) {
            target.clear(TRANSPARENT);
            let lights = self.config.lighting_enabled.then_some(&self.lights);
            report.render = Some(self.chunks.render_chunks(&self.tiles, lights, &self.tileset, &view, target));
            self.scene.render(&view, target);
        }

        report.swept = self.scene.sweep();
        self.tick += 1;
        self.timer.record(started.elapsed());
        tracing::trace!(?report, "frame complete");
        Ok(report)
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            tick: self.tick,
            seed: self.config.seed,
            tiles: self.tiles.len(),
            generated_chunks: self.generator.as_ref().map_or(0, WorldGenerator::generated_count),
            light_sources: self.lights.source_count(),
            lit_tiles: self.lights.lit_target_count(),
            dirty_light_chunks: self.lights.dirty_count(),
            cached_chunks: self.chunks.len(),
            entities: self.scene.len(),
            average_frame: self.timer.average(),
        }
    }

    /// FNV-1a hash of the tile contents in coordinate order. Equal hashes
    /// mean equal tile maps for all practical purposes.
    pub fn state_hash(&self) -> u64 {
        let mut tiles: Vec<(TileCoord, TileId)> = self.tiles.iter().collect();
        tiles.sort_unstable();
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mut mix = |bytes: &[u8]| {
            for &b in bytes {
                h ^= b as u64;
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for (coord, id) in tiles {
            mix(&coord.x.to_le_bytes());
            mix(&coord.y.to_le_bytes());
            mix(&id.to_le_bytes());
        }
        h
    }
}
