use std::collections::{BTreeSet, HashMap, HashSet};
use tileworld_common::{Address, ChunkCoord, DEFAULT_CHUNK_SIZE, DirtySink, TileCoord, TileId};
use tileworld_tiles::{TileEntry, TileMap, TileRegistry};

use crate::color::{Contribution, Light, falloff, mix_additive};

/// Errors from lighting maintenance. All of them are internal-consistency
/// failures of the dependency graph and must not be ignored.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LightError {
    #[error("light source {emitter:?} lists target {target:?} but the target does not list it back")]
    MissingReverse { emitter: TileCoord, target: TileCoord },
    #[error("tile {target:?} lists light source {emitter:?} which has no forward entry")]
    MissingForward { emitter: TileCoord, target: TileCoord },
    #[error("tile {0:?} keeps an empty light-source set")]
    EmptyReverse(TileCoord),
}

/// Forward record of one light source.
#[derive(Debug, Clone)]
struct Emitter {
    /// Tile id that was emitting when the source was last baked.
    tile: TileId,
    targets: HashSet<Address>,
}

/// What a single chunk bake did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBake {
    /// Whether any tile in the chunk started, stopped, or changed emitting.
    pub light_sources_changed: bool,
    /// Other chunks marked dirty as a consequence, in order.
    pub cascaded: Vec<ChunkCoord>,
}

/// Summary of one [`LightMap::update_dirty_chunks`] pass.
#[derive(Debug, Clone, Default)]
pub struct LightingPass {
    /// Chunks baked, in bake order. A chunk may appear more than once when a
    /// later bake in the same pass rescheduled it.
    pub baked: Vec<ChunkCoord>,
    /// Number of cascade invalidations raised during the pass.
    pub cascaded: usize,
    /// Chunks left dirty because the bake budget ran out.
    pub remaining: usize,
}

/// Incremental per-tile lighting cache.
///
/// Illumination is derived from emissive tiles through a two-way dependency
/// graph: `forward` maps a light source to the tiles it reaches and `reverse`
/// maps a tile to the sources reaching it. Work is scheduled per chunk; only
/// dirty chunks are re-baked, and a bake only invalidates other chunks when
/// the set of light sources inside it changed.
///
/// All coordinates are tile-map local.
#[derive(Debug, Clone)]
pub struct LightMap {
    chunk_size: i32,
    lighting: HashMap<Address, Light>,
    dirty: BTreeSet<ChunkCoord>,
    forward: HashMap<Address, Emitter>,
    reverse: HashMap<Address, HashSet<Address>>,
    bake_budget: Option<usize>,
}

impl Default for LightMap {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl DirtySink for LightMap {
    fn mark_dirty(&mut self, chunk: ChunkCoord) {
        LightMap::mark_dirty(self, chunk);
    }
}

impl LightMap {
    pub fn new(chunk_size: i32) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self {
            chunk_size,
            lighting: HashMap::new(),
            dirty: BTreeSet::new(),
            forward: HashMap::new(),
            reverse: HashMap::new(),
            bake_budget: None,
        }
    }

    /// Cap the number of chunk bakes per [`LightMap::update_dirty_chunks`]
    /// call. `None` drains everything.
    pub fn with_bake_budget(mut self, budget: Option<usize>) -> Self {
        self.bake_budget = budget;
        self
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Schedule a chunk for re-baking.
    pub fn mark_dirty(&mut self, chunk: ChunkCoord) {
        self.dirty.insert(chunk);
    }

    pub fn is_dirty(&self, chunk: ChunkCoord) -> bool {
        self.dirty.contains(&chunk)
    }

    pub fn dirty_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.dirty.iter().copied()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Resolved lighting at a tile, if any source reaches it.
    pub fn get_lighting(&self, tile: TileCoord) -> Option<Light> {
        self.lighting.get(&tile.address()).copied()
    }

    /// Overwrite the cached lighting of one tile until its chunk is re-baked.
    pub fn set_lighting(&mut self, tile: TileCoord, light: Light) {
        self.lighting.insert(tile.address(), light);
    }

    /// Brightness at a tile; `0.0` when dark or untracked.
    pub fn illumination(&self, tile: TileCoord) -> f32 {
        self.get_lighting(tile).map_or(0.0, |l| l.intensity)
    }

    /// Light sources currently reaching `tile`.
    pub fn sources_of(&self, tile: TileCoord) -> Vec<TileCoord> {
        let mut out: Vec<TileCoord> = self
            .reverse
            .get(&tile.address())
            .map(|s| s.iter().map(|a| a.decode()).collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Tiles reached by the light source at `source`. `None` if it is not a
    /// tracked source.
    pub fn dependents_of(&self, source: TileCoord) -> Option<Vec<TileCoord>> {
        self.forward.get(&source.address()).map(|e| {
            let mut out: Vec<TileCoord> = e.targets.iter().map(|a| a.decode()).collect();
            out.sort();
            out
        })
    }

    /// Number of tracked light sources.
    pub fn source_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of tiles reached by at least one source.
    pub fn lit_target_count(&self) -> usize {
        self.reverse.len()
    }

    fn chunk_of(&self, addr: Address) -> ChunkCoord {
        ChunkCoord::containing(addr.decode(), self.chunk_size)
    }

    /// Bake every dirty chunk.
    ///
    /// Bakes may schedule other chunks, which are baked in the same pass; a
    /// chunk never schedules itself. `render` receives every baked chunk and
    /// every cascade target so presentation caches can be invalidated.
    pub fn update_dirty_chunks(
        &mut self,
        tiles: &TileMap,
        registry: &TileRegistry,
        render: &mut impl DirtySink,
    ) -> Result<LightingPass, LightError> {
        let mut pass = LightingPass::default();
        if self.dirty.is_empty() {
            return Ok(pass);
        }
        let _span = tracing::info_span!("bake_lighting").entered();

        while let Some(chunk) = self.dirty.pop_first() {
            if self.bake_budget.is_some_and(|budget| pass.baked.len() >= budget) {
                self.dirty.insert(chunk);
                break;
            }
            let bake = self.bake_chunk_lighting(chunk, tiles, registry, render)?;
            render.mark_dirty(chunk);
            pass.cascaded += bake.cascaded.len();
            pass.baked.push(chunk);
        }
        pass.remaining = self.dirty.len();

        tracing::info!(
            baked = pass.baked.len(),
            cascaded = pass.cascaded,
            remaining = pass.remaining,
            "baked light map chunks"
        );
        Ok(pass)
    }

    /// Recompute lighting for one chunk and its sources' dependency entries.
    pub fn bake_chunk_lighting(
        &mut self,
        chunk: ChunkCoord,
        tiles: &TileMap,
        registry: &TileRegistry,
        render: &mut impl DirtySink,
    ) -> Result<ChunkBake, LightError> {
        tracing::debug!(?chunk, "baking chunk");
        let size = self.chunk_size;
        let mut light_sources_changed = false;
        let mut affected: BTreeSet<ChunkCoord> = BTreeSet::new();

        for tile in chunk.tiles(size) {
            let addr = tile.address();
            self.lighting.remove(&addr);

            let tile_id = tiles.get_local(tile);
            let emitting = registry
                .get_tile_entry(tile_id)
                .filter(|e| e.is_light_source());
            let previous = self.forward.remove(&addr);

            if previous.as_ref().map(|e| e.tile) != emitting.map(|_| tile_id) {
                light_sources_changed = true;
                if let Some(prev) = &previous {
                    affected.extend(prev.targets.iter().map(|t| self.chunk_of(*t)));
                }
            }

            if let Some(prev) = previous {
                for target in prev.targets {
                    self.unlink(addr, target)?;
                }
            }

            let Some(entry) = emitting else { continue };
            let targets = self.link(tile, entry, &mut affected);
            self.forward.insert(addr, Emitter { tile: tile_id, targets });
        }

        for tile in chunk.tiles(size) {
            if let Some(light) = self.resolve(tile, registry)? {
                self.lighting.insert(tile.address(), light);
            }
        }

        let mut cascaded = Vec::new();
        if light_sources_changed {
            for other in affected.into_iter().filter(|c| *c != chunk) {
                self.mark_dirty(other);
                render.mark_dirty(other);
                cascaded.push(other);
            }
            tracing::debug!(?chunk, cascaded = cascaded.len(), "light sources changed");
        }

        Ok(ChunkBake {
            light_sources_changed,
            cascaded,
        })
    }

    /// Drop `source` from the reverse entry of `target`, pruning empty sets.
    fn unlink(&mut self, source: Address, target: Address) -> Result<(), LightError> {
        let missing = || LightError::MissingReverse {
            emitter: source.decode(),
            target: target.decode(),
        };
        let sources = self.reverse.get_mut(&target).ok_or_else(missing)?;
        if !sources.remove(&source) {
            return Err(missing());
        }
        if sources.is_empty() {
            self.reverse.remove(&target);
        }
        Ok(())
    }

    /// Register every tile within the source's radius in both directions.
    fn link(&mut self, source: TileCoord, entry: &TileEntry, affected: &mut BTreeSet<ChunkCoord>) -> HashSet<Address> {
        let mut targets = HashSet::new();
        let radius = entry.light_radius();
        if radius <= 0.0 {
            return targets;
        }
        let source_addr = source.address();
        let reach = radius.floor() as i32;
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                // Tiles past the ends of the coordinate range do not exist.
                let Some(target) = source.checked_offset(dx, dy) else {
                    continue;
                };
                if !within_radius(source.distance_sq(target), radius) {
                    continue;
                }
                let target_addr = target.address();
                targets.insert(target_addr);
                self.reverse.entry(target_addr).or_default().insert(source_addr);
                affected.insert(ChunkCoord::containing(target, self.chunk_size));
            }
        }
        targets
    }

    /// Mix every source reaching `tile`.
    fn resolve(&self, tile: TileCoord, registry: &TileRegistry) -> Result<Option<Light>, LightError> {
        let Some(sources) = self.reverse.get(&tile.address()) else {
            return Ok(None);
        };
        let mut contributions = Vec::with_capacity(sources.len());
        for source_addr in sources {
            let source = source_addr.decode();
            let emitter = self.forward.get(source_addr).ok_or(LightError::MissingForward {
                emitter: source,
                target: tile,
            })?;
            let Some(entry) = registry.get_tile_entry(emitter.tile) else {
                continue;
            };
            let distance = (source.distance_sq(tile) as f32).sqrt();
            let intensity = falloff(entry.light_intensity(), entry.light_radius(), distance);
            if intensity > 0.0 {
                contributions.push(Contribution {
                    color: entry.light_color(),
                    intensity,
                });
            }
        }
        Ok(mix_additive(&contributions))
    }

    /// Check the whole dependency graph: every forward edge has its reverse
    /// edge and vice versa, and no reverse set is empty.
    pub fn verify_graph(&self) -> Result<(), LightError> {
        for (source, emitter) in &self.forward {
            for target in &emitter.targets {
                if !self.reverse.get(target).is_some_and(|s| s.contains(source)) {
                    return Err(LightError::MissingReverse {
                        emitter: source.decode(),
                        target: target.decode(),
                    });
                }
            }
        }
        for (target, sources) in &self.reverse {
            if sources.is_empty() {
                return Err(LightError::EmptyReverse(target.decode()));
            }
            for source in sources {
                if !self.forward.get(source).is_some_and(|e| e.targets.contains(target)) {
                    return Err(LightError::MissingForward {
                        emitter: source.decode(),
                        target: target.decode(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Whether a tile `distance_sq` away lies inside `radius`, boundary
/// included. Squares in `f64` so large radii compare exactly.
fn within_radius(distance_sq: i64, radius: f32) -> bool {
    let radius = radius as f64;
    distance_sq as f64 <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileworld_common::{AIR, Color};

    const LAMP: TileId = 4;
    const BIG_LAMP: TileId = 6;
    const RED_LAMP: TileId = 7;

    fn registry() -> TileRegistry {
        let mut registry = TileRegistry::new();
        registry.register_tiles([
            TileEntry::new(1, "Dirt", "dirt.png", true),
            TileEntry::new(LAMP, "Light", "light.png", false).with_light(1.0, 5.0, Color::WHITE),
            TileEntry::new(5, "Dead", "dead.png", false).with_light(1.0, 0.0, Color::WHITE),
            TileEntry::new(BIG_LAMP, "Big", "big.png", false).with_light(1.0, 10.0, Color::WHITE),
            TileEntry::new(RED_LAMP, "Red", "red.png", false).with_light(1.0, 5.0, Color::rgb(255, 0, 0)),
        ]);
        registry
    }

    fn chunk_at(x: i32, y: i32) -> ChunkCoord {
        ChunkCoord::containing(TileCoord::new(x, y), 32)
    }

    /// Write tiles the way the world does: both caches hear about the chunk.
    fn place(tiles: &mut TileMap, lights: &mut LightMap, x: i32, y: i32, id: TileId) {
        tiles.set_tile(TileCoord::new(x, y), id, lights);
    }

    #[test]
    fn scenario_lamp_at_origin() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        assert_eq!(lights.illumination(TileCoord::new(0, 0)), 1.0);
        assert_eq!(lights.illumination(TileCoord::new(5, 0)), 0.0);
        assert!((lights.illumination(TileCoord::new(3, 0)) - 0.4).abs() < 1e-5);
        assert_eq!(lights.get_lighting(TileCoord::new(0, 0)).unwrap().color, Color::WHITE);
    }

    #[test]
    fn lamp_lights_neighbor_chunks_after_cascade() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        let pass = lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        // (0,0) reaches into the three chunks left of and above it.
        assert_eq!(pass.cascaded, 3);
        assert_eq!(pass.remaining, 0);
        assert!((lights.illumination(TileCoord::new(-3, 0)) - 0.4).abs() < 1e-5);
        assert!((lights.illumination(TileCoord::new(0, -2)) - 0.6).abs() < 1e-5);
        assert!(lights.illumination(TileCoord::new(-1, -1)) > 0.0);
    }

    #[test]
    fn falloff_is_monotone_and_zero_at_radius() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 10, 10, BIG_LAMP);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        assert_eq!(lights.illumination(TileCoord::new(10, 10)), 1.0);
        let mut previous = f32::INFINITY;
        for d in 0..=12 {
            let value = lights.illumination(TileCoord::new(10 + d, 10));
            assert!(value <= previous);
            if d >= 10 {
                assert_eq!(value, 0.0);
            } else {
                assert!(value > 0.0);
            }
            previous = value;
        }
        // (6, 8) away: exactly on the radius.
        assert_eq!(lights.illumination(TileCoord::new(16, 18)), 0.0);
    }

    #[test]
    fn removing_a_source_clears_its_tiles_and_marks_exactly_their_chunks() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        let lit = lights.dependents_of(TileCoord::new(0, 0)).unwrap();
        let expected: BTreeSet<ChunkCoord> = lit
            .iter()
            .map(|t| ChunkCoord::containing(*t, 32))
            .filter(|c| *c != chunk_at(0, 0))
            .collect();

        tiles.set_tile(TileCoord::new(0, 0), AIR, &mut ());
        let mut render = BTreeSet::new();
        let bake = lights
            .bake_chunk_lighting(chunk_at(0, 0), &tiles, &registry, &mut render)
            .unwrap();

        assert!(bake.light_sources_changed);
        let dirty: BTreeSet<ChunkCoord> = lights.dirty_chunks().collect();
        assert_eq!(dirty, expected);
        assert_eq!(render, expected);
        assert!(lights.dependents_of(TileCoord::new(0, 0)).is_none());

        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        for tile in lit {
            assert!(lights.get_lighting(tile).is_none(), "{tile:?} still lit");
            assert!(lights.sources_of(tile).is_empty());
        }
        assert_eq!(lights.lit_target_count(), 0);
        lights.verify_graph().unwrap();
    }

    #[test]
    fn radius_boundary_is_exact_for_large_radii() {
        // 4097^2 is not representable in f32.
        assert!(within_radius(4097 * 4097, 4097.0));
        assert!(!within_radius(4097 * 4097 + 1, 4097.0));
        assert!(within_radius(25, 5.0));
        assert!(!within_radius(26, 5.0));
    }

    #[test]
    fn sources_at_the_coordinate_range_end_bake() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        let edge = TileCoord::new(i32::MAX, i32::MIN);
        place(&mut tiles, &mut lights, edge.x, edge.y, LAMP);
        tiles.set_tile(TileCoord::new(i32::MAX, 0), 1, &mut lights);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        assert_eq!(lights.illumination(edge), 1.0);
        assert!(lights.illumination(TileCoord::new(i32::MAX - 3, i32::MIN)) > 0.0);
        let lit = lights.dependents_of(edge).unwrap();
        assert!(lit.iter().all(|t| t.distance_sq(edge) <= 25));
        lights.verify_graph().unwrap();

        place(&mut tiles, &mut lights, edge.x, edge.y, AIR);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        assert_eq!(lights.lit_target_count(), 0);
    }

    #[test]
    fn rebake_without_source_change_does_not_cascade() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        // A non-emitting edit in the lamp's chunk.
        place(&mut tiles, &mut lights, 10, 10, 1);
        let mut render = BTreeSet::new();
        let pass = lights.update_dirty_chunks(&tiles, &registry, &mut render).unwrap();
        assert_eq!(pass.baked, vec![chunk_at(0, 0)]);
        assert_eq!(pass.cascaded, 0);
        assert_eq!(lights.dirty_count(), 0);
        assert_eq!(render.into_iter().collect::<Vec<_>>(), vec![chunk_at(0, 0)]);
        assert!((lights.illumination(TileCoord::new(3, 0)) - 0.4).abs() < 1e-5);
    }

    #[test]
    fn dependency_graph_stays_consistent_across_edits() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        let edits: [(i32, i32, TileId); 8] = [
            (0, 0, LAMP),
            (3, 1, RED_LAMP),
            (-2, 30, BIG_LAMP),
            (0, 0, 1),
            (31, 31, LAMP),
            (3, 1, LAMP),
            (-2, 30, AIR),
            (40, -5, 5),
        ];
        for (x, y, id) in edits {
            place(&mut tiles, &mut lights, x, y, id);
            lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
            lights.verify_graph().unwrap();
        }
        assert_eq!(lights.source_count(), 3);
        assert!(lights.dependents_of(TileCoord::new(-2, 30)).is_none());
        assert!(lights.sources_of(TileCoord::new(3, 1)).contains(&TileCoord::new(3, 1)));
    }

    #[test]
    fn zero_radius_source_is_tracked_with_no_targets() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 2, 2, 5);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        assert_eq!(lights.dependents_of(TileCoord::new(2, 2)), Some(Vec::new()));
        assert_eq!(lights.illumination(TileCoord::new(2, 2)), 0.0);
        lights.verify_graph().unwrap();
    }

    #[test]
    fn swapping_lamp_type_counts_as_a_change() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        place(&mut tiles, &mut lights, 0, 0, RED_LAMP);
        let pass = lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        assert!(pass.cascaded > 0);
        assert_eq!(lights.get_lighting(TileCoord::new(-1, 0)).unwrap().color, Color::rgb(255, 0, 0));
    }

    #[test]
    fn light_from_a_later_chunk_reaches_an_earlier_one() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        // Both chunks dirty at once; (-32, 0) sorts first and bakes before
        // the lamp's chunk exists in the graph, then gets rescheduled.
        lights.mark_dirty(chunk_at(-1, 0));
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        let pass = lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        assert!(pass.baked.iter().filter(|c| **c == chunk_at(-1, 0)).count() >= 2);
        assert!(lights.illumination(TileCoord::new(-1, 0)) > 0.0);
    }

    #[test]
    fn bake_budget_leaves_work_for_later_frames() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32).with_bake_budget(Some(1));
        place(&mut tiles, &mut lights, 0, 0, LAMP);

        let first = lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
        assert_eq!(first.baked.len(), 1);
        assert_eq!(first.remaining, 3);

        let mut frames = 1;
        while lights.dirty_count() > 0 {
            lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();
            frames += 1;
        }
        assert_eq!(frames, 4);
        assert!(lights.illumination(TileCoord::new(-1, -1)) > 0.0);
    }

    #[test]
    fn clean_map_has_nothing_to_do() {
        let mut lights = LightMap::new(32);
        let pass = lights
            .update_dirty_chunks(&TileMap::new(32), &registry(), &mut ())
            .unwrap();
        assert!(pass.baked.is_empty());
    }

    #[test]
    fn broken_graph_is_reported() {
        let registry = registry();
        let mut tiles = TileMap::new(32);
        let mut lights = LightMap::new(32);
        place(&mut tiles, &mut lights, 0, 0, LAMP);
        lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap();

        lights.reverse.remove(&TileCoord::new(1, 0).address());
        assert!(matches!(lights.verify_graph(), Err(LightError::MissingReverse { .. })));

        tiles.set_tile(TileCoord::new(0, 0), AIR, &mut lights);
        let err = lights.update_dirty_chunks(&tiles, &registry, &mut ()).unwrap_err();
        assert!(matches!(err, LightError::MissingReverse { .. }));
    }
}
