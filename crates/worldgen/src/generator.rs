use noise::{NoiseFn, Simplex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tileworld_common::{AIR, Bounds, ChunkCoord, DirtySink, TileId};
use tileworld_tiles::TileMap;

/// Weighted cave density below this value makes a tile a cave candidate.
pub const CAVE_THRESHOLD: f64 = 0.42;

/// Candidate neighbors (out of 8) needed for a tile to become cave.
const SMOOTHING_NEIGHBORS: usize = 5;

/// Second noise coordinate used for the one-dimensional height profiles.
const HEIGHT_ROW: f64 = 0.5;

/// Tile ids written by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainTiles {
    pub air: TileId,
    pub dirt: TileId,
    pub grass: TileId,
    pub stone: TileId,
}

impl Default for TerrainTiles {
    fn default() -> Self {
        Self {
            air: AIR,
            dirt: 1,
            grass: 2,
            stone: 3,
        }
    }
}

/// Chunked terrain generator with a memo of materialized chunks.
///
/// All shape functions are pure in `(seed, x, y)`; the memo only decides
/// whether a chunk still has to be written.
pub struct WorldGenerator {
    seed: u32,
    noise: Simplex,
    chunk_size: i32,
    terrain: TerrainTiles,
    generated: HashSet<ChunkCoord>,
}

impl WorldGenerator {
    pub fn new(seed: u32, chunk_size: i32) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self {
            seed,
            noise: Simplex::new(seed),
            chunk_size,
            terrain: TerrainTiles::default(),
            generated: HashSet::new(),
        }
    }

    pub fn with_terrain(mut self, terrain: TerrainTiles) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn terrain(&self) -> TerrainTiles {
        self.terrain
    }

    pub fn is_generated(&self, chunk: ChunkCoord) -> bool {
        self.generated.contains(&chunk)
    }

    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }

    /// Coherent noise remapped from `[-1, 1]` to `[0, 1]`.
    fn sample(&self, x: f64, y: f64) -> f64 {
        (self.noise.get([x, y]) + 1.0) / 2.0
    }

    /// Surface row for column `x`. Rows grow downwards, so smaller is higher.
    pub fn landstrip_height(&self, x: i32) -> i32 {
        let t = x as f64 / 50.0;
        let mut n = self.sample(t, HEIGHT_ROW);
        n += self.sample(signed_root(t, 0.5), HEIGHT_ROW) / 2.0;
        n += self.sample(signed_root(t, 0.25), HEIGHT_ROW) / 4.0;
        (n * 10.0).floor() as i32
    }

    /// Row below which column `x` is stone. Not rounded.
    pub fn stone_height(&self, x: i32) -> f64 {
        self.landstrip_height(x) as f64 + self.sample(x as f64 / 2.0, HEIGHT_ROW) * 4.0 + 5.0
    }

    /// Terrain tile before caves are carved.
    pub fn terrain_tile(&self, x: i32, y: i32) -> TileId {
        self.layer_tile(y, self.landstrip_height(x), self.stone_height(x))
    }

    fn layer_tile(&self, y: i32, landstrip: i32, stone: f64) -> TileId {
        if y as f64 > stone {
            self.terrain.stone
        } else if y > landstrip {
            self.terrain.dirt
        } else if y == landstrip {
            self.terrain.grass
        } else {
            self.terrain.air
        }
    }

    /// Weighted sum of four noise octaves in `[0, 1]`.
    pub fn cave_density(&self, x: i32, y: i32) -> f64 {
        let (x, y) = (x as f64, y as f64);
        let large = self.sample(x / 40.0, y / 40.0);
        let medium = self.sample(x / 20.0, y / 20.0);
        let small = self.sample(x / 10.0, y / 10.0);
        let vertical = self.sample(x / 30.0, y / 30.0 + 1000.0);
        large * 0.5 + medium * 0.3 + small * 0.15 + vertical * 0.05
    }

    pub fn is_cave_candidate(&self, x: i32, y: i32) -> bool {
        self.cave_density(x, y) < CAVE_THRESHOLD
    }

    /// Candidate test that treats tiles past the coordinate range as rock.
    fn candidate_at(&self, x: i64, y: i64) -> bool {
        match (i32::try_from(x), i32::try_from(y)) {
            (Ok(x), Ok(y)) => self.is_cave_candidate(x, y),
            _ => false,
        }
    }

    /// Smoothed cave test for a single tile.
    pub fn is_cave(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        let mut count = 0;
        for ox in -1..=1 {
            for oy in -1..=1 {
                if (ox, oy) != (0, 0) && self.candidate_at(x + ox, y + oy) {
                    count += 1;
                }
            }
        }
        count >= SMOOTHING_NEIGHBORS
    }

    /// Smoothed cave flags for every tile of `chunk`, in the order of
    /// [`ChunkCoord::tiles`].
    ///
    /// Candidates are sampled over a one-tile apron around the chunk so edge
    /// tiles see the same neighbors regardless of which chunks exist.
    pub fn cave_mask(&self, chunk: ChunkCoord) -> Vec<bool> {
        let xs = chunk.x_range(self.chunk_size);
        let ys = chunk.y_range(self.chunk_size);
        let (x0, y0) = (*xs.start() as i64 - 1, *ys.start() as i64 - 1);
        let width = (*xs.end() as i64 - *xs.start() as i64 + 1) as usize;
        let height = (*ys.end() as i64 - *ys.start() as i64 + 1) as usize;
        let span = height + 2;

        let mut candidates = Vec::with_capacity((width + 2) * span);
        for i in 0..width + 2 {
            for j in 0..span {
                candidates.push(self.candidate_at(x0 + i as i64, y0 + j as i64));
            }
        }

        let mut mask = Vec::with_capacity(width * height);
        for dx in 1..=width {
            for dy in 1..=height {
                let mut count = 0;
                for i in dx - 1..=dx + 1 {
                    for j in dy - 1..=dy + 1 {
                        if (i, j) != (dx, dy) && candidates[i * span + j] {
                            count += 1;
                        }
                    }
                }
                mask.push(count >= SMOOTHING_NEIGHBORS);
            }
        }
        mask
    }

    /// Materialize every not-yet-generated chunk overlapping `bounds`.
    /// Returns the chunks generated by this call.
    pub fn generate_visible(&mut self, bounds: Bounds, tiles: &mut TileMap, sink: &mut impl DirtySink) -> Vec<ChunkCoord> {
        let _span = tracing::info_span!("worldgen").entered();
        let generated: Vec<ChunkCoord> = ChunkCoord::covering(bounds, self.chunk_size)
            .into_iter()
            .filter(|&chunk| self.generate_chunk(chunk, tiles, sink))
            .collect();
        if !generated.is_empty() {
            tracing::debug!(count = generated.len(), total = self.generated.len(), "generated chunks");
        }
        generated
    }

    /// Write terrain and caves for one chunk. Returns `false` if the chunk
    /// was already generated, in which case nothing is touched.
    pub fn generate_chunk(&mut self, chunk: ChunkCoord, tiles: &mut TileMap, sink: &mut impl DirtySink) -> bool {
        if self.generated.contains(&chunk) {
            return false;
        }
        let mask = self.cave_mask(chunk);
        let mut written = 0usize;
        let mut carved = 0usize;
        let mut column: Option<(i32, i32, f64)> = None;

        for (tile, cave) in chunk.tiles(self.chunk_size).zip(mask) {
            let (landstrip, stone) = match column {
                Some((x, landstrip, stone)) if x == tile.x => (landstrip, stone),
                _ => {
                    let heights = (self.landstrip_height(tile.x), self.stone_height(tile.x));
                    column = Some((tile.x, heights.0, heights.1));
                    heights
                }
            };
            let id = if cave {
                carved += 1;
                self.terrain.air
            } else {
                self.layer_tile(tile.y, landstrip, stone)
            };
            if id != AIR || tiles.get_tile(tile) != AIR {
                tiles.set_tile(tile, id, sink);
                written += 1;
            }
        }

        self.generated.insert(chunk);
        tracing::trace!(?chunk, written, carved, "generated chunk");
        true
    }
}

/// `sign(v) * |v|^p`, so fractional powers stay defined left of the origin.
fn signed_root(v: f64, p: f64) -> f64 {
    v.signum() * v.abs().powf(p)
}
