use glam::Vec2;
use std::collections::HashMap;
use tileworld_common::{AIR, Address, ChunkCoord, DEFAULT_CHUNK_SIZE, DirtySink, TileCoord, TileId};

/// Sparse tile storage for one tile map.
///
/// Tiles are stored in map-local coordinates keyed by [`Address`]; air is
/// never stored. World coordinates are translated by `origin` on the way in,
/// so several maps can share world space. Chunk invalidations are reported
/// in local coordinates, which is the space the lighting and render caches
/// work in.
#[derive(Debug, Clone)]
pub struct TileMap {
    tiles: HashMap<Address, TileId>,
    origin: TileCoord,
    chunk_size: i32,
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl TileMap {
    pub fn new(chunk_size: i32) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self {
            tiles: HashMap::new(),
            origin: TileCoord::default(),
            chunk_size,
        }
    }

    pub fn with_origin(mut self, origin: TileCoord) -> Self {
        self.origin = origin;
        self
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// World-space position of local tile (0, 0).
    pub fn origin(&self) -> TileCoord {
        self.origin
    }

    /// Move the map. Stored tiles move with it; caches keyed by local
    /// coordinates stay valid.
    pub fn set_origin(&mut self, origin: TileCoord) {
        self.origin = origin;
    }

    /// Translation wraps, so every world tile has exactly one local tile and
    /// `local_to_world` inverts it for any origin.
    pub fn world_to_local(&self, world: TileCoord) -> TileCoord {
        TileCoord::new(world.x.wrapping_sub(self.origin.x), world.y.wrapping_sub(self.origin.y))
    }

    pub fn local_to_world(&self, local: TileCoord) -> TileCoord {
        TileCoord::new(local.x.wrapping_add(self.origin.x), local.y.wrapping_add(self.origin.y))
    }

    /// Chunk owning a local tile.
    pub fn chunk_of(&self, local: TileCoord) -> ChunkCoord {
        ChunkCoord::containing(local, self.chunk_size)
    }

    /// Write a tile at a world coordinate and notify `sink` that the owning
    /// chunk changed. Returns whether the stored value changed.
    pub fn set_tile(&mut self, world: TileCoord, tile: TileId, sink: &mut impl DirtySink) -> bool {
        let local = self.world_to_local(world);
        self.set_local(local, tile, sink)
    }

    /// Like [`TileMap::set_tile`] for a fractional world position.
    pub fn set_tile_at(&mut self, world: Vec2, tile: TileId, sink: &mut impl DirtySink) -> bool {
        self.set_tile(TileCoord::from_world(world), tile, sink)
    }

    /// Write a tile at a map-local coordinate.
    pub fn set_local(&mut self, local: TileCoord, tile: TileId, sink: &mut impl DirtySink) -> bool {
        let addr = local.address();
        let previous = if tile == AIR {
            self.tiles.remove(&addr)
        } else {
            self.tiles.insert(addr, tile)
        };
        if previous.unwrap_or(AIR) == tile {
            return false;
        }
        sink.mark_dirty(self.chunk_of(local));
        true
    }

    /// Tile at a world coordinate; air when nothing is stored.
    pub fn get_tile(&self, world: TileCoord) -> TileId {
        self.get_local(self.world_to_local(world))
    }

    pub fn get_tile_at(&self, world: Vec2) -> TileId {
        self.get_tile(TileCoord::from_world(world))
    }

    /// Tile at a map-local coordinate.
    pub fn get_local(&self, local: TileCoord) -> TileId {
        self.tiles.get(&local.address()).copied().unwrap_or(AIR)
    }

    /// Number of non-air tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All stored (non-air) tiles in local coordinates, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, TileId)> + '_ {
        self.tiles.iter().map(|(addr, id)| (addr.decode(), *id))
    }
}
