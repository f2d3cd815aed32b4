use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Packed scalar key for a tile coordinate.
///
/// The upper 32 bits hold `x`, the lower 32 bits hold `y`, both as two's
/// complement. Every `i32` pair has exactly one address, so integer encoding
/// never overflows. Float inputs are floored and then converted with a
/// saturating cast, which clamps out-of-range values to `i32::MIN`/`i32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    /// Pack an integer tile coordinate.
    pub fn encode(x: i32, y: i32) -> Self {
        Self(((x as u32 as u64) << 32) | (y as u32 as u64))
    }

    /// Pack a fractional position, flooring both axes first.
    pub fn encode_f32(x: f32, y: f32) -> Self {
        Self::encode(x.floor() as i32, y.floor() as i32)
    }

    /// Unpack into the tile coordinate this address was built from.
    pub fn decode(self) -> TileCoord {
        TileCoord {
            x: (self.0 >> 32) as u32 as i32,
            y: self.0 as u32 as i32,
        }
    }
}

impl From<TileCoord> for Address {
    fn from(coord: TileCoord) -> Self {
        Self::encode(coord.x, coord.y)
    }
}

/// Integer tile coordinate. `y` grows downwards, matching screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile containing a world-space point.
    pub fn from_world(pos: glam::Vec2) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
        }
    }

    pub fn address(self) -> Address {
        Address::from(self)
    }

    /// Shift by a delta, clamping at the ends of the `i32` range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Like [`TileCoord::offset`], but `None` when the result leaves the
    /// `i32` range.
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// Squared Euclidean distance, kept integral to avoid a square root in
    /// scans. Saturates at `i64::MAX` for points near opposite range ends.
    pub fn distance_sq(self, other: TileCoord) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A square chunk of tiles identified by its minimum corner.
///
/// The corner is a multiple of the chunk size on both axes; build one with
/// [`ChunkCoord::containing`] rather than by hand. Chunks at the ends of the
/// `i32` range are clipped: a corner below `i32::MIN` is stored as `i32::MIN`
/// and the last chunk stops at `i32::MAX`, so every chunk holds only
/// representable tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    /// The chunk that owns `tile` for the given chunk size.
    pub fn containing(tile: TileCoord, size: i32) -> Self {
        assert!(size > 0, "chunk size must be positive");
        Self {
            x: corner_of(tile.x, size),
            y: corner_of(tile.y, size),
        }
    }

    pub fn origin(self) -> TileCoord {
        TileCoord::new(self.x, self.y)
    }

    pub fn address(self) -> Address {
        Address::encode(self.x, self.y)
    }

    pub fn contains(self, tile: TileCoord, size: i32) -> bool {
        self.x_range(size).contains(&tile.x) && self.y_range(size).contains(&tile.y)
    }

    /// Columns covered by the chunk.
    pub fn x_range(self, size: i32) -> RangeInclusive<i32> {
        axis_span(self.x, size)
    }

    /// Rows covered by the chunk.
    pub fn y_range(self, size: i32) -> RangeInclusive<i32> {
        axis_span(self.y, size)
    }

    /// Every tile of the chunk, column by column.
    pub fn tiles(self, size: i32) -> impl Iterator<Item = TileCoord> {
        let rows = self.y_range(size);
        self.x_range(size)
            .flat_map(move |x| rows.clone().map(move |y| TileCoord::new(x, y)))
    }

    /// All chunk origins covering the inclusive world-space rectangle.
    pub fn covering(bounds: crate::Bounds, size: i32) -> Vec<ChunkCoord> {
        let min = ChunkCoord::containing(TileCoord::from_world(bounds.min), size);
        let max = ChunkCoord::containing(TileCoord::from_world(bounds.max), size);
        let mut out = Vec::new();
        let mut x = Some(min.x);
        while let Some(cx) = x.filter(|cx| *cx <= max.x) {
            let mut y = Some(min.y);
            while let Some(cy) = y.filter(|cy| *cy <= max.y) {
                out.push(ChunkCoord { x: cx, y: cy });
                y = next_corner(cy, size);
            }
            x = next_corner(cx, size);
        }
        out
    }
}

/// Floor `v` to a multiple of `size`, clamped to `i32::MIN`.
fn corner_of(v: i32, size: i32) -> i32 {
    let corner = (v as i64).div_euclid(size as i64) * size as i64;
    corner.max(i32::MIN as i64) as i32
}

/// Tiles along one axis of the chunk starting at `corner`, clipped to `i32`.
fn axis_span(corner: i32, size: i32) -> RangeInclusive<i32> {
    let size = size as i64;
    // A clipped corner still ends where the unclipped chunk would.
    let start = if corner == i32::MIN {
        (i32::MIN as i64).div_euclid(size) * size
    } else {
        corner as i64
    };
    let end = (start + size - 1).min(i32::MAX as i64);
    corner..=end as i32
}

/// Corner of the next chunk along an axis, `None` past `i32::MAX`.
fn next_corner(corner: i32, size: i32) -> Option<i32> {
    axis_span(corner, size).end().checked_add(1)
}

/// Receiver of chunk invalidations.
///
/// Both the lighting cache and the chunk render cache implement this, so tile
/// writers can notify them without owning either.
pub trait DirtySink {
    fn mark_dirty(&mut self, chunk: ChunkCoord);
}

impl DirtySink for () {
    fn mark_dirty(&mut self, _chunk: ChunkCoord) {}
}

impl DirtySink for std::collections::BTreeSet<ChunkCoord> {
    fn mark_dirty(&mut self, chunk: ChunkCoord) {
        self.insert(chunk);
    }
}

impl<T: DirtySink + ?Sized> DirtySink for &mut T {
    fn mark_dirty(&mut self, chunk: ChunkCoord) {
        (**self).mark_dirty(chunk);
    }
}

impl<A: DirtySink, B: DirtySink> DirtySink for (A, B) {
    fn mark_dirty(&mut self, chunk: ChunkCoord) {
        self.0.mark_dirty(chunk);
        self.1.mark_dirty(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bounds;
    use glam::Vec2;
    use std::collections::BTreeSet;

    #[test]
    fn negative_one_round_trips() {
        let addr = Address::encode(-1, -1);
        assert_eq!(addr.decode(), TileCoord::new(-1, -1));
    }

    #[test]
    fn round_trip_across_range() {
        let samples = [i32::MIN, -32769, -32768, -1000, -1, 0, 1, 31, 32, 32767, 32768, i32::MAX];
        for &x in &samples {
            for &y in &samples {
                assert_eq!(Address::encode(x, y).decode(), TileCoord::new(x, y));
            }
        }
    }

    #[test]
    fn distinct_coordinates_get_distinct_addresses() {
        assert_ne!(Address::encode(1, 0), Address::encode(0, 1));
        assert_ne!(Address::encode(-1, 0), Address::encode(0, -1));
        assert_ne!(Address::encode(0, -1), Address::encode(-1, -1));
    }

    #[test]
    fn fractional_inputs_are_floored() {
        assert_eq!(Address::encode_f32(2.7, -0.2), Address::encode(2, -1));
        assert_eq!(Address::encode_f32(-3.5, 4.0), Address::encode(-4, 4));
    }

    #[test]
    fn out_of_range_floats_saturate() {
        let addr = Address::encode_f32(1.0e12, -1.0e12);
        assert_eq!(addr.decode(), TileCoord::new(i32::MAX, i32::MIN));
    }

    #[test]
    fn chunk_containing_floors_toward_negative_infinity() {
        assert_eq!(ChunkCoord::containing(TileCoord::new(0, 0), 32), ChunkCoord { x: 0, y: 0 });
        assert_eq!(ChunkCoord::containing(TileCoord::new(31, 31), 32), ChunkCoord { x: 0, y: 0 });
        assert_eq!(ChunkCoord::containing(TileCoord::new(32, -1), 32), ChunkCoord { x: 32, y: -32 });
        assert_eq!(ChunkCoord::containing(TileCoord::new(-33, -32), 32), ChunkCoord { x: -64, y: -32 });
    }

    #[test]
    fn chunk_tiles_cover_the_square() {
        let chunk = ChunkCoord { x: -4, y: 4 };
        let tiles: Vec<_> = chunk.tiles(4).collect();
        assert_eq!(tiles.len(), 16);
        assert!(tiles.iter().all(|t| chunk.contains(*t, 4)));
        assert!(!chunk.contains(TileCoord::new(0, 4), 4));
    }

    #[test]
    fn covering_includes_partial_chunks() {
        let bounds = Bounds::new(Vec2::new(-1.5, 0.0), Vec2::new(33.0, 10.0));
        let chunks = ChunkCoord::covering(bounds, 32);
        assert_eq!(
            chunks,
            vec![
                ChunkCoord { x: -32, y: 0 },
                ChunkCoord { x: 0, y: 0 },
                ChunkCoord { x: 32, y: 0 },
            ]
        );
    }

    #[test]
    fn chunks_at_the_range_ends_stay_in_range() {
        let top = ChunkCoord::containing(TileCoord::new(i32::MAX, i32::MAX), 32);
        assert_eq!(top, ChunkCoord { x: i32::MAX - 31, y: i32::MAX - 31 });
        assert_eq!(top.tiles(32).count(), 32 * 32);
        assert!(top.contains(TileCoord::new(i32::MAX, i32::MAX), 32));

        // 33 does not divide the range, so both end chunks are partial.
        let low = ChunkCoord::containing(TileCoord::new(i32::MIN, 0), 33);
        assert_eq!(low.x, i32::MIN);
        let columns = low.x_range(33);
        assert!(columns.clone().count() < 33);
        assert!(low.tiles(33).all(|t| ChunkCoord::containing(t, 33) == low));

        let high = ChunkCoord::containing(TileCoord::new(i32::MAX, 0), 33);
        assert_eq!(*high.x_range(33).end(), i32::MAX);
        assert!(high.tiles(33).all(|t| ChunkCoord::containing(t, 33) == high));
    }

    #[test]
    fn covering_stops_at_the_range_end() {
        let edge = i32::MAX as f32;
        let bounds = Bounds::new(Vec2::new(edge - 100.0, 0.0), Vec2::new(edge, 10.0));
        let chunks = ChunkCoord::covering(bounds, 32);
        assert!(!chunks.is_empty());
        assert_eq!(chunks.last().map(|c| c.x), Some(i32::MAX - 31));
        assert!(chunks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn neighborhood_math_does_not_overflow() {
        let far = TileCoord::new(i32::MAX, i32::MIN);
        assert_eq!(far.offset(5, -5), far);
        assert_eq!(far.checked_offset(1, 0), None);
        assert_eq!(far.checked_offset(-1, 1), Some(TileCoord::new(i32::MAX - 1, i32::MIN + 1)));
        let near = TileCoord::new(i32::MAX, 0).distance_sq(TileCoord::new(i32::MAX - 3, 4));
        assert_eq!(near, 25);
        let across = TileCoord::new(i32::MIN, 0).distance_sq(TileCoord::new(i32::MAX, 0));
        assert_eq!(across, i64::MAX);
    }

    #[test]
    fn tuple_sink_fans_out() {
        let mut a = BTreeSet::new();
        let mut b = BTreeSet::new();
        let chunk = ChunkCoord { x: 32, y: 0 };
        (&mut a, &mut b).mark_dirty(chunk);
        assert!(a.contains(&chunk));
        assert!(b.contains(&chunk));
    }
}
