use glam::Vec2;
use tileworld_common::{AIR, TileCoord, TileId};

use crate::{TileMap, TileRegistry};

/// Inset applied to box edges so touching a tile face is not a collision.
pub const EDGE_EPSILON: f32 = 0.001;

/// Axis-aligned box collision against tile maps.
///
/// The box is sampled on a lattice with at most unit spacing, so every tile
/// it overlaps is sampled at least once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCollider {
    /// Box center in world space.
    pub center: Vec2,
    /// Full box extents.
    pub size: Vec2,
}

impl TileCollider {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, size }
    }

    /// Whether a tile blocks movement. Unregistered non-air tiles are solid.
    pub fn is_solid(tile: TileId, registry: &TileRegistry) -> bool {
        if tile == AIR {
            return false;
        }
        registry.get_tile_entry(tile).is_none_or(|entry| entry.solid)
    }

    fn axis_samples(extent: f32) -> Vec<f32> {
        let half = extent / 2.0;
        let steps = extent.ceil().max(1.0) as usize;
        let mut samples: Vec<f32> = (0..=steps)
            .map(|i| -half + extent * i as f32 / steps as f32)
            .collect();
        if let Some(first) = samples.first_mut() {
            *first += EDGE_EPSILON;
        }
        if let Some(last) = samples.last_mut() {
            *last -= EDGE_EPSILON;
        }
        samples
    }

    /// Sample offsets relative to the box center.
    pub fn sample_points(&self) -> Vec<Vec2> {
        let xs = Self::axis_samples(self.size.x);
        let ys = Self::axis_samples(self.size.y);
        xs.iter()
            .flat_map(|&x| ys.iter().map(move |&y| Vec2::new(x, y)))
            .collect()
    }

    /// True if any sample point lands on a solid tile of any map.
    pub fn colliding<'a>(&self, maps: impl IntoIterator<Item = &'a TileMap>, registry: &TileRegistry) -> bool {
        let points = self.sample_points();
        maps.into_iter().any(|map| {
            points.iter().any(|offset| {
                let tile = map.get_tile(TileCoord::from_world(self.center + *offset));
                Self::is_solid(tile, registry)
            })
        })
    }

    /// True if the box would collide after nudging it down past the edge inset.
    pub fn grounded<'a>(&self, maps: impl IntoIterator<Item = &'a TileMap>, registry: &TileRegistry) -> bool {
        // The bottom samples sit one epsilon inside the box edge, so a single
        // epsilon would land exactly on the tile face.
        let nudged = Self {
            center: self.center + Vec2::new(0.0, EDGE_EPSILON * 2.0),
            ..*self
        };
        nudged.colliding(maps, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileEntry;

    fn floor_map() -> (TileMap, TileRegistry) {
        let mut map = TileMap::default();
        for x in -5..5 {
            map.set_tile(TileCoord::new(x, 1), 1, &mut ());
        }
        let mut registry = TileRegistry::new();
        registry.register_tile(TileEntry::new(1, "Dirt", "dirt.png", true));
        registry.register_tile(TileEntry::new(9, "Vine", "vine.png", false));
        (map, registry)
    }

    #[test]
    fn resting_on_floor_is_grounded_not_colliding() {
        let (map, registry) = floor_map();
        let body = TileCollider::new(Vec2::new(0.5, 0.5), Vec2::ONE);
        assert!(!body.colliding([&map], &registry));
        assert!(body.grounded([&map], &registry));
    }

    #[test]
    fn grounded_tolerates_a_push_out_gap() {
        let (map, registry) = floor_map();
        let hovering = TileCollider::new(Vec2::new(0.5, 0.4995), Vec2::ONE);
        assert!(!hovering.colliding([&map], &registry));
        assert!(hovering.grounded([&map], &registry));

        let airborne = TileCollider::new(Vec2::new(0.5, 0.49), Vec2::ONE);
        assert!(!airborne.grounded([&map], &registry));
    }

    #[test]
    fn overlapping_floor_collides() {
        let (map, registry) = floor_map();
        let body = TileCollider::new(Vec2::new(0.5, 0.9), Vec2::ONE);
        assert!(body.colliding([&map], &registry));
    }

    #[test]
    fn non_solid_tiles_are_passable() {
        let (mut map, registry) = floor_map();
        map.set_tile(TileCoord::new(0, 0), 9, &mut ());
        let body = TileCollider::new(Vec2::new(0.5, 0.5), Vec2::ONE);
        assert!(!body.colliding([&map], &registry));
    }

    #[test]
    fn unregistered_tiles_are_solid() {
        let mut map = TileMap::default();
        map.set_tile(TileCoord::new(0, 0), 42, &mut ());
        let body = TileCollider::new(Vec2::new(0.5, 0.5), Vec2::ONE);
        assert!(body.colliding([&map], &TileRegistry::new()));
    }

    #[test]
    fn wide_bodies_sample_every_column() {
        let mut map = TileMap::default();
        map.set_tile(TileCoord::new(2, 0), 1, &mut ());
        let registry = TileRegistry::builtin();
        let body = TileCollider::new(Vec2::new(0.0, 0.5), Vec2::new(6.0, 1.0));
        assert!(body.colliding([&map], &registry));
        assert_eq!(body.sample_points().len(), 7 * 2);
    }
}
