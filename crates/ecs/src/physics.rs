use glam::Vec2;
use tileworld_common::Transform;
use tileworld_tiles::TileCollider;

use crate::{Component, Context};

/// Default downward acceleration in world units per second squared.
pub const GRAVITY: f32 = 20.0;

/// Distance a colliding body backs off per step.
pub const PUSH_OUT_STEP: f32 = 0.001;

/// Velocity integration with per-axis tile collision.
///
/// The body is the entity's transform: centered on its position and as large
/// as its scale. Each update moves along x, then along y; after each axis
/// move the body backs off in [`PUSH_OUT_STEP`] increments until it no longer
/// overlaps a solid tile, and that velocity component is zeroed. Without
/// terrain the body moves freely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Physics {
    pub velocity: Vec2,
    pub acceleration: Vec2,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            acceleration: Vec2::new(0.0, GRAVITY),
        }
    }
}

impl Physics {
    pub fn new(velocity: Vec2) -> Self {
        Self {
            velocity,
            ..Self::default()
        }
    }

    /// Collision box for an entity transform.
    pub fn body(transform: &Transform) -> TileCollider {
        TileCollider::new(transform.position, transform.scale)
    }

    fn move_axis(&mut self, ctx: &mut Context<'_>, axis: usize, dt: f32) {
        let velocity = self.velocity[axis];
        let delta = velocity * dt;
        ctx.transform.position[axis] += delta;

        let Some(terrain) = ctx.terrain else {
            return;
        };
        if velocity == 0.0 || !terrain.colliding(&Self::body(ctx.transform)) {
            return;
        }
        // Never back off further than this step moved, so a body that
        // started inside a wall is not pushed across the map.
        let sign = velocity.signum();
        let steps = (delta.abs() / PUSH_OUT_STEP).ceil() as usize;
        for _ in 0..steps {
            ctx.transform.position[axis] -= sign * PUSH_OUT_STEP;
            if !terrain.colliding(&Self::body(ctx.transform)) {
                break;
            }
        }
        self.velocity[axis] = 0.0;
    }
}

impl Component for Physics {
    fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {
        self.velocity += self.acceleration * dt;
        self.move_axis(ctx, 0, dt);
        self.move_axis(ctx, 1, dt);
    }
}
