use glam::Vec2;
use tileworld_common::{Bounds, Transform};

use crate::{Component, Context, EntityId};

/// Default screen pixels per world unit.
pub const DEFAULT_PIXELS_PER_UNIT: f32 = 16.0;

/// Zoom factor applied per update while a zoom key is held.
pub const ZOOM_STEP: f32 = 1.1;
pub const ZOOM_IN_KEY: &str = "-";
pub const ZOOM_OUT_KEY: &str = "=";

/// Orthographic camera centered on its entity.
///
/// The entity's transform scale acts as zoom: a scale of 2 shows half as
/// much world. Screen space has its origin at the top-left of the viewport
/// and `y` pointing down, like world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pixels_per_unit: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
        }
    }
}

impl Component for Camera {}

impl Camera {
    pub fn new(pixels_per_unit: f32) -> Self {
        Self { pixels_per_unit }
    }

    /// Screen pixels per world unit on each axis, zoom included.
    pub fn scale(&self, transform: &Transform) -> Vec2 {
        self.pixels_per_unit * transform.scale
    }

    /// Visible world rectangle for a viewport size in pixels. Rotation is
    /// not taken into account.
    pub fn bounds(&self, transform: &Transform, viewport: Vec2) -> Bounds {
        let half = viewport / self.scale(transform) / 2.0;
        Bounds::new(transform.position - half, transform.position + half)
    }

    pub fn screen_to_world(&self, transform: &Transform, viewport: Vec2, screen: Vec2) -> Vec2 {
        let offset = (screen - viewport / 2.0) / self.scale(transform);
        transform.position + Vec2::from_angle(-transform.rotation).rotate(offset)
    }

    pub fn world_to_screen(&self, transform: &Transform, viewport: Vec2, world: Vec2) -> Vec2 {
        let offset = Vec2::from_angle(transform.rotation).rotate(world - transform.position);
        offset * self.scale(transform) + viewport / 2.0
    }
}

/// Moves its entity toward a target entity and zooms while a zoom key is
/// held. Zoom is the transform scale, so it pairs with a [`Camera`] on the
/// same entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraController {
    pub target: Option<EntityId>,
    /// Fraction of the remaining distance closed per second.
    pub speed: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            target: None,
            speed: 10.0,
        }
    }
}

impl CameraController {
    pub fn following(target: EntityId) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }
}

impl Component for CameraController {
    fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {
        if let Some(target) = self.target.and_then(|id| ctx.transforms.get(id)) {
            // Clamped so a long frame lands on the target instead of past it.
            let t = (self.speed * dt).clamp(0.0, 1.0);
            ctx.transform.position += (target.position - ctx.transform.position) * t;
        }
        if ctx.input.is_key_pressed(ZOOM_IN_KEY) {
            ctx.transform.scale *= ZOOM_STEP;
        }
        if ctx.input.is_key_pressed(ZOOM_OUT_KEY) {
            ctx.transform.scale /= ZOOM_STEP;
        }
    }
}
