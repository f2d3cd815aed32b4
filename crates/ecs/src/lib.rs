//! Entity arena and component runtime.
//!
//! Entities live in slots addressed by generational [`EntityId`] handles.
//! Components are trait objects with optional hooks; the scene dispatches
//! update, input and render hooks in slot order.
//!
//! # Invariants
//! - A handle resolves only while its entity holds the slot; stale handles
//!   resolve to `None`.
//! - Hooks other than `setup` only reach enabled components of enabled,
//!   non-despawned entities.
//! - The active camera always carries a [`Camera`] component.

mod camera;
mod component;
mod entity;
mod physics;
mod scene;

pub use camera::{Camera, CameraController, DEFAULT_PIXELS_PER_UNIT, ZOOM_IN_KEY, ZOOM_OUT_KEY, ZOOM_STEP};
pub use component::{AsAny, ColorRect, Component, Context, RenderContext, Terrain, Transforms};
pub use entity::{Entity, EntityId};
pub use physics::{GRAVITY, PUSH_OUT_STEP, Physics};
pub use scene::{EcsError, Scene};

pub fn crate_info() -> &'static str {
    "tileworld-ecs v0.1.0"
}
