use glam::Vec2;
use std::any::Any;
use tileworld_common::Transform;
use tileworld_input::{InputState, PointerButton};
use tileworld_render::{Raster, View};
use tileworld_tiles::{TileCollider, TileMap, TileRegistry};

use crate::EntityId;

/// Tiles that bodies collide with during an update.
#[derive(Clone, Copy)]
pub struct Terrain<'a> {
    pub tiles: &'a TileMap,
    pub registry: &'a TileRegistry,
}

impl Terrain<'_> {
    pub fn colliding(&self, collider: &TileCollider) -> bool {
        collider.colliding([self.tiles], self.registry)
    }

    pub fn grounded(&self, collider: &TileCollider) -> bool {
        collider.grounded([self.tiles], self.registry)
    }
}

/// Entity transforms as they were when the current pass started.
#[derive(Clone, Copy)]
pub struct Transforms<'a> {
    slots: &'a [Option<(u32, Transform)>],
}

impl<'a> Transforms<'a> {
    pub(crate) fn new(slots: &'a [Option<(u32, Transform)>]) -> Self {
        Self { slots }
    }

    pub fn get(&self, id: EntityId) -> Option<&'a Transform> {
        match self.slots.get(id.index() as usize)? {
            Some((generation, transform)) if *generation == id.generation() => Some(transform),
            _ => None,
        }
    }
}

/// Shared, read-only state handed to every hook of one pass.
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    pub(crate) input: &'a InputState,
    pub(crate) transforms: Transforms<'a>,
    pub(crate) terrain: Option<Terrain<'a>>,
}

/// What a component hook may touch: its own entity's transform, the input
/// state, other entities' transforms from the start of the pass, and the
/// terrain when the scene is updated against one.
pub struct Context<'a> {
    pub entity: EntityId,
    pub transform: &'a mut Transform,
    pub input: &'a InputState,
    pub transforms: Transforms<'a>,
    pub terrain: Option<Terrain<'a>>,
}

/// Read-only inputs for drawing a component.
pub struct RenderContext<'a> {
    pub entity: EntityId,
    pub transform: &'a Transform,
    pub view: &'a View,
}

/// Downcasting support, implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behavior attached to an entity. Every hook is optional.
///
/// Hooks are only called while both the entity and the component are
/// enabled, except `setup`, which runs once for every component.
#[allow(unused_variables)]
pub trait Component: AsAny {
    fn setup(&mut self, ctx: &mut Context<'_>) {}
    fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {}
    fn render(&self, ctx: &RenderContext<'_>, target: &mut Raster) {}
    fn on_key_down(&mut self, ctx: &mut Context<'_>, key: &str) {}
    fn on_key_up(&mut self, ctx: &mut Context<'_>, key: &str) {}
    fn on_pointer_move(&mut self, ctx: &mut Context<'_>, position: Vec2) {}
    fn on_pointer_down(&mut self, ctx: &mut Context<'_>, button: PointerButton, position: Vec2) {}
    fn on_pointer_up(&mut self, ctx: &mut Context<'_>, button: PointerButton, position: Vec2) {}
}

/// Solid axis-aligned rectangle the size of the entity's scale, centered on
/// its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRect {
    pub color: [u8; 4],
}

impl Component for ColorRect {
    fn render(&self, ctx: &RenderContext<'_>, target: &mut Raster) {
        let half = ctx.transform.scale / 2.0;
        let min = ctx.view.world_to_screen(ctx.transform.position - half);
        let max = ctx.view.world_to_screen(ctx.transform.position + half);
        let w = (max.x - min.x).round().max(0.0) as u32;
        let h = (max.y - min.y).round().max(0.0) as u32;
        target.fill_rect(min.x.round() as i64, min.y.round() as i64, w, h, self.color);
    }
}
