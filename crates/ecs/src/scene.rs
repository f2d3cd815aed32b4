use glam::Vec2;
use tileworld_common::{Bounds, Transform};
use tileworld_input::{InputEvent, InputState};
use tileworld_render::{Raster, View};

use crate::component::Env;
use crate::entity::ComponentSlot;
use crate::{Camera, Component, Entity, EntityId, RenderContext, Terrain, Transforms};

/// Errors from scene operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {0} does not exist")]
    StaleEntity(EntityId),
    #[error("entity {entity} has no {component} component")]
    MissingComponent { entity: EntityId, component: &'static str },
}

fn short_type_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    full.rsplit("::").next().unwrap_or(full)
}

struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Entity arena plus the scene's active camera.
///
/// Iteration and hook dispatch follow slot order, so runs are reproducible.
/// Despawning is deferred: a despawned entity stops receiving hooks at once
/// but keeps its slot until [`Scene::sweep`].
#[derive(Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    camera: Option<EntityId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, transform: Transform) -> EntityId {
        let entity = Entity::new(transform);
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            return EntityId::from_raw_parts(index, slot.generation);
        }
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        EntityId::from_raw_parts((self.slots.len() - 1) as u32, 0)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entity.as_mut())
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, EcsError> {
        self.get_mut(id).ok_or(EcsError::StaleEntity(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Number of entities holding a slot, including ones awaiting a sweep.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.entity
                .as_ref()
                .map(|e| (EntityId::from_raw_parts(i as u32, slot.generation), e))
        })
    }

    /// Mark an entity for removal at the next sweep.
    pub fn despawn(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.entity_mut(id)?.destroy();
        Ok(())
    }

    /// Free the slots of every despawned entity. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entity.as_ref().is_some_and(Entity::is_destroyed) {
                slot.entity = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                removed += 1;
            }
        }
        self.live -= removed;
        if self.camera.is_some_and(|id| !self.contains(id)) {
            tracing::warn!("active camera entity was removed");
            self.camera = None;
        }
        if removed > 0 {
            tracing::debug!(removed, live = self.live, "swept entities");
        }
        removed
    }

    /// Attach a component. Its `setup` hook runs before the next update.
    pub fn add_component<C: Component>(&mut self, id: EntityId, component: C) -> Result<(), EcsError> {
        self.entity_mut(id)?.components.push(ComponentSlot {
            component: Box::new(component),
            enabled: true,
            ready: false,
        });
        Ok(())
    }

    pub fn component<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.get(id)?.component::<C>()
    }

    pub fn component_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.get_mut(id)?.component_mut::<C>()
    }

    /// Enable or disable every `C` component of an entity.
    pub fn set_component_enabled<C: Component>(&mut self, id: EntityId, enabled: bool) -> Result<(), EcsError> {
        let entity = self.entity_mut(id)?;
        let mut found = false;
        for slot in entity.components.iter_mut() {
            if (*slot.component).as_any().is::<C>() {
                slot.enabled = enabled;
                found = true;
            }
        }
        if !found {
            return Err(EcsError::MissingComponent {
                entity: id,
                component: short_type_name::<C>(),
            });
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> Result<(), EcsError> {
        self.entity_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Entities carrying a `C` component, in slot order.
    pub fn entities_with<C: Component>(&self) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, e)| !e.is_destroyed() && e.has::<C>())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn set_tag(&mut self, id: EntityId, tag: impl Into<String>) -> Result<(), EcsError> {
        self.entity_mut(id)?.tag = Some(tag.into());
        Ok(())
    }

    /// First live entity with the given tag.
    pub fn find_by_tag(&self, tag: &str) -> Option<EntityId> {
        self.iter()
            .find(|(_, e)| !e.is_destroyed() && e.tag.as_deref() == Some(tag))
            .map(|(id, _)| id)
    }

    /// Make `id` the active camera. The entity must carry a [`Camera`].
    pub fn set_camera(&mut self, id: EntityId) -> Result<(), EcsError> {
        let entity = self.get(id).ok_or(EcsError::StaleEntity(id))?;
        if !entity.has::<Camera>() {
            return Err(EcsError::MissingComponent {
                entity: id,
                component: short_type_name::<Camera>(),
            });
        }
        self.camera = Some(id);
        tracing::debug!(%id, "active camera set");
        Ok(())
    }

    /// The active camera, if one is set and still alive.
    pub fn camera(&self) -> Option<EntityId> {
        self.camera.filter(|id| self.contains(*id))
    }

    fn active_camera(&self) -> Option<(&Camera, &Transform)> {
        let entity = self.get(self.camera?)?;
        Some((entity.component::<Camera>()?, &entity.transform))
    }

    /// Visible world rectangle, or `None` without an active camera.
    pub fn camera_bounds(&self, viewport: Vec2) -> Option<Bounds> {
        let (camera, transform) = self.active_camera()?;
        Some(camera.bounds(transform, viewport))
    }

    pub fn screen_to_world(&self, viewport: Vec2, screen: Vec2) -> Option<Vec2> {
        let (camera, transform) = self.active_camera()?;
        Some(camera.screen_to_world(transform, viewport, screen))
    }

    pub fn world_to_screen(&self, viewport: Vec2, world: Vec2) -> Option<Vec2> {
        let (camera, transform) = self.active_camera()?;
        Some(camera.world_to_screen(transform, viewport, world))
    }

    /// Blit mapping for the active camera.
    pub fn camera_view(&self, viewport: Vec2) -> Option<View> {
        let (camera, transform) = self.active_camera()?;
        Some(View::new(camera.bounds(transform, viewport), camera.scale(transform).x))
    }

    /// Transforms of every slot, for [`Transforms`] lookups during a pass.
    fn snapshot(&self) -> Vec<Option<(u32, Transform)>> {
        self.slots
            .iter()
            .map(|slot| slot.entity.as_ref().map(|e| (slot.generation, e.transform)))
            .collect()
    }

    /// Run pending `setup` hooks, then `update` on enabled components of
    /// enabled entities. Hooks see no terrain.
    pub fn update(&mut self, dt: f32, input: &InputState) {
        self.update_with_terrain(dt, input, None);
    }

    /// Like [`Scene::update`], with `terrain` available to hooks for
    /// collision.
    pub fn update_with_terrain(&mut self, dt: f32, input: &InputState, terrain: Option<Terrain<'_>>) {
        let snapshot = self.snapshot();
        let env = Env {
            input,
            transforms: Transforms::new(&snapshot),
            terrain,
        };
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let id = EntityId::from_raw_parts(index as u32, slot.generation);
            let Some(entity) = slot.entity.as_mut() else {
                continue;
            };
            entity.setup_pending(id, env);
            if entity.is_active() {
                entity.each_enabled(id, env, |component, ctx| component.update(ctx, dt));
            }
        }
    }

    /// Route an input event to every enabled component. `input` should
    /// already reflect the event.
    pub fn dispatch(&mut self, event: &InputEvent, input: &InputState) {
        let snapshot = self.snapshot();
        let env = Env {
            input,
            transforms: Transforms::new(&snapshot),
            terrain: None,
        };
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let id = EntityId::from_raw_parts(index as u32, slot.generation);
            let Some(entity) = slot.entity.as_mut().filter(|e| e.is_active()) else {
                continue;
            };
            entity.each_enabled(id, env, |component, ctx| match event {
                InputEvent::KeyDown(key) => component.on_key_down(ctx, key),
                InputEvent::KeyUp(key) => component.on_key_up(ctx, key),
                InputEvent::PointerMove(p) => component.on_pointer_move(ctx, *p),
                InputEvent::PointerDown { button, position } => component.on_pointer_down(ctx, *button, *position),
                InputEvent::PointerUp { button, position } => component.on_pointer_up(ctx, *button, *position),
            });
        }
    }

    /// Draw enabled components of enabled entities, in slot order.
    pub fn render(&self, view: &View, target: &mut Raster) {
        for (id, entity) in self.iter().filter(|(_, e)| e.is_active()) {
            let ctx = RenderContext {
                entity: id,
                transform: &entity.transform,
                view,
            };
            for slot in entity.components.iter().filter(|s| s.enabled) {
                slot.component.render(&ctx, target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorRect, Context};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tileworld_input::PointerButton;

    /// Records every hook it receives.
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Component for Recorder {
        fn setup(&mut self, ctx: &mut Context<'_>) {
            self.log.borrow_mut().push(format!("setup {}", ctx.entity));
        }

        fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {
            ctx.transform.position.x += dt;
            self.log.borrow_mut().push("update".into());
        }

        fn on_key_down(&mut self, ctx: &mut Context<'_>, key: &str) {
            let held = ctx.input.is_key_pressed(key);
            self.log.borrow_mut().push(format!("key {key} {held}"));
        }

        fn on_pointer_down(&mut self, _ctx: &mut Context<'_>, button: PointerButton, position: Vec2) {
            self.log.borrow_mut().push(format!("down {button:?} {}", position.x));
        }
    }

    fn recorder() -> (Recorder, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Recorder { log: log.clone() }, log)
    }

    #[test]
    fn stale_handles_resolve_to_none() {
        let mut scene = Scene::new();
        let a = scene.spawn(Transform::default());
        scene.despawn(a).unwrap();
        assert!(scene.contains(a));
        assert_eq!(scene.sweep(), 1);
        assert!(scene.get(a).is_none());

        let b = scene.spawn(Transform::default());
        assert_eq!(b.index(), a.index());
        assert_ne!(b, a);
        assert!(scene.get(a).is_none());
        assert!(scene.get(b).is_some());
        assert_eq!(scene.despawn(a), Err(EcsError::StaleEntity(a)));
    }

    #[test]
    fn setup_runs_once_then_update_each_frame() {
        let mut scene = Scene::new();
        let id = scene.spawn(Transform::default());
        let (p, log) = recorder();
        scene.add_component(id, p).unwrap();

        let input = InputState::new();
        scene.update(0.5, &input);
        scene.update(0.25, &input);
        assert_eq!(*log.borrow(), vec![format!("setup {id}"), "update".into(), "update".into()]);
        assert_eq!(scene.get(id).unwrap().transform.position.x, 0.75);
    }

    #[test]
    fn disabled_entities_and_components_are_skipped() {
        let mut scene = Scene::new();
        let id = scene.spawn(Transform::default());
        let (p, log) = recorder();
        scene.add_component(id, p).unwrap();
        let input = InputState::new();

        scene.set_enabled(id, false).unwrap();
        scene.update(1.0, &input);
        assert_eq!(log.borrow().len(), 1, "only setup");

        scene.set_enabled(id, true).unwrap();
        scene.set_component_enabled::<Recorder>(id, false).unwrap();
        scene.update(1.0, &input);
        assert_eq!(log.borrow().len(), 1);

        scene.set_component_enabled::<Recorder>(id, true).unwrap();
        scene.update(1.0, &input);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn despawned_entities_stop_receiving_hooks() {
        let mut scene = Scene::new();
        let id = scene.spawn(Transform::default());
        let (p, log) = recorder();
        scene.add_component(id, p).unwrap();
        let input = InputState::new();
        scene.update(1.0, &input);
        scene.despawn(id).unwrap();
        scene.update(1.0, &input);
        assert_eq!(log.borrow().len(), 2);
        assert!(scene.entities_with::<Recorder>().is_empty());
    }

    #[test]
    fn events_reach_components_after_state_update() {
        let mut scene = Scene::new();
        let id = scene.spawn(Transform::default());
        let (p, log) = recorder();
        scene.add_component(id, p).unwrap();

        let mut input = InputState::new();
        for event in [
            InputEvent::KeyDown("a".into()),
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                position: Vec2::new(4.0, 1.0),
            },
        ] {
            input.apply(&event);
            scene.dispatch(&event, &input);
        }
        assert_eq!(*log.borrow(), vec!["key a true".to_string(), "down Primary 4".to_string()]);
    }

    #[test]
    fn query_by_component_and_tag() {
        let mut scene = Scene::new();
        let a = scene.spawn(Transform::default());
        let b = scene.spawn(Transform::default());
        let c = scene.spawn(Transform::default());
        scene.add_component(a, Camera::default()).unwrap();
        scene.add_component(c, Camera::default()).unwrap();
        scene.set_tag(b, "editableTileMap").unwrap();

        assert_eq!(scene.entities_with::<Camera>(), vec![a, c]);
        assert_eq!(scene.find_by_tag("editableTileMap"), Some(b));
        assert_eq!(scene.find_by_tag("player"), None);
        assert_eq!(scene.component::<Camera>(a).unwrap().pixels_per_unit, 16.0);
        assert!(scene.component::<ColorRect>(a).is_none());
    }

    #[test]
    fn camera_requires_camera_component() {
        let mut scene = Scene::new();
        let plain = scene.spawn(Transform::default());
        assert_eq!(
            scene.set_camera(plain),
            Err(EcsError::MissingComponent {
                entity: plain,
                component: "Camera"
            })
        );
        assert!(scene.camera_bounds(Vec2::new(160.0, 160.0)).is_none());

        let cam = scene.spawn(Transform::from_position(Vec2::new(5.0, 5.0)));
        scene.add_component(cam, Camera::default()).unwrap();
        scene.set_camera(cam).unwrap();
        let bounds = scene.camera_bounds(Vec2::new(160.0, 160.0)).unwrap();
        assert_eq!(bounds.min, Vec2::ZERO);
        assert_eq!(bounds.max, Vec2::new(10.0, 10.0));
        assert_eq!(scene.camera_view(Vec2::new(160.0, 160.0)).unwrap().pixels_per_unit, 16.0);
    }

    #[test]
    fn removing_camera_entity_clears_active_camera() {
        let mut scene = Scene::new();
        let cam = scene.spawn(Transform::default());
        scene.add_component(cam, Camera::default()).unwrap();
        scene.set_camera(cam).unwrap();
        scene.despawn(cam).unwrap();
        scene.sweep();
        assert_eq!(scene.camera(), None);
        assert!(scene.screen_to_world(Vec2::ONE, Vec2::ZERO).is_none());
    }

    #[test]
    fn render_draws_enabled_components() {
        let mut scene = Scene::new();
        let id = scene.spawn(Transform::from_position(Vec2::new(1.0, 1.0)));
        scene.add_component(id, ColorRect { color: [7, 7, 7, 255] }).unwrap();
        let view = View::new(Bounds::new(Vec2::ZERO, Vec2::new(2.0, 2.0)), 2.0);
        let mut target = Raster::new(4, 4);
        scene.render(&view, &mut target);
        assert_eq!(target.get_pixel(1, 1), Some([7, 7, 7, 255]));

        let mut target = Raster::new(4, 4);
        scene.set_component_enabled::<ColorRect>(id, false).unwrap();
        scene.render(&view, &mut target);
        assert_eq!(target.get_pixel(1, 1), Some([0, 0, 0, 0]));
    }
}
