use serde::{Deserialize, Serialize};
use std::fmt;
use tileworld_common::Transform;
use crate::component::Env;
use crate::{Component, Context};

/// Generational handle into a [`crate::Scene`].
///
/// A handle stays valid until its entity is swept; the slot is then reused
/// under a new generation, so old handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

pub(crate) struct ComponentSlot {
    pub(crate) component: Box<dyn Component>,
    pub(crate) enabled: bool,
    pub(crate) ready: bool,
}

/// An entity: a transform, flags, and an ordered list of components.
pub struct Entity {
    pub transform: Transform,
    pub enabled: bool,
    pub tag: Option<String>,
    destroyed: bool,
    pub(crate) components: Vec<ComponentSlot>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("transform", &self.transform)
            .field("enabled", &self.enabled)
            .field("tag", &self.tag)
            .field("destroyed", &self.destroyed)
            .field("components", &self.components.len())
            .finish()
    }
}

impl Entity {
    pub(crate) fn new(transform: Transform) -> Self {
        Self {
            transform,
            enabled: true,
            tag: None,
            destroyed: false,
            components: Vec::new(),
        }
    }

    /// Marked for removal at the next sweep.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn destroy(&mut self) {
        self.destroyed = true;
    }

    /// Whether hooks other than `setup` should run.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.destroyed
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn has<C: Component>(&self) -> bool {
        self.component::<C>().is_some()
    }

    /// First component of type `C`.
    pub fn component<C: Component>(&self) -> Option<&C> {
        self.components
            .iter()
            .find_map(|slot| (*slot.component).as_any().downcast_ref::<C>())
    }

    pub fn component_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components
            .iter_mut()
            .find_map(|slot| (*slot.component).as_any_mut().downcast_mut::<C>())
    }

    /// Run `setup` on components added since the last call.
    pub(crate) fn setup_pending(&mut self, id: EntityId, env: Env<'_>) {
        for slot in self.components.iter_mut().filter(|s| !s.ready) {
            let mut ctx = Context {
                entity: id,
                transform: &mut self.transform,
                input: env.input,
                transforms: env.transforms,
                terrain: env.terrain,
            };
            slot.component.setup(&mut ctx);
            slot.ready = true;
        }
    }

    /// Call `hook` on every enabled component.
    pub(crate) fn each_enabled(
        &mut self,
        id: EntityId,
        env: Env<'_>,
        mut hook: impl FnMut(&mut dyn Component, &mut Context<'_>),
    ) {
        for slot in self.components.iter_mut().filter(|s| s.enabled) {
            let mut ctx = Context {
                entity: id,
                transform: &mut self.transform,
                input: env.input,
                transforms: env.transforms,
                terrain: env.terrain,
            };
            hook(slot.component.as_mut(), &mut ctx);
        }
    }
}
