use glam::Vec2;
use std::collections::BTreeSet;

use crate::{InputEvent, PointerButton};

/// Pressed keys and buttons plus the last known pointer position.
///
/// Updated by [`InputState::apply`] before events are routed to components,
/// so hooks observe the state including the event being delivered.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: BTreeSet<String>,
    buttons: BTreeSet<PointerButton>,
    pointer: Option<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.keys.insert(key.clone());
            }
            InputEvent::KeyUp(key) => {
                self.keys.remove(key);
            }
            InputEvent::PointerMove(position) => self.pointer = Some(*position),
            InputEvent::PointerDown { button, position } => {
                self.buttons.insert(*button);
                self.pointer = Some(*position);
            }
            InputEvent::PointerUp { button, position } => {
                self.buttons.remove(button);
                self.pointer = Some(*position);
            }
        }
        tracing::trace!(?event, "input");
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_button_pressed(&self, button: PointerButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Last pointer position in screen space; `None` before the pointer
    /// entered the viewport.
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    /// `-1`, `0` or `1` from a pair of opposing keys.
    pub fn axis(&self, negative: &str, positive: &str) -> f32 {
        let pos = if self.is_key_pressed(positive) { 1.0 } else { 0.0 };
        let neg = if self.is_key_pressed(negative) { 1.0 } else { 0.0 };
        pos - neg
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Forget everything pressed, e.g. when the viewport loses focus.
    pub fn release_all(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }
}
