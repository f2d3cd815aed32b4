//! Input: raw keyboard and pointer events plus the pressed-state they imply.
//!
//! # Invariants
//! - State is updated before an event is routed, never after.
//! - Positions are screen space; conversion to world space belongs to the camera.

mod event;
mod state;

pub use event::{InputEvent, PointerButton};
pub use state::InputState;

pub fn crate_info() -> &'static str {
    "tileworld-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
