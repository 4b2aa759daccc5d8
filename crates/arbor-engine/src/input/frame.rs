use std::collections::HashSet;

use crate::coords::{Vec2, Viewport};

use super::types::{InputEvent, Key, MouseButton};

/// Input edges collected since the last frame.
///
/// `InputState` is the level (what is held, where the pointer is);
/// `InputFrame` is what changed. Cleared by the engine at the end of each frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Accumulated wheel delta in logical pixels.
    pub wheel: Vec2,

    /// Last viewport reported this frame, if the window was resized.
    pub resized: Option<Viewport>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.wheel = Vec2::ZERO;
        self.resized = None;
    }

    #[inline]
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    #[inline]
    pub fn primary_pressed(&self) -> bool {
        self.buttons_pressed.contains(&MouseButton::PRIMARY)
    }

    #[inline]
    pub fn primary_released(&self) -> bool {
        self.buttons_released.contains(&MouseButton::PRIMARY)
    }

    /// Wheel motion this frame, if any.
    pub fn scrolled(&self) -> Option<Vec2> {
        (self.wheel != Vec2::ZERO).then_some(self.wheel)
    }
}
