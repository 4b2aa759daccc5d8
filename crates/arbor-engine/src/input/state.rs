use std::collections::HashSet;

use crate::coords::{Vec2, Viewport};

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState};

/// Current input levels for one window.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,

    pub focused: bool,

    /// Pointer position in logical pixels; `None` while outside the window.
    pub pointer: Option<Vec2>,

    pub keys_down: HashSet<Key>,

    pub buttons_down: HashSet<MouseButton>,

    pub viewport: Viewport,
}

impl InputState {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport, focused: true, ..Self::default() }
    }

    /// Applies `ev` to the levels and records its edges into `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Nothing stays held across a focus loss.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(pos) => self.pointer = Some(*pos),

            InputEvent::PointerLeft => self.pointer = None,

            InputEvent::Key { key, state } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                MouseButtonState::Pressed => {
                    if self.buttons_down.insert(*button) {
                        frame.buttons_pressed.insert(*button);
                    }
                }
                MouseButtonState::Released => {
                    if self.buttons_down.remove(button) {
                        frame.buttons_released.insert(*button);
                    }
                }
            },

            InputEvent::MouseWheel(delta) => frame.wheel += delta.to_pixels(),

            InputEvent::Resized(viewport) => {
                self.viewport = *viewport;
                frame.resized = Some(*viewport);
            }
        }

        frame.events.push(ev);
    }

    /// Pointer position, or a point outside any widget when the pointer is away.
    pub fn pointer_or_offscreen(&self) -> Vec2 {
        self.pointer.unwrap_or(Vec2::splat(f32::NEG_INFINITY))
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseWheelDelta;

    fn press(button: MouseButton) -> InputEvent {
        InputEvent::PointerButton { button, state: MouseButtonState::Pressed }
    }

    fn release(button: MouseButton) -> InputEvent {
        InputEvent::PointerButton { button, state: MouseButtonState::Released }
    }

    #[test]
    fn press_and_release_record_edges_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(MouseButton::Left));
        state.apply_event(&mut frame, press(MouseButton::Left));
        assert!(frame.primary_pressed());
        assert!(state.button_down(MouseButton::Left));

        frame.clear();
        state.apply_event(&mut frame, release(MouseButton::Left));
        assert!(frame.primary_released());
        assert!(!frame.primary_pressed());
        assert!(!state.button_down(MouseButton::Left));
    }

    #[test]
    fn wheel_accumulates_in_pixels() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: 1.0 }));
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: 0.0, y: 5.0 }));
        assert_eq!(frame.scrolled(), Some(Vec2::new(0.0, 25.0)));
    }

    #[test]
    fn resize_updates_viewport_and_frame() {
        let mut state = InputState::new(Viewport::new(100.0, 100.0));
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::Resized(Viewport::new(300.0, 200.0)));
        assert_eq!(state.viewport.width, 300.0);
        assert_eq!(frame.resized.map(|v| v.height), Some(200.0));
        assert!(frame.has_events());
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, press(MouseButton::Right));
        state.apply_event(&mut frame, InputEvent::Key { key: Key::Space, state: KeyState::Pressed });
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.buttons_down.is_empty());
        assert!(state.keys_down.is_empty());
    }

    #[test]
    fn pointer_left_clears_position() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::PointerMoved(Vec2::new(3.0, 4.0)));
        state.apply_event(&mut frame, InputEvent::PointerLeft);
        assert!(state.pointer.is_none());
        assert!(!state.pointer_or_offscreen().is_finite());
    }
}
