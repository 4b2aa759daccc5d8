use crate::coords::{Vec2, Viewport};

/// Keyboard key identifier.
///
/// Only keys the engine and tools bind to are named; everything else is
/// `Unknown` with the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    Unknown(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl MouseButton {
    /// The button that drives UI selection, clicks and drags.
    pub const PRIMARY: MouseButton = MouseButton::Left;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse wheel delta. `Line` is notched wheels, `Pixel` is touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

impl MouseWheelDelta {
    /// Logical pixels assumed per wheel line.
    pub const LINE_HEIGHT: f32 = 20.0;

    pub fn to_pixels(self) -> Vec2 {
        match self {
            MouseWheelDelta::Line { x, y } => Vec2::new(x, y) * Self::LINE_HEIGHT,
            MouseWheelDelta::Pixel { x, y } => Vec2::new(x, y),
        }
    }
}

/// Platform-agnostic input events.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ModifiersChanged(Modifiers),

    Key { key: Key, state: KeyState },

    /// Pointer position in logical pixels.
    PointerMoved(Vec2),

    PointerButton { button: MouseButton, state: MouseButtonState },

    MouseWheel(MouseWheelDelta),

    /// Pointer left the window surface.
    PointerLeft,

    Focused(bool),

    /// Drawable area changed.
    Resized(Viewport),
}
