use ::winit::dpi::{PhysicalPosition, PhysicalSize};
use ::winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use ::winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::coords::{Vec2, Viewport};
use crate::input::{InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// `scale_factor` is the window's current DPI scale; positions and sizes are
/// converted to logical pixels. Returns `None` for events the engine ignores.
pub fn translate_window_event(scale_factor: f64, event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::ModifiersChanged(m) => Some(InputEvent::ModifiersChanged(map_modifiers(m.state()))),

        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => {
            Some(InputEvent::PointerMoved(to_logical(scale_factor, *position)))
        }

        WindowEvent::MouseInput { state, button, .. } => Some(InputEvent::PointerButton {
            button: map_mouse_button(*button),
            state: match state {
                ElementState::Pressed => MouseButtonState::Pressed,
                ElementState::Released => MouseButtonState::Released,
            },
        }),

        WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::MouseWheel(match delta {
            MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
            MouseScrollDelta::PixelDelta(p) => {
                let v = to_logical(scale_factor, *p);
                MouseWheelDelta::Pixel { x: v.x, y: v.y }
            }
        })),

        WindowEvent::KeyboardInput { event, .. } if !event.repeat => Some(InputEvent::Key {
            key: map_key(event.physical_key),
            state: match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            },
        }),

        WindowEvent::Resized(size) => Some(InputEvent::Resized(to_viewport(scale_factor, *size))),

        _ => None,
    }
}

/// Logical viewport for a physical surface size.
pub fn to_viewport(scale_factor: f64, size: PhysicalSize<u32>) -> Viewport {
    let logical = size.to_logical::<f64>(scale_factor);
    Viewport::new(logical.width as f32, logical.height as f32).with_scale_factor(scale_factor as f32)
}

fn to_logical(scale_factor: f64, pos: PhysicalPosition<f64>) -> Vec2 {
    let logical = pos.to_logical::<f64>(scale_factor);
    Vec2::new(logical.x as f32, logical.y as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Other(3),
        WinitMouseButton::Forward => MouseButton::Other(4),
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    let PhysicalKey::Code(code) = pk else {
        return Key::Unknown(0);
    };
    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,

        other => Key::Unknown(other as u32),
    }
}
