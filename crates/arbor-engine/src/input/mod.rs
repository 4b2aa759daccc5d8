//! Input subsystem.
//!
//! The public API is platform-agnostic. `platform::winit` translates
//! windowing events into `InputEvent`s at the boundary.

mod frame;
pub mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta};
