//! Renderer-agnostic render command stream.
//!
//! Scene components record what the frame should do (bind targets, toggle
//! pipeline state, write stencil masks, draw quads) into a [`RenderList`].
//! A backend replays the list into real draw calls.

mod cmd;
mod list;

pub use cmd::RenderCmd;
pub use list::RenderList;
