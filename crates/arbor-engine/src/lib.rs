//! Arbor engine crate.
//!
//! Identity and resource registries, the GPU allocation seam, the scene graph
//! with its deserializer, and the frame driver used by higher layers.

pub mod core;
pub mod device;
pub mod identity;
pub mod input;
pub mod resource;
pub mod scene;
pub mod time;

pub mod coords;
pub mod error;
pub mod logging;
pub mod paint;
pub mod render;

pub use error::{Error, Result};
