//! Engine context and frame driver.
//!
//! [`Engine`] is the explicitly constructed owner of every shared service:
//! identity registry, GPU allocator, resource registries, component builders,
//! input state and the active scene. Higher layers talk to it through the
//! [`App`] contract and plug startup work in as [`System`]s.

mod app;
mod config;
mod engine;
mod system;

pub use app::{App, AppControl};
pub use config::EngineConfig;
pub use engine::{Engine, FrameStats, RunFlag};
pub use system::{SetupCtx, System, Systems};
