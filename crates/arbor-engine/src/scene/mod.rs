//! Scene graph and message dispatch.
//!
//! A [`SceneGraph`] is a forest of [`GameObject`]s. Each node owns an ordered
//! list of [`Component`]s; a component declares which capabilities
//! ([`Script`], [`Transform`], [`Widget`], [`Mask`]) it implements and is
//! reached through the matching narrowing accessor.
//!
//! Every structural mutation marks the owning root's cached traversal order
//! dirty. [`SceneGraph::validate`] rebuilds dirty roots only, and every
//! broadcast validates first, so messages always walk a current order
//! (parent before children, children in list order).
//!
//! [`loader`] builds graphs from serialized scene documents through a
//! registry of component builders keyed by type tag.

mod component;
mod context;
mod graph;
pub mod loader;
mod object;
#[allow(clippy::module_inception)]
mod scene;

pub use component::{
    AsAny, Capabilities, Component, ComponentId, Mask, MaskPass, Script, Transform, Widget, WidgetEvent,
    WidgetReply,
};
pub use context::{FrameEnv, FrameInfo, Message, ScriptCtx};
pub use graph::SceneGraph;
pub use loader::{ComponentBuilders, SceneDocument};
pub use object::GameObject;
pub use scene::Scene;
