//! Named, GPU-backed resources.
//!
//! A [`ResourceRegistry`] caches one kind of [`Resource`] by name. Registries
//! for different kinds are collected in [`Resources`], keyed by the kind tag.
//!
//! Lookups take a read lock and may run from any thread. Registration,
//! loading and eviction take the write lock and allocate or release GPU
//! objects synchronously, so they belong on the render thread.

mod hub;
mod mesh;
mod registry;
mod source;
mod texture;

pub use hub::Resources;
pub use mesh::{CORNER_NORMAL, CORNER_POSITION, CORNER_UV, Face, FaceLayout, Mesh, MeshData, Vertex};
pub use registry::{Resource, ResourceLink, ResourceRegistry};
pub use source::ResourceSource;
pub use texture::Texture;
