//! GPU resource allocation.
//!
//! Scene and resource code never talks to a graphics API directly. It asks a
//! [`GpuAllocator`] for opaque [`GpuHandle`]s and gives them back on release.
//!
//! - [`HeadlessGpu`] keeps allocations in memory (tests, tools, servers).
//! - [`WgpuGpu`] backs handles with real `wgpu` buffers and textures.

mod allocator;
mod gpu;
mod headless;

pub use allocator::{GpuAllocator, GpuHandle, TextureDesc, TextureFormat};
pub use gpu::{WgpuGpu, WgpuInit};
pub use headless::{Allocation, AllocationKind, HeadlessGpu};
