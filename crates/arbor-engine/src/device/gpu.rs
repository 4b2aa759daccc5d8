use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use wgpu::util::DeviceExt;

use super::allocator::{check_size, GpuAllocator, GpuHandle, TextureDesc, TextureFormat};
use crate::error::{Error, Result};

/// Parameters for headless device creation.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    pub power_preference: wgpu::PowerPreference,

    /// Required wgpu features. 16-bit normalized textures need
    /// `TEXTURE_FORMAT_16BIT_NORM`; without it those uploads are rejected.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Use the software fallback adapter (CI machines without a GPU).
    pub force_fallback_adapter: bool,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            force_fallback_adapter: false,
        }
    }
}

enum Slot {
    Buffer(wgpu::Buffer),
    Texture(wgpu::Texture),
    Target {
        color: wgpu::Texture,
        depth_stencil: wgpu::Texture,
    },
}

impl Slot {
    fn destroy(&self) {
        match self {
            Slot::Buffer(b) => b.destroy(),
            Slot::Texture(t) => t.destroy(),
            Slot::Target { color, depth_stencil } => {
                color.destroy();
                depth_stencil.destroy();
            }
        }
    }
}

/// Allocator backed by a wgpu device.
///
/// Render targets are an `Rgba8Unorm` color plane plus a
/// `Depth24PlusStencil8` plane, which is what the UI clip pass needs.
pub struct WgpuGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next: AtomicU64,
    slots: Mutex<HashMap<GpuHandle, Slot>>,
}

impl WgpuGpu {
    pub const TARGET_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    pub const TARGET_DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    /// Wraps a device owned by a windowed runtime.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            next: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a device without a surface, blocking on adapter/device acquisition.
    pub fn headless(init: WgpuInit) -> anyhow::Result<Self> {
        pollster::block_on(Self::request(init))
    }

    async fn request(init: WgpuInit) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("arbor-engine device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        log::debug!("wgpu allocator on adapter {:?}", adapter.get_info().name);
        Ok(Self::new(device, queue))
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The buffer behind `handle`, for renderers consuming the command stream.
    pub fn buffer(&self, handle: GpuHandle) -> Option<wgpu::Buffer> {
        match self.slots().get(&handle)? {
            Slot::Buffer(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// The sampled texture, or the color plane of a render target.
    pub fn texture(&self, handle: GpuHandle) -> Option<wgpu::Texture> {
        match self.slots().get(&handle)? {
            Slot::Texture(t) => Some(t.clone()),
            Slot::Target { color, .. } => Some(color.clone()),
            Slot::Buffer(_) => None,
        }
    }

    fn insert(&self, slot: Slot) -> GpuHandle {
        let handle = GpuHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.slots().insert(handle, slot);
        handle
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<GpuHandle, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        check_size(width, height)?;
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(Error::InvalidSize { width, height });
        }
        Ok(())
    }

    fn wgpu_format(&self, format: TextureFormat) -> Result<wgpu::TextureFormat> {
        if format.is_16_bit()
            && !self
                .device
                .features()
                .contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM)
        {
            return Err(Error::Gpu(format!("{format:?} textures need TEXTURE_FORMAT_16BIT_NORM")));
        }
        Ok(match format {
            TextureFormat::R8 => wgpu::TextureFormat::R8Unorm,
            TextureFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::R16 => wgpu::TextureFormat::R16Unorm,
            TextureFormat::Rg16 => wgpu::TextureFormat::Rg16Unorm,
            TextureFormat::Rgba16 => wgpu::TextureFormat::Rgba16Unorm,
        })
    }

    fn create_target_planes(&self, label: &str, width: u32, height: u32) -> (wgpu::Texture, wgpu::Texture) {
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let color = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::TARGET_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth_stencil = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::TARGET_DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        (color, depth_stencil)
    }
}

impl GpuAllocator for WgpuGpu {
    fn create_buffer(&self, label: &str, contents: &[u8]) -> Result<GpuHandle> {
        if contents.is_empty() {
            return Err(Error::invalid(format!("buffer '{label}' has no contents")));
        }
        if contents.len() as u64 > self.device.limits().max_buffer_size {
            return Err(Error::Gpu(format!("buffer '{label}' exceeds max_buffer_size")));
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Ok(self.insert(Slot::Buffer(buffer)))
    }

    fn create_texture(&self, label: &str, desc: TextureDesc, pixels: Option<&[u8]>) -> Result<GpuHandle> {
        desc.validate(pixels)?;
        self.check_dimensions(desc.width, desc.height)?;
        let format = self.wgpu_format(desc.format)?;

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        if let Some(pixels) = pixels {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(desc.width * desc.format.bytes_per_pixel()),
                    rows_per_image: Some(desc.height),
                },
                size,
            );
        }

        Ok(self.insert(Slot::Texture(texture)))
    }

    fn create_target(&self, label: &str, width: u32, height: u32) -> Result<GpuHandle> {
        self.check_dimensions(width, height)?;
        let (color, depth_stencil) = self.create_target_planes(label, width, height);
        Ok(self.insert(Slot::Target { color, depth_stencil }))
    }

    fn resize_target(&self, target: GpuHandle, width: u32, height: u32) -> Result<()> {
        self.check_dimensions(width, height)?;
        let mut slots = self.slots();
        let slot = slots
            .get_mut(&target)
            .ok_or_else(|| Error::not_found("render target", target))?;
        let Slot::Target { color, depth_stencil } = slot else {
            return Err(Error::TypeMismatch {
                name: target.to_string(),
                expected: "render target",
            });
        };
        let label = format!("target {target}");
        let (new_color, new_depth) = self.create_target_planes(&label, width, height);
        color.destroy();
        depth_stencil.destroy();
        *color = new_color;
        *depth_stencil = new_depth;
        Ok(())
    }

    fn release(&self, handle: GpuHandle) {
        if let Some(slot) = self.slots().remove(&handle) {
            slot.destroy();
        }
    }

    fn live(&self) -> usize {
        self.slots().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A software device if one exists, else any adapter. Machines with
    /// neither skip these tests.
    fn gpu() -> Option<WgpuGpu> {
        WgpuGpu::headless(WgpuInit { force_fallback_adapter: true, ..Default::default() })
            .or_else(|_| WgpuGpu::headless(WgpuInit::default()))
            .ok()
    }

    fn extent(texture: &wgpu::Texture) -> (u32, u32) {
        let size = texture.size();
        (size.width, size.height)
    }

    // ── buffers / textures ────────────────────────────────────────────────

    #[test]
    fn buffer_round_trip() {
        let Some(gpu) = gpu() else { return };
        let handle = gpu.create_buffer("quad", &[0u8; 96]).unwrap();
        assert_eq!(gpu.live(), 1);
        assert_eq!(gpu.buffer(handle).unwrap().size(), 96);
        assert!(gpu.texture(handle).is_none());

        gpu.release(handle);
        assert_eq!(gpu.live(), 0);
        assert!(gpu.buffer(handle).is_none());
        gpu.release(handle);
        assert_eq!(gpu.live(), 0);
    }

    #[test]
    fn empty_buffer_is_invalid() {
        let Some(gpu) = gpu() else { return };
        assert!(matches!(gpu.create_buffer("empty", &[]), Err(Error::InvalidContent(_))));
        assert_eq!(gpu.live(), 0);
    }

    #[test]
    fn texture_upload_maps_format() {
        let Some(gpu) = gpu() else { return };
        let desc = TextureDesc::new(3, 2, TextureFormat::Rgba8);
        let handle = gpu.create_texture("logo", desc, Some(&[255; 24])).unwrap();
        let texture = gpu.texture(handle).unwrap();
        assert_eq!(texture.format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(extent(&texture), (3, 2));

        let blank = gpu.create_texture("mask", TextureDesc::new(4, 4, TextureFormat::R8), None).unwrap();
        assert_eq!(gpu.texture(blank).unwrap().format(), wgpu::TextureFormat::R8Unorm);
        assert_eq!(gpu.live(), 2);
    }

    #[test]
    fn bad_texture_sizes_are_rejected() {
        let Some(gpu) = gpu() else { return };
        let zero = TextureDesc::new(0, 4, TextureFormat::Rgba8);
        assert!(matches!(gpu.create_texture("zero", zero, None), Err(Error::InvalidSize { .. })));

        let max = gpu.device().limits().max_texture_dimension_2d;
        let huge = TextureDesc::new(max + 1, 1, TextureFormat::R8);
        assert!(matches!(gpu.create_texture("huge", huge, None), Err(Error::InvalidSize { .. })));

        let short = TextureDesc::new(2, 2, TextureFormat::Rgba8);
        assert!(matches!(gpu.create_texture("short", short, Some(&[0; 3])), Err(Error::InvalidContent(_))));
        assert_eq!(gpu.live(), 0);
    }

    #[test]
    fn sixteen_bit_needs_the_feature() {
        let Some(gpu) = gpu() else { return };
        assert!(!gpu.device().features().contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM));
        let desc = TextureDesc::new(2, 2, TextureFormat::Rgba16);
        assert!(matches!(gpu.create_texture("deep", desc, Some(&[0; 32])), Err(Error::Gpu(_))));
        assert_eq!(gpu.live(), 0);
    }

    // ── targets ───────────────────────────────────────────────────────────

    #[test]
    fn target_resize_swaps_planes() {
        let Some(gpu) = gpu() else { return };
        let target = gpu.create_target("ui", 64, 32).unwrap();
        let color = gpu.texture(target).unwrap();
        assert_eq!(color.format(), WgpuGpu::TARGET_COLOR_FORMAT);
        assert_eq!(extent(&color), (64, 32));

        gpu.resize_target(target, 128, 96).unwrap();
        assert_eq!(extent(&gpu.texture(target).unwrap()), (128, 96));
        assert_eq!(gpu.live(), 1);

        assert!(matches!(gpu.resize_target(target, 0, 96), Err(Error::InvalidSize { .. })));
        assert_eq!(extent(&gpu.texture(target).unwrap()), (128, 96));

        gpu.release(target);
        assert_eq!(gpu.live(), 0);
        assert!(matches!(gpu.resize_target(target, 8, 8), Err(Error::NotFound { .. })));
    }

    #[test]
    fn only_targets_resize() {
        let Some(gpu) = gpu() else { return };
        let buffer = gpu.create_buffer("b", &[1, 2, 3, 4]).unwrap();
        assert!(matches!(gpu.resize_target(buffer, 8, 8), Err(Error::TypeMismatch { .. })));
        assert!(matches!(gpu.create_target("zero", 0, 0), Err(Error::InvalidSize { .. })));
    }
}
