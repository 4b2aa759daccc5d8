use std::fmt;

use crate::error::{Error, Result};

/// Opaque handle to an allocated GPU object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GpuHandle(pub(crate) u64);

impl GpuHandle {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu:{}", self.0)
    }
}

/// Pixel layouts a texture upload can carry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgba8,
    R16,
    Rg16,
    Rgba16,
}

impl TextureFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 | TextureFormat::R16 => 2,
            TextureFormat::Rgba8 | TextureFormat::Rg16 => 4,
            TextureFormat::Rgba16 => 8,
        }
    }

    #[inline]
    pub const fn is_16_bit(self) -> bool {
        matches!(self, TextureFormat::R16 | TextureFormat::Rg16 | TextureFormat::Rgba16)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    pub const fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self { width, height, format }
    }

    /// Expected length of a tightly packed upload.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel() as usize
    }

    /// Rejects zero dimensions and uploads whose length does not match.
    pub fn validate(&self, pixels: Option<&[u8]>) -> Result<()> {
        check_size(self.width, self.height)?;
        if let Some(pixels) = pixels {
            if pixels.len() != self.byte_len() {
                return Err(Error::invalid(format!(
                    "texture upload is {} bytes, expected {} for {}x{} {:?}",
                    pixels.len(),
                    self.byte_len(),
                    self.width,
                    self.height,
                    self.format
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidSize { width, height });
    }
    Ok(())
}

/// Creates and destroys GPU objects on behalf of resources and components.
///
/// Calls must come from the thread that owns the rendering context.
/// Releasing an unknown or already released handle is a no-op.
pub trait GpuAllocator: Send + Sync {
    /// Creates a vertex buffer initialized with `contents`.
    fn create_buffer(&self, label: &str, contents: &[u8]) -> Result<GpuHandle>;

    /// Creates a sampled 2D texture, optionally uploading tightly packed pixels.
    fn create_texture(&self, label: &str, desc: TextureDesc, pixels: Option<&[u8]>) -> Result<GpuHandle>;

    /// Creates an offscreen render target: a color plane plus a depth/stencil plane.
    fn create_target(&self, label: &str, width: u32, height: u32) -> Result<GpuHandle>;

    /// Recreates the planes of a render target at a new size.
    fn resize_target(&self, target: GpuHandle, width: u32, height: u32) -> Result<()>;

    fn release(&self, handle: GpuHandle);

    /// Number of handles currently allocated.
    fn live(&self) -> usize;
}
