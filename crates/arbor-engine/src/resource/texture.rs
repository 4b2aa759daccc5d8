use image::DynamicImage;

use super::registry::Resource;
use super::source::ResourceSource;
use crate::device::{GpuAllocator, GpuHandle, TextureDesc, TextureFormat};
use crate::error::{Error, Result};

/// 2D texture.
///
/// Decoded textures keep their pixels and fixed dimensions. Blank textures
/// created with [`Texture::blank`] are resizable render storage.
#[derive(Debug)]
pub struct Texture {
    name: String,
    desc: TextureDesc,
    pixels: Option<Vec<u8>>,
    resizable: bool,
    handle: Option<GpuHandle>,
}

impl Texture {
    /// Uninitialized, resizable texture.
    pub fn blank(name: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Result<Self> {
        let desc = TextureDesc::new(width, height, format);
        desc.validate(None)?;
        Ok(Self { name: name.into(), desc, pixels: None, resizable: true, handle: None })
    }

    /// Fixed-size texture from tightly packed pixels.
    pub fn from_pixels(
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let desc = TextureDesc::new(width, height, format);
        desc.validate(Some(&pixels))?;
        Ok(Self { name: name.into(), desc, pixels: Some(pixels), resizable: false, handle: None })
    }

    /// Maps a decoded image onto a GPU pixel layout.
    ///
    /// RGB images are widened to RGBA; luma/alpha images map onto one or two
    /// channel formats. Float images have no mapping.
    pub fn from_image(name: impl Into<String>, image: DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        let (format, pixels) = match image {
            DynamicImage::ImageRgba8(buf) => (TextureFormat::Rgba8, buf.into_raw()),
            rgb @ DynamicImage::ImageRgb8(_) => (TextureFormat::Rgba8, rgb.to_rgba8().into_raw()),
            DynamicImage::ImageRgba16(buf) => (TextureFormat::Rgba16, widen(buf.into_raw())),
            rgb @ DynamicImage::ImageRgb16(_) => (TextureFormat::Rgba16, widen(rgb.to_rgba16().into_raw())),
            DynamicImage::ImageLumaA8(buf) => (TextureFormat::Rg8, buf.into_raw()),
            DynamicImage::ImageLumaA16(buf) => (TextureFormat::Rg16, widen(buf.into_raw())),
            DynamicImage::ImageLuma8(buf) => (TextureFormat::R8, buf.into_raw()),
            DynamicImage::ImageLuma16(buf) => (TextureFormat::R16, widen(buf.into_raw())),
            other => {
                return Err(Error::invalid(format!(
                    "no channel mapping for color model {:?}",
                    other.color()
                )));
            }
        };
        Self::from_pixels(name, width, height, format, pixels)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    #[inline]
    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    #[inline]
    pub fn handle(&self) -> Option<GpuHandle> {
        self.handle
    }

    #[inline]
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// Changes the dimensions of a resizable texture, reallocating if it is live.
    pub fn set_size(&mut self, gpu: &dyn GpuAllocator, width: u32, height: u32) -> Result<()> {
        if !self.resizable {
            return Err(Error::NotResizable(self.name.clone()));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        if (width, height) == self.size() {
            return Ok(());
        }
        self.desc.width = width;
        self.desc.height = height;
        if self.handle.is_some() {
            self.allocate(gpu)?;
        }
        Ok(())
    }
}

fn widen(samples: Vec<u16>) -> Vec<u8> {
    bytemuck::cast_slice(&samples).to_vec()
}

impl Resource for Texture {
    const KIND: &'static str = "texture";

    fn decode(source: &mut ResourceSource) -> Result<Self> {
        let bytes = source.read_all()?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| Error::invalid(format!("texture '{}': {e}", source.name())))?;
        Self::from_image(source.name(), image)
    }

    fn allocate(&mut self, gpu: &dyn GpuAllocator) -> Result<()> {
        if let Some(old) = self.handle.take() {
            gpu.release(old);
        }
        self.handle = Some(gpu.create_texture(&self.name, self.desc, self.pixels.as_deref())?);
        Ok(())
    }

    fn release(&self, gpu: &dyn GpuAllocator) {
        if let Some(handle) = self.handle {
            gpu.release(handle);
        }
    }
}
