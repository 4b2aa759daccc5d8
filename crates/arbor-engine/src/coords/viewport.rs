use super::{Rect, Vec2};

/// Drawable area in logical pixels plus the platform scale factor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height, scale_factor: 1.0 }
    }

    #[inline]
    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// The full viewport as a rectangle at the origin.
    #[inline]
    pub fn rect(self) -> Rect {
        Rect::from_origin_size(Vec2::ZERO, self.size())
    }

    /// Size of the backing surface in physical pixels, at least 1x1.
    pub fn physical_size(self) -> (u32, u32) {
        let w = (self.width * self.scale_factor).round().max(1.0) as u32;
        let h = (self.height * self.scale_factor).round().max(1.0) as u32;
        (w, h)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}
