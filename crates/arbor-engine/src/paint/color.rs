use serde::{Deserialize, Serialize};

/// Linear premultiplied RGBA color.
///
/// Invariant: `r`, `g` and `b` are already multiplied by `a`.
///
/// Serialized documents (styles, scene payloads) carry straight-alpha
/// `[r, g, b, a]` arrays; conversion happens at the serde boundary.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::from_premul(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::from_premul(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::from_premul(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a premultiplied color from straight alpha components in `[0, 1]`.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    /// Straight-alpha components. RGB is 0 when `a == 0`.
    #[inline]
    pub fn to_straight(self) -> [f32; 4] {
        if self.a <= 0.0 {
            [0.0; 4]
        } else {
            let inv = 1.0 / self.a;
            [self.r * inv, self.g * inv, self.b * inv, self.a]
        }
    }

    /// Scales opacity, keeping premultiplication intact.
    #[inline]
    pub fn with_opacity(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self { r: self.r * f, g: self.g * f, b: self.b * f, a: self.a * f }
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Color::from_straight(r, g, b, a)
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.to_straight()
    }
}
