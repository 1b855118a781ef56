use serde::{Deserialize, Serialize};

/// Premultiplied RGBA pixel with 8-bit channels, the storage format of every raster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::from_rgba_premultiplied(0, 0, 0, 0);
    pub const BLACK: Pixel = Pixel::from_rgba_premultiplied(0, 0, 0, 255);
    pub const WHITE: Pixel = Pixel::from_rgba_premultiplied(255, 255, 255, 255);

    pub const fn from_rgba_premultiplied(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiply straight-alpha channels.
    pub fn from_rgba_unmultiplied(r: u8, g: u8, b: u8, a: u8) -> Self {
        let a32 = a as u32;
        if a32 >= 255 {
            return Self::from_rgba_premultiplied(r, g, b, a);
        }
        Self {
            r: ((r as u32 * a32 + 127) / 255) as u8,
            g: ((g as u32 * a32 + 127) / 255) as u8,
            b: ((b as u32 * a32 + 127) / 255) as u8,
            a,
        }
    }

    /// Undo premultiplication, e.g. before handing pixels to an image encoder.
    pub fn to_rgba_unmultiplied(self) -> [u8; 4] {
        let a = self.a as u32;
        if a == 0 {
            return [0, 0, 0, 0];
        }
        if a >= 255 {
            return [self.r, self.g, self.b, self.a];
        }
        let r = ((self.r as u32 * 255 + a / 2) / a).min(255);
        let g = ((self.g as u32 * 255 + a / 2) / a).min(255);
        let b = ((self.b as u32 * 255 + a / 2) / a).min(255);
        [r as u8, g as u8, b as u8, self.a]
    }

    /// Scale every channel by `scale / 255`.
    #[inline]
    pub fn scale_alpha(self, scale: u32) -> Self {
        if scale >= 255 {
            return self;
        }
        Self {
            r: ((self.r as u32 * scale + 127) / 255) as u8,
            g: ((self.g as u32 * scale + 127) / 255) as u8,
            b: ((self.b as u32 * scale + 127) / 255) as u8,
            a: ((self.a as u32 * scale + 127) / 255) as u8,
        }
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }
}

/// Simple RGBA color stored as straight-alpha floats in 0..1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl Color {
    /// Construct from 0-255 channel values.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgba(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::rgba(255, 255, 255, 255)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise linear interpolation, used by the gradient tool.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Convert to the premultiplied 8-bit storage format.
    pub fn to_pixel(self) -> Pixel {
        let a = self.a.clamp(0.0, 1.0);
        let channel = |c: f32| (c.clamp(0.0, 1.0) * a * 255.0).round() as u8;
        Pixel {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
            a: (a * 255.0).round() as u8,
        }
    }

    /// Convert from premultiplied storage back to straight floats.
    pub fn from_pixel(p: Pixel) -> Self {
        let [r, g, b, a] = p.to_rgba_unmultiplied();
        Self::rgba(r, g, b, a)
    }
}
