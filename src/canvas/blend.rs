use serde::{Deserialize, Serialize};

use crate::utils::color::Pixel;

/// Per-layer pixel combination function used by the compositor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Difference,
    Additive,
}

impl BlendMode {
    pub const ALL: [BlendMode; 8] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::Difference,
        BlendMode::Additive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Difference => "Difference",
            BlendMode::Additive => "Additive",
        }
    }

    /// Blend a premultiplied `src` onto a premultiplied `dst`.
    pub fn blend(self, src: Pixel, dst: Pixel) -> Pixel {
        match self {
            BlendMode::Normal => alpha_over(src, dst),
            BlendMode::Multiply => blend_separable(src, dst, |s, d| s * d),
            BlendMode::Screen => blend_separable(src, dst, |s, d| s + d - s * d),
            BlendMode::Overlay => blend_separable(src, dst, |s, d| hard_light(d, s)),
            BlendMode::Darken => blend_separable(src, dst, f32::min),
            BlendMode::Lighten => blend_separable(src, dst, f32::max),
            BlendMode::Difference => blend_separable(src, dst, |s, d| (s - d).abs()),
            BlendMode::Additive => blend_separable(src, dst, |s, d| (s + d).min(1.0)),
        }
    }
}

/// How a tool writes a source pixel into a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaintOp {
    /// Source-over compositing.
    Over,
    /// Reduce destination alpha by the source alpha.
    Erase,
    /// Overwrite the destination.
    Replace,
}

impl PaintOp {
    #[inline]
    pub fn apply(self, src: Pixel, dst: Pixel) -> Pixel {
        match self {
            PaintOp::Over => alpha_over(src, dst),
            PaintOp::Erase => blend_erase(src, dst),
            PaintOp::Replace => src,
        }
    }
}

/// Erase blend mode: reduce destination alpha by the source alpha.
pub fn blend_erase(src: Pixel, dst: Pixel) -> Pixel {
    let inv = 255 - src.a as u32;
    let out_a = (dst.a as u32 * inv + 127) / 255;
    let out_r = (dst.r as u32 * inv + 127) / 255;
    let out_g = (dst.g as u32 * inv + 127) / 255;
    let out_b = (dst.b as u32 * inv + 127) / 255;
    Pixel::from_rgba_premultiplied(
        out_r.min(255) as u8,
        out_g.min(255) as u8,
        out_b.min(255) as u8,
        out_a.min(255) as u8,
    )
}

/// Standard "source over" alpha compositing for premultiplied colors.
pub fn alpha_over(src: Pixel, dst: Pixel) -> Pixel {
    let src_a = src.a as u32;
    if src_a == 0 {
        return dst;
    }
    if src_a == 255 {
        return src;
    }
    let inv = 255 - src_a;
    let out_a = src_a + (dst.a as u32 * inv + 127) / 255;
    if out_a == 0 {
        return Pixel::TRANSPARENT;
    }

    let out_r = src.r as u32 + (dst.r as u32 * inv + 127) / 255;
    let out_g = src.g as u32 + (dst.g as u32 * inv + 127) / 255;
    let out_b = src.b as u32 + (dst.b as u32 * inv + 127) / 255;

    Pixel::from_rgba_premultiplied(
        out_r.min(255) as u8,
        out_g.min(255) as u8,
        out_b.min(255) as u8,
        out_a.min(255) as u8,
    )
}

fn hard_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        d * 2.0 * s
    } else {
        let s2 = 2.0 * s - 1.0;
        d + s2 - d * s2
    }
}

/// Separable blend on premultiplied pixels:
/// `co = (1 - ab) * cs + (1 - as) * cb + as * ab * B(Cs, Cb)`.
fn blend_separable(src: Pixel, dst: Pixel, f: impl Fn(f32, f32) -> f32) -> Pixel {
    if src.a == 0 {
        return dst;
    }
    if dst.a == 0 {
        return src;
    }
    let sa = src.a as f32 / 255.0;
    let da = dst.a as f32 / 255.0;
    let channel = |s: u8, d: u8| -> u8 {
        let sp = s as f32 / 255.0;
        let dp = d as f32 / 255.0;
        let cs = (sp / sa).min(1.0);
        let cd = (dp / da).min(1.0);
        let out = (1.0 - da) * sp + (1.0 - sa) * dp + sa * da * f(cs, cd);
        (out.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    let out_a = sa + da - sa * da;
    Pixel::from_rgba_premultiplied(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        (out_a.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

/// Map a 0..100 opacity percentage to the 0..255 scale used by `Pixel::scale_alpha`.
#[inline]
pub fn opacity_scale(opacity: u8) -> u32 {
    (opacity.min(100) as u32 * 255 + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Pixel = Pixel::from_rgba_premultiplied(255, 0, 0, 255);
    const GREY: Pixel = Pixel::from_rgba_premultiplied(128, 128, 128, 255);

    #[test]
    fn opaque_over_replaces() {
        assert_eq!(alpha_over(RED, Pixel::WHITE), RED);
        assert_eq!(alpha_over(Pixel::TRANSPARENT, RED), RED);
    }

    #[test]
    fn erase_full_alpha_clears() {
        assert_eq!(blend_erase(Pixel::BLACK, RED), Pixel::TRANSPARENT);
    }

    #[test]
    fn multiply_with_white_is_identity() {
        assert_eq!(BlendMode::Multiply.blend(GREY, Pixel::WHITE), GREY);
        assert_eq!(BlendMode::Multiply.blend(RED, Pixel::WHITE), RED);
    }

    #[test]
    fn screen_with_black_is_identity() {
        assert_eq!(BlendMode::Screen.blend(GREY, Pixel::BLACK), GREY);
    }

    #[test]
    fn difference_of_equal_colors_is_black() {
        assert_eq!(BlendMode::Difference.blend(GREY, GREY), Pixel::BLACK);
    }

    #[test]
    fn opacity_scale_endpoints() {
        assert_eq!(opacity_scale(0), 0);
        assert_eq!(opacity_scale(100), 255);
        assert_eq!(opacity_scale(50), 128);
    }
}
