use crate::brush_engine::brush_options::{BrushShape, DabJitter};
use crate::brush_engine::hardness::FalloffTable;
use crate::canvas::blend::PaintOp;
use crate::canvas::journal::JournaledRaster;
use crate::canvas::raster::RasterBuffer;
use crate::selection::Selection;
use crate::utils::color::Color;
use crate::utils::rect::Rect;
use crate::utils::vector::Vec2;

/// Everything needed to stamp dabs for one stroke.
#[derive(Clone, Debug)]
pub struct DabStyle {
    pub color: Color,
    /// Diameter in pixels at full pressure.
    pub size: f32,
    /// 0..1
    pub opacity: f32,
    /// 0..1
    pub flow: f32,
    /// 0..100
    pub hardness: f32,
    pub shape: BrushShape,
    /// Hard-edged pixel footprint without falloff or anti-aliasing.
    pub aliased: bool,
    pub op: PaintOp,
}

/// Stamps dabs into a raster, scaled by pressure, jitter and selection coverage.
#[derive(Clone, Debug)]
pub struct DabRenderer {
    style: DabStyle,
    falloff: FalloffTable,
}

impl DabRenderer {
    pub fn new(style: DabStyle) -> Self {
        let falloff = FalloffTable::new(style.hardness);
        Self { style, falloff }
    }

    pub fn style(&self) -> &DabStyle {
        &self.style
    }

    /// Effective diameter for a given pressure; never below one pixel.
    pub fn size_at(&self, pressure: f32, jitter: &DabJitter) -> f32 {
        (self.style.size * pressure.clamp(0.0, 1.0) * jitter.size_factor).max(1.0)
    }

    /// Pixel bounds a dab of diameter `size` at `center` may touch.
    pub fn footprint(center: Vec2, size: f32) -> Rect {
        let r = size / 2.0 + 1.0;
        Rect::new(
            (center.x - r).floor() as i32,
            (center.y - r).floor() as i32,
            (center.x + r).ceil() as i32 + 1,
            (center.y + r).ceil() as i32 + 1,
        )
    }

    /// Shape coverage times falloff at pixel (x, y), in 0..1.
    fn coverage(&self, x: i32, y: i32, center: Vec2, size: f32) -> f32 {
        let r = size / 2.0;
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;
        let dx = px - center.x;
        let dy = py - center.y;

        if self.style.aliased {
            // Pixel containing the center is always painted, so a one-pixel pen never vanishes.
            if x == center.x.floor() as i32 && y == center.y.floor() as i32 {
                return 1.0;
            }
            let inside = match self.style.shape {
                BrushShape::Square => dx.abs().max(dy.abs()) <= r,
                _ => dx * dx + dy * dy <= r * r,
            };
            return if inside { 1.0 } else { 0.0 };
        }

        let d = match self.style.shape {
            BrushShape::Round => (dx * dx + dy * dy).sqrt(),
            BrushShape::Square => dx.abs().max(dy.abs()),
            BrushShape::Texture { .. } => {
                let u = (px - (center.x - r)) / size;
                let v = (py - (center.y - r)) / size;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    return 0.0;
                }
                return self.style.shape.texture_value(u, v);
            }
        };
        let edge = (r + 0.5 - d).clamp(0.0, 1.0);
        if edge <= 0.0 {
            return 0.0;
        }
        edge * self.falloff.sample((d / (r + 0.5)).min(1.0))
    }

    /// Stamp one dab of the style's color.
    pub fn dab(
        &self,
        target: &mut dyn RasterBuffer,
        center: Vec2,
        pressure: f32,
        jitter: &DabJitter,
        selection: Option<&Selection>,
    ) {
        let size = self.size_at(pressure, jitter);
        let center = center + jitter.offset;
        let strength = self.style.color.a
            * self.style.opacity
            * self.style.flow
            * pressure.clamp(0.0, 1.0)
            * jitter.opacity_factor;
        if strength <= 0.0 {
            return;
        }
        let bounds = Self::footprint(center, size).clamp_to(target.width(), target.height());
        for (x, y) in bounds.pixels() {
            let sel = selection_value(selection, x, y);
            if sel <= 0.0 {
                continue;
            }
            let cov = self.coverage(x, y, center, size);
            if cov <= 0.0 {
                continue;
            }
            let src = self.style.color.with_alpha(strength * cov * sel).to_pixel();
            if src.a == 0 {
                continue;
            }
            target.composite_pixel(x as u32, y as u32, src, self.style.op);
        }
    }

    /// Stamp one dab sampled from the layer's pre-stroke pixels at `offset`.
    pub fn clone_dab(
        &self,
        target: &mut JournaledRaster<'_>,
        center: Vec2,
        offset: Vec2,
        pressure: f32,
        selection: Option<&Selection>,
    ) {
        let size = self.size_at(pressure, &DabJitter::NONE);
        let strength = self.style.opacity * self.style.flow * pressure.clamp(0.0, 1.0);
        if strength <= 0.0 {
            return;
        }
        let (ox, oy) = (offset.x.round() as i32, offset.y.round() as i32);
        let bounds = Self::footprint(center, size).clamp_to(target.width(), target.height());
        for (x, y) in bounds.pixels() {
            let sel = selection_value(selection, x, y);
            if sel <= 0.0 {
                continue;
            }
            let cov = self.coverage(x, y, center, size);
            if cov <= 0.0 {
                continue;
            }
            let (sx, sy) = (x + ox, y + oy);
            if sx < 0 || sy < 0 {
                continue;
            }
            let source = target.original_pixel(sx as u32, sy as u32);
            if source.a == 0 {
                continue;
            }
            let scale = (strength * cov * sel * 255.0).round() as u32;
            target.composite_pixel(x as u32, y as u32, source.scale_alpha(scale), PaintOp::Over);
        }
    }
}

fn selection_value(selection: Option<&Selection>, x: i32, y: i32) -> f32 {
    selection.map_or(1.0, |s| s.value_at(x, y) as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::journal::StrokeJournal;
    use crate::canvas::raster::TiledRaster;
    use crate::utils::color::Pixel;

    fn style(size: f32) -> DabStyle {
        DabStyle {
            color: Color::rgba(255, 0, 0, 255),
            size,
            opacity: 1.0,
            flow: 1.0,
            hardness: 100.0,
            shape: BrushShape::Round,
            aliased: false,
            op: PaintOp::Over,
        }
    }

    fn painted(raster: &TiledRaster) -> usize {
        raster
            .read_block(raster.bounds())
            .iter()
            .filter(|p| p.a > 0)
            .count()
    }

    #[test]
    fn round_dab_is_roughly_circular() {
        let mut raster = TiledRaster::new(40, 40, 16);
        DabRenderer::new(style(10.0)).dab(&mut raster, Vec2::new(20.0, 20.0), 1.0, &DabJitter::NONE, None);
        let area = painted(&raster) as f32;
        let ideal = std::f32::consts::PI * 25.0;
        assert!((area - ideal).abs() < ideal * 0.35, "area {area}");
        assert_eq!(raster.pixel(20, 20), Pixel::from_rgba_premultiplied(255, 0, 0, 255));
        assert_eq!(raster.pixel(20, 30), Pixel::TRANSPARENT);
    }

    #[test]
    fn pressure_shrinks_but_never_erases_the_dab() {
        let mut raster = TiledRaster::new(40, 40, 16);
        DabRenderer::new(style(10.0)).dab(&mut raster, Vec2::new(20.5, 20.5), 0.01, &DabJitter::NONE, None);
        assert!(painted(&raster) >= 1);
    }

    #[test]
    fn aliased_dab_writes_opaque_pixels_only() {
        let mut raster = TiledRaster::new(16, 16, 8);
        let renderer = DabRenderer::new(DabStyle {
            aliased: true,
            ..style(3.0)
        });
        renderer.dab(&mut raster, Vec2::new(8.5, 8.5), 1.0, &DabJitter::NONE, None);
        let block = raster.read_block(raster.bounds());
        assert!(block.iter().all(|p| p.a == 0 || p.a == 255));
        assert_eq!(raster.pixel(8, 8).a, 255);
    }

    #[test]
    fn clone_dab_copies_from_offset() {
        let mut raster = TiledRaster::new(32, 32, 8);
        let blue = Pixel::from_rgba_premultiplied(0, 0, 255, 255);
        raster.fill(Rect::from_xywh(0, 0, 8, 8), blue);
        let mut journal = StrokeJournal::new();
        let mut target = JournaledRaster::new(&mut raster, &mut journal);
        DabRenderer::new(style(4.0)).clone_dab(&mut target, Vec2::new(20.0, 20.0), Vec2::new(-16.0, -16.0), 1.0, None);
        assert_eq!(raster.pixel(20, 20), blue);
    }
}
