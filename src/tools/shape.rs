//! Rectangle, ellipse and line primitives with a live preview.
//!
//! Every update restores the journaled pre-stroke tiles and redraws the
//! primitive from the anchor to the current pointer position.

use crate::canvas::blend::PaintOp;
use crate::canvas::journal::JournaledRaster;
use crate::canvas::raster::RasterBuffer;
use crate::input::Sample;
use crate::selection::Selection;
use crate::tools::settings::{ShapeKind, ShapeSettings};
use crate::tools::{StrokeSession, ToolContext, ToolOutcome};
use crate::utils::color::Pixel;
use crate::utils::rect::Rect;
use crate::utils::vector::Vec2;

pub fn begin(session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, sample: Sample) {
    session.anchor = Some(sample.pos);
}

pub fn update(session: &mut StrokeSession, ctx: &mut ToolContext<'_>, sample: Sample) {
    let Some(anchor) = session.anchor else {
        return;
    };
    let Some(raster) = ctx.raster.as_deref_mut() else {
        return;
    };
    let mut target = JournaledRaster::new(raster, &mut session.journal);
    target.restore();
    draw(&mut target, &ctx.settings.shape, anchor, sample.pos, ctx.selection);
}

pub fn end(session: &mut StrokeSession, _ctx: &mut ToolContext<'_>) -> ToolOutcome {
    if session.journal.is_empty() {
        ToolOutcome::None
    } else {
        ToolOutcome::Raster
    }
}

fn draw(
    target: &mut dyn RasterBuffer,
    settings: &ShapeSettings,
    from: Vec2,
    to: Vec2,
    selection: Option<&Selection>,
) {
    let color = settings.color;
    let src = color.with_alpha(color.a * settings.opacity / 100.0).to_pixel();
    if src.a == 0 {
        return;
    }
    let weight = |x: u32, y: u32| selection.map_or(1.0, |s| s.value_at(x as i32, y as i32) as f32 / 255.0);
    let width = settings.line_width;

    match settings.kind {
        ShapeKind::Line => target.draw_segment(from, to, width, src, PaintOp::Over, &weight),
        ShapeKind::Rectangle => {
            let min = Vec2::new(from.x.min(to.x), from.y.min(to.y));
            let max = Vec2::new(from.x.max(to.x), from.y.max(to.y));
            if settings.filled {
                let rect = Rect::new(
                    min.x.round() as i32,
                    min.y.round() as i32,
                    max.x.round() as i32,
                    max.y.round() as i32,
                );
                fill_where(target, rect, src, &weight, |_| true);
            } else {
                let corners = [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)];
                for i in 0..4 {
                    target.draw_segment(corners[i], corners[(i + 1) % 4], width, src, PaintOp::Over, &weight);
                }
            }
        }
        ShapeKind::Ellipse => {
            let center = (from + to) / 2.0;
            let rx = (to.x - from.x).abs() / 2.0;
            let ry = (to.y - from.y).abs() / 2.0;
            if rx <= 0.0 || ry <= 0.0 {
                return;
            }
            let half = if settings.filled { 0.0 } else { width / 2.0 };
            let bounds = Rect::new(
                (center.x - rx - half).floor() as i32,
                (center.y - ry - half).floor() as i32,
                (center.x + rx + half).ceil() as i32 + 1,
                (center.y + ry + half).ceil() as i32 + 1,
            );
            let filled = settings.filled;
            fill_where(target, bounds, src, &weight, |p| {
                let n = Vec2::new((p.x - center.x) / rx, (p.y - center.y) / ry);
                let r = n.length();
                if filled {
                    r <= 1.0
                } else {
                    // Approximate distance to the outline along the radial direction.
                    ((r - 1.0) * rx.min(ry)).abs() <= half
                }
            });
        }
    }
}

fn fill_where(
    target: &mut dyn RasterBuffer,
    rect: Rect,
    src: Pixel,
    weight: &dyn Fn(u32, u32) -> f32,
    inside: impl Fn(Vec2) -> bool,
) {
    for (x, y) in rect.clamp_to(target.width(), target.height()).pixels() {
        if !inside(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
            continue;
        }
        let w = weight(x as u32, y as u32);
        if w <= 0.0 {
            continue;
        }
        let scaled = src.scale_alpha((w.min(1.0) * 255.0).round() as u32);
        target.composite_pixel(x as u32, y as u32, scaled, PaintOp::Over);
    }
}
