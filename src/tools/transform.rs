//! Move tool: translates the selected (or all non-transparent) pixels of the
//! active layer by the drag offset when the pointer is released. Pixels that
//! land outside the selection are dropped.

use crate::canvas::blend::PaintOp;
use crate::canvas::journal::JournaledRaster;
use crate::canvas::raster::RasterBuffer;
use crate::input::Sample;
use crate::tools::{StrokeSession, ToolContext, ToolOutcome};
use crate::utils::color::Pixel;

pub fn begin(session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, sample: Sample) {
    session.anchor = Some(sample.pos);
}

pub fn update(_session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, _sample: Sample) {}

pub fn end(session: &mut StrokeSession, ctx: &mut ToolContext<'_>) -> ToolOutcome {
    let (Some(start), Some(end)) = (session.anchor, session.last_pos()) else {
        return ToolOutcome::None;
    };
    let offset = (end - start).round();
    let (dx, dy) = (offset.x as i32, offset.y as i32);
    if dx == 0 && dy == 0 {
        return ToolOutcome::None;
    }
    let Some(raster) = ctx.raster.as_deref_mut() else {
        return ToolOutcome::None;
    };

    let source = match ctx.selection {
        Some(sel) => sel.bounds().intersect(&raster.content_bounds()),
        None => raster.content_bounds(),
    };
    if source.is_empty() {
        return ToolOutcome::None;
    }

    // Lift the moving pixels, weighted by selection coverage.
    let mut lifted: Vec<(i32, i32, Pixel, u8)> = Vec::with_capacity(source.area());
    for (x, y) in source.pixels() {
        let px = raster.pixel(x as u32, y as u32);
        if px.a == 0 {
            continue;
        }
        let coverage = ctx.selection.map_or(255, |s| s.value_at(x, y));
        if coverage == 0 {
            continue;
        }
        lifted.push((x, y, px.scale_alpha(coverage as u32), coverage));
    }

    let mut target = JournaledRaster::new(raster, &mut session.journal);
    for &(x, y, _, coverage) in &lifted {
        // What stays behind is the uncovered share of the pixel.
        let cut = Pixel::from_rgba_premultiplied(0, 0, 0, coverage);
        target.composite_pixel(x as u32, y as u32, cut, PaintOp::Erase);
    }
    for &(x, y, px, _) in &lifted {
        let (tx, ty) = (x + dx, y + dy);
        if tx < 0 || ty < 0 {
            continue;
        }
        // Drops are clipped to the selection like any other write.
        let coverage = ctx.selection.map_or(255, |s| s.value_at(tx, ty));
        if coverage == 0 {
            continue;
        }
        target.composite_pixel(
            tx as u32,
            ty as u32,
            px.scale_alpha(coverage as u32),
            PaintOp::Over,
        );
    }

    if session.journal.is_empty() {
        ToolOutcome::None
    } else {
        ToolOutcome::Raster
    }
}
