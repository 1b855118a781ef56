//! Linear gradient, applied once on release.

use crate::canvas::blend::PaintOp;
use crate::canvas::journal::JournaledRaster;
use crate::canvas::raster::RasterBuffer;
use crate::input::Sample;
use crate::tools::{StrokeSession, ToolContext, ToolOutcome};
use crate::utils::profiler::ScopeTimer;
use crate::utils::rect::Rect;
use crate::utils::vector::Vec2;

pub fn begin(session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, sample: Sample) {
    session.anchor = Some(sample.pos);
}

pub fn update(_session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, _sample: Sample) {}

pub fn end(session: &mut StrokeSession, ctx: &mut ToolContext<'_>) -> ToolOutcome {
    let (Some(start), Some(end)) = (session.anchor, session.last_pos()) else {
        return ToolOutcome::None;
    };
    let dir = end - start;
    let len_sq = dir.dot(dir);
    if len_sq <= f32::EPSILON {
        return ToolOutcome::None;
    }
    let Some(raster) = ctx.raster.as_deref_mut() else {
        return ToolOutcome::None;
    };

    let _timer = ScopeTimer::new("gradient");
    let settings = &ctx.settings.gradient;
    let opacity = settings.opacity / 100.0;
    let area = match ctx.selection {
        Some(sel) => sel.bounds(),
        None => Rect::new(0, 0, ctx.width as i32, ctx.height as i32),
    };
    let mut target = JournaledRaster::new(raster, &mut session.journal);
    for (x, y) in area.clamp_to(ctx.width, ctx.height).pixels() {
        let coverage = ctx.selection.map_or(1.0, |s| s.value_at(x, y) as f32 / 255.0);
        if coverage <= 0.0 {
            continue;
        }
        let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        let t = (p - start).dot(dir) / len_sq;
        let color = settings.start_color.lerp(settings.end_color, t);
        let src = color.with_alpha(color.a * opacity * coverage).to_pixel();
        target.composite_pixel(x as u32, y as u32, src, PaintOp::Over);
    }

    if session.journal.is_empty() {
        ToolOutcome::None
    } else {
        ToolOutcome::Raster
    }
}
