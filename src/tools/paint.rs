//! Brush, eraser, pen and clone: tools that stamp dabs along the stroke path.

use crate::brush_engine::brush::{DabRenderer, DabStyle};
use crate::brush_engine::brush_options::{BrushDynamics, BrushShape, DabJitter};
use crate::brush_engine::stroke::StrokeInterpolator;
use crate::canvas::blend::PaintOp;
use crate::canvas::journal::JournaledRaster;
use crate::input::Sample;
use crate::tools::settings::ToolSettings;
use crate::tools::{StrokeSession, ToolContext, ToolKind, ToolOutcome};
use crate::utils::color::Color;

const ERASER_SPACING: f32 = 25.0;

fn setup(kind: ToolKind, settings: &ToolSettings) -> (DabRenderer, StrokeInterpolator, BrushDynamics) {
    match kind {
        ToolKind::Eraser => {
            let e = &settings.eraser;
            let style = DabStyle {
                color: Color::black(),
                size: e.size,
                opacity: e.opacity / 100.0,
                flow: 1.0,
                hardness: e.hardness,
                shape: BrushShape::Round,
                aliased: false,
                op: PaintOp::Erase,
            };
            (
                DabRenderer::new(style),
                StrokeInterpolator::spaced(e.size, ERASER_SPACING),
                BrushDynamics::default(),
            )
        }
        ToolKind::Pen => {
            let p = &settings.pen;
            let style = DabStyle {
                color: p.color,
                size: p.size,
                opacity: p.opacity / 100.0,
                flow: 1.0,
                hardness: 100.0,
                shape: BrushShape::Round,
                aliased: true,
                op: PaintOp::Over,
            };
            (
                DabRenderer::new(style),
                StrokeInterpolator::pixel_perfect(),
                BrushDynamics::default(),
            )
        }
        ToolKind::Clone => {
            let c = &settings.clone;
            let style = DabStyle {
                color: Color::black(),
                size: c.size,
                opacity: c.opacity / 100.0,
                flow: 1.0,
                hardness: c.hardness,
                shape: BrushShape::Round,
                aliased: false,
                op: PaintOp::Over,
            };
            (
                DabRenderer::new(style),
                StrokeInterpolator::spaced(c.size, c.spacing),
                BrushDynamics::default(),
            )
        }
        _ => {
            let b = &settings.brush;
            let style = DabStyle {
                color: b.color,
                size: b.size,
                opacity: b.opacity / 100.0,
                flow: b.flow / 100.0,
                hardness: b.hardness,
                shape: b.shape.clone(),
                aliased: false,
                op: PaintOp::Over,
            };
            (
                DabRenderer::new(style),
                StrokeInterpolator::spaced(b.size, b.spacing),
                b.dynamics,
            )
        }
    }
}

pub fn begin(session: &mut StrokeSession, ctx: &mut ToolContext<'_>, sample: Sample) {
    if session.kind == ToolKind::Clone {
        if session.modifiers.alt {
            log::debug!("clone source set to ({:.1}, {:.1})", sample.pos.x, sample.pos.y);
            *ctx.clone_source = Some(sample.pos);
            return;
        }
        let Some(source) = *ctx.clone_source else {
            log::warn!("clone stroke ignored: no source point set");
            return;
        };
        session.clone_offset = Some(source - sample.pos);
    }

    let (renderer, interpolator, dynamics) = setup(session.kind, ctx.settings);
    session.renderer = Some(renderer);
    session.interpolator = Some(interpolator);
    session.dynamics = dynamics;
    stamp(session, ctx, sample);
}

pub fn update(session: &mut StrokeSession, ctx: &mut ToolContext<'_>, sample: Sample) {
    stamp(session, ctx, sample);
}

pub fn end(session: &mut StrokeSession, _ctx: &mut ToolContext<'_>) -> ToolOutcome {
    if let Some(interpolator) = &session.interpolator {
        log::debug!(
            "{} stroke: {} samples, {} dabs",
            session.kind,
            session.samples.len(),
            interpolator.emitted()
        );
    }
    if session.journal.is_empty() {
        ToolOutcome::None
    } else {
        ToolOutcome::Raster
    }
}

/// Interpolate up to `sample` and stamp a dab at every produced position.
fn stamp(session: &mut StrokeSession, ctx: &mut ToolContext<'_>, sample: Sample) {
    let (Some(interpolator), Some(renderer)) =
        (session.interpolator.as_mut(), session.renderer.as_ref())
    else {
        return;
    };
    let Some(raster) = ctx.raster.as_deref_mut() else {
        return;
    };
    let positions = interpolator.add_sample(sample.pos, sample.pressure);
    let mut target = JournaledRaster::new(raster, &mut session.journal);
    for p in positions {
        match session.clone_offset {
            Some(offset) => {
                renderer.clone_dab(&mut target, p.pos, offset, p.pressure, ctx.selection)
            }
            None => {
                let jitter = if session.dynamics.is_static() {
                    DabJitter::NONE
                } else {
                    session.dynamics.sample(&mut *ctx.rng, renderer.style().size)
                };
                renderer.dab(&mut target, p.pos, p.pressure, &jitter, ctx.selection);
            }
        }
    }
}
