//! Rectangle and lasso selection.

use crate::input::{Modifiers, Sample};
use crate::selection::{CombineOp, Selection, SelectionRegion, SelectionShape};
use crate::tools::{StrokeSession, ToolContext, ToolKind, ToolOutcome};
use crate::utils::vector::{Vec2, distance};

/// Minimum distance between consecutive lasso points.
const LASSO_MIN_STEP: f32 = 2.0;

/// Shift adds, Alt subtracts, both intersect; no modifier replaces.
pub fn combine_op(modifiers: Modifiers) -> Option<CombineOp> {
    match (modifiers.shift, modifiers.alt) {
        (true, true) => Some(CombineOp::Intersect),
        (true, false) => Some(CombineOp::Add),
        (false, true) => Some(CombineOp::Subtract),
        (false, false) => None,
    }
}

pub fn begin(session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, sample: Sample) {
    session.anchor = Some(sample.pos);
}

pub fn update(_session: &mut StrokeSession, _ctx: &mut ToolContext<'_>, _sample: Sample) {}

pub fn end(session: &mut StrokeSession, ctx: &mut ToolContext<'_>) -> ToolOutcome {
    let Some(anchor) = session.anchor else {
        return ToolOutcome::None;
    };
    let shape = match session.kind {
        ToolKind::LassoSelect => SelectionShape::Lasso {
            points: lasso_points(&session.samples),
        },
        _ => SelectionShape::rect_from_drag(anchor, session.last_pos().unwrap_or(anchor)),
    };
    let op = combine_op(session.modifiers);

    if shape.is_degenerate() {
        // A click without a drag clears the selection in replace mode only.
        return match (op, ctx.selection) {
            (None, Some(_)) => ToolOutcome::Selection(None),
            _ => ToolOutcome::None,
        };
    }

    let region = SelectionRegion {
        shape,
        feather: ctx.settings.selection.feather,
        anti_alias: ctx.settings.selection.anti_alias,
    };
    let selection = match op {
        None => Selection::from_region(ctx.width, ctx.height, region),
        Some(op) => Selection::combine_region(ctx.selection, ctx.width, ctx.height, op, region),
    };
    ToolOutcome::Selection(Some(selection))
}

fn lasso_points(samples: &[Sample]) -> Vec<Vec2> {
    let mut points: Vec<Vec2> = Vec::with_capacity(samples.len());
    for sample in samples {
        match points.last() {
            Some(last) if distance(*last, sample.pos) <= LASSO_MIN_STEP => {}
            _ => points.push(sample.pos),
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_pick_combine_op() {
        assert_eq!(combine_op(Modifiers::NONE), None);
        assert_eq!(combine_op(Modifiers::shift()), Some(CombineOp::Add));
        assert_eq!(combine_op(Modifiers::alt()), Some(CombineOp::Subtract));
        let both = Modifiers {
            shift: true,
            alt: true,
            ctrl: false,
        };
        assert_eq!(combine_op(both), Some(CombineOp::Intersect));
    }

    #[test]
    fn lasso_drops_near_duplicate_points() {
        let samples: Vec<Sample> = [0.0, 0.5, 1.0, 3.5, 3.6, 8.0]
            .iter()
            .map(|x| Sample::new(Vec2::new(*x, 0.0), None, 0))
            .collect();
        let xs: Vec<f32> = lasso_points(&samples).iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 3.5, 8.0]);
    }
}
