use serde::{Deserialize, Serialize};

use crate::utils::rect::Rect;
use crate::utils::vector::Vec2;

/// Largest feather radius, in pixels, a region is rasterized with.
pub const MAX_FEATHER: f32 = 250.0;

fn clamp_feather(feather: f32) -> f32 {
    if feather.is_nan() {
        0.0
    } else {
        feather.clamp(0.0, MAX_FEATHER)
    }
}

/// Geometry of one selection region in canvas coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SelectionShape {
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Ellipse {
        center: Vec2,
        radius_x: f32,
        radius_y: f32,
    },
    Lasso {
        points: Vec<Vec2>,
    },
}

impl SelectionShape {
    /// Rectangle spanned by two drag corners, in any order.
    pub fn rect_from_drag(start: Vec2, end: Vec2) -> Self {
        SelectionShape::Rectangle {
            x: start.x.min(end.x),
            y: start.y.min(end.y),
            width: (end.x - start.x).abs(),
            height: (end.y - start.y).abs(),
        }
    }

    /// Every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        match self {
            SelectionShape::Rectangle {
                x,
                y,
                width,
                height,
            } => [x, y, width, height].iter().all(|v| v.is_finite()),
            SelectionShape::Ellipse {
                center,
                radius_x,
                radius_y,
            } => [&center.x, &center.y, radius_x, radius_y]
                .iter()
                .all(|v| v.is_finite()),
            SelectionShape::Lasso { points } => {
                points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
            }
        }
    }

    /// True when the shape encloses no area.
    pub fn is_degenerate(&self) -> bool {
        match self {
            SelectionShape::Rectangle { width, height, .. } => *width <= 0.0 || *height <= 0.0,
            SelectionShape::Ellipse {
                radius_x, radius_y, ..
            } => *radius_x <= 0.0 || *radius_y <= 0.0,
            SelectionShape::Lasso { points } => points.len() < 3 || polygon_area(points) == 0.0,
        }
    }

    /// Pixel bounds (not clamped to the canvas).
    pub fn bounds(&self) -> Rect {
        let (min, max) = match self {
            SelectionShape::Rectangle {
                x,
                y,
                width,
                height,
            } => (Vec2::new(*x, *y), Vec2::new(x + width, y + height)),
            SelectionShape::Ellipse {
                center,
                radius_x,
                radius_y,
            } => (
                Vec2::new(center.x - radius_x, center.y - radius_y),
                Vec2::new(center.x + radius_x, center.y + radius_y),
            ),
            SelectionShape::Lasso { points } => {
                if points.is_empty() {
                    return Rect::empty();
                }
                points.iter().fold(
                    (Vec2::new(f32::MAX, f32::MAX), Vec2::new(f32::MIN, f32::MIN)),
                    |(lo, hi), p| {
                        (
                            Vec2::new(lo.x.min(p.x), lo.y.min(p.y)),
                            Vec2::new(hi.x.max(p.x), hi.y.max(p.y)),
                        )
                    },
                )
            }
        };
        Rect::new(
            min.x.floor() as i32,
            min.y.floor() as i32,
            max.x.ceil() as i32,
            max.y.ceil() as i32,
        )
    }

    /// Point-in-shape test; lassos use the even-odd rule.
    pub fn contains_point(&self, p: Vec2) -> bool {
        match self {
            SelectionShape::Rectangle {
                x,
                y,
                width,
                height,
            } => p.x >= *x && p.x < x + width && p.y >= *y && p.y < y + height,
            SelectionShape::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                if *radius_x <= 0.0 || *radius_y <= 0.0 {
                    return false;
                }
                let nx = (p.x - center.x) / radius_x;
                let ny = (p.y - center.y) / radius_y;
                nx * nx + ny * ny <= 1.0
            }
            SelectionShape::Lasso { points } => {
                if points.len() < 3 {
                    return false;
                }
                let mut inside = false;
                let mut j = points.len() - 1;
                for i in 0..points.len() {
                    let (a, b) = (points[i], points[j]);
                    if (a.y > p.y) != (b.y > p.y)
                        && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }
}

fn polygon_area(points: &[Vec2]) -> f32 {
    let mut sum = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum / 2.0).abs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    Add,
    Subtract,
    Intersect,
}

impl CombineOp {
    #[inline]
    fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            CombineOp::Add => a.max(b),
            CombineOp::Subtract => ((a as u32 * (255 - b as u32) + 127) / 255) as u8,
            CombineOp::Intersect => a.min(b),
        }
    }
}

/// A shape plus the edge treatment used when rasterizing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionRegion {
    pub shape: SelectionShape,
    /// Edge softening radius in pixels.
    #[serde(default)]
    pub feather: f32,
    #[serde(default = "default_anti_alias")]
    pub anti_alias: bool,
}

fn default_anti_alias() -> bool {
    true
}

impl SelectionRegion {
    pub fn new(shape: SelectionShape) -> Self {
        Self {
            shape,
            feather: 0.0,
            anti_alias: true,
        }
    }

    /// Hard-edged region, useful when exact pixel membership matters.
    pub fn aliased(shape: SelectionShape) -> Self {
        Self {
            shape,
            feather: 0.0,
            anti_alias: false,
        }
    }

    /// Set the feather radius, clamped to `0..=MAX_FEATHER`.
    pub fn with_feather(self, feather: f32) -> Self {
        Self {
            feather: clamp_feather(feather),
            ..self
        }
    }

    /// Reject regions that could not have come from the editor.
    pub fn validate(&self) -> Result<(), String> {
        if !self.shape.is_finite() {
            return Err("shape has non-finite coordinates".into());
        }
        if !(0.0..=MAX_FEATHER).contains(&self.feather) {
            return Err(format!("feather {} outside 0..={MAX_FEATHER}", self.feather));
        }
        Ok(())
    }

    /// Rasterize into a full-canvas coverage mask.
    pub fn rasterize(&self, width: u32, height: u32) -> Vec<u8> {
        let mut mask = vec![0u8; width as usize * height as usize];
        let area = self.shape.bounds().inflate(1).clamp_to(width, height);
        for (x, y) in area.pixels() {
            let value = if self.anti_alias {
                let mut hits = 0u32;
                for sy in 0..4 {
                    for sx in 0..4 {
                        let p = Vec2::new(
                            x as f32 + (sx as f32 + 0.5) / 4.0,
                            y as f32 + (sy as f32 + 0.5) / 4.0,
                        );
                        if self.shape.contains_point(p) {
                            hits += 1;
                        }
                    }
                }
                ((hits * 255 + 8) / 16) as u8
            } else if self.shape.contains_point(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                255
            } else {
                0
            };
            mask[y as usize * width as usize + x as usize] = value;
        }
        let radius = clamp_feather(self.feather).round() as usize;
        if radius > 0 {
            box_blur(&mut mask, width as usize, height as usize, radius);
        }
        mask
    }
}

/// Separable box blur, horizontal pass then vertical, edges clamped.
fn box_blur(mask: &mut [u8], width: usize, height: usize, radius: usize) {
    let window = (2 * radius + 1) as u32;
    let mut scratch = vec![0u8; mask.len()];
    let blur_line = |src: &[u8], dst: &mut [u8], len: usize, stride: usize, start: usize| {
        let at = |i: isize| src[start + i.clamp(0, len as isize - 1) as usize * stride] as u32;
        let mut sum: u32 = (-(radius as isize)..=radius as isize).map(at).sum();
        for i in 0..len {
            dst[start + i * stride] = ((sum + window / 2) / window) as u8;
            sum += at(i as isize + radius as isize + 1);
            sum -= at(i as isize - radius as isize);
        }
    };
    for y in 0..height {
        blur_line(mask, &mut scratch, width, 1, y * width);
    }
    for x in 0..width {
        blur_line(&scratch, mask, height, width, x);
    }
}

/// One step in the construction of a selection, kept so it can be persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOp {
    All,
    Replace(SelectionRegion),
    Combine { op: CombineOp, region: SelectionRegion },
    /// Combine with a whole selection, itself described by its ops.
    Merge { op: CombineOp, ops: Vec<SelectionOp> },
}

impl SelectionOp {
    /// Check every region this op (and any nested op) carries.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SelectionOp::All => Ok(()),
            SelectionOp::Replace(region) | SelectionOp::Combine { region, .. } => region.validate(),
            SelectionOp::Merge { ops, .. } => {
                if ops.is_empty() {
                    return Err("merge with an empty selection".into());
                }
                ops.iter().try_for_each(SelectionOp::validate)
            }
        }
    }
}

/// Rasterized selection mask, one coverage byte per canvas pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    width: u32,
    height: u32,
    mask: Vec<u8>,
    ops: Vec<SelectionOp>,
}

impl Selection {
    pub fn from_region(width: u32, height: u32, region: SelectionRegion) -> Self {
        let mask = region.rasterize(width, height);
        Self {
            width,
            height,
            mask,
            ops: vec![SelectionOp::Replace(region)],
        }
    }

    /// Every pixel fully selected.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mask: vec![255; width as usize * height as usize],
            ops: vec![SelectionOp::All],
        }
    }

    /// Combine a region into an optional selection; no selection counts as
    /// the full canvas.
    pub fn combine_region(
        current: Option<&Selection>,
        width: u32,
        height: u32,
        op: CombineOp,
        region: SelectionRegion,
    ) -> Selection {
        let base = match current {
            Some(sel) => sel.clone(),
            None => Selection::full(width, height),
        };
        let other = region.rasterize(width, height);
        let mut out = base.combine_mask(op, &other);
        out.ops.push(SelectionOp::Combine { op, region });
        out
    }

    /// Rebuild a selection from its recorded ops. Returns `None` for an empty op list.
    pub fn from_ops(width: u32, height: u32, ops: &[SelectionOp]) -> Option<Selection> {
        let mut current: Option<Selection> = None;
        for op in ops {
            current = Some(match op {
                SelectionOp::All => Selection::full(width, height),
                SelectionOp::Replace(region) => Selection::from_region(width, height, region.clone()),
                SelectionOp::Combine { op, region } => {
                    Selection::combine_region(current.as_ref(), width, height, *op, region.clone())
                }
                SelectionOp::Merge { op, ops } => {
                    let base = current.unwrap_or_else(|| Selection::full(width, height));
                    let other = Selection::from_ops(width, height, ops)
                        .unwrap_or_else(|| Selection::full(width, height));
                    base.combine(*op, &other)
                }
            });
        }
        current
    }

    /// Mask-level combination of two selections of the same size.
    pub fn combine(&self, op: CombineOp, other: &Selection) -> Selection {
        let mut out = self.combine_mask(op, &other.mask);
        match other.ops.as_slice() {
            [SelectionOp::Replace(region)] => out.ops.push(SelectionOp::Combine {
                op,
                region: region.clone(),
            }),
            ops => out.ops.push(SelectionOp::Merge {
                op,
                ops: ops.to_vec(),
            }),
        }
        out
    }

    fn combine_mask(&self, op: CombineOp, other: &[u8]) -> Selection {
        let mask = self
            .mask
            .iter()
            .zip(other.iter().chain(std::iter::repeat(&0)))
            .map(|(a, b)| op.apply(*a, *b))
            .collect();
        Selection {
            width: self.width,
            height: self.height,
            mask,
            ops: self.ops.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    pub fn ops(&self) -> &[SelectionOp] {
        &self.ops
    }

    /// Coverage at (x, y); zero outside the canvas.
    #[inline]
    pub fn value_at(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return 0;
        }
        self.mask[y as usize * self.width as usize + x as usize]
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.value_at(x, y) > 0
    }

    /// Bounding box of every selected pixel.
    pub fn bounds(&self) -> Rect {
        let mut bounds = Rect::empty();
        for (i, v) in self.mask.iter().enumerate() {
            if *v > 0 {
                let x = (i % self.width as usize) as i32;
                let y = (i / self.width as usize) as i32;
                bounds.include(x, y);
            }
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.mask.iter().all(|v| *v == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Selection {
        Selection::from_region(
            32,
            32,
            SelectionRegion::aliased(SelectionShape::Rectangle {
                x,
                y,
                width: w,
                height: h,
            }),
        )
    }

    #[test]
    fn rectangle_mask_is_exact_without_anti_alias() {
        let sel = rect(2.0, 3.0, 4.0, 5.0);
        assert_eq!(sel.bounds(), Rect::from_xywh(2, 3, 4, 5));
        assert_eq!(sel.value_at(2, 3), 255);
        assert_eq!(sel.value_at(6, 3), 0);
        assert_eq!(sel.value_at(-1, 3), 0);
    }

    #[test]
    fn anti_aliased_edges_are_partial() {
        let sel = Selection::from_region(
            16,
            16,
            SelectionRegion::new(SelectionShape::Rectangle {
                x: 2.5,
                y: 2.0,
                width: 4.0,
                height: 4.0,
            }),
        );
        assert_eq!(sel.value_at(3, 3), 255);
        let edge = sel.value_at(2, 3);
        assert!(edge > 0 && edge < 255);
    }

    #[test]
    fn intersect_distributes_over_add() {
        let a = rect(0.0, 0.0, 20.0, 20.0);
        let b = rect(10.0, 0.0, 20.0, 10.0);
        let c = rect(0.0, 15.0, 30.0, 10.0);
        let left = a.combine(CombineOp::Intersect, &b.combine(CombineOp::Add, &c));
        let right = a
            .combine(CombineOp::Intersect, &b)
            .combine(CombineOp::Add, &a.combine(CombineOp::Intersect, &c));
        assert_eq!(left.mask(), right.mask());
    }

    #[test]
    fn subtract_then_add_is_not_identity() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 10.0, 10.0);
        let round_trip = a.combine(CombineOp::Subtract, &b).combine(CombineOp::Add, &b);
        assert_ne!(round_trip.mask(), a.mask());
        assert!(round_trip.contains(12, 12));
    }

    #[test]
    fn ellipse_and_lasso_contain_their_centers() {
        let ellipse = SelectionShape::Ellipse {
            center: Vec2::new(10.0, 10.0),
            radius_x: 5.0,
            radius_y: 3.0,
        };
        assert!(ellipse.contains_point(Vec2::new(10.0, 10.0)));
        assert!(!ellipse.contains_point(Vec2::new(10.0, 14.0)));

        let lasso = SelectionShape::Lasso {
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)],
        };
        assert!(lasso.contains_point(Vec2::new(2.0, 2.0)));
        assert!(!lasso.contains_point(Vec2::new(8.0, 8.0)));
        assert!(SelectionShape::Lasso { points: vec![Vec2::ZERO; 2] }.is_degenerate());
    }

    #[test]
    fn feather_softens_edges() {
        let sharp = rect(8.0, 8.0, 16.0, 16.0);
        let soft = Selection::from_region(
            32,
            32,
            SelectionRegion::aliased(SelectionShape::Rectangle {
                x: 8.0,
                y: 8.0,
                width: 16.0,
                height: 16.0,
            })
            .with_feather(2.0),
        );
        assert_eq!(sharp.value_at(7, 16), 0);
        assert!(soft.value_at(7, 16) > 0);
        assert!(soft.value_at(8, 16) < 255);
        assert_eq!(soft.value_at(16, 16), 255);
    }

    #[test]
    fn ops_rebuild_the_same_mask() {
        let mut sel = rect(0.0, 0.0, 10.0, 10.0);
        sel = Selection::combine_region(
            Some(&sel),
            32,
            32,
            CombineOp::Subtract,
            SelectionRegion::aliased(SelectionShape::Rectangle {
                x: 4.0,
                y: 4.0,
                width: 2.0,
                height: 2.0,
            }),
        );
        let rebuilt = Selection::from_ops(32, 32, sel.ops()).unwrap();
        assert_eq!(rebuilt, sel);
    }

    #[test]
    fn composed_selections_replay_through_ops() {
        let a = rect(0.0, 0.0, 20.0, 20.0);
        let b = rect(4.0, 4.0, 12.0, 12.0).combine(CombineOp::Intersect, &rect(8.0, 0.0, 24.0, 32.0));
        let out = a.combine(CombineOp::Subtract, &b);
        assert!(!out.contains(10, 10));
        assert!(out.contains(5, 5));
        assert_eq!(Selection::from_ops(32, 32, out.ops()).unwrap(), out);

        let widened = a.combine(CombineOp::Add, &Selection::full(32, 32));
        assert_eq!(Selection::from_ops(32, 32, widened.ops()).unwrap(), widened);
    }

    #[test]
    fn feather_is_clamped() {
        let shape = SelectionShape::Rectangle {
            x: 2.0,
            y: 2.0,
            width: 4.0,
            height: 4.0,
        };
        let region = SelectionRegion::new(shape.clone());
        assert_eq!(region.clone().with_feather(f32::INFINITY).feather, MAX_FEATHER);
        assert_eq!(region.clone().with_feather(f32::NAN).feather, 0.0);

        // A raw out-of-range value is clamped when rasterizing too.
        let raw = SelectionRegion {
            feather: f32::INFINITY,
            ..region
        };
        assert!(raw.validate().is_err());
        let mask = raw.rasterize(8, 8);
        assert_eq!(mask.len(), 64);
    }

    #[test]
    fn non_finite_shapes_fail_validation() {
        let op = SelectionOp::Merge {
            op: CombineOp::Add,
            ops: vec![SelectionOp::Replace(SelectionRegion::new(SelectionShape::Ellipse {
                center: Vec2::new(f32::NAN, 1.0),
                radius_x: 2.0,
                radius_y: 2.0,
            }))],
        };
        assert!(op.validate().is_err());
        assert!(SelectionOp::All.validate().is_ok());
    }
}
