use serde::{Deserialize, Serialize};

use crate::brush_engine::brush_options::{BrushDynamics, BrushShape};
use crate::selection::MAX_FEATHER;
use crate::utils::color::Color;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Diameter in pixels, 1..=1000.
    pub size: f32,
    /// Percent, 1..=100.
    pub opacity: f32,
    /// Percent, 1..=100.
    pub flow: f32,
    /// Percent, 0..=100.
    pub hardness: f32,
    /// Percent of size between dabs, 1..=1000.
    pub spacing: f32,
    pub shape: BrushShape,
    pub color: Color,
    pub dynamics: BrushDynamics,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 10.0,
            opacity: 100.0,
            flow: 100.0,
            hardness: 100.0,
            spacing: 25.0,
            shape: BrushShape::Round,
            color: Color::black(),
            dynamics: BrushDynamics::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EraserSettings {
    pub size: f32,
    pub opacity: f32,
    pub hardness: f32,
}

impl Default for EraserSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            opacity: 100.0,
            hardness: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenSettings {
    pub size: f32,
    pub opacity: f32,
    pub color: Color,
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            size: 1.0,
            opacity: 100.0,
            color: Color::black(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneSettings {
    pub size: f32,
    pub opacity: f32,
    pub hardness: f32,
    pub spacing: f32,
}

impl Default for CloneSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            opacity: 100.0,
            hardness: 80.0,
            spacing: 25.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub feather: f32,
    pub anti_alias: bool,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            feather: 0.0,
            anti_alias: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientSettings {
    pub start_color: Color,
    pub end_color: Color,
    pub opacity: f32,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            start_color: Color::black(),
            end_color: Color::white(),
            opacity: 100.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Ellipse,
    Line,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSettings {
    pub kind: ShapeKind,
    pub filled: bool,
    pub line_width: f32,
    pub color: Color,
    pub opacity: f32,
}

impl Default for ShapeSettings {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            filled: false,
            line_width: 2.0,
            color: Color::black(),
            opacity: 100.0,
        }
    }
}

/// Settings for every tool, kept across tool switches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub brush: BrushSettings,
    pub eraser: EraserSettings,
    pub pen: PenSettings,
    pub clone: CloneSettings,
    pub selection: SelectionSettings,
    pub gradient: GradientSettings,
    pub shape: ShapeSettings,
}

fn clamp_pct(v: f32, min: f32) -> f32 {
    if v.is_nan() { 100.0 } else { v.clamp(min, 100.0) }
}

fn clamp_size(v: f32) -> f32 {
    if v.is_nan() { 1.0 } else { v.clamp(1.0, 1000.0) }
}

fn clamp_color(c: Color) -> Color {
    Color {
        r: c.r.clamp(0.0, 1.0),
        g: c.g.clamp(0.0, 1.0),
        b: c.b.clamp(0.0, 1.0),
        a: c.a.clamp(0.0, 1.0),
    }
}

impl ToolSettings {
    /// Pull every value back into its valid range.
    pub fn sanitize(&mut self) {
        let b = &mut self.brush;
        b.size = clamp_size(b.size);
        b.opacity = clamp_pct(b.opacity, 1.0);
        b.flow = clamp_pct(b.flow, 1.0);
        b.hardness = clamp_pct(b.hardness, 0.0);
        b.spacing = if b.spacing.is_nan() { 25.0 } else { b.spacing.clamp(1.0, 1000.0) };
        b.color = clamp_color(b.color);
        b.dynamics.sanitize();

        let e = &mut self.eraser;
        e.size = clamp_size(e.size);
        e.opacity = clamp_pct(e.opacity, 1.0);
        e.hardness = clamp_pct(e.hardness, 0.0);

        let p = &mut self.pen;
        p.size = clamp_size(p.size);
        p.opacity = clamp_pct(p.opacity, 1.0);
        p.color = clamp_color(p.color);

        let c = &mut self.clone;
        c.size = clamp_size(c.size);
        c.opacity = clamp_pct(c.opacity, 1.0);
        c.hardness = clamp_pct(c.hardness, 0.0);
        c.spacing = if c.spacing.is_nan() { 25.0 } else { c.spacing.clamp(1.0, 1000.0) };

        let s = &mut self.selection;
        s.feather = if s.feather.is_nan() { 0.0 } else { s.feather.clamp(0.0, MAX_FEATHER) };

        let g = &mut self.gradient;
        g.opacity = clamp_pct(g.opacity, 1.0);
        g.start_color = clamp_color(g.start_color);
        g.end_color = clamp_color(g.end_color);

        let sh = &mut self.shape;
        sh.line_width = clamp_size(sh.line_width);
        sh.opacity = clamp_pct(sh.opacity, 1.0);
        sh.color = clamp_color(sh.color);
    }
}
