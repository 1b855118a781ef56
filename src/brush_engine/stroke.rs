use crate::utils::vector::{Vec2, distance};

/// A point where the renderer stamps one dab.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintPosition {
    pub pos: Vec2,
    pub pressure: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum StepMode {
    /// Evenly spaced positions, `step` pixels apart at most.
    Spaced { step: f32 },
    /// Bresenham stepping through pixel centers, no gaps or doubled pixels.
    PixelPerfect,
}

/// Turns raw pointer samples into evenly spaced paint positions.
#[derive(Clone, Debug)]
pub struct StrokeInterpolator {
    mode: StepMode,
    last: Option<PaintPosition>,
    emitted: usize,
}

impl StrokeInterpolator {
    /// Spacing is a percentage of `size`; the step never drops below one pixel.
    pub fn spaced(size: f32, spacing: f32) -> Self {
        let step = (size * spacing / 100.0).max(1.0);
        Self {
            mode: StepMode::Spaced { step },
            last: None,
            emitted: 0,
        }
    }

    pub fn pixel_perfect() -> Self {
        Self {
            mode: StepMode::PixelPerfect,
            last: None,
            emitted: 0,
        }
    }

    /// Distance between consecutive positions; 1 for pixel-perfect stepping.
    pub fn step(&self) -> f32 {
        match self.mode {
            StepMode::Spaced { step } => step,
            StepMode::PixelPerfect => 1.0,
        }
    }

    pub fn last(&self) -> Option<PaintPosition> {
        self.last
    }

    /// Total positions produced so far in this stroke.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Feed one sample and get the positions to paint for it.
    ///
    /// The first sample always yields exactly one position. Later samples
    /// yield `ceil(distance / step)` positions ending at the sample, with
    /// position and pressure interpolated linearly from the previous sample.
    pub fn add_sample(&mut self, pos: Vec2, pressure: f32) -> Vec<PaintPosition> {
        let pressure = pressure.clamp(0.0, 1.0);
        let current = PaintPosition { pos, pressure };
        let out = match (self.mode, self.last) {
            (StepMode::Spaced { .. }, None) => vec![current],
            (StepMode::PixelPerfect, None) => vec![PaintPosition {
                pos: pixel_center(pos.x.floor() as i32, pos.y.floor() as i32),
                pressure,
            }],
            (StepMode::Spaced { step }, Some(prev)) => interpolate(prev, current, step),
            (StepMode::PixelPerfect, Some(prev)) => bresenham(prev, current),
        };
        // Zero-distance samples leave the anchor where it was.
        if self.last.is_none() || !out.is_empty() {
            self.last = Some(current);
        }
        self.emitted += out.len();
        out
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.emitted = 0;
    }
}

fn interpolate(prev: PaintPosition, current: PaintPosition, step: f32) -> Vec<PaintPosition> {
    let d = distance(prev.pos, current.pos);
    if d <= 0.0 {
        return Vec::new();
    }
    let n = (d / step).ceil().max(1.0) as usize;
    (1..=n)
        .map(|i| {
            let t = i as f32 / n as f32;
            PaintPosition {
                pos: prev.pos.lerp(current.pos, t),
                pressure: prev.pressure + (current.pressure - prev.pressure) * t,
            }
        })
        .collect()
}

fn pixel_center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}

/// Pixels on the line after the previous sample's pixel, up to and including
/// the current one.
fn bresenham(prev: PaintPosition, current: PaintPosition) -> Vec<PaintPosition> {
    let (x0, y0) = (prev.pos.x.floor() as i32, prev.pos.y.floor() as i32);
    let (x1, y1) = (current.pos.x.floor() as i32, current.pos.y.floor() as i32);
    if x0 == x1 && y0 == y1 {
        return Vec::new();
    }

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    let total = dx.max(-dy) as f32;

    let mut out = Vec::with_capacity(total as usize);
    loop {
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        let t = (out.len() + 1) as f32 / total;
        out.push(PaintPosition {
            pos: pixel_center(x, y),
            pressure: prev.pressure + (current.pressure - prev.pressure) * t.min(1.0),
        });
    }
    out
}
