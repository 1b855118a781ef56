use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::utils::vector::Vec2;

/// Footprint of a single dab.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BrushShape {
    #[default]
    Round,
    Square,
    /// Grayscale stamp, stretched over the dab's bounding square.
    Texture {
        width: u32,
        height: u32,
        data: Vec<u8>, // 0-255 mask
    },
}

impl BrushShape {
    /// Sample a texture stamp at normalized coordinates in `[0, 1)`.
    pub fn texture_value(&self, u: f32, v: f32) -> f32 {
        match self {
            BrushShape::Texture {
                width,
                height,
                data,
            } if *width > 0 && *height > 0 => {
                let x = ((u.clamp(0.0, 0.9999) * *width as f32) as u32).min(width - 1);
                let y = ((v.clamp(0.0, 0.9999) * *height as f32) as u32).min(height - 1);
                data.get((y * width + x) as usize)
                    .map_or(0.0, |&m| m as f32 / 255.0)
            }
            BrushShape::Texture { .. } => 0.0,
            _ => 1.0,
        }
    }
}

/// Per-dab randomization, all in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushDynamics {
    /// Maximum size reduction, percent of the brush size.
    pub size_jitter: f32,
    /// Maximum opacity reduction, percent.
    pub opacity_jitter: f32,
    /// Maximum positional offset, percent of the brush size.
    pub scatter: f32,
}

/// Jitter drawn for one paint position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DabJitter {
    pub size_factor: f32,
    pub opacity_factor: f32,
    pub offset: Vec2,
}

impl DabJitter {
    pub const NONE: DabJitter = DabJitter {
        size_factor: 1.0,
        opacity_factor: 1.0,
        offset: Vec2::ZERO,
    };
}

impl BrushDynamics {
    pub fn is_static(&self) -> bool {
        self.size_jitter <= 0.0 && self.opacity_jitter <= 0.0 && self.scatter <= 0.0
    }

    pub fn sanitize(&mut self) {
        self.size_jitter = self.size_jitter.clamp(0.0, 100.0);
        self.opacity_jitter = self.opacity_jitter.clamp(0.0, 100.0);
        self.scatter = self.scatter.clamp(0.0, 1000.0);
    }

    /// Draw jitter for one dab. The generator is only consumed for the
    /// dynamics that are enabled, so static brushes stay deterministic.
    pub fn sample(&self, rng: &mut dyn RngCore, size: f32) -> DabJitter {
        let mut jitter = DabJitter::NONE;
        if self.size_jitter > 0.0 {
            jitter.size_factor = 1.0 - rng.random_range(0.0..=self.size_jitter / 100.0);
        }
        if self.opacity_jitter > 0.0 {
            jitter.opacity_factor = 1.0 - rng.random_range(0.0..=self.opacity_jitter / 100.0);
        }
        if self.scatter > 0.0 {
            let amount = self.scatter / 100.0 * size;
            jitter.offset = Vec2::new(
                rng.random_range(-amount..=amount),
                rng.random_range(-amount..=amount),
            );
        }
        jitter
    }
}
