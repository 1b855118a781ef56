pub mod brush;
pub mod brush_options;
pub mod hardness;
pub mod stroke;

pub use brush::{DabRenderer, DabStyle};
pub use brush_options::{BrushDynamics, BrushShape, DabJitter};
pub use stroke::{PaintPosition, StrokeInterpolator};
