pub mod blend;
pub mod history;
pub mod journal;
pub mod layer;
pub mod raster;
pub mod stack;

pub use blend::{BlendMode, PaintOp};
pub use history::{History, HistoryEntry, HistoryStep, OperationKind, Patch, RasterPatch};
pub use journal::{JournaledRaster, StrokeJournal};
pub use layer::{Layer, LayerId, LayerProps};
pub use raster::{RasterBuffer, TiledRaster};
pub use stack::{Composite, LayerStack, RenderJob};
