pub mod brush_engine;
pub mod canvas;
pub mod config;
pub mod document;
pub mod error;
pub mod input;
pub mod io;
pub mod scheduler;
pub mod selection;
pub mod tools;
pub mod utils;

pub use canvas::{BlendMode, Composite, HistoryStep, LayerId, OperationKind};
pub use config::EngineConfig;
pub use document::{Document, DocumentId, SuggestionMode};
pub use error::{EngineError, Result};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use scheduler::{FillTask, FrameBudget, RenderTask, Task, TaskOutput, TaskQueue, TaskStatus};
pub use selection::{CombineOp, SelectionRegion, SelectionShape};
pub use tools::{ToolKind, ToolSwitch};
pub use utils::color::{Color, Pixel};
pub use utils::vector::Vec2;
