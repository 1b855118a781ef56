use thiserror::Error;

use crate::canvas::layer::LayerId;
use crate::io::DroppedLayer;
use crate::tools::ToolKind;

/// Errors surfaced to callers of the engine.
///
/// Pointer coordinates outside the canvas and undo/redo on an empty stack are
/// not errors: the former are clamped, the latter report
/// [`HistoryStep::Exhausted`](crate::canvas::history::HistoryStep::Exhausted).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown tool `{0}`")]
    ToolNotFound(String),

    #[error("layer {0} not found")]
    LayerNotFound(LayerId),

    #[error("cannot allocate {bytes} bytes for {operation}{}", layer_suffix(.layer))]
    AllocationFailure {
        operation: &'static str,
        layer: Option<LayerId>,
        bytes: u64,
    },

    #[error("document is corrupt: {reason} ({} layer(s) dropped)", .dropped.len())]
    DocumentCorrupt {
        reason: String,
        dropped: Vec<DroppedLayer>,
    },

    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("a stroke is in progress")]
    StrokeInProgress,

    #[error("layer {0} is busy with a background operation")]
    LayerBusy(LayerId),

    #[error("shortcut `{key}` is bound to both {first:?} and {second:?}")]
    ShortcutConflict {
        key: char,
        first: ToolKind,
        second: ToolKind,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid suggestion: {0}")]
    InvalidSuggestion(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn layer_suffix(layer: &Option<LayerId>) -> String {
    match layer {
        Some(id) => format!(" (layer {id})"),
        None => String::new(),
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
