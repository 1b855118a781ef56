pub mod dispatcher;
pub mod gradient;
pub mod paint;
pub mod select;
pub mod settings;
pub mod shape;
pub mod shortcuts;
pub mod transform;

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::brush_engine::brush::DabRenderer;
use crate::brush_engine::brush_options::BrushDynamics;
use crate::brush_engine::stroke::StrokeInterpolator;
use crate::canvas::history::OperationKind;
use crate::canvas::journal::StrokeJournal;
use crate::canvas::layer::LayerId;
use crate::canvas::raster::TiledRaster;
use crate::error::EngineError;
use crate::input::{Modifiers, Sample};
use crate::selection::Selection;
use crate::utils::profiler::ScopeTimer;
use crate::utils::vector::Vec2;

pub use dispatcher::{DispatchState, ToolDispatcher, ToolSwitch};
pub use settings::ToolSettings;
pub use shortcuts::{ShortcutBinding, ShortcutMap};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Pen,
    Clone,
    RectSelect,
    LassoSelect,
    Gradient,
    Shape,
    Move,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Brush,
        ToolKind::Eraser,
        ToolKind::Pen,
        ToolKind::Clone,
        ToolKind::RectSelect,
        ToolKind::LassoSelect,
        ToolKind::Gradient,
        ToolKind::Shape,
        ToolKind::Move,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Brush => "brush",
            ToolKind::Eraser => "eraser",
            ToolKind::Pen => "pen",
            ToolKind::Clone => "clone",
            ToolKind::RectSelect => "rect_select",
            ToolKind::LassoSelect => "lasso_select",
            ToolKind::Gradient => "gradient",
            ToolKind::Shape => "shape",
            ToolKind::Move => "move",
        }
    }

    /// Tools that modify the active layer's pixels.
    pub fn writes_raster(&self) -> bool {
        !matches!(self, ToolKind::RectSelect | ToolKind::LassoSelect)
    }

    /// History entry kind recorded when this tool commits a raster change.
    pub fn operation(&self) -> OperationKind {
        match self {
            ToolKind::Gradient => OperationKind::Fill,
            ToolKind::Move => OperationKind::Transform,
            ToolKind::RectSelect | ToolKind::LassoSelect => OperationKind::SelectionChange,
            _ => OperationKind::Stroke,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| EngineError::ToolNotFound(s.to_string()))
    }
}

/// Borrowed document state a tool works against for one event.
pub struct ToolContext<'a> {
    /// Active layer's pixels; `None` for tools that don't paint.
    pub raster: Option<&'a mut TiledRaster>,
    pub selection: Option<&'a Selection>,
    pub settings: &'a ToolSettings,
    pub clone_source: &'a mut Option<Vec2>,
    pub rng: &'a mut dyn RngCore,
    pub width: u32,
    pub height: u32,
}

/// What a finished stroke produced.
#[derive(Debug)]
pub enum ToolOutcome {
    /// Nothing to record.
    None,
    /// Pixels changed; the session journal holds the pre-stroke tiles.
    Raster,
    /// The selection should become this value.
    Selection(Option<Selection>),
}

/// Per-gesture state shared by all tools, alive from pointer down to up.
pub struct StrokeSession {
    pub kind: ToolKind,
    pub layer: Option<LayerId>,
    pub modifiers: Modifiers,
    pub samples: Vec<Sample>,
    pub journal: StrokeJournal,
    pub interpolator: Option<StrokeInterpolator>,
    pub renderer: Option<DabRenderer>,
    pub dynamics: BrushDynamics,
    pub clone_offset: Option<Vec2>,
    /// Gesture start for drag tools.
    pub anchor: Option<Vec2>,
    _timer: ScopeTimer,
}

impl StrokeSession {
    pub fn new(kind: ToolKind, layer: Option<LayerId>, modifiers: Modifiers) -> Self {
        Self {
            kind,
            layer,
            modifiers,
            samples: Vec::new(),
            journal: StrokeJournal::new(),
            interpolator: None,
            renderer: None,
            dynamics: BrushDynamics::default(),
            clone_offset: None,
            anchor: None,
            _timer: ScopeTimer::new("stroke"),
        }
    }

    pub fn last_pos(&self) -> Option<Vec2> {
        self.samples.last().map(|s| s.pos)
    }
}

pub type BeginFn = fn(&mut StrokeSession, &mut ToolContext<'_>, Sample);
pub type UpdateFn = fn(&mut StrokeSession, &mut ToolContext<'_>, Sample);
pub type EndFn = fn(&mut StrokeSession, &mut ToolContext<'_>) -> ToolOutcome;

/// Strategy functions for one tool kind.
pub struct ToolFns {
    pub begin: BeginFn,
    pub update: UpdateFn,
    pub end: EndFn,
}

static PAINT: ToolFns = ToolFns {
    begin: paint::begin,
    update: paint::update,
    end: paint::end,
};

static SELECT: ToolFns = ToolFns {
    begin: select::begin,
    update: select::update,
    end: select::end,
};

static GRADIENT: ToolFns = ToolFns {
    begin: gradient::begin,
    update: gradient::update,
    end: gradient::end,
};

static SHAPE: ToolFns = ToolFns {
    begin: shape::begin,
    update: shape::update,
    end: shape::end,
};

static MOVE: ToolFns = ToolFns {
    begin: transform::begin,
    update: transform::update,
    end: transform::end,
};

/// Dispatch table from tool kind to its strategy.
pub fn tool_fns(kind: ToolKind) -> &'static ToolFns {
    match kind {
        ToolKind::Brush | ToolKind::Eraser | ToolKind::Pen | ToolKind::Clone => &PAINT,
        ToolKind::RectSelect | ToolKind::LassoSelect => &SELECT,
        ToolKind::Gradient => &GRADIENT,
        ToolKind::Shape => &SHAPE,
        ToolKind::Move => &MOVE,
    }
}
