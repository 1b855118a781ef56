//! Cooperative background work. Tasks advance one bounded step per tick so
//! large renders and fills never stall input handling.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::canvas::blend::PaintOp;
use crate::canvas::journal::JournaledRaster;
use crate::canvas::layer::LayerId;
use crate::canvas::raster::RasterBuffer;
use crate::canvas::stack::{Composite, RenderJob};
use crate::document::{Document, DocumentId};
use crate::error::{EngineError, Result};
use crate::selection::Selection;
use crate::utils::color::{Color, Pixel};
use crate::utils::rect::Rect;

/// Pixels a task may touch in one step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameBudget {
    pub pixels: u64,
}

impl FrameBudget {
    pub fn new(pixels: u64) -> Self {
        Self {
            pixels: pixels.max(1),
        }
    }

    /// Whole rows of `width` pixels that fit; always at least one.
    pub fn rows_for(&self, width: u32) -> u32 {
        (self.pixels / width.max(1) as u64).clamp(1, u32::MAX as u64) as u32
    }
}

#[derive(Debug)]
pub enum TaskOutput {
    Composite(Composite),
    /// History sequence of the committed entry, if anything changed.
    Committed(Option<u64>),
}

#[derive(Debug)]
pub enum TaskStatus {
    Pending,
    Finished(TaskOutput),
}

pub trait Task: Send {
    fn label(&self) -> &'static str;

    fn step(&mut self, doc: &mut Document, budget: FrameBudget) -> Result<TaskStatus>;

    /// Abandon the task, undoing any partial writes.
    fn cancel(&mut self, doc: &mut Document);
}

/// Full composite spread over several ticks.
pub struct RenderTask {
    job: Option<RenderJob>,
}

impl RenderTask {
    pub fn new(doc: &Document) -> Result<Self> {
        Ok(Self {
            job: Some(doc.render_job()?),
        })
    }
}

impl Task for RenderTask {
    fn label(&self) -> &'static str {
        "render"
    }

    fn step(&mut self, doc: &mut Document, budget: FrameBudget) -> Result<TaskStatus> {
        let Some(job) = self.job.as_mut() else {
            return Ok(TaskStatus::Finished(TaskOutput::Committed(None)));
        };
        let rows = budget.rows_for(doc.width());
        if !job.step(doc.layers(), rows) {
            return Ok(TaskStatus::Pending);
        }
        match self.job.take() {
            Some(job) => Ok(TaskStatus::Finished(TaskOutput::Composite(job.finish()))),
            None => Ok(TaskStatus::Finished(TaskOutput::Committed(None))),
        }
    }

    fn cancel(&mut self, _doc: &mut Document) {
        self.job = None;
    }
}

/// Fill of the selection (or the whole layer) with a flat color. Holds the
/// document's writer slot from creation until it finishes, is cancelled or
/// is dropped.
pub struct FillTask {
    layer: LayerId,
    color: Pixel,
    selection: Option<Selection>,
    area: Rect,
    next_row: i32,
    _lease: Arc<()>,
}

impl FillTask {
    pub(crate) fn new(
        layer: LayerId,
        color: Color,
        selection: Option<Selection>,
        area: Rect,
        lease: Arc<()>,
    ) -> Self {
        Self {
            layer,
            color: color.to_pixel(),
            selection,
            next_row: area.top,
            area,
            _lease: lease,
        }
    }

    /// Pixels a fill may touch: the selection's bounds, or the whole canvas.
    pub(crate) fn area_for(selection: Option<&Selection>, width: u32, height: u32) -> Rect {
        match selection {
            Some(sel) => sel.bounds().clamp_to(width, height),
            None => Rect::new(0, 0, width as i32, height as i32),
        }
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn is_done(&self) -> bool {
        self.area.is_empty() || self.next_row >= self.area.bottom
    }
}

impl Task for FillTask {
    fn label(&self) -> &'static str {
        "fill"
    }

    fn step(&mut self, doc: &mut Document, budget: FrameBudget) -> Result<TaskStatus> {
        let layer = self.layer;
        let Some((target, journal)) = doc.writer_parts(layer) else {
            doc.abort_writer(layer);
            return Err(EngineError::LayerNotFound(layer));
        };

        if !self.is_done() {
            let rows = budget.rows_for(self.area.width()) as i32;
            let last = (self.next_row + rows).min(self.area.bottom);
            let mut raster = JournaledRaster::new(target, journal);
            for y in self.next_row..last {
                for x in self.area.left..self.area.right {
                    let coverage = self.selection.as_ref().map_or(255, |s| s.value_at(x, y));
                    if coverage == 0 {
                        continue;
                    }
                    let src = self.color.scale_alpha(coverage as u32);
                    raster.composite_pixel(x as u32, y as u32, src, PaintOp::Over);
                }
            }
            self.next_row = last;
        }
        if !self.is_done() {
            return Ok(TaskStatus::Pending);
        }

        let seq = doc.finish_writer(layer);
        log::debug!("fill on layer {layer} finished");
        Ok(TaskStatus::Finished(TaskOutput::Committed(seq)))
    }

    fn cancel(&mut self, doc: &mut Document) {
        doc.abort_writer(self.layer);
        self.next_row = self.area.bottom;
        log::debug!("fill on layer {} cancelled", self.layer);
    }
}

/// Per-document FIFO queues of background tasks.
#[derive(Default)]
pub struct TaskQueue {
    queues: HashMap<DocumentId, VecDeque<Box<dyn Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, doc: DocumentId, task: Box<dyn Task>) {
        log::debug!("queued {} task for document {doc}", task.label());
        self.queues.entry(doc).or_default().push_back(task);
    }

    pub fn pending(&self, doc: DocumentId) -> usize {
        self.queues.get(&doc).map_or(0, VecDeque::len)
    }

    /// Advance the document's front task by one budgeted step. Returns its
    /// output once it finishes. A failing task is dropped.
    pub fn run_tick(&mut self, doc: &mut Document, budget: FrameBudget) -> Result<Option<TaskOutput>> {
        let id = doc.id();
        let Some(queue) = self.queues.get_mut(&id) else {
            return Ok(None);
        };
        let Some(task) = queue.front_mut() else {
            return Ok(None);
        };
        let result = task.step(doc, budget);
        let output = match result {
            Ok(TaskStatus::Pending) => return Ok(None),
            Ok(TaskStatus::Finished(output)) => Ok(Some(output)),
            Err(err) => {
                log::warn!("{} task failed: {err}", task.label());
                task.cancel(doc);
                Err(err)
            }
        };
        queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(&id);
        }
        output
    }

    /// Cancel every queued task for the document, newest first.
    pub fn cancel_all(&mut self, doc: &mut Document) -> usize {
        let Some(mut queue) = self.queues.remove(&doc.id()) else {
            return 0;
        };
        let count = queue.len();
        while let Some(mut task) = queue.pop_back() {
            task.cancel(doc);
        }
        count
    }
}
