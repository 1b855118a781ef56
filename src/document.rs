use std::fmt;
use std::sync::{Arc, Weak};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::blend::{BlendMode, PaintOp};
use crate::canvas::history::{History, HistoryStep, OperationKind, Patch};
use crate::canvas::journal::{JournaledRaster, StrokeJournal};
use crate::canvas::layer::{Layer, LayerId, LayerProps};
use crate::canvas::raster::{RasterBuffer, TiledRaster};
use crate::canvas::stack::{Composite, LayerStack, RenderJob};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::input::{EventQueue, InputEvent, Modifiers, PointerButton, Sample};
use crate::scheduler::{FillTask, FrameBudget, Task, TaskOutput, TaskStatus};
use crate::selection::{CombineOp, Selection, SelectionRegion};
use crate::tools::settings::ToolSettings;
use crate::tools::shortcuts::KeyAction;
use crate::tools::{DispatchState, StrokeSession, ToolContext, ToolDispatcher, ToolKind, ToolOutcome, ToolSwitch};
use crate::utils::color::{Color, Pixel};
use crate::utils::rect::Rect;
use crate::utils::vector::Vec2;

/// Largest accepted canvas edge in pixels.
pub const MAX_DIMENSION: u32 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable editing state shared by tools, history and tasks.
pub struct EditorState {
    pub layers: LayerStack,
    pub selection: Option<Selection>,
    pub settings: ToolSettings,
    pub clone_source: Option<Vec2>,
    pub rng: Box<dyn RngCore + Send>,
}

/// How a suggested bitmap is written into a layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionMode {
    #[default]
    Replace,
    Over,
}

fn make_rng(seed: Option<u64>) -> Box<dyn RngCore + Send> {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_os_rng()),
    }
}

/// Split the editor state into the borrows one tool call needs.
fn tool_context(state: &mut EditorState, layer: Option<LayerId>, width: u32, height: u32) -> ToolContext<'_> {
    let EditorState {
        layers,
        selection,
        settings,
        clone_source,
        rng,
    } = state;
    ToolContext {
        raster: layer.and_then(|id| layers.get_mut(id)).map(Layer::raster_mut),
        selection: selection.as_ref(),
        settings,
        clone_source,
        rng: &mut **rng,
        width,
        height,
    }
}

/// A background task's claim on one layer, with the tiles it has replaced.
/// The task keeps the lease alive; once it is gone the slot is stale.
struct WriterSlot {
    layer: LayerId,
    journal: StrokeJournal,
    lease: Weak<()>,
}

impl WriterSlot {
    fn is_abandoned(&self) -> bool {
        self.lease.strong_count() == 0
    }
}

/// One open image: layers, selection, tools, history and pending input.
pub struct Document {
    id: DocumentId,
    config: EngineConfig,
    state: EditorState,
    history: History,
    dispatcher: ToolDispatcher,
    events: EventQueue,
    writer: Option<WriterSlot>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("layers", &self.state.layers.len())
            .field("tool", &self.dispatcher.active_tool())
            .field("history", &self.history.undo_len())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// New document with default configuration and one blank layer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_config(width, height, EngineConfig::default())
    }

    pub fn with_config(width: u32, height: u32, config: EngineConfig) -> Result<Self> {
        let mut doc = Self::empty(width, height, config)?;
        doc.state.layers.add_layer();
        log::debug!("created document {} ({width}x{height})", doc.id);
        Ok(doc)
    }

    fn empty(width: u32, height: u32, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        let layer_bytes = width as u64 * height as u64 * 4;
        if layer_bytes > config.max_layer_bytes {
            return Err(EngineError::AllocationFailure {
                operation: "create_document",
                layer: None,
                bytes: layer_bytes,
            });
        }
        let shortcuts = config.shortcut_map()?;
        Ok(Self {
            id: DocumentId::new(),
            state: EditorState {
                layers: LayerStack::new(width, height, config.tile_size),
                selection: None,
                settings: ToolSettings::default(),
                clone_source: None,
                rng: make_rng(config.rng_seed),
            },
            history: History::new(config.history_depth),
            dispatcher: ToolDispatcher::new(shortcuts),
            events: EventQueue::new(),
            writer: None,
            config,
        })
    }

    /// Reassemble a document from loaded parts. History starts empty.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        config: EngineConfig,
        width: u32,
        height: u32,
        layers: Vec<Layer>,
        active: Option<usize>,
        selection: Option<Selection>,
        tool: ToolKind,
        settings: ToolSettings,
    ) -> Result<Self> {
        let mut doc = Self::empty(width, height, config)?;
        let tile_size = doc.config.tile_size;
        doc.state.layers = LayerStack::from_layers(width, height, tile_size, layers, active);
        doc.state.selection = selection;
        doc.state.settings = settings;
        doc.state.settings.sanitize();
        doc.dispatcher.select_tool(tool);
        Ok(doc)
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.state.layers.width()
    }

    pub fn height(&self) -> u32 {
        self.state.layers.height()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerStack {
        &self.state.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.state.layers.get(id)
    }

    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.state.layers.active_id()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.state.selection.as_ref()
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.state.settings
    }

    /// Edit tool settings; values are clamped to their valid ranges afterwards.
    pub fn update_settings(&mut self, f: impl FnOnce(&mut ToolSettings)) {
        f(&mut self.state.settings);
        self.state.settings.sanitize();
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active_tool(&self) -> ToolKind {
        self.dispatcher.active_tool()
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    pub fn is_stroke_active(&self) -> bool {
        self.dispatcher.is_stroke_active()
    }

    pub fn clone_source(&self) -> Option<Vec2> {
        self.state.clone_source
    }

    pub fn set_clone_source(&mut self, point: Option<Vec2>) {
        self.state.clone_source = point;
    }

    /// Layer currently owned by a live background writer, if any.
    pub fn pending_writer(&self) -> Option<LayerId> {
        self.writer
            .as_ref()
            .filter(|slot| !slot.is_abandoned())
            .map(|slot| slot.layer)
    }

    pub fn seed_rng(&mut self, seed: u64) {
        self.state.rng = Box::new(StdRng::seed_from_u64(seed));
    }

    pub fn set_rng(&mut self, rng: Box<dyn RngCore + Send>) {
        self.state.rng = rng;
    }

    /// Total bytes held by allocated tiles across every layer.
    pub fn allocated_bytes(&self) -> u64 {
        self.state
            .layers
            .layers()
            .iter()
            .map(|l| l.raster().allocated_tiles() as u64 * self.tile_bytes())
            .sum()
    }

    fn tile_bytes(&self) -> u64 {
        let tile = self.state.layers.tile_size() as u64;
        tile * tile * 4
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.dispatcher.is_stroke_active() {
            return Err(EngineError::StrokeInProgress);
        }
        Ok(())
    }

    /// Structural edits wait for both strokes and background writers.
    fn ensure_quiescent(&mut self) -> Result<()> {
        self.ensure_idle()?;
        match self.busy_writer() {
            Some(layer) => Err(EngineError::LayerBusy(layer)),
            None => Ok(()),
        }
    }

    /// Live writer's layer. A writer whose task was dropped unfinished is
    /// rolled back and released first.
    fn busy_writer(&mut self) -> Option<LayerId> {
        if self.writer.as_ref().is_some_and(WriterSlot::is_abandoned) {
            if let Some(mut slot) = self.writer.take() {
                log::warn!("background write on layer {} was abandoned, rolling back", slot.layer);
                if let Some(target) = self.state.layers.get_mut(slot.layer) {
                    slot.journal.rollback(target.raster_mut());
                }
            }
        }
        self.writer.as_ref().map(|slot| slot.layer)
    }

    /// Refuse a raster write over `area` that could push tile memory past
    /// the document budget. `None` stands for a blank layer about to be added.
    fn ensure_budget(&self, operation: &'static str, layer: Option<LayerId>, area: Rect) -> Result<()> {
        let blank;
        let raster = match layer.and_then(|id| self.state.layers.get(id)) {
            Some(target) => target.raster(),
            None => {
                blank = TiledRaster::new(self.width(), self.height(), self.state.layers.tile_size());
                &blank
            }
        };
        let bytes = raster.missing_tiles(area) as u64 * raster.tile_bytes();
        if self.allocated_bytes() + bytes > self.config.max_document_bytes {
            return Err(EngineError::AllocationFailure {
                operation,
                layer,
                bytes,
            });
        }
        Ok(())
    }

    /// Active layer, inserting a recorded blank layer if the stack is empty.
    fn ensure_active_layer(&mut self) -> Result<LayerId> {
        if let Some(id) = self.state.layers.active_id() {
            return Ok(id);
        }
        self.ensure_quiescent()?;
        let (index, id) = self.state.layers.add_layer();
        self.history
            .commit(OperationKind::LayerAdd, Patch::layer_added(index, id, None));
        log::debug!("inserted blank layer {id} for a raster operation");
        Ok(id)
    }

    // ---- layers ----

    pub fn add_layer(&mut self) -> Result<LayerId> {
        self.ensure_quiescent()?;
        let active_before = self.state.layers.active_id();
        let (index, id) = self.state.layers.add_layer();
        self.history.commit(
            OperationKind::LayerAdd,
            Patch::layer_added(index, id, active_before),
        );
        Ok(id)
    }

    /// Copy a layer directly above itself and make the copy active.
    pub fn duplicate_layer(&mut self, id: LayerId) -> Result<LayerId> {
        self.ensure_quiescent()?;
        let source = self
            .state
            .layers
            .get(id)
            .ok_or(EngineError::LayerNotFound(id))?;
        let tile = self.state.layers.tile_size() as u64;
        let bytes = source.raster().allocated_tiles() as u64 * tile * tile * 4;
        if self.allocated_bytes() + bytes > self.config.max_document_bytes {
            return Err(EngineError::AllocationFailure {
                operation: "duplicate_layer",
                layer: Some(id),
                bytes,
            });
        }
        let copy = source.duplicate();
        let copy_id = copy.id();
        let active_before = self.state.layers.active_id();
        let index = self.state.layers.index_of(id).map_or(0, |i| i + 1);
        let index = self.state.layers.insert_layer(index, copy);
        self.history.commit(
            OperationKind::LayerAdd,
            Patch::layer_added(index, copy_id, active_before),
        );
        Ok(copy_id)
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<()> {
        self.ensure_quiescent()?;
        let active_before = self.state.layers.active_id();
        let (index, layer) = self.state.layers.delete_layer(id)?;
        self.history.commit(
            OperationKind::LayerDelete,
            Patch::layer_deleted(index, layer, active_before),
        );
        Ok(())
    }

    pub fn reorder_layer(&mut self, id: LayerId, new_index: usize) -> Result<()> {
        self.ensure_quiescent()?;
        let from = self.state.layers.reorder(id, new_index)?;
        let to = self.state.layers.index_of(id).unwrap_or(from);
        if from != to {
            self.history.commit(
                OperationKind::LayerReorder,
                Patch::LayerMoved { layer: id, from, to },
            );
        }
        Ok(())
    }

    fn change_props(&mut self, id: LayerId, f: impl FnOnce(LayerProps) -> LayerProps) -> Result<()> {
        self.ensure_quiescent()?;
        let before = self
            .state
            .layers
            .get(id)
            .map(Layer::props)
            .ok_or(EngineError::LayerNotFound(id))?;
        self.state.layers.set_props(id, f(before))?;
        let after = self.state.layers.get(id).map(Layer::props).unwrap_or(before);
        if before != after {
            self.history.commit(
                OperationKind::LayerProperties,
                Patch::LayerProps {
                    layer: id,
                    before,
                    after,
                },
            );
        }
        Ok(())
    }

    /// Opacity in percent; values above 100 are clamped.
    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: u8) -> Result<()> {
        self.change_props(id, |p| LayerProps { opacity, ..p })
    }

    pub fn set_layer_blend_mode(&mut self, id: LayerId, blend_mode: BlendMode) -> Result<()> {
        self.change_props(id, |p| LayerProps { blend_mode, ..p })
    }

    pub fn set_layer_visibility(&mut self, id: LayerId, visible: bool) -> Result<()> {
        self.change_props(id, |p| LayerProps { visible, ..p })
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> Result<()> {
        self.ensure_idle()?;
        self.state.layers.set_active(id)
    }

    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> Result<()> {
        let layer = self
            .state
            .layers
            .get_mut(id)
            .ok_or(EngineError::LayerNotFound(id))?;
        layer.name = name.into();
        Ok(())
    }

    // ---- selection ----

    /// Replace the selection with a region, or drop it with `None`.
    pub fn set_selection(&mut self, region: Option<SelectionRegion>) -> Result<Option<u64>> {
        self.ensure_idle()?;
        let (w, h) = (self.width(), self.height());
        let next = region.map(|r| Selection::from_region(w, h, r));
        Ok(self.replace_selection(next))
    }

    pub fn combine_selection(&mut self, op: CombineOp, region: SelectionRegion) -> Result<Option<u64>> {
        self.ensure_idle()?;
        let (w, h) = (self.width(), self.height());
        let next = Selection::combine_region(self.state.selection.as_ref(), w, h, op, region);
        Ok(self.replace_selection(Some(next)))
    }

    pub fn select_all(&mut self) -> Result<Option<u64>> {
        self.ensure_idle()?;
        let full = Selection::full(self.width(), self.height());
        Ok(self.replace_selection(Some(full)))
    }

    pub fn clear_selection(&mut self) -> Result<Option<u64>> {
        self.ensure_idle()?;
        Ok(self.replace_selection(None))
    }

    fn replace_selection(&mut self, next: Option<Selection>) -> Option<u64> {
        if self.state.selection == next {
            return None;
        }
        let before = std::mem::replace(&mut self.state.selection, next.clone());
        Some(self.history.commit(
            OperationKind::SelectionChange,
            Patch::Selection {
                before,
                after: next,
            },
        ))
    }

    // ---- tools ----

    pub fn select_tool(&mut self, kind: ToolKind) -> ToolSwitch {
        self.dispatcher.select_tool(kind)
    }

    pub fn select_tool_named(&mut self, name: &str) -> Result<ToolSwitch> {
        self.dispatcher.select_tool_named(name)
    }

    /// Roll back any in-flight stroke, then switch.
    pub fn cancel_and_select_tool(&mut self, kind: ToolKind) -> ToolSwitch {
        self.cancel_stroke();
        self.dispatcher.select_tool(kind)
    }

    // ---- input ----

    pub fn queue_event(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Drain and handle every queued event. Failures are logged and do not
    /// stop the remaining events. Returns the number of events handled.
    pub fn tick(&mut self) -> usize {
        let events = self.events.drain();
        let count = events.len();
        for event in events {
            if let Err(err) = self.handle_event(event) {
                log::warn!("input event rejected: {err}");
            }
        }
        count
    }

    pub fn handle_event(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::PointerDown {
                pos,
                pressure,
                button,
                modifiers,
                timestamp,
            } => {
                if button != PointerButton::Primary {
                    return Ok(());
                }
                if self.dispatcher.is_stroke_active() {
                    log::trace!("pointer down ignored, stroke already active");
                    return Ok(());
                }
                let sample = Sample::new(self.clamp_point(pos), pressure, timestamp);
                self.begin_stroke(sample, modifiers)
            }
            InputEvent::PointerMove {
                pos,
                pressure,
                timestamp,
                ..
            } => {
                let Some(layer) = self.dispatcher.session().map(|s| s.layer) else {
                    return Ok(());
                };
                let sample = Sample::new(self.clamp_point(pos), pressure, timestamp);
                let (w, h) = (self.width(), self.height());
                let mut ctx = tool_context(&mut self.state, layer, w, h);
                self.dispatcher.update(sample, &mut ctx);
                Ok(())
            }
            InputEvent::PointerUp {
                pos,
                button,
                timestamp,
                ..
            } => {
                if button != PointerButton::Primary || !self.dispatcher.is_stroke_active() {
                    return Ok(());
                }
                if !self.in_canvas(pos) {
                    log::debug!("pointer released outside the canvas, discarding stroke");
                    self.cancel_stroke();
                    return Ok(());
                }
                let pressure = self
                    .dispatcher
                    .session()
                    .and_then(|s| s.samples.last())
                    .map(|s| s.pressure);
                self.finish_stroke(Some(Sample::new(pos, pressure, timestamp)))?;
                Ok(())
            }
            InputEvent::PointerLeave { .. } => {
                if self.dispatcher.is_stroke_active() {
                    self.finish_stroke(None)?;
                }
                Ok(())
            }
            InputEvent::LostCapture | InputEvent::Cancel => {
                self.cancel_stroke();
                Ok(())
            }
            InputEvent::KeyDown { key, modifiers } => {
                self.handle_key(key, modifiers);
                Ok(())
            }
        }
    }

    fn handle_key(&mut self, key: char, modifiers: Modifiers) {
        match self.dispatcher.shortcuts().resolve(key, modifiers) {
            Some(KeyAction::SelectTool(kind)) => {
                self.select_tool(kind);
            }
            Some(KeyAction::Undo) => {
                self.undo();
            }
            Some(KeyAction::Redo) => {
                self.redo();
            }
            Some(KeyAction::Cancel) => {
                self.cancel_stroke();
            }
            None => log::trace!("unbound key {key:?}"),
        }
    }

    fn in_canvas(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.y >= 0.0 && pos.x <= self.width() as f32 && pos.y <= self.height() as f32
    }

    fn clamp_point(&self, pos: Vec2) -> Vec2 {
        let clamped = Vec2::new(
            pos.x.clamp(0.0, self.width() as f32),
            pos.y.clamp(0.0, self.height() as f32),
        );
        if clamped != pos {
            log::trace!("clamped ({}, {}) to canvas bounds", pos.x, pos.y);
        }
        clamped
    }

    fn begin_stroke(&mut self, sample: Sample, modifiers: Modifiers) -> Result<()> {
        let kind = self.dispatcher.active_tool();
        let layer = if kind.writes_raster() {
            if let Some(busy) = self.busy_writer() {
                return Err(EngineError::LayerBusy(busy));
            }
            Some(self.ensure_active_layer()?)
        } else {
            None
        };
        let (w, h) = (self.width(), self.height());
        let mut ctx = tool_context(&mut self.state, layer, w, h);
        self.dispatcher.begin(layer, modifiers, sample, &mut ctx);
        Ok(())
    }

    fn finish_stroke(&mut self, release: Option<Sample>) -> Result<Option<u64>> {
        let layer = self.dispatcher.session().and_then(|s| s.layer);
        let (w, h) = (self.width(), self.height());
        let mut ctx = tool_context(&mut self.state, layer, w, h);
        let Some((session, outcome)) = self.dispatcher.end(release, &mut ctx) else {
            return Ok(None);
        };
        self.commit_outcome(*session, outcome)
    }

    /// A stroke's footprint is only known once it ends, so the memory budget
    /// is enforced here: an over-budget stroke is rolled back and reported.
    fn commit_outcome(&mut self, session: StrokeSession, outcome: ToolOutcome) -> Result<Option<u64>> {
        if let (ToolOutcome::Raster, Some(id)) = (&outcome, session.layer) {
            let grown = session.journal.new_tiles() as u64 * self.tile_bytes();
            if grown > 0 && self.allocated_bytes() > self.config.max_document_bytes {
                let bytes = grown;
                if let Some(layer) = self.state.layers.get_mut(id) {
                    let mut journal = session.journal;
                    journal.rollback(layer.raster_mut());
                }
                log::warn!("{} stroke exceeded the document memory budget", session.kind);
                return Err(EngineError::AllocationFailure {
                    operation: "stroke",
                    layer: Some(id),
                    bytes,
                });
            }
        }
        Ok(match outcome {
            ToolOutcome::None => {
                if let Some(id) = session.layer {
                    if let Some(layer) = self.state.layers.get_mut(id) {
                        let mut journal = session.journal;
                        journal.rollback(layer.raster_mut());
                    }
                }
                None
            }
            ToolOutcome::Raster => {
                let Some(id) = session.layer else {
                    return Ok(None);
                };
                let Some(layer) = self.state.layers.get(id) else {
                    log::warn!("stroke target layer {id} disappeared");
                    return Ok(None);
                };
                session
                    .journal
                    .into_patch(layer.raster(), id)
                    .map(|patch| self.history.commit(session.kind.operation(), Patch::Raster(patch)))
            }
            ToolOutcome::Selection(next) => self.replace_selection(next),
        })
    }

    /// Roll back the in-flight stroke, if any. Returns true if one was dropped.
    pub fn cancel_stroke(&mut self) -> bool {
        let Some(session) = self.dispatcher.cancel() else {
            return false;
        };
        let StrokeSession { layer, journal, .. } = *session;
        if let Some(id) = layer {
            if let Some(target) = self.state.layers.get_mut(id) {
                let mut journal = journal;
                journal.rollback(target.raster_mut());
            }
        }
        true
    }

    // ---- output ----

    pub fn render(&self) -> Result<Composite> {
        self.state.layers.render(self.config.background_pixel())
    }

    /// Resumable render for spreading a composite over several ticks.
    pub fn render_job(&self) -> Result<RenderJob> {
        RenderJob::new(self.width(), self.height(), self.config.background_pixel())
    }

    /// Full-canvas composite handed to external collaborators.
    pub fn export_composite(&self) -> Result<Composite> {
        self.render()
    }

    pub fn export_image(&self) -> Result<image::RgbaImage> {
        Ok(self.render()?.to_rgba_image())
    }

    /// Write a suggested bitmap into a layer at (x, y) as one undoable entry.
    /// Parts outside the canvas are clipped.
    pub fn apply_suggestion(
        &mut self,
        layer: LayerId,
        x: i32,
        y: i32,
        image: &image::RgbaImage,
        mode: SuggestionMode,
    ) -> Result<Option<u64>> {
        self.ensure_idle()?;
        if self.busy_writer() == Some(layer) {
            return Err(EngineError::LayerBusy(layer));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(EngineError::InvalidSuggestion("empty image".into()));
        }
        let rect = Rect::from_xywh(x, y, image.width() as i32, image.height() as i32);
        let clipped = rect.clamp_to(self.width(), self.height());
        if clipped.is_empty() {
            return Err(EngineError::InvalidSuggestion(format!(
                "placement {rect:?} lies outside the canvas"
            )));
        }
        if self.state.layers.get(layer).is_none() {
            return Err(EngineError::LayerNotFound(layer));
        }
        self.ensure_budget("apply_suggestion", Some(layer), clipped)?;
        let target = self
            .state
            .layers
            .get_mut(layer)
            .ok_or(EngineError::LayerNotFound(layer))?;

        let mut journal = StrokeJournal::new();
        {
            let mut raster = JournaledRaster::new(target.raster_mut(), &mut journal);
            for (px, py) in clipped.pixels() {
                let [r, g, b, a] = image.get_pixel((px - x) as u32, (py - y) as u32).0;
                let src = Pixel::from_rgba_unmultiplied(r, g, b, a);
                let op = match mode {
                    SuggestionMode::Replace => PaintOp::Replace,
                    SuggestionMode::Over => PaintOp::Over,
                };
                raster.composite_pixel(px as u32, py as u32, src, op);
            }
        }
        let Some(patch) = journal.into_patch(target.raster(), layer) else {
            return Ok(None);
        };
        Ok(Some(self.history.commit(OperationKind::Suggestion, Patch::Raster(patch))))
    }

    /// Fill the selection (or the whole layer) on the active layer, running
    /// the fill task to completion. One history entry.
    pub fn fill_selection(&mut self, color: Color) -> Result<Option<u64>> {
        let mut task = self.start_fill(color)?;
        let budget = FrameBudget::new(self.config.frame_budget_pixels);
        loop {
            match task.step(self, budget) {
                Ok(TaskStatus::Pending) => {}
                Ok(TaskStatus::Finished(TaskOutput::Committed(seq))) => return Ok(seq),
                Ok(TaskStatus::Finished(_)) => return Ok(None),
                Err(err) => {
                    task.cancel(self);
                    return Err(err);
                }
            }
        }
    }

    /// Claim the active layer for a background fill. The layer is released
    /// when the task finishes or is cancelled. A task dropped unfinished has
    /// its partial fill rolled back by the next mutating call on the document.
    pub fn start_fill(&mut self, color: Color) -> Result<FillTask> {
        self.ensure_quiescent()?;
        let area = FillTask::area_for(self.state.selection.as_ref(), self.width(), self.height());
        self.ensure_budget("fill", self.state.layers.active_id(), area)?;
        let layer = self.ensure_active_layer()?;
        let lease = Arc::new(());
        self.writer = Some(WriterSlot {
            layer,
            journal: StrokeJournal::new(),
            lease: Arc::downgrade(&lease),
        });
        Ok(FillTask::new(layer, color, self.state.selection.clone(), area, lease))
    }

    /// Raster and journal of the background write holding `layer`.
    pub(crate) fn writer_parts(&mut self, layer: LayerId) -> Option<(&mut TiledRaster, &mut StrokeJournal)> {
        let slot = self.writer.as_mut().filter(|slot| slot.layer == layer)?;
        let target = self.state.layers.get_mut(layer)?;
        Some((target.raster_mut(), &mut slot.journal))
    }

    fn take_writer(&mut self, layer: LayerId) -> Option<WriterSlot> {
        if self.writer.as_ref().is_some_and(|slot| slot.layer == layer) {
            self.writer.take()
        } else {
            None
        }
    }

    /// Commit the background write on `layer` as one fill entry and free the layer.
    pub(crate) fn finish_writer(&mut self, layer: LayerId) -> Option<u64> {
        let slot = self.take_writer(layer)?;
        let target = self.state.layers.get(layer)?;
        let patch = slot.journal.into_patch(target.raster(), layer)?;
        Some(self.history.commit(OperationKind::Fill, Patch::Raster(patch)))
    }

    /// Roll back the background write on `layer` and free the layer.
    pub(crate) fn abort_writer(&mut self, layer: LayerId) {
        let Some(mut slot) = self.take_writer(layer) else {
            return;
        };
        if let Some(target) = self.state.layers.get_mut(layer) {
            slot.journal.rollback(target.raster_mut());
        }
    }

    // ---- history ----

    pub fn undo(&mut self) -> HistoryStep {
        if self.dispatcher.is_stroke_active() || self.busy_writer().is_some() {
            return HistoryStep::Blocked;
        }
        let step = self
            .history
            .undo(&mut self.state.layers, &mut self.state.selection);
        log::debug!("undo: {step:?}");
        step
    }

    pub fn redo(&mut self) -> HistoryStep {
        if self.dispatcher.is_stroke_active() || self.busy_writer().is_some() {
            return HistoryStep::Blocked;
        }
        let step = self
            .history
            .redo(&mut self.state.layers, &mut self.state.selection);
        log::debug!("redo: {step:?}");
        step
    }
}
