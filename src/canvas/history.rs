use std::collections::VecDeque;

use crate::canvas::layer::{Layer, LayerId, LayerProps};
use crate::canvas::raster::RasterBuffer;
use crate::canvas::stack::LayerStack;
use crate::error::{EngineError, Result};
use crate::selection::Selection;
use crate::utils::color::Pixel;
use crate::utils::rect::Rect;

/// What kind of user operation a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Stroke,
    LayerAdd,
    LayerDelete,
    LayerReorder,
    LayerProperties,
    SelectionChange,
    Fill,
    Suggestion,
    Transform,
}

/// Before/after pixels of the rectangle an operation touched on one layer.
#[derive(Debug, Clone)]
pub struct RasterPatch {
    pub layer: LayerId,
    pub rect: Rect,
    pub before: Vec<Pixel>,
    pub after: Vec<Pixel>,
}

impl RasterPatch {
    pub fn byte_size(&self) -> usize {
        (self.before.len() + self.after.len()) * std::mem::size_of::<Pixel>()
    }
}

/// Invertible change recorded by history.
///
/// Layer add/delete patches own the layer while it is out of the stack, so
/// applying them in either direction moves the layer instead of copying it.
#[derive(Debug, Clone)]
pub enum Patch {
    Raster(RasterPatch),
    LayerAdded {
        index: usize,
        id: LayerId,
        active_before: Option<LayerId>,
        detached: Option<Box<Layer>>,
    },
    LayerDeleted {
        index: usize,
        id: LayerId,
        active_before: Option<LayerId>,
        detached: Option<Box<Layer>>,
    },
    LayerMoved {
        layer: LayerId,
        from: usize,
        to: usize,
    },
    LayerProps {
        layer: LayerId,
        before: LayerProps,
        after: LayerProps,
    },
    Selection {
        before: Option<Selection>,
        after: Option<Selection>,
    },
}

impl Patch {
    /// Patch for a layer that is already in the stack.
    pub fn layer_added(index: usize, id: LayerId, active_before: Option<LayerId>) -> Self {
        Patch::LayerAdded {
            index,
            id,
            active_before,
            detached: None,
        }
    }

    /// Patch for a layer that was just removed from the stack.
    pub fn layer_deleted(index: usize, layer: Layer, active_before: Option<LayerId>) -> Self {
        Patch::LayerDeleted {
            index,
            id: layer.id(),
            active_before,
            detached: Some(Box::new(layer)),
        }
    }

    fn apply(&mut self, layers: &mut LayerStack, selection: &mut Option<Selection>, forward: bool) -> Result<()> {
        match self {
            Patch::Raster(patch) => {
                let layer = layers
                    .get_mut(patch.layer)
                    .ok_or(EngineError::LayerNotFound(patch.layer))?;
                let data = if forward { &patch.after } else { &patch.before };
                layer.raster_mut().write_block(patch.rect, data);
            }
            Patch::LayerAdded {
                index,
                id,
                active_before,
                detached,
            } => {
                if forward {
                    attach(layers, *index, detached, *id)?;
                } else {
                    detach(layers, detached, *id, *active_before)?;
                }
            }
            Patch::LayerDeleted {
                index,
                id,
                active_before,
                detached,
            } => {
                if forward {
                    detach(layers, detached, *id, None)?;
                } else {
                    attach(layers, *index, detached, *id)?;
                    if let Some(active) = active_before {
                        layers.set_active(*active)?;
                    }
                }
            }
            Patch::LayerMoved { layer, from, to } => {
                layers.reorder(*layer, if forward { *to } else { *from })?;
            }
            Patch::LayerProps {
                layer,
                before,
                after,
            } => {
                layers.set_props(*layer, if forward { *after } else { *before })?;
            }
            Patch::Selection { before, after } => {
                *selection = if forward { after.clone() } else { before.clone() };
            }
        }
        Ok(())
    }
}

fn attach(
    layers: &mut LayerStack,
    index: usize,
    detached: &mut Option<Box<Layer>>,
    id: LayerId,
) -> Result<()> {
    let layer = detached.take().ok_or(EngineError::LayerNotFound(id))?;
    layers.insert_layer(index, *layer);
    Ok(())
}

fn detach(
    layers: &mut LayerStack,
    detached: &mut Option<Box<Layer>>,
    id: LayerId,
    restore_active: Option<LayerId>,
) -> Result<()> {
    let (_, layer) = layers.delete_layer(id)?;
    *detached = Some(Box::new(layer));
    if let Some(active) = restore_active.filter(|a| layers.index_of(*a).is_some()) {
        layers.set_active(active)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub seq: u64,
    pub kind: OperationKind,
    pub patch: Patch,
}

/// Result of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Applied { seq: u64, kind: OperationKind },
    /// Nothing left to undo or redo.
    Exhausted,
    /// Refused because a stroke or background writer is active.
    Blocked,
}

impl HistoryStep {
    pub fn is_applied(&self) -> bool {
        matches!(self, HistoryStep::Applied { .. })
    }
}

/// Linear undo/redo history with bounded depth.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_depth: usize,
    next_seq: u64,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            next_seq: 1,
        }
    }

    /// Record an already-applied change. Clears redo and evicts the oldest
    /// entry past the depth limit. Returns the entry's sequence number.
    pub fn commit(&mut self, kind: OperationKind, patch: Patch) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.redo_stack.clear();
        self.undo_stack.push_back(HistoryEntry { seq, kind, patch });
        while self.undo_stack.len() > self.max_depth {
            if let Some(evicted) = self.undo_stack.pop_front() {
                log::debug!("history full, evicted entry {} ({:?})", evicted.seq, evicted.kind);
            }
        }
        seq
    }

    pub fn undo(&mut self, layers: &mut LayerStack, selection: &mut Option<Selection>) -> HistoryStep {
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return HistoryStep::Exhausted;
        };
        if let Err(err) = entry.patch.apply(layers, selection, false) {
            log::warn!("undo of entry {} ({:?}) incomplete: {err}", entry.seq, entry.kind);
        }
        let step = HistoryStep::Applied {
            seq: entry.seq,
            kind: entry.kind,
        };
        self.redo_stack.push(entry);
        step
    }

    pub fn redo(&mut self, layers: &mut LayerStack, selection: &mut Option<Selection>) -> HistoryStep {
        let Some(mut entry) = self.redo_stack.pop() else {
            return HistoryStep::Exhausted;
        };
        if let Err(err) = entry.patch.apply(layers, selection, true) {
            log::warn!("redo of entry {} ({:?}) incomplete: {err}", entry.seq, entry.kind);
        }
        let step = HistoryStep::Applied {
            seq: entry.seq,
            kind: entry.kind,
        };
        self.undo_stack.push_back(entry);
        step
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Most recent undoable entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth.max(1);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
