use crate::canvas::layer::LayerId;
use crate::error::Result;
use crate::input::{Modifiers, Sample};
use crate::tools::shortcuts::ShortcutMap;
use crate::tools::{StrokeSession, ToolContext, ToolKind, ToolOutcome, tool_fns};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    StrokeActive(ToolKind),
}

/// Result of a tool selection request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToolSwitch {
    Switched,
    Unchanged,
    /// A stroke of another tool is in flight.
    Refused,
}

/// Routes pointer gestures to the active tool's strategy functions.
#[derive(Default)]
pub struct ToolDispatcher {
    active_tool: ToolKind,
    session: Option<Box<StrokeSession>>,
    shortcuts: ShortcutMap,
}

impl ToolDispatcher {
    pub fn new(shortcuts: ShortcutMap) -> Self {
        Self {
            active_tool: ToolKind::Brush,
            session: None,
            shortcuts,
        }
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    pub fn state(&self) -> DispatchState {
        match &self.session {
            Some(session) => DispatchState::StrokeActive(session.kind),
            None => DispatchState::Idle,
        }
    }

    pub fn is_stroke_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&StrokeSession> {
        self.session.as_deref()
    }

    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }

    pub fn select_tool(&mut self, kind: ToolKind) -> ToolSwitch {
        if let Some(session) = &self.session {
            if session.kind != kind {
                log::debug!("refusing switch to {kind} during a {} stroke", session.kind);
                return ToolSwitch::Refused;
            }
        }
        if self.active_tool == kind {
            return ToolSwitch::Unchanged;
        }
        log::debug!("tool {} -> {}", self.active_tool, kind);
        self.active_tool = kind;
        ToolSwitch::Switched
    }

    /// Select by name; unknown names leave the current tool unchanged.
    pub fn select_tool_named(&mut self, name: &str) -> Result<ToolSwitch> {
        let kind: ToolKind = name.parse()?;
        Ok(self.select_tool(kind))
    }

    /// Start a stroke with the active tool. Returns false if one is already running.
    pub fn begin(
        &mut self,
        layer: Option<LayerId>,
        modifiers: Modifiers,
        sample: Sample,
        ctx: &mut ToolContext<'_>,
    ) -> bool {
        if self.session.is_some() {
            return false;
        }
        let kind = self.active_tool;
        let mut session = Box::new(StrokeSession::new(kind, layer, modifiers));
        session.samples.push(sample);
        (tool_fns(kind).begin)(&mut session, ctx, sample);
        self.session = Some(session);
        true
    }

    pub fn update(&mut self, sample: Sample, ctx: &mut ToolContext<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.samples.push(sample);
        (tool_fns(session.kind).update)(session, ctx, sample);
    }

    /// Finish the stroke, feeding the release position first if it moved.
    pub fn end(
        &mut self,
        release: Option<Sample>,
        ctx: &mut ToolContext<'_>,
    ) -> Option<(Box<StrokeSession>, ToolOutcome)> {
        let mut session = self.session.take()?;
        if let Some(sample) = release {
            if session.last_pos() != Some(sample.pos) {
                session.samples.push(sample);
                (tool_fns(session.kind).update)(&mut session, ctx, sample);
            }
        }
        let outcome = (tool_fns(session.kind).end)(&mut session, ctx);
        Some((session, outcome))
    }

    /// Drop the stroke. The caller rolls its journal back.
    pub fn cancel(&mut self) -> Option<Box<StrokeSession>> {
        let session = self.session.take();
        if let Some(s) = &session {
            log::debug!("{} stroke cancelled after {} samples", s.kind, s.samples.len());
        }
        session
    }
}
