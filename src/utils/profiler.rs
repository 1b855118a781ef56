use std::time::{Duration, Instant};

/// Scope guard that reports its lifetime under the `canvas_engine::timing`
/// log target when dropped.
pub struct ScopeTimer {
    label: &'static str,
    started: Instant,
}

impl ScopeTimer {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        log::debug!(target: "canvas_engine::timing", "{} took {:?}", self.label, self.elapsed());
    }
}
