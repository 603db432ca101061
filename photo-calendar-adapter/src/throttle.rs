/// Collapses bursts of scroll events into at most one emitted offset per window.
///
/// Events arriving inside the window are not queued: only the latest offset is kept and it is
/// released by [`ScrollThrottle::tick`] once the window has elapsed (or by
/// [`ScrollThrottle::flush`]). The last emitted value always equals the last reported offset
/// once the burst settles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollThrottle {
    window_ms: u64,
    last_emit_ms: Option<u64>,
    pending: Option<f64>,
}

impl Default for ScrollThrottle {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ScrollThrottle {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_emit_ms: None,
            pending: None,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn set_window_ms(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }

    /// The collapsed offset waiting for the window to elapse.
    pub fn pending(&self) -> Option<f64> {
        self.pending
    }

    /// Reports a scroll event. Returns the offset to apply now, or `None` if it was deferred.
    pub fn on_scroll(&mut self, offset: f64, now_ms: u64) -> Option<f64> {
        if self.is_open(now_ms) {
            self.pending = None;
            self.last_emit_ms = Some(now_ms);
            return Some(offset);
        }
        if self.pending.is_some() {
            atrace!(offset, "scroll event collapsed");
        }
        self.pending = Some(offset);
        None
    }

    /// Releases the pending offset once the window has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<f64> {
        if self.pending.is_none() || !self.is_open(now_ms) {
            return None;
        }
        self.last_emit_ms = Some(now_ms);
        self.pending.take()
    }

    /// Releases the pending offset regardless of the window.
    pub fn flush(&mut self) -> Option<f64> {
        self.pending.take()
    }

    pub fn reset(&mut self) {
        self.last_emit_ms = None;
        self.pending = None;
    }

    fn is_open(&self, now_ms: u64) -> bool {
        match self.last_emit_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.window_ms,
        }
    }
}
