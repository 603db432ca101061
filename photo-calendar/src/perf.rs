//! Advisory timing and ratio bookkeeping.
//!
//! Nothing here affects correctness; the monitor only feeds knobs such as the grouping chunk
//! size.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Frame budget of a 60 Hz display.
pub const FRAME_BUDGET_60FPS: Duration = Duration::from_micros(16_667);

pub const MIN_CHUNK_SIZE: usize = 100;
pub const MAX_CHUNK_SIZE: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    Grouping,
    GroupingChunk,
    Layout,
    ViewportQuery,
    NavigatorRebuild,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ratio {
    /// Thumbnail cache hits over lookups.
    CacheHitRate,
    /// Rendered items over total layout items.
    RenderedItems,
    /// Date cache hits over resolutions.
    DateCacheHitRate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
    pub last: Duration,
}

impl TimingStats {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / self.count as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total = self.total.saturating_add(elapsed);
        self.max = self.max.max(elapsed);
        self.last = elapsed;
    }
}

#[derive(Clone, Debug)]
pub struct PerformanceMonitor {
    frame_budget: Duration,
    timings: HashMap<Operation, TimingStats>,
    ratios: HashMap<Ratio, f64>,
    // Items processed by the last recorded grouping chunk.
    last_chunk_items: Option<usize>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(FRAME_BUDGET_60FPS)
    }
}

impl PerformanceMonitor {
    pub fn new(frame_budget: Duration) -> Self {
        Self {
            frame_budget,
            timings: HashMap::new(),
            ratios: HashMap::new(),
            last_chunk_items: None,
        }
    }

    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    pub fn record(&mut self, operation: Operation, elapsed: Duration) {
        self.timings.entry(operation).or_default().record(elapsed);
        if elapsed > self.frame_budget {
            cdebug!(?operation, elapsed_us = elapsed.as_micros() as u64, "over frame budget");
        }
    }

    /// Records one grouping chunk together with the number of files it processed.
    pub fn record_chunk(&mut self, items: usize, elapsed: Duration) {
        self.record(Operation::GroupingChunk, elapsed);
        self.last_chunk_items = Some(items);
    }

    pub fn measure<T>(&mut self, operation: Operation, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record(operation, started.elapsed());
        out
    }

    /// Stores a ratio, clamped to `[0, 1]`; non-finite values are ignored.
    pub fn record_ratio(&mut self, ratio: Ratio, value: f64) {
        if value.is_finite() {
            self.ratios.insert(ratio, value.clamp(0.0, 1.0));
        }
    }

    pub fn stats(&self, operation: Operation) -> Option<TimingStats> {
        self.timings.get(&operation).copied()
    }

    pub fn ratio(&self, ratio: Ratio) -> Option<f64> {
        self.ratios.get(&ratio).copied()
    }

    /// Scales `current` so one grouping chunk fits the frame budget, based on the last
    /// recorded chunk. Without a sample `current` is returned (clamped).
    pub fn recommended_chunk_size(&self, current: usize) -> usize {
        let clamp = |n: usize| n.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        let (Some(items), Some(stats)) =
            (self.last_chunk_items, self.stats(Operation::GroupingChunk))
        else {
            return clamp(current);
        };
        let last = stats.last.as_nanos();
        if items == 0 || last == 0 {
            return clamp(current);
        }
        let fit = self.frame_budget.as_nanos().saturating_mul(items as u128) / last;
        clamp(usize::try_from(fit).unwrap_or(MAX_CHUNK_SIZE))
    }

    pub fn reset(&mut self) {
        self.timings.clear();
        self.ratios.clear();
        self.last_chunk_items = None;
    }
}
