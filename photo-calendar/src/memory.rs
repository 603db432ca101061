//! Bounded cache of resident thumbnail resources.
//!
//! Eviction follows least-recently-used order, except that entries flagged visible are pinned:
//! they are cycled to the back of the queue instead of being removed.
//!
//! The recency queue is append-only between compactions. Every access pushes `(id, stamp)`;
//! records whose stamp no longer matches the entry's `last_accessed` are stale and skipped.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::FileId;

// Stale queue records tolerated beyond twice the live entry count before compacting.
const QUEUE_SLACK: usize = 64;

/// Fixed per-entry bookkeeping cost added to the pixel estimate.
pub const ENTRY_OVERHEAD_BYTES: usize = 2048;

/// Estimated resident size of a decoded RGBA thumbnail.
pub fn estimate_bytes(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
        .saturating_add(ENTRY_OVERHEAD_BYTES)
}

/// A resource the memory manager can size without touching OS counters.
pub trait ThumbnailResource {
    fn dimensions(&self) -> (u32, u32);
}

impl<T: ThumbnailResource + ?Sized> ThumbnailResource for Arc<T> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryConfig {
    pub max_entries: usize,
    pub max_bytes: usize,
    /// Eviction starts once usage crosses this fraction of either maximum.
    pub eviction_threshold: f64,
    /// Eviction stops once usage is at or below this fraction of both maxima.
    pub eviction_target: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_bytes: 256 * 1024 * 1024,
            eviction_threshold: 0.9,
            eviction_target: 0.7,
        }
    }
}

impl MemoryConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_eviction_threshold(mut self, threshold: f64) -> Self {
        self.eviction_threshold = threshold;
        self
    }

    pub fn with_eviction_target(mut self, target: f64) -> Self {
        self.eviction_target = target;
        self
    }

    fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let fraction = |v: f64, fallback: f64| {
            if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        let threshold = fraction(self.eviction_threshold, defaults.eviction_threshold);
        let target = fraction(self.eviction_target, defaults.eviction_target).min(threshold);
        Self {
            max_entries: self.max_entries,
            max_bytes: self.max_bytes,
            eviction_threshold: threshold,
            eviction_target: target,
        }
    }

    fn entries_at(&self, fraction: f64) -> usize {
        (self.max_entries as f64 * fraction) as usize
    }

    fn bytes_at(&self, fraction: f64) -> usize {
        (self.max_bytes as f64 * fraction) as usize
    }
}

/// Memory pressure derived from the higher of entry and byte utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryPressure {
    /// Below 50% utilization.
    Low,
    /// 50–75%.
    Moderate,
    /// 75–90%.
    High,
    /// Above 90%.
    Critical,
}

impl MemoryPressure {
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization < 0.5 {
            Self::Low
        } else if utilization < 0.75 {
            Self::Moderate
        } else if utilization < 0.9 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

#[derive(Clone, Debug)]
pub struct ThumbnailCacheEntry<R> {
    pub file_id: FileId,
    pub resource: R,
    /// Logical access clock; larger is more recent.
    pub last_accessed: u64,
    pub estimated_bytes: usize,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    pub entries: usize,
    pub bytes: usize,
    pub visible: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl MemoryStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Delivered to pressure subscribers after an aggressive cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPressureEvent {
    /// Pressure observed before the cleanup ran.
    pub pressure: MemoryPressure,
    pub freed_entries: usize,
    pub freed_bytes: usize,
}

pub type PressureCallback = Arc<dyn Fn(&MemoryPressureEvent) + Send + Sync>;

/// Owns every resident thumbnail resource, keyed by file id.
pub struct MemoryManager<R> {
    config: MemoryConfig,
    entries: HashMap<FileId, ThumbnailCacheEntry<R>>,
    // `(file id, access stamp)`, least recently used at the front.
    lru: VecDeque<(FileId, u64)>,
    bytes: usize,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    listeners: Vec<PressureCallback>,
}

impl<R> core::fmt::Debug for MemoryManager<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .field("bytes", &self.bytes)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<R: ThumbnailResource> Default for MemoryManager<R> {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl<R: ThumbnailResource> MemoryManager<R> {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config: config.sanitized(),
            entries: HashMap::new(),
            lru: VecDeque::new(),
            bytes: 0,
            clock: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MemoryConfig) {
        self.config = config.sanitized();
        self.evict_if_needed();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn contains(&self, file_id: FileId) -> bool {
        self.entries.contains_key(&file_id)
    }

    pub fn entry(&self, file_id: FileId) -> Option<&ThumbnailCacheEntry<R>> {
        self.entries.get(&file_id)
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            entries: self.entries.len(),
            bytes: self.bytes,
            visible: self.entries.values().filter(|e| e.is_visible).count(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    pub fn utilization(&self) -> f64 {
        let ratio = |used: usize, max: usize| {
            if max == 0 {
                if used == 0 { 0.0 } else { 1.0 }
            } else {
                used as f64 / max as f64
            }
        };
        ratio(self.entries.len(), self.config.max_entries)
            .max(ratio(self.bytes, self.config.max_bytes))
    }

    pub fn pressure(&self) -> MemoryPressure {
        MemoryPressure::from_utilization(self.utilization())
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, file_id: FileId, stamp: u64) {
        self.lru.push_back((file_id, stamp));
        if self.lru.len() > self.entries.len().saturating_mul(2) + QUEUE_SLACK {
            self.compact_queue();
        }
    }

    fn is_live(entries: &HashMap<FileId, ThumbnailCacheEntry<R>>, id: FileId, stamp: u64) -> bool {
        entries.get(&id).is_some_and(|e| e.last_accessed == stamp)
    }

    /// Drops stale queue records, keeping the order of the live ones.
    fn compact_queue(&mut self) {
        let entries = &self.entries;
        self.lru.retain(|&(id, stamp)| Self::is_live(entries, id, stamp));
    }

    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.lru.len()
    }

    /// Stores a resource, replacing any previous one for the same file, then evicts if needed.
    pub fn cache_thumbnail(&mut self, file_id: FileId, resource: R, is_visible: bool) {
        let (width, height) = resource.dimensions();
        let estimated_bytes = estimate_bytes(width, height);
        let last_accessed = self.tick();

        if let Some(old) = self.entries.insert(
            file_id,
            ThumbnailCacheEntry {
                file_id,
                resource,
                last_accessed,
                estimated_bytes,
                is_visible,
            },
        ) {
            self.bytes = self.bytes.saturating_sub(old.estimated_bytes);
        }
        self.bytes = self.bytes.saturating_add(estimated_bytes);
        self.touch(file_id, last_accessed);
        ctrace!(file_id, estimated_bytes, is_visible, "cache_thumbnail");

        self.evict_if_needed();
    }

    pub fn get_thumbnail(&mut self, file_id: FileId) -> Option<&R> {
        if !self.entries.contains_key(&file_id) {
            self.misses += 1;
            return None;
        }
        self.hits += 1;
        let now = self.tick();
        if let Some(entry) = self.entries.get_mut(&file_id) {
            entry.last_accessed = now;
        }
        self.touch(file_id, now);
        self.entries.get(&file_id).map(|e| &e.resource)
    }

    pub fn remove(&mut self, file_id: FileId) -> Option<R> {
        let entry = self.entries.remove(&file_id)?;
        self.bytes = self.bytes.saturating_sub(entry.estimated_bytes);
        Some(entry.resource)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.bytes = 0;
    }

    /// Applies the renderer's visibility set and purges entries whose files left the working set.
    ///
    /// Returns the number of purged entries. Purging ignores visibility.
    pub fn update_visibility(
        &mut self,
        visible_ids: impl IntoIterator<Item = FileId>,
        all_ids: impl IntoIterator<Item = FileId>,
    ) -> usize {
        let visible: HashSet<FileId> = visible_ids.into_iter().collect();
        let all: HashSet<FileId> = all_ids.into_iter().collect();

        let gone: Vec<FileId> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !all.contains(id))
            .collect();
        for &id in &gone {
            self.remove(id);
        }
        if !gone.is_empty() {
            cdebug!(purged = gone.len(), "purged thumbnails for removed files");
        }

        self.apply_visibility(&visible);
        gone.len()
    }

    /// Replaces the visibility flags without purging anything, then evicts if needed.
    pub fn set_visible(&mut self, visible_ids: impl IntoIterator<Item = FileId>) {
        let visible: HashSet<FileId> = visible_ids.into_iter().collect();
        self.apply_visibility(&visible);
    }

    fn apply_visibility(&mut self, visible: &HashSet<FileId>) {
        for entry in self.entries.values_mut() {
            entry.is_visible = visible.contains(&entry.file_id);
        }
        self.evict_if_needed();
    }

    fn over_threshold(&self) -> bool {
        let cfg = &self.config;
        let threshold = cfg.eviction_threshold;
        self.entries.len() > cfg.entries_at(threshold) || self.bytes > cfg.bytes_at(threshold)
    }

    fn over_target(&self) -> bool {
        let cfg = &self.config;
        let target = cfg.eviction_target;
        self.entries.len() > cfg.entries_at(target) || self.bytes > cfg.bytes_at(target)
    }

    /// Evicts least recently used, non-visible entries once usage crosses the threshold, until
    /// usage is back at the target. Returns the evicted file ids, oldest first.
    pub fn evict_if_needed(&mut self) -> Vec<FileId> {
        let mut evicted = Vec::new();
        if !self.over_threshold() {
            return evicted;
        }

        // Every queued record is looked at most once per round; visible ones rotate to the back.
        let mut budget = self.lru.len();
        while self.over_target() && budget > 0 {
            budget -= 1;
            let Some((id, stamp)) = self.lru.pop_front() else {
                break;
            };
            match self.entries.get(&id) {
                Some(entry) if entry.last_accessed != stamp => {}
                Some(entry) if entry.is_visible => self.lru.push_back((id, stamp)),
                Some(_) => {
                    if let Some(entry) = self.entries.remove(&id) {
                        self.bytes = self.bytes.saturating_sub(entry.estimated_bytes);
                    }
                    self.evictions += 1;
                    evicted.push(id);
                }
                None => {}
            }
        }

        if !evicted.is_empty() {
            cdebug!(
                evicted = evicted.len(),
                entries = self.entries.len(),
                bytes = self.bytes,
                "evicted thumbnails"
            );
        }
        if self.over_target() {
            cwarn!(
                entries = self.entries.len(),
                bytes = self.bytes,
                "visible thumbnails alone exceed the eviction target"
            );
        }
        evicted
    }

    /// Drops every non-visible entry immediately and notifies pressure subscribers.
    pub fn aggressive_cleanup(&mut self) -> MemoryPressureEvent {
        let pressure = self.pressure();
        let before_entries = self.entries.len();
        let before_bytes = self.bytes;

        let hidden: Vec<FileId> = self
            .entries
            .values()
            .filter(|e| !e.is_visible)
            .map(|e| e.file_id)
            .collect();
        for id in hidden {
            self.remove(id);
            self.evictions += 1;
        }

        let event = MemoryPressureEvent {
            pressure,
            freed_entries: before_entries - self.entries.len(),
            freed_bytes: before_bytes.saturating_sub(self.bytes),
        };
        cdebug!(
            ?pressure,
            freed_entries = event.freed_entries,
            freed_bytes = event.freed_bytes,
            "aggressive cleanup"
        );
        for listener in &self.listeners {
            listener(&event);
        }
        event
    }

    pub fn on_memory_pressure(&mut self, callback: PressureCallback) {
        self.listeners.push(callback);
    }

    /// Unregisters a callback previously passed to [`Self::on_memory_pressure`].
    pub fn off_memory_pressure(&mut self, callback: &PressureCallback) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|cb| !Arc::ptr_eq(cb, callback));
        self.listeners.len() != before
    }

    pub fn pressure_listener_count(&self) -> usize {
        self.listeners.len()
    }
}
