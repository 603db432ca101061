use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use photo_calendar::perf::{Operation, Ratio};
use photo_calendar::{
    Align, CancellationToken, DateGroupingEngine, Direction, FileId, FileRecord, GroupingOptions,
    GroupingStatus, GroupingStrategy, KeyboardNavigator, LayoutConfig, LayoutConfigPatch,
    LayoutEngine, LayoutError, LayoutItem, MemoryConfig, MemoryManager, MemoryPressure,
    MemoryPressureEvent, PerformanceMonitor, Photo, Progress, ThumbnailResource, VisibleRange,
};

use crate::{
    InMemoryScrollStore, PhotoSelectCallback, ScrollPositionStore, ScrollThrottle, SelectMode,
    Selection, SelectionModifiers, apply_anchor, capture_anchor,
};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerOptions {
    pub scroll_throttle_ms: u64,
    pub viewport_height: f64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            scroll_throttle_ms: 16,
            viewport_height: 600.0,
        }
    }
}

impl ControllerOptions {
    pub fn with_scroll_throttle_ms(mut self, window_ms: u64) -> Self {
        self.scroll_throttle_ms = window_ms;
        self
    }

    pub fn with_viewport_height(mut self, height: f64) -> Self {
        self.viewport_height = height;
        self
    }
}

/// A framework-neutral controller that owns the calendar engines and drives them from UI events.
///
/// This type does not hold any UI objects. Adapters drive it by calling:
/// - `set_files` when the file store hands out a new record list
/// - `resize` / `on_scroll` when UI events occur
/// - `tick(now_ms)` each frame/timer tick (releases throttled scroll offsets)
/// - `handle_key` / `select` for keyboard and pointer input
///
/// Render from [`Self::visible_items`]; the scroll position is mirrored into the store `S`.
/// Overscan comes from [`LayoutConfig::overscan`].
pub struct CalendarController<R, S = InMemoryScrollStore> {
    options: ControllerOptions,
    grouping: DateGroupingEngine,
    layout: LayoutEngine,
    navigator: KeyboardNavigator,
    memory: MemoryManager<R>,
    perf: PerformanceMonitor,
    throttle: ScrollThrottle,
    store: S,
    files: Vec<Arc<FileRecord>>,
    status: GroupingStatus,
    scroll_top: f64,
    visible: VisibleRange,
    visible_ids: HashSet<FileId>,
    focused: Option<usize>,
    selection: Selection,
    on_select: Option<PhotoSelectCallback>,
}

impl<R, S> fmt::Debug for CalendarController<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarController")
            .field("options", &self.options)
            .field("files", &self.files.len())
            .field("status", &self.status)
            .field("scroll_top", &self.scroll_top)
            .field("visible", &self.visible)
            .field("focused", &self.focused)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

impl<R: ThumbnailResource> CalendarController<R> {
    pub fn new(layout: LayoutConfig, options: ControllerOptions) -> Self {
        Self::with_store(layout, options, InMemoryScrollStore::default())
    }
}

impl<R: ThumbnailResource, S: ScrollPositionStore> CalendarController<R, S> {
    /// Creates a controller whose initial scroll position is restored from `store`.
    pub fn with_store(layout: LayoutConfig, options: ControllerOptions, store: S) -> Self {
        let options = ControllerOptions {
            viewport_height: sanitize_height(options.viewport_height),
            ..options
        };
        let restored = store.scroll_position();
        Self {
            options,
            grouping: DateGroupingEngine::default(),
            layout: LayoutEngine::new(layout),
            navigator: KeyboardNavigator::new(),
            memory: MemoryManager::default(),
            perf: PerformanceMonitor::default(),
            throttle: ScrollThrottle::new(options.scroll_throttle_ms),
            store,
            files: Vec::new(),
            status: GroupingStatus::Complete,
            scroll_top: if restored.is_finite() { restored } else { 0.0 },
            visible: VisibleRange::empty(0, 0),
            visible_ids: HashSet::new(),
            focused: None,
            selection: Selection::new(),
            on_select: None,
        }
    }

    pub fn with_grouping_options(mut self, options: GroupingOptions) -> Self {
        self.grouping.set_options(options);
        self
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.grouping = std::mem::take(&mut self.grouping).with_reference_year(year);
        self
    }

    pub fn with_memory_config(mut self, config: MemoryConfig) -> Self {
        self.memory.set_config(config);
        self
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn memory(&self) -> &MemoryManager<R> {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryManager<R> {
        &mut self.memory
    }

    pub fn perf(&self) -> &PerformanceMonitor {
        &self.perf
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn files(&self) -> &[Arc<FileRecord>] {
        &self.files
    }

    pub fn grouping_status(&self) -> &GroupingStatus {
        &self.status
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn on_photo_select(&mut self, callback: PhotoSelectCallback) {
        self.on_select = Some(callback);
    }

    pub fn clear_photo_select(&mut self) {
        self.on_select = None;
    }

    /// Replaces the file set, grouping with the strategy picked for its size.
    pub fn set_files(&mut self, files: Vec<Arc<FileRecord>>) -> Result<(), LayoutError> {
        let strategy = match self.grouping.strategy_for(files.len()) {
            GroupingStrategy::Chunked {
                chunk_size,
                cache_dates,
            } => GroupingStrategy::Chunked {
                chunk_size: self.perf.recommended_chunk_size(chunk_size),
                cache_dates,
            },
            other => other,
        };
        let token = CancellationToken::new();
        self.set_files_with(files, strategy, &token, |_| {})
            .map(|_| ())
    }

    /// Replaces the file set with an explicit strategy and cancellation token.
    ///
    /// Returns `Ok(false)` when the run was cancelled; the previous layout then stays in place.
    pub fn set_files_with(
        &mut self,
        files: Vec<Arc<FileRecord>>,
        strategy: GroupingStrategy,
        token: &CancellationToken,
        mut yield_point: impl FnMut(&Progress),
    ) -> Result<bool, LayoutError> {
        let started = Instant::now();
        let perf = &mut self.perf;
        let mut last_processed = 0;
        let outcome = self.grouping.group_with(&files, strategy, token, |progress| {
            perf.record_chunk(progress.processed - last_processed, progress.chunk_elapsed);
            last_processed = progress.processed;
            yield_point(progress);
        });
        let Some(grouping) = outcome.into_grouping() else {
            adebug!(files = files.len(), "file set update cancelled");
            return Ok(false);
        };
        self.perf.record(Operation::Grouping, started.elapsed());
        let cache = self.grouping.date_cache();
        let lookups = cache.hits() + cache.misses();
        if lookups > 0 {
            self.perf.record_ratio(
                Ratio::DateCacheHitRate,
                cache.hits() as f64 / lookups as f64,
            );
        }

        let focused_id = self.focused_photo().map(Photo::id);
        self.status = grouping.status;
        self.files = files;

        let layout = &mut self.layout;
        let groups = grouping.groups;
        let laid_out = self.perf.measure(Operation::Layout, || {
            layout.calculate_layout(groups).map(|_| ())
        });

        let ids: HashSet<FileId> = self.files.iter().map(|f| f.id).collect();
        self.selection.retain(|id| ids.contains(&id));
        self.focused = focused_id
            .and_then(|id| self.navigator.position_of(&self.layout, id))
            .map(|p| p.global_index);
        self.refresh(self.scroll_top);
        let purged = self
            .memory
            .update_visibility(self.visible_ids.iter().copied(), ids.iter().copied());

        adebug!(
            files = self.files.len(),
            groups = self.layout.groups().len(),
            purged,
            "file set updated"
        );
        laid_out.map(|()| true)
    }

    /// Applies a new container width and viewport height, keeping the first visible photo
    /// anchored. Returns the resulting scroll offset.
    pub fn resize(&mut self, container_width: f64, viewport_height: f64) -> Result<f64, LayoutError> {
        let anchor = capture_anchor(&self.layout, self.scroll_top, self.options.viewport_height);
        self.options.viewport_height = sanitize_height(viewport_height);

        let layout = &mut self.layout;
        let laid_out = self.perf.measure(Operation::Layout, || {
            layout.update_config(LayoutConfigPatch::container_width(container_width))
        });

        let view = self.options.viewport_height;
        let target = anchor
            .and_then(|anchor| {
                let layout = &self.layout;
                let navigator = &mut self.navigator;
                apply_anchor(layout, &anchor, view, |id| {
                    navigator.position_of(layout, id).map(|p| p.global_index)
                })
            })
            .unwrap_or(self.scroll_top);
        self.refresh(target);
        laid_out.map(|()| self.scroll_top)
    }

    /// Reports a UI scroll event. Returns the new visible range when the throttle let it through.
    pub fn on_scroll(&mut self, scroll_top: f64, now_ms: u64) -> Option<VisibleRange> {
        let offset = self.throttle.on_scroll(scroll_top, now_ms)?;
        Some(self.refresh(offset))
    }

    /// Releases a throttled scroll offset once its window elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<VisibleRange> {
        let offset = self.throttle.tick(now_ms)?;
        Some(self.refresh(offset))
    }

    /// Applies a programmatic scroll immediately, discarding any throttled user offset.
    pub fn scroll_to(&mut self, scroll_top: f64) -> VisibleRange {
        self.throttle.flush();
        self.refresh(scroll_top)
    }

    pub fn visible_range(&self) -> VisibleRange {
        self.visible
    }

    pub fn visible_items(&self) -> &[LayoutItem] {
        self.layout.visible_items(self.visible)
    }

    pub fn is_photo_visible(&self, file_id: FileId) -> bool {
        self.visible_ids.contains(&file_id)
    }

    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn focused_photo(&self) -> Option<&Photo> {
        self.layout.photo(self.focused?)
    }

    /// Moves focus one step, selects the new photo and scrolls it into view.
    ///
    /// Without a focus the first photo is focused. Returns `None` for "no move".
    pub fn handle_key(
        &mut self,
        direction: Direction,
        modifiers: SelectionModifiers,
    ) -> Option<usize> {
        let next = match self.focused {
            Some(current) => self.navigator.navigate(&self.layout, current, direction)?,
            None => self.navigator.first(&self.layout)?,
        };
        self.select(next, modifiers)?;
        self.scroll_into_view(next);
        Some(next)
    }

    pub fn focus_first(&mut self) -> Option<usize> {
        let first = self.navigator.first(&self.layout)?;
        self.focus(first)
    }

    pub fn focus_last(&mut self) -> Option<usize> {
        let last = self.navigator.last(&self.layout)?;
        self.focus(last)
    }

    fn focus(&mut self, global_index: usize) -> Option<usize> {
        self.layout.photo(global_index)?;
        self.focused = Some(global_index);
        self.scroll_into_view(global_index);
        Some(global_index)
    }

    /// Applies a selection event to the photo at `global_index` and notifies the select callback.
    pub fn select(
        &mut self,
        global_index: usize,
        modifiers: SelectionModifiers,
    ) -> Option<SelectMode> {
        let mode = modifiers.mode();
        if !self.selection.apply(&self.layout, global_index, mode) {
            return None;
        }
        self.focused = Some(global_index);
        if let (Some(callback), Some(photo)) = (&self.on_select, self.layout.photo(global_index)) {
            let (additive, range) = mode.flags();
            callback(photo, additive, range);
        }
        adebug!(global_index, ?mode, selected = self.selection.len(), "photo selected");
        Some(mode)
    }

    /// Scrolls the minimum distance that shows the photo completely. Returns the scroll offset.
    pub fn scroll_into_view(&mut self, global_index: usize) -> Option<f64> {
        let target = self.layout.offset_for_photo(
            global_index,
            self.options.viewport_height,
            self.scroll_top,
            Align::Auto,
        )?;
        if target != self.scroll_top {
            self.throttle.flush();
            self.refresh(target);
        }
        Some(self.scroll_top)
    }

    /// Stores a decoded thumbnail; it is pinned while its row is on screen.
    pub fn cache_thumbnail(&mut self, file_id: FileId, resource: R) {
        let visible = self.visible_ids.contains(&file_id);
        self.memory.cache_thumbnail(file_id, resource, visible);
    }

    pub fn thumbnail(&mut self, file_id: FileId) -> Option<&R> {
        let hit = self.memory.get_thumbnail(file_id).is_some();
        self.perf
            .record_ratio(Ratio::CacheHitRate, self.memory.stats().hit_rate());
        if !hit {
            return None;
        }
        self.memory.entry(file_id).map(|e| &e.resource)
    }

    pub fn pressure(&self) -> MemoryPressure {
        self.memory.pressure()
    }

    /// Handles an OS memory warning by dropping every off-screen thumbnail.
    pub fn memory_pressure(&mut self) -> MemoryPressureEvent {
        self.memory.aggressive_cleanup()
    }

    fn refresh(&mut self, scroll_top: f64) -> VisibleRange {
        let view = self.options.viewport_height;
        let scroll_top = self.layout.clamp_scroll_top(scroll_top, view);
        self.scroll_top = scroll_top;
        self.store.set_scroll_position(scroll_top);

        let layout = &self.layout;
        let range = self.perf.measure(Operation::ViewportQuery, || {
            layout.visible_range(scroll_top, view)
        });
        if range.total_items > 0 {
            self.perf.record_ratio(
                Ratio::RenderedItems,
                range.len() as f64 / range.total_items as f64,
            );
        }
        self.visible = range;
        self.visible_ids = self
            .layout
            .visible_photo_ids(scroll_top, view)
            .into_iter()
            .collect();
        self.memory.set_visible(self.visible_ids.iter().copied());
        atrace!(
            scroll_top,
            start = range.start_index,
            end = range.end_index,
            "viewport refreshed"
        );
        range
    }
}

fn sanitize_height(height: f64) -> f64 {
    if height.is_finite() { height.max(0.0) } else { 0.0 }
}
