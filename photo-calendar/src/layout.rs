use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    Align, FileId, GroupId, LayoutConfig, LayoutConfigPatch, LayoutError, LayoutItem, MonthGroup,
    Photo, PhotoRect, VisibleRange,
};

/// Turns month groups into an absolutely positioned list of header/grid items.
///
/// The engine is the single writer of its item list. Every change of groups or configuration
/// rebuilds the whole list; there is no incremental patching, so `top` values can never drift.
/// Readers observe [`LayoutEngine::revision`] to detect that a rebuild happened.
#[derive(Clone, Debug)]
pub struct LayoutEngine {
    config: LayoutConfig,
    items_per_row: usize,
    groups: Vec<Arc<MonthGroup>>,
    items: Vec<LayoutItem>,
    total_height: f64,
    // Global index of each group's first photo.
    group_starts: Vec<usize>,
    // Index into `items` of each group's grid.
    grid_items: Vec<usize>,
    photo_count: usize,
    revision: u64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        let config = config.sanitized();
        Self {
            items_per_row: config.items_per_row(),
            config,
            groups: Vec::new(),
            items: Vec::new(),
            total_height: 0.0,
            group_starts: Vec::new(),
            grid_items: Vec::new(),
            photo_count: 0,
            revision: next_revision(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn items_per_row(&self) -> usize {
        self.items_per_row
    }

    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    pub fn groups(&self) -> &[Arc<MonthGroup>] {
        &self.groups
    }

    pub fn total_height(&self) -> f64 {
        self.total_height
    }

    pub fn photo_count(&self) -> usize {
        self.photo_count
    }

    /// Changes after every completed recompute (and when a failed recompute resets the layout).
    ///
    /// Values come from a process-wide counter, so two engines only share a revision when one
    /// is an unmodified clone of the other.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the group set and rebuilds every item.
    pub fn calculate_layout(
        &mut self,
        groups: Vec<Arc<MonthGroup>>,
    ) -> Result<&[LayoutItem], LayoutError> {
        self.groups = groups;
        self.recompute()?;
        Ok(&self.items)
    }

    /// Applies a partial configuration update; rebuilds when a layout already exists.
    pub fn update_config(&mut self, patch: LayoutConfigPatch) -> Result<(), LayoutError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut next = self.config;
        patch.apply_to(&mut next);
        self.set_config(next)
    }

    pub fn set_config(&mut self, config: LayoutConfig) -> Result<(), LayoutError> {
        let config = config.sanitized();
        if config == self.config {
            return Ok(());
        }
        // Overscan only affects viewport queries, not geometry.
        let geometry_unchanged = config.with_overscan(self.config.overscan) == self.config;
        self.config = config;
        if geometry_unchanged {
            return Ok(());
        }
        self.items_per_row = config.items_per_row();
        if self.groups.is_empty() && self.items.is_empty() {
            return Ok(());
        }
        self.recompute()
    }

    /// Drops the current layout (keeps nothing, not even the groups).
    pub fn clear(&mut self) {
        self.groups.clear();
        self.reset();
    }

    fn reset(&mut self) {
        self.items.clear();
        self.group_starts.clear();
        self.grid_items.clear();
        self.total_height = 0.0;
        self.photo_count = 0;
        self.revision = next_revision();
    }

    fn fail(&mut self, group: GroupId, field: &'static str) -> LayoutError {
        cwarn!(%group, field, "non-finite layout geometry, resetting layout");
        self.reset();
        LayoutError::NonFiniteGeometry { group, field }
    }

    fn recompute(&mut self) -> Result<(), LayoutError> {
        match self.build() {
            Ok(built) => {
                self.items = built.items;
                self.group_starts = built.group_starts;
                self.grid_items = built.grid_items;
                self.total_height = built.total_height;
                self.photo_count = built.photo_count;
                self.revision = next_revision();
                cdebug!(
                    groups = self.groups.len(),
                    items = self.items.len(),
                    photos = self.photo_count,
                    items_per_row = self.items_per_row,
                    total_height = self.total_height,
                    "layout recomputed"
                );
                Ok(())
            }
            Err((group, field)) => Err(self.fail(group, field)),
        }
    }

    fn build(&self) -> Result<BuiltLayout, (GroupId, &'static str)> {
        let cfg = &self.config;
        let per_row = self.items_per_row.max(1);
        let row_height = cfg.row_height();

        let mut items = Vec::with_capacity(self.groups.len() * 2);
        let mut group_starts = Vec::with_capacity(self.groups.len());
        let mut grid_items = Vec::with_capacity(self.groups.len());
        let mut top = 0.0f64;
        let mut global = 0usize;

        for (group_index, group) in self.groups.iter().enumerate() {
            if group_index > 0 {
                top += cfg.group_margin;
            }
            if !top.is_finite() {
                return Err((group.id, "top"));
            }

            items.push(LayoutItem::Header {
                group_index,
                group: Arc::clone(group),
                top,
                height: cfg.header_height,
            });
            top += cfg.header_height;

            let rows = group.len().div_ceil(per_row);
            let height = (rows as f64 * row_height).min(cfg.max_grid_height);
            if !(top.is_finite() && height.is_finite()) {
                return Err((group.id, "grid height"));
            }

            grid_items.push(items.len());
            group_starts.push(global);
            items.push(LayoutItem::Grid {
                group_index,
                group: Arc::clone(group),
                top,
                height,
                rows,
            });
            top += height;
            global += group.len();
        }

        if !top.is_finite() {
            let id = self.groups.last().map_or(GroupId::AllPhotos, |g| g.id);
            return Err((id, "total height"));
        }

        Ok(BuiltLayout {
            items,
            group_starts,
            grid_items,
            total_height: top,
            photo_count: global,
        })
    }

    /// Returns the item range intersecting `[scroll_top, scroll_top + viewport_height)`,
    /// expanded by `overscan` on both sides.
    ///
    /// Equivalent to a linear scan for `top < viewport_bottom && top + height > scroll_top`, but
    /// runs two binary searches over the (monotonic) item tops and bottoms. When nothing
    /// intersects the range is empty and is not expanded.
    pub fn find_visible_items(
        &self,
        scroll_top: f64,
        viewport_height: f64,
        overscan: usize,
    ) -> VisibleRange {
        let n = self.items.len();
        if n == 0 {
            return VisibleRange::empty(0, 0);
        }

        let (scroll_top, viewport_bottom) = viewport_bounds(scroll_top, viewport_height);
        let first = self.items.partition_point(|it| it.bottom() <= scroll_top);
        let end = self.items.partition_point(|it| it.top() < viewport_bottom);
        ctrace!(scroll_top, viewport_bottom, first, end, "find_visible_items");

        if first >= end {
            return VisibleRange::empty(end, n);
        }

        VisibleRange {
            start_index: first.saturating_sub(overscan),
            end_index: end.saturating_add(overscan).min(n),
            total_items: n,
        }
    }

    /// [`Self::find_visible_items`] with the configured overscan.
    pub fn visible_range(&self, scroll_top: f64, viewport_height: f64) -> VisibleRange {
        self.find_visible_items(scroll_top, viewport_height, self.config.overscan)
    }

    pub fn visible_items(&self, range: VisibleRange) -> &[LayoutItem] {
        let end = range.end_index.min(self.items.len());
        let start = range.start_index.min(end);
        &self.items[start..end]
    }

    pub fn for_each_visible_item(
        &self,
        scroll_top: f64,
        viewport_height: f64,
        mut f: impl FnMut(usize, &LayoutItem),
    ) {
        let range = self.visible_range(scroll_top, viewport_height);
        for (offset, item) in self.visible_items(range).iter().enumerate() {
            f(range.start_index + offset, item);
        }
    }

    /// Index of the item containing `offset`, if any (margins between groups belong to none).
    pub fn item_at_offset(&self, offset: f64) -> Option<usize> {
        if offset.is_nan() {
            return None;
        }
        let idx = self.items.partition_point(|it| it.bottom() <= offset);
        let item = self.items.get(idx)?;
        (item.top() <= offset).then_some(idx)
    }

    /// Locates a global photo index as `(group_index, index_in_group)`.
    pub fn locate(&self, global_index: usize) -> Option<(usize, usize)> {
        if global_index >= self.photo_count {
            return None;
        }
        // Empty groups share their start with the next group; the last match owns the photo.
        let group_index = self
            .group_starts
            .partition_point(|&start| start <= global_index)
            .checked_sub(1)?;
        let start = self.group_starts[group_index];
        Some((group_index, global_index - start))
    }

    pub fn group_start(&self, group_index: usize) -> Option<usize> {
        self.group_starts.get(group_index).copied()
    }

    pub fn photo(&self, global_index: usize) -> Option<&Photo> {
        let (group_index, index_in_group) = self.locate(global_index)?;
        self.groups.get(group_index)?.photos.get(index_in_group)
    }

    /// Document rectangle of the thumbnail at `global_index`.
    pub fn photo_rect(&self, global_index: usize) -> Option<PhotoRect> {
        let (group_index, index_in_group) = self.locate(global_index)?;
        let grid = self.items.get(*self.grid_items.get(group_index)?)?;
        let per_row = self.items_per_row.max(1);
        let row = index_in_group / per_row;
        let column = index_in_group % per_row;
        let cfg = &self.config;
        let cell = cfg.row_height();
        Some(PhotoRect {
            x: cfg.thumbnail_padding + column as f64 * cell,
            y: grid.top() + row as f64 * cell,
            width: cfg.thumbnail_size,
            height: cfg.thumbnail_size,
        })
    }

    pub fn max_scroll_top(&self, viewport_height: f64) -> f64 {
        let view = if viewport_height.is_finite() {
            viewport_height.max(0.0)
        } else {
            0.0
        };
        (self.total_height - view).max(0.0)
    }

    pub fn clamp_scroll_top(&self, scroll_top: f64, viewport_height: f64) -> f64 {
        if scroll_top.is_nan() {
            return 0.0;
        }
        scroll_top.clamp(0.0, self.max_scroll_top(viewport_height))
    }

    /// Scroll offset that brings the photo at `global_index` into view.
    pub fn offset_for_photo(
        &self,
        global_index: usize,
        viewport_height: f64,
        current_scroll: f64,
        align: Align,
    ) -> Option<f64> {
        let rect = self.photo_rect(global_index)?;
        let view = if viewport_height.is_finite() {
            viewport_height.max(0.0)
        } else {
            0.0
        };

        let target = match align {
            Align::Start => rect.y,
            Align::End => rect.bottom() - view,
            Align::Center => rect.y + rect.height / 2.0 - view / 2.0,
            Align::Auto => {
                let cur_end = current_scroll + view;
                if rect.y >= current_scroll && rect.bottom() <= cur_end {
                    current_scroll
                } else if rect.y < current_scroll {
                    rect.y
                } else {
                    rect.bottom() - view
                }
            }
        };

        Some(self.clamp_scroll_top(target, viewport_height))
    }

    /// Global index of the first photo in the topmost row intersecting the viewport.
    pub fn first_visible_photo(&self, scroll_top: f64, viewport_height: f64) -> Option<usize> {
        let (scroll_top, viewport_bottom) = viewport_bounds(scroll_top, viewport_height);
        let range = self.find_visible_items(scroll_top, viewport_bottom - scroll_top, 0);
        let per_row = self.items_per_row.max(1);
        let row_height = self.config.row_height();

        for item in self.visible_items(range) {
            let &LayoutItem::Grid {
                group_index,
                top,
                rows,
                ..
            } = item
            else {
                continue;
            };
            let row = if row_height > 0.0 {
                ((scroll_top - top) / row_height).floor().max(0.0) as usize
            } else {
                0
            };
            if row >= rows {
                continue;
            }
            return Some(self.group_starts.get(group_index)? + row * per_row);
        }
        None
    }

    /// Ids of the thumbnails whose rows intersect the viewport (no overscan).
    pub fn visible_photo_ids(&self, scroll_top: f64, viewport_height: f64) -> Vec<FileId> {
        let mut out = Vec::new();
        let (scroll_top, viewport_bottom) = viewport_bounds(scroll_top, viewport_height);
        let range = self.find_visible_items(scroll_top, viewport_bottom - scroll_top, 0);
        let per_row = self.items_per_row.max(1);
        let row_height = self.config.row_height();

        for item in self.visible_items(range) {
            let &LayoutItem::Grid {
                ref group, top, rows, ..
            } = item
            else {
                continue;
            };
            if rows == 0 {
                continue;
            }
            let (first_row, last_row) = if row_height > 0.0 {
                let first = ((scroll_top - top) / row_height).floor().max(0.0) as usize;
                let last = ((viewport_bottom - top) / row_height).ceil().max(1.0) as usize - 1;
                (first, last.min(rows - 1))
            } else {
                (0, rows - 1)
            };
            if first_row > last_row {
                continue;
            }
            let start = first_row * per_row;
            let end = ((last_row + 1) * per_row).min(group.len());
            out.extend(group.photos[start..end].iter().map(Photo::id));
        }
        out
    }
}

struct BuiltLayout {
    items: Vec<LayoutItem>,
    group_starts: Vec<usize>,
    grid_items: Vec<usize>,
    total_height: f64,
    photo_count: usize,
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

fn viewport_bounds(scroll_top: f64, viewport_height: f64) -> (f64, f64) {
    let scroll_top = if scroll_top.is_nan() { 0.0 } else { scroll_top };
    let height = if viewport_height.is_nan() || viewport_height < 0.0 {
        0.0
    } else {
        viewport_height
    };
    (scroll_top, scroll_top + height)
}
