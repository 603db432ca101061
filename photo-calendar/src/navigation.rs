use std::collections::HashMap;

use crate::{Direction, FileId, LayoutEngine, LayoutItem, Photo, PhotoPosition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MonthSpan {
    group_index: usize,
    start: usize,
    len: usize,
}

impl MonthSpan {
    fn last_row(&self, per_row: usize) -> usize {
        (self.len - 1) / per_row
    }

    /// Global index of `column` in the span's last row, clamped to the row's length.
    fn last_row_at(&self, per_row: usize, column: usize) -> usize {
        let row_start = self.last_row(per_row) * per_row;
        let row_len = self.len - row_start;
        self.start + row_start + column.min(row_len - 1)
    }

    fn first_row_at(&self, column: usize) -> usize {
        self.start + column.min(self.len - 1)
    }
}

/// 2-D grid navigation across month boundaries.
///
/// The position map is derived from the committed items of a [`LayoutEngine`] and tagged with
/// its revision. Every query takes the layout and rebuilds first when the revision moved, so a
/// stale map is never read. After a failed recompute the layout has no items and the map is
/// empty, even though the engine keeps its groups for a retry.
#[derive(Clone, Debug, Default)]
pub struct KeyboardNavigator {
    revision: Option<u64>,
    items_per_row: usize,
    positions: Vec<PhotoPosition>,
    by_id: HashMap<FileId, usize>,
    // Non-empty groups only, in layout order.
    months: Vec<MonthSpan>,
}

impl KeyboardNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revisions are unique across engines, so a map built for a different engine is stale too.
    pub fn is_stale(&self, layout: &LayoutEngine) -> bool {
        self.revision != Some(layout.revision())
    }

    pub fn invalidate(&mut self) {
        self.revision = None;
    }

    pub fn rebuild(&mut self, layout: &LayoutEngine) {
        let per_row = layout.items_per_row().max(1);
        self.items_per_row = per_row;
        self.positions.clear();
        self.by_id.clear();
        self.months.clear();
        self.positions.reserve(layout.photo_count());

        let mut global_index = 0usize;
        for item in layout.items() {
            let &LayoutItem::Grid {
                group_index,
                ref group,
                ..
            } = item
            else {
                continue;
            };
            if group.is_empty() {
                continue;
            }
            self.months.push(MonthSpan {
                group_index,
                start: global_index,
                len: group.len(),
            });
            for (index_in_group, photo) in group.photos.iter().enumerate() {
                self.positions.push(PhotoPosition {
                    file_id: photo.id(),
                    row: index_in_group / per_row,
                    column: index_in_group % per_row,
                    group_index,
                    index_in_group,
                    global_index,
                });
                self.by_id.entry(photo.id()).or_insert(global_index);
                global_index += 1;
            }
        }

        self.revision = Some(layout.revision());
        cdebug!(
            photos = self.positions.len(),
            months = self.months.len(),
            items_per_row = per_row,
            "navigator rebuilt"
        );
    }

    fn ensure_fresh(&mut self, layout: &LayoutEngine) {
        if self.is_stale(layout) {
            self.rebuild(layout);
        }
    }

    pub fn len(&mut self, layout: &LayoutEngine) -> usize {
        self.ensure_fresh(layout);
        self.positions.len()
    }

    pub fn position(&mut self, layout: &LayoutEngine, global_index: usize) -> Option<PhotoPosition> {
        self.ensure_fresh(layout);
        self.positions.get(global_index).copied()
    }

    /// Position of a file id; duplicated ids resolve to their first occurrence.
    pub fn position_of(&mut self, layout: &LayoutEngine, file_id: FileId) -> Option<PhotoPosition> {
        self.ensure_fresh(layout);
        let index = *self.by_id.get(&file_id)?;
        self.positions.get(index).copied()
    }

    pub fn photo<'a>(&mut self, layout: &'a LayoutEngine, global_index: usize) -> Option<&'a Photo> {
        self.ensure_fresh(layout);
        self.positions.get(global_index)?;
        layout.photo(global_index)
    }

    pub fn first(&mut self, layout: &LayoutEngine) -> Option<usize> {
        self.ensure_fresh(layout);
        (!self.positions.is_empty()).then_some(0)
    }

    pub fn last(&mut self, layout: &LayoutEngine) -> Option<usize> {
        self.ensure_fresh(layout);
        self.positions.len().checked_sub(1)
    }

    pub fn month_start(&mut self, layout: &LayoutEngine, global_index: usize) -> Option<usize> {
        self.ensure_fresh(layout);
        self.month_of(global_index).map(|m| self.months[m].start)
    }

    pub fn month_end(&mut self, layout: &LayoutEngine, global_index: usize) -> Option<usize> {
        self.ensure_fresh(layout);
        self.month_of(global_index)
            .map(|m| self.months[m].start + self.months[m].len - 1)
    }

    /// Returns the next photo index, or `None` for "no move".
    pub fn navigate(
        &mut self,
        layout: &LayoutEngine,
        current: usize,
        direction: Direction,
    ) -> Option<usize> {
        self.ensure_fresh(layout);
        let next = self.step(current, direction);
        ctrace!(current, ?direction, ?next, "navigate");
        next
    }

    fn month_of(&self, global_index: usize) -> Option<usize> {
        if global_index >= self.positions.len() {
            return None;
        }
        self.months
            .partition_point(|m| m.start <= global_index)
            .checked_sub(1)
    }

    fn step(&self, current: usize, direction: Direction) -> Option<usize> {
        let pos = self.positions.get(current)?;
        let per_row = self.items_per_row.max(1);

        match direction {
            // Global indexes run row by row and month by month, so the previous/next index is
            // the row-wrap and month-wrap target at once.
            Direction::Left => current.checked_sub(1),
            Direction::Right => {
                let next = current + 1;
                (next < self.positions.len()).then_some(next)
            }
            Direction::Up => {
                if pos.row > 0 {
                    return Some(current - per_row);
                }
                let month = self.month_of(current)?;
                let prev = self.months.get(month.checked_sub(1)?)?;
                Some(prev.last_row_at(per_row, pos.column))
            }
            Direction::Down => {
                let month = self.month_of(current)?;
                let span = self.months[month];
                if pos.row < span.last_row(per_row) {
                    let target = (pos.index_in_group + per_row).min(span.len - 1);
                    return Some(span.start + target);
                }
                let next = self.months.get(month + 1)?;
                Some(next.first_row_at(pos.column))
            }
        }
    }

    /// Layout group index owning the photo, if known.
    pub fn group_index_of(&mut self, layout: &LayoutEngine, global_index: usize) -> Option<usize> {
        self.ensure_fresh(layout);
        self.month_of(global_index).map(|m| self.months[m].group_index)
    }
}
