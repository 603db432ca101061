use std::collections::HashSet;
use std::sync::Arc;

use photo_calendar::{FileId, LayoutEngine, Photo};

/// How a pointer or key event changes the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectMode {
    /// Select only the target photo.
    Replace,
    /// Flip the target photo (ctrl/cmd-click).
    Toggle,
    /// Select the contiguous run from the anchor to the target (shift-click).
    Range,
}

impl SelectMode {
    /// The `(additive, range)` flags handed to [`PhotoSelectCallback`]. At most one is set.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Replace => (false, false),
            Self::Toggle => (true, false),
            Self::Range => (false, true),
        }
    }
}

/// Modifier keys held during a selection event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionModifiers {
    pub toggle: bool,
    pub range: bool,
}

impl SelectionModifiers {
    pub const NONE: Self = Self {
        toggle: false,
        range: false,
    };

    pub fn with_toggle(mut self, toggle: bool) -> Self {
        self.toggle = toggle;
        self
    }

    pub fn with_range(mut self, range: bool) -> Self {
        self.range = range;
        self
    }

    /// Range wins when both modifiers are held.
    pub fn mode(self) -> SelectMode {
        if self.range {
            SelectMode::Range
        } else if self.toggle {
            SelectMode::Toggle
        } else {
            SelectMode::Replace
        }
    }
}

/// `on_photo_select(photo, additive, range)`.
pub type PhotoSelectCallback = Arc<dyn Fn(&Photo, bool, bool) + Send + Sync>;

/// The set of selected photos plus the anchor used for range selection.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    selected: HashSet<FileId>,
    // Global index of the last replace/toggle target.
    anchor: Option<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, file_id: FileId) -> bool {
        self.selected.contains(&file_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.selected.iter().copied()
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Applies `mode` to the photo at `global_index`. Returns `false` if there is no such photo.
    pub fn apply(&mut self, layout: &LayoutEngine, global_index: usize, mode: SelectMode) -> bool {
        let Some(photo) = layout.photo(global_index) else {
            return false;
        };
        match mode {
            SelectMode::Replace => {
                self.selected.clear();
                self.selected.insert(photo.id());
                self.anchor = Some(global_index);
            }
            SelectMode::Toggle => {
                if !self.selected.remove(&photo.id()) {
                    self.selected.insert(photo.id());
                }
                self.anchor = Some(global_index);
            }
            SelectMode::Range => {
                let anchor = match self.anchor {
                    Some(a) if a < layout.photo_count() => a,
                    _ => global_index,
                };
                let (lo, hi) = (anchor.min(global_index), anchor.max(global_index));
                self.selected.clear();
                self.selected
                    .extend((lo..=hi).filter_map(|i| layout.photo(i)).map(Photo::id));
                self.anchor = Some(anchor);
            }
        }
        true
    }

    /// Drops selected ids that fail `keep` and forgets the range anchor (indexes are only valid
    /// for the layout they were taken from).
    pub fn retain(&mut self, mut keep: impl FnMut(FileId) -> bool) {
        self.selected.retain(|id| keep(*id));
        self.anchor = None;
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }
}
