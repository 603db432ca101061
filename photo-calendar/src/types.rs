use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Stable identity of a file, supplied by the external file store.
pub type FileId = u64;

/// A file record as supplied by the external file store.
///
/// The core never mutates records; groups and layout items share them through `Arc`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub date_added: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn new(id: FileId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            size: 0,
            width: 0,
            height: 0,
            date_created: None,
            date_modified: None,
            date_added: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_date_created(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date_created = date;
        self
    }

    pub fn with_date_modified(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date_modified = date;
        self
    }

    pub fn with_date_added(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date_added = date;
        self
    }
}

/// A photo reference inside a [`MonthGroup`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Photo {
    pub file: Arc<FileRecord>,
    /// The first reasonable date of `created → modified → added`, if any.
    pub effective_date: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn id(&self) -> FileId {
        self.file.id
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }
}

/// Identity of a month group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupId {
    /// `month` is zero-based (0 = January).
    Month { year: i32, month: u32 },
    /// Photos without any reasonable date.
    UnknownDate,
    /// The single synthetic group produced when grouping degrades.
    AllPhotos,
}

impl GroupId {
    pub const UNKNOWN_DATE: &'static str = "unknown-date";
    pub const ALL_PHOTOS: &'static str = "all-photos";

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Month { .. })
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{year:04}-{:02}", month + 1),
            Self::UnknownDate => f.write_str(Self::UNKNOWN_DATE),
            Self::AllPhotos => f.write_str(Self::ALL_PHOTOS),
        }
    }
}

/// A bucket of photos sharing an effective year/month (or one of the sentinel buckets).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonthGroup {
    pub id: GroupId,
    pub display_name: String,
    pub year: Option<i32>,
    /// Zero-based month, `None` for sentinel groups.
    pub month: Option<u32>,
    pub photos: Vec<Photo>,
}

impl MonthGroup {
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// A positioned block of the virtual document.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutItem {
    Header {
        group_index: usize,
        group: Arc<MonthGroup>,
        top: f64,
        height: f64,
    },
    Grid {
        group_index: usize,
        group: Arc<MonthGroup>,
        top: f64,
        height: f64,
        /// Number of thumbnail rows rendered by this grid.
        rows: usize,
    },
}

impl LayoutItem {
    pub fn top(&self) -> f64 {
        match self {
            Self::Header { top, .. } | Self::Grid { top, .. } => *top,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            Self::Header { height, .. } | Self::Grid { height, .. } => *height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top() + self.height()
    }

    pub fn group(&self) -> &Arc<MonthGroup> {
        match self {
            Self::Header { group, .. } | Self::Grid { group, .. } => group,
        }
    }

    pub fn group_index(&self) -> usize {
        match self {
            Self::Header { group_index, .. } | Self::Grid { group_index, .. } => *group_index,
        }
    }

    /// The photos rendered by this item; empty for headers.
    pub fn photos(&self) -> &[Photo] {
        match self {
            Self::Header { .. } => &[],
            Self::Grid { group, .. } => &group.photos,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header { .. })
    }

    pub fn intersects(&self, scroll_top: f64, viewport_bottom: f64) -> bool {
        self.top() < viewport_bottom && self.bottom() > scroll_top
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleRange {
    pub start_index: usize,
    pub end_index: usize, // exclusive, includes overscan
    pub total_items: usize,
}

impl VisibleRange {
    pub const fn empty(at: usize, total_items: usize) -> Self {
        Self {
            start_index: at,
            end_index: at,
            total_items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index
    }
}

/// Absolute thumbnail rectangle in document coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhotoRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PhotoRect {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Where to place a photo when scrolling it into view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Grid position of a photo, rebuilt on demand by the navigator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhotoPosition {
    pub file_id: FileId,
    /// Row within the owning month grid.
    pub row: usize,
    pub column: usize,
    pub group_index: usize,
    pub index_in_group: usize,
    pub global_index: usize,
}
