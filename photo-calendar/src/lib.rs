//! A headless engine for month-bucketed photo calendars.
//!
//! This crate holds the algorithmic core of a scrolling "calendar" gallery over very large,
//! date-ordered photo collections:
//! - date grouping with fallback and validation rules ([`DateGroupingEngine`])
//! - absolutely positioned header/grid layout ([`LayoutEngine`])
//! - binary-search viewport windowing ([`LayoutEngine::find_visible_items`])
//! - 2-D keyboard navigation across month boundaries ([`KeyboardNavigator`])
//! - a visibility-pinned LRU for thumbnail resources ([`MemoryManager`])
//!
//! It is UI-agnostic. A GUI layer is expected to provide:
//! - the ordered file records
//! - container width, viewport height and scroll offset
//! - decoded thumbnail resources and the set of thumbnails actually on screen
//!
//! For adapter-level utilities (scroll throttling, selection, anchoring), see the
//! `photo-calendar-adapter` crate.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod cancel;
pub mod date;
mod error;
mod grouping;
mod layout;
pub mod memory;
mod navigation;
mod options;
pub mod perf;
mod types;

#[cfg(test)]
mod tests;

pub use cancel::CancellationToken;
pub use date::{DateCache, is_reasonable_date, parse_date, resolve_effective_date};
pub use error::{GroupingError, LayoutError};
pub use grouping::{
    DateGroupingEngine, Grouping, GroupingJob, GroupingOptions, GroupingOutcome, GroupingStatus,
    GroupingStrategy, JobStep, Progress, fallback_grouping,
};
pub use layout::LayoutEngine;
pub use memory::{
    MemoryConfig, MemoryManager, MemoryPressure, MemoryPressureEvent, MemoryStats,
    PressureCallback, ThumbnailCacheEntry, ThumbnailResource,
};
pub use navigation::KeyboardNavigator;
pub use options::{LayoutConfig, LayoutConfigPatch};
pub use perf::PerformanceMonitor;
pub use types::{
    Align, Direction, FileId, FileRecord, GroupId, LayoutItem, MonthGroup, Photo, PhotoPosition,
    PhotoRect, VisibleRange,
};
