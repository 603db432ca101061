use crate::{FileId, GroupId};

/// Problems encountered while bucketing files into month groups.
///
/// None of these abort grouping: a malformed record is diverted into the unknown-date group, and
/// an inconsistent assembly degrades to the single all-photos group.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GroupingError {
    #[error("malformed file record {id}: {reason}")]
    MalformedRecord { id: FileId, reason: &'static str },
    #[error("grouping lost photos: expected {expected}, assembled {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// A layout recompute that could not produce finite geometry.
///
/// The engine is reset to an empty layout before this is returned, so callers can offer a retry
/// or a fallback view.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout produced a non-finite {field} for group {group}")]
    NonFiniteGeometry { group: GroupId, field: &'static str },
}
