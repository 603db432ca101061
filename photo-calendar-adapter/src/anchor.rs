use photo_calendar::{FileId, LayoutEngine};

/// Keeps a photo at the same place in the viewport across relayouts (e.g. container resize).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutAnchor {
    pub file_id: FileId,
    /// The distance from the photo's row top to the viewport's scroll offset. Negative when the
    /// row starts below the viewport top (e.g. under a visible month header).
    pub offset_in_viewport: f64,
}

/// Captures an anchor for the first photo of the topmost visible row.
///
/// Returns `None` when no photo row intersects the viewport.
pub fn capture_anchor(
    layout: &LayoutEngine,
    scroll_top: f64,
    viewport_height: f64,
) -> Option<LayoutAnchor> {
    let index = layout.first_visible_photo(scroll_top, viewport_height)?;
    let photo = layout.photo(index)?;
    let rect = layout.photo_rect(index)?;
    Some(LayoutAnchor {
        file_id: photo.id(),
        offset_in_viewport: scroll_top - rect.y,
    })
}

/// Computes the scroll offset that restores a previously captured anchor.
///
/// The adapter must provide an `id_to_index` mapping for the *current* layout. Returns the
/// clamped offset, or `None` when the anchored photo is gone.
pub fn apply_anchor(
    layout: &LayoutEngine,
    anchor: &LayoutAnchor,
    viewport_height: f64,
    mut id_to_index: impl FnMut(FileId) -> Option<usize>,
) -> Option<f64> {
    let index = id_to_index(anchor.file_id)?;
    let rect = layout.photo_rect(index)?;
    Some(layout.clamp_scroll_top(rect.y + anchor.offset_in_viewport, viewport_height))
}
