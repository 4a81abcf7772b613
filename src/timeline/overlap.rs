//! Placement checks within one lane.

use super::item::{ItemId, TrackItem};

/// Result of checking a candidate span against a lane.
///
/// Indices refer to the lane's items with the candidate itself left out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlapCheck {
    pub has_overlap: bool,
    /// First conflicting item, in scan order.
    pub overlap_index: Option<usize>,
    /// Number of items ending at or before the candidate's start.
    pub insert_index: usize,
}

/// `true` when `[a_start, a_end)` and `[b_start, b_end)` share an interior point, or `b` is
/// contained in `a`. Touching boundaries never overlap.
pub fn spans_overlap(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> bool {
    (b_start < a_start && a_start < b_end)
        || (b_start < a_end && a_end < b_end)
        || (b_start >= a_start && b_end <= a_end)
}

/// Check `[start, end)` against `items`, skipping the item whose id is `exclude`.
pub fn check_span<'a>(
    items: impl IntoIterator<Item = &'a TrackItem>,
    exclude: Option<ItemId>,
    start: u64,
    end: u64,
) -> OverlapCheck {
    let mut out = OverlapCheck {
        has_overlap: false,
        overlap_index: None,
        insert_index: 0,
    };
    let others = items
        .into_iter()
        .filter(|it| Some(it.id()) != exclude)
        .enumerate();
    for (idx, existing) in others {
        if existing.end() <= start {
            out.insert_index += 1;
        }
        let hit = spans_overlap(start, end, existing.start(), existing.end());
        if hit && out.overlap_index.is_none() {
            out.has_overlap = true;
            out.overlap_index = Some(idx);
        }
    }
    out
}

/// Check `candidate` against a lane's items. Never fails; the caller decides what to do.
pub fn check_overlap(items: &[TrackItem], candidate: &TrackItem) -> OverlapCheck {
    check_span(items, Some(candidate.id()), candidate.start(), candidate.end())
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/overlap.rs"]
mod tests;
