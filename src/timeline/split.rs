use super::item::TrackItem;
use crate::foundation::error::{ReelError, ReelResult};

/// Cut `item` at `cut` (timeline frame) and return the right-hand piece as a new item.
///
/// `item` keeps `[start, cut)` with `offset_r = frame_count + start - cut - offset_l`. The new
/// item shares the source, starts at `cut` with `offset_l + (cut - start)`, keeps the original
/// `frame_count` and ends at `cut + frame_count`. Both pieces continue the source where the
/// other stops, also for items that were trimmed or split before.
///
/// Fails with `InvalidSplit` unless `start < cut < end`; `item` is untouched on failure.
pub fn split(item: &mut TrackItem, cut: u64) -> ReelResult<TrackItem> {
    let span = *item.span();
    if !(span.start < cut && cut < span.end) {
        return Err(ReelError::invalid_split(format!(
            "cut frame {cut} is outside ({}, {})",
            span.start, span.end
        )));
    }

    let mut right = item.duplicate();
    {
        let s = right.span_mut();
        s.start = cut;
        s.end = cut.saturating_add(span.frame_count);
        s.offset_l = span.offset_l + (cut - span.start);
        s.offset_r = 0;
    }

    let left = item.span_mut();
    left.end = cut;
    left.offset_r = (span.frame_count + span.start).saturating_sub(cut + span.offset_l);

    tracing::debug!(
        item = %item.id(),
        new_item = %right.id(),
        cut,
        "split item"
    );
    Ok(right)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/split.rs"]
mod tests;
