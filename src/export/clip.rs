//! Trimmed views over decoded media. Cutting a clip never copies the decoded data.

use std::sync::Arc;

use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// `[start_us, end_us)` of a shared decoded handle, in source microseconds.
///
/// `end_us = None` runs to the end of the source.
#[derive(Debug)]
pub struct ClipSpan<H: ?Sized> {
    handle: Arc<H>,
    start_us: u64,
    end_us: Option<u64>,
}

impl<H: ?Sized> Clone for ClipSpan<H> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            start_us: self.start_us,
            end_us: self.end_us,
        }
    }
}

impl<H: ?Sized> ClipSpan<H> {
    /// The whole source.
    pub fn whole(handle: Arc<H>) -> Self {
        Self {
            handle,
            start_us: 0,
            end_us: None,
        }
    }

    pub fn handle(&self) -> &Arc<H> {
        &self.handle
    }

    pub fn start_us(&self) -> u64 {
        self.start_us
    }

    pub fn end_us(&self) -> Option<u64> {
        self.end_us
    }

    pub fn duration_us(&self) -> Option<u64> {
        self.end_us.map(|end| end - self.start_us)
    }

    /// Source timestamp for `local_us` into this view.
    pub fn source_time(&self, local_us: u64) -> u64 {
        self.start_us.saturating_add(local_us)
    }

    /// `true` when both views read the same decoded handle.
    pub fn shares_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    /// Cut `at_us` into the view, returning the left and right pieces.
    pub fn split(&self, at_us: u64) -> ReelResult<(Self, Self)> {
        if at_us == 0 {
            return Err(ReelError::validation("clip split at 0 leaves an empty head"));
        }
        if let Some(d) = self.duration_us()
            && at_us >= d
        {
            return Err(ReelError::validation(format!(
                "clip split at {at_us}us is outside a {d}us clip"
            )));
        }
        let cut = self.start_us.saturating_add(at_us);
        let left = Self {
            handle: self.handle.clone(),
            start_us: self.start_us,
            end_us: Some(cut),
        };
        let right = Self {
            handle: self.handle.clone(),
            start_us: cut,
            end_us: self.end_us,
        };
        Ok((left, right))
    }
}

/// Narrow `clip` to the part an item presents after trimming `offset_l` / `offset_r` frames
/// off its `frame_count`-long natural span.
pub fn split_clip<H: ?Sized>(
    clip: ClipSpan<H>,
    offset_l: u64,
    offset_r: u64,
    frame_count: u64,
    fps: Fps,
) -> ReelResult<ClipSpan<H>> {
    let mut clip = clip;
    if offset_l > 0 {
        clip = clip.split(fps.frames_to_micros(offset_l))?.1;
    }
    if offset_r > 0 {
        let kept = frame_count
            .checked_sub(offset_l + offset_r)
            .filter(|k| *k > 0)
            .ok_or_else(|| {
                ReelError::validation(format!(
                    "trim {offset_l}+{offset_r} leaves nothing of {frame_count} frames"
                ))
            })?;
        clip = clip.split(fps.frames_to_micros(kept))?.0;
    }
    Ok(clip)
}

#[cfg(test)]
#[path = "../../tests/unit/export/clip.rs"]
mod tests;
