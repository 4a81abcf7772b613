//! Hand-off of committed frames to whatever displays them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::surface::FrameRGBA;

/// Receives one fully composed frame per commit.
pub trait OutputSink: Send + Sync {
    fn present(&self, frame: Arc<FrameRGBA>);
}

/// Visible half of the preview double buffer.
///
/// The scheduler draws into its own surface and swaps a finished snapshot in here, so readers
/// only ever see complete frames.
#[derive(Debug, Default)]
pub struct FrontBuffer {
    current: Mutex<Option<Arc<FrameRGBA>>>,
    presented: AtomicU64,
}

impl FrontBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last presented frame.
    pub fn current(&self) -> Option<Arc<FrameRGBA>> {
        self.current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Acquire)
    }
}

impl OutputSink for FrontBuffer {
    fn present(&self, frame: Arc<FrameRGBA>) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(frame);
        self.presented.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/output.rs"]
mod tests;
