//! Keeps per-item audio transports in step with the play head.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::assets::source::Source;
use crate::foundation::core::Fps;
use crate::foundation::error::ReelResult;
use crate::timeline::item::{ItemId, TrackItem};
use crate::timeline::lane::Timeline;

/// A playable audio stream, e.g. an output device voice.
pub trait Transport: Send {
    fn is_paused(&self) -> bool;
    /// Position in source seconds.
    fn seek(&mut self, secs: f64);
    fn play(&mut self) -> ReelResult<()>;
    fn pause(&mut self);
}

/// Opens a transport for a source the first time one of its items becomes audible.
pub trait TransportFactory: Send + Sync {
    fn open(&self, source: &Arc<Source>) -> ReelResult<Box<dyn Transport>>;
}

/// Starts, seeks and stops transports for the audible items under the play head.
pub struct PlaybackController {
    factory: Arc<dyn TransportFactory>,
    fps: Fps,
    transports: HashMap<ItemId, Box<dyn Transport>>,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("fps", &self.fps)
            .field("transports", &self.transports.len())
            .finish_non_exhaustive()
    }
}

/// Source time in seconds heard at timeline `frame`.
pub fn seek_secs(item: &TrackItem, frame: u64, fps: Fps) -> f64 {
    let span = item.span();
    let frames = frame as i64 - span.start as i64 - span.offset_l as i64;
    fps.frames_to_secs(frames).max(0.0)
}

impl PlaybackController {
    pub fn new(factory: Arc<dyn TransportFactory>, fps: Fps) -> Self {
        Self {
            factory,
            fps,
            transports: HashMap::new(),
        }
    }

    /// Bring transports in line with `frame` and the play state.
    ///
    /// While playing, paused transports of audible items are seeked and started; transports
    /// of items no longer under the play head are paused. When not playing everything pauses.
    pub fn sync(&mut self, timeline: &Timeline, frame: u64, playing: bool) -> ReelResult<()> {
        if !playing {
            self.pause_all();
            return Ok(());
        }

        let audible = timeline.audible_items_at(frame);
        for (id, transport) in self.transports.iter_mut() {
            if !transport.is_paused() && !audible.iter().any(|it| it.id() == *id) {
                transport.pause();
            }
        }
        for item in audible {
            let Some(source) = item.source() else {
                continue;
            };
            let transport = match self.transports.entry(item.id()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(self.factory.open(source)?)
                }
            };
            if transport.is_paused() {
                let secs = seek_secs(item, frame, self.fps);
                debug!(item = %item.id(), secs, "starting transport");
                transport.seek(secs);
                transport.play()?;
            }
        }
        Ok(())
    }

    pub fn pause_all(&mut self) {
        for transport in self.transports.values_mut() {
            if !transport.is_paused() {
                transport.pause();
            }
        }
    }

    /// Drop transports for items that are no longer on `timeline`.
    pub fn prune(&mut self, timeline: &Timeline) {
        self.transports
            .retain(|id, _| timeline.find(*id).is_some());
    }

    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/playback.rs"]
mod tests;
