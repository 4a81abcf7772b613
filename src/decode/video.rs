use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::ffmpeg::{decode_frame_rgba8, probe, require_path};
use super::{DecodedFrame, MediaDecoder, blocking};
use crate::assets::source::ContentHash;
use crate::foundation::error::{ReelError, ReelResult};
use crate::store::StoredBlob;

/// Stream-level facts about a decoded video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub duration_us: u64,
    pub has_audio: bool,
}

/// Preview frame sampled at `ts_us`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    pub ts_us: u64,
    pub frame: DecodedFrame,
}

/// Decoded video handle. Frame access is blocking; callers run it off the async executor.
pub trait VideoClip: Send + Sync + fmt::Debug {
    fn meta(&self) -> VideoMeta;

    /// Frame shown at `ts_us` (source time). `None` when nothing is decodable there.
    fn frame_at(&self, ts_us: u64) -> ReelResult<Option<DecodedFrame>>;

    /// Up to `count` frames spaced `step_us` apart from the start of the clip.
    fn thumbnails(&self, count: usize, step_us: u64) -> ReelResult<Vec<Thumbnail>> {
        let duration = self.meta().duration_us;
        let mut out = Vec::with_capacity(count);
        for i in 0..count as u64 {
            let ts_us = i.saturating_mul(step_us);
            if ts_us >= duration {
                break;
            }
            if let Some(frame) = self.frame_at(ts_us)? {
                out.push(Thumbnail { ts_us, frame });
            }
        }
        Ok(out)
    }
}

/// Bounded least-recently-used map of decoded frames keyed by millisecond.
#[derive(Debug)]
pub(crate) struct FrameLru {
    frames: HashMap<u64, DecodedFrame>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl FrameLru {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            frames: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn key_for(ts_us: u64) -> u64 {
        ts_us / 1_000
    }

    pub(crate) fn get(&mut self, key: u64) -> Option<DecodedFrame> {
        let frame = self.frames.get(&key).cloned()?;
        self.touch(key);
        Some(frame)
    }

    pub(crate) fn insert(&mut self, key: u64, frame: DecodedFrame) {
        self.frames.insert(key, frame);
        self.touch(key);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.frames.remove(&old);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key);
    }
}

/// Video decoded through the `ffmpeg` CLI, reading from the byte store's on-disk copy.
pub struct FfmpegVideoClip {
    id: ContentHash,
    path: PathBuf,
    meta: VideoMeta,
    cache: Mutex<FrameLru>,
}

impl fmt::Debug for FfmpegVideoClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfmpegVideoClip")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish()
    }
}

impl VideoClip for FfmpegVideoClip {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn frame_at(&self, ts_us: u64) -> ReelResult<Option<DecodedFrame>> {
        if ts_us >= self.meta.duration_us {
            return Ok(None);
        }
        let key = FrameLru::key_for(ts_us);
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
        {
            return Ok(Some(hit));
        }

        let Some(rgba) = decode_frame_rgba8(&self.path, self.meta.width, self.meta.height, ts_us)?
        else {
            return Ok(None);
        };
        let frame = DecodedFrame::from_straight(self.meta.width, self.meta.height, rgba)?;
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key, frame.clone());
        Ok(Some(frame))
    }
}

/// Produces [`FfmpegVideoClip`] handles.
#[derive(Clone, Copy, Debug)]
pub struct FfmpegVideoDecoder {
    /// Decoded frames retained per clip.
    pub frame_cache: usize,
}

impl Default for FfmpegVideoDecoder {
    fn default() -> Self {
        Self { frame_cache: 64 }
    }
}

#[async_trait]
impl MediaDecoder<dyn VideoClip> for FfmpegVideoDecoder {
    async fn decode(&self, blob: StoredBlob) -> ReelResult<Arc<dyn VideoClip>> {
        let path = require_path(&blob)?.to_path_buf();
        let capacity = self.frame_cache;
        let id = blob.id;
        blocking(move || {
            let info = probe(&path)?;
            let (Some(width), Some(height)) = (info.width, info.height) else {
                return Err(ReelError::decode(format!("'{id}' has no video stream")));
            };
            let clip: Arc<dyn VideoClip> = Arc::new(FfmpegVideoClip {
                id,
                path,
                meta: VideoMeta {
                    width,
                    height,
                    duration_us: info.duration_us,
                    has_audio: info.has_audio,
                },
                cache: Mutex::new(FrameLru::new(capacity)),
            });
            Ok(clip)
        })
        .await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/video.rs"]
mod tests;
