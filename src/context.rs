//! Shared state threaded through import, preview and export.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::assets::source::{ContentHash, MediaKind, Source, SourceRegistry};
use crate::assets::text::TextLayoutEngine;
use crate::config::EngineConfig;
use crate::decode::audio::{AudioPcm, FfmpegAudioDecoder};
use crate::decode::cache::{DecodeCache, Memo};
use crate::decode::image::{ImageDecoder, ImageFrames};
use crate::decode::video::{FfmpegVideoDecoder, Thumbnail, VideoClip};
use crate::decode::{DecodedFrame, MediaDecoder, blocking};
use crate::foundation::error::{ReelError, ReelResult};
use crate::store::ByteStore;

/// Decoder set used to build a [`CompositionContext`].
#[derive(Clone)]
pub struct Decoders {
    pub video: Arc<dyn MediaDecoder<dyn VideoClip>>,
    pub image: Arc<dyn MediaDecoder<ImageFrames>>,
    pub audio: Arc<dyn MediaDecoder<AudioPcm>>,
}

impl Decoders {
    /// `image` crate stills/GIFs plus ffmpeg video and audio.
    pub fn standard(config: &EngineConfig) -> Self {
        Self {
            video: Arc::new(FfmpegVideoDecoder {
                frame_cache: config.video_frame_cache,
            }),
            image: Arc::new(ImageDecoder),
            audio: Arc::new(FfmpegAudioDecoder),
        }
    }
}

/// Per-kind decode caches, fonts, the shared source registry and the render generation.
pub struct CompositionContext {
    config: EngineConfig,
    pub video: DecodeCache<dyn VideoClip>,
    pub image: DecodeCache<ImageFrames>,
    pub audio: DecodeCache<AudioPcm>,
    thumbnails: Memo<ContentHash, Arc<Vec<Thumbnail>>>,
    sources: SourceRegistry,
    text: Mutex<TextLayoutEngine>,
    generation: AtomicU64,
}

impl std::fmt::Debug for CompositionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionContext")
            .field("video", &self.video)
            .field("image", &self.image)
            .field("audio", &self.audio)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl CompositionContext {
    pub fn new(config: EngineConfig, store: Arc<dyn ByteStore>) -> Self {
        let decoders = Decoders::standard(&config);
        Self::with_decoders(config, store, decoders)
    }

    pub fn with_decoders(
        config: EngineConfig,
        store: Arc<dyn ByteStore>,
        decoders: Decoders,
    ) -> Self {
        Self {
            video: DecodeCache::new(MediaKind::Video, store.clone(), decoders.video),
            image: DecodeCache::new(MediaKind::Image, store.clone(), decoders.image),
            audio: DecodeCache::new(MediaKind::Audio, store, decoders.audio),
            thumbnails: Memo::default(),
            sources: SourceRegistry::new(),
            text: Mutex::new(TextLayoutEngine::new()),
            generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Register font bytes for text items using `family`.
    pub fn register_font(&self, family: &str, bytes: Vec<u8>) {
        self.text_engine().register_font(family, bytes);
    }

    /// Exclusive access to the text layout engine. Do not hold across `.await`.
    pub fn text_engine(&self) -> MutexGuard<'_, TextLayoutEngine> {
        self.text.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Source timestamp probed for a video frame index.
    ///
    /// Frame `n` maps to `(n - 1)` frame durations, never earlier than the minimum probe offset.
    /// Offline export probes its clips the same way, so both show the same source frame.
    pub fn video_probe_us(&self, frame_index: u64) -> u64 {
        let fps = self.config.fps;
        fps.frames_to_micros(frame_index.saturating_sub(1))
            .max(self.config.min_probe_us())
    }

    /// Decoded frame of video `id` for `frame_index`.
    pub async fn video_frame(
        &self,
        id: &ContentHash,
        frame_index: u64,
    ) -> ReelResult<Option<DecodedFrame>> {
        let clip = self.video.decode(id, None).await?;
        let ts_us = self.video_probe_us(frame_index);
        blocking(move || clip.frame_at(ts_us)).await
    }

    /// Frame of image `id` for a local frame index; animated images loop.
    pub async fn image_frame(
        &self,
        id: &ContentHash,
        frame_index: u64,
    ) -> ReelResult<Option<DecodedFrame>> {
        let frames = self.image.decode(id, None).await?;
        Ok(frames.frame(frame_index).cloned())
    }

    /// Evenly spaced preview frames of a video source, computed once per source id.
    pub async fn thumbnails(&self, source: &Source) -> ReelResult<Arc<Vec<Thumbnail>>> {
        if source.kind != MediaKind::Video {
            return Err(ReelError::validation(format!(
                "thumbnails need a video source, got {}",
                source.kind
            )));
        }
        let count = self.config.thumbnail_count;
        let step_us = self.config.thumbnail_step_us;
        self.thumbnails
            .get_or_try_init(&source.id, || async {
                let clip = self.video.decode(&source.id, None).await?;
                let thumbs = blocking(move || clip.thumbnails(count, step_us)).await?;
                Ok(Arc::new(thumbs))
            })
            .await
    }

    /// Current render generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new generation; work tagged with older generations is stale.
    pub fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }
}

#[cfg(test)]
#[path = "../tests/unit/context.rs"]
mod tests;
