//! Offline rendering of a whole timeline into a [`FrameSink`].

use rayon::prelude::*;

use super::audio::{AudioMix, mix_units, write_f32le};
use super::combine::{RenderUnit, UnitMedia};
use super::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::context::CompositionContext;
use crate::decode::DecodedFrame;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::surface::{FrameRGBA, Surface};
use crate::timeline::lane::Timeline;

/// How frames are rasterized.
#[derive(Clone, Debug)]
pub struct ExportThreading {
    pub parallel: bool,
    /// Frames rendered per batch before they are pushed to the sink.
    pub chunk_size: usize,
    /// Worker count; `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for ExportThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub frames: u64,
    pub visual_units: usize,
    pub audio_units: usize,
}

/// Every item of a timeline combined into render units, ready to rasterize.
///
/// Units are ordered bottom lane first, so drawing them in order reproduces preview z-order.
#[derive(Debug)]
pub struct ExportPipeline {
    canvas: Canvas,
    fps: Fps,
    frames: u64,
    min_probe_us: u64,
    units: Vec<RenderUnit>,
    audio: Option<AudioMix>,
}

impl ExportPipeline {
    /// Combine every item of `timeline`. Decode and store failures abort the export.
    #[tracing::instrument(skip_all, fields(lanes = timeline.lanes.len()))]
    pub async fn prepare(ctx: &CompositionContext, timeline: &Timeline) -> ReelResult<Self> {
        let config = ctx.config();
        let mut units = Vec::new();
        for lane in timeline.lanes.iter().rev() {
            for item in &lane.items {
                units.push(item.combine(ctx, config.output_ratio).await?);
            }
        }
        let frames = timeline.duration_frames();
        let audio = mix_units(&units, config.fps.frames_to_micros(frames));
        tracing::info!(units = units.len(), frames, audio = audio.is_some(), "export prepared");
        Ok(Self {
            canvas: config.output(),
            fps: config.fps,
            frames,
            min_probe_us: config.min_probe_us(),
            units,
            audio,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn units(&self) -> &[RenderUnit] {
        &self.units
    }

    pub fn audio(&self) -> Option<&AudioMix> {
        self.audio.as_ref()
    }

    fn unit_frame(&self, unit: &RenderUnit, t_us: u64) -> ReelResult<Option<DecodedFrame>> {
        let Some(local) = unit.time.local(t_us) else {
            return Ok(None);
        };
        match &unit.media {
            UnitMedia::Video { clip, .. } => {
                // One frame behind the local time, matching `CompositionContext::video_probe_us`.
                let ts = clip
                    .source_time(local)
                    .saturating_sub(self.fps.frame_micros())
                    .max(self.min_probe_us);
                clip.handle().frame_at(ts)
            }
            UnitMedia::Image { frames } => {
                let index = local / self.fps.frame_micros().max(1);
                Ok(frames.frame(index).cloned())
            }
            UnitMedia::Still { frame } => Ok(Some(frame.clone())),
            UnitMedia::Audio { .. } => Ok(None),
        }
    }

    /// Rasterize output frame `frame` onto `surface`.
    pub fn render_frame(&self, frame: u64, surface: &mut Surface) -> ReelResult<FrameRGBA> {
        surface.clear();
        let t_us = self.fps.frames_to_micros(frame);
        for unit in &self.units {
            let Some(rect) = unit.rect else {
                continue;
            };
            if let Some(decoded) = self.unit_frame(unit, t_us)? {
                surface.draw_frame(&decoded, rect)?;
            }
        }
        Ok(surface.snapshot())
    }

    fn render_chunk(
        &self,
        range: std::ops::Range<u64>,
        surface: &mut Surface,
        pool: Option<&rayon::ThreadPool>,
    ) -> ReelResult<Vec<FrameRGBA>> {
        let Some(pool) = pool else {
            return range.map(|f| self.render_frame(f, surface)).collect();
        };
        let canvas = self.canvas;
        pool.install(|| {
            range
                .into_par_iter()
                .map_init(
                    || Surface::new(canvas),
                    |worker, f| match worker {
                        Ok(s) => self.render_frame(f, s),
                        Err(e) => Err(ReelError::surface(e.to_string())),
                    },
                )
                .collect()
        })
    }

    /// Render every frame in order into `sink`, handing it the mixed soundtrack if any.
    pub fn render_to(
        &self,
        sink: &mut dyn FrameSink,
        threading: &ExportThreading,
    ) -> ReelResult<ExportStats> {
        if self.frames == 0 {
            return Err(ReelError::validation("timeline is empty; nothing to export"));
        }
        let all = FrameRange::new(FrameIndex(0), FrameIndex(self.frames))?;
        self.render_range_to(sink, all, threading)
    }

    /// Render `range` into `sink`. The soundtrack is cut to the same window.
    #[tracing::instrument(skip_all, fields(start = range.start.0, end = range.end.0))]
    pub fn render_range_to(
        &self,
        sink: &mut dyn FrameSink,
        range: FrameRange,
        threading: &ExportThreading,
    ) -> ReelResult<ExportStats> {
        if range.is_empty() {
            return Err(ReelError::validation("export range is empty"));
        }
        if range.end.0 > self.frames {
            return Err(ReelError::validation(format!(
                "export range ends at frame {} but the timeline has {} frames",
                range.end.0, self.frames
            )));
        }
        let mut surface = Surface::new(self.canvas)?;
        let pool = if threading.parallel {
            Some(build_thread_pool(threading.threads)?)
        } else {
            None
        };

        let mut audio_tmp = TempFileGuard(None);
        let audio = match &self.audio {
            Some(mix) => {
                let window = mix.window(
                    self.fps.frames_to_micros(range.start.0),
                    self.fps.frames_to_micros(range.end.0),
                );
                let path = std::env::temp_dir().join(format!(
                    "reelkit_mix_{}_{}.f32le",
                    std::process::id(),
                    std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_nanos())
                        .unwrap_or(0)
                ));
                write_f32le(&window.interleaved_f32, &path)?;
                audio_tmp.0 = Some(path.clone());
                Some(AudioInputConfig {
                    path,
                    sample_rate: window.sample_rate,
                    channels: window.channels,
                })
            }
            None => None,
        };

        sink.begin(SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            audio,
        })?;

        let chunk = threading.chunk_size.max(1) as u64;
        let mut start = range.start.0;
        while start < range.end.0 {
            let end = (start + chunk).min(range.end.0);
            let frames = self.render_chunk(start..end, &mut surface, pool.as_ref())?;
            for (f, frame) in (start..end).zip(&frames) {
                sink.push_frame(FrameIndex(f), frame)?;
            }
            tracing::debug!(start, end, "export chunk pushed");
            start = end;
        }
        sink.end()?;
        drop(audio_tmp);

        Ok(ExportStats {
            frames: range.len_frames(),
            visual_units: self.units.iter().filter(|u| u.is_visual()).count(),
            audio_units: self.units.iter().filter(|u| u.audio().is_some()).count(),
        })
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(ReelError::validation("export threads must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::encode(format!("failed to build rayon thread pool: {e}")))
}

struct TempFileGuard(Option<std::path::PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/render.rs"]
mod tests;
