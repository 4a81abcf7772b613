//! Timeline items to time-positioned render units.

use std::sync::Arc;

use super::clip::{ClipSpan, split_clip};
use crate::context::CompositionContext;
use crate::decode::DecodedFrame;
use crate::decode::audio::AudioPcm;
use crate::decode::image::ImageFrames;
use crate::decode::video::VideoClip;
use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::ReelResult;
use crate::render::draw::draw_text;
use crate::render::surface::Surface;
use crate::timeline::item::{DrawAttrs, ItemId, Placement, TrackItem};

/// Decoded media a unit pulls pixels or samples from.
#[derive(Clone, Debug)]
pub enum UnitMedia {
    /// Trimmed video, with its trimmed soundtrack unless the item is silent or has none.
    Video {
        clip: ClipSpan<dyn VideoClip>,
        audio: Option<ClipSpan<AudioPcm>>,
    },
    Audio {
        clip: ClipSpan<AudioPcm>,
    },
    /// Image frames indexed by local frame; animated images loop.
    Image {
        frames: Arc<ImageFrames>,
    },
    /// Pre-rendered bitmap (text).
    Still {
        frame: DecodedFrame,
    },
}

/// Absolute placement on the export timeline, in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitTime {
    pub offset_us: u64,
    pub duration_us: u64,
}

impl UnitTime {
    pub fn end_us(&self) -> u64 {
        self.offset_us.saturating_add(self.duration_us)
    }

    /// Microseconds into the unit at export time `t_us`, if it is active then.
    pub fn local(&self, t_us: u64) -> Option<u64> {
        (self.offset_us <= t_us && t_us < self.end_us()).then(|| t_us - self.offset_us)
    }
}

/// Export-time form of one item.
#[derive(Clone, Debug)]
pub struct RenderUnit {
    pub item: ItemId,
    pub media: UnitMedia,
    pub time: UnitTime,
    /// Destination on the output canvas. `None` for audio.
    pub rect: Option<Rect>,
}

impl RenderUnit {
    pub fn is_visual(&self) -> bool {
        self.rect.is_some()
    }

    /// Soundtrack to mix, if any.
    pub fn audio(&self) -> Option<&ClipSpan<AudioPcm>> {
        match &self.media {
            UnitMedia::Audio { clip } => Some(clip),
            UnitMedia::Video { audio, .. } => audio.as_ref(),
            _ => None,
        }
    }
}

fn unit_time(span: &Placement, frame_us: u64) -> UnitTime {
    UnitTime {
        offset_us: span.start.saturating_mul(frame_us),
        duration_us: span.len_frames().saturating_mul(frame_us),
    }
}

fn output_rect(draw: &DrawAttrs, player: Canvas, ratio: f64) -> Rect {
    let r = draw.dest_rect(player);
    Rect::new(r.x0 * ratio, r.y0 * ratio, r.x1 * ratio, r.y1 * ratio)
}

impl TrackItem {
    /// Build this item's render unit for an output canvas `ratio` times the preview size.
    #[tracing::instrument(skip_all, fields(item = %self.id(), kind = %self.kind()))]
    pub async fn combine(&self, ctx: &CompositionContext, ratio: f64) -> ReelResult<RenderUnit> {
        let fps = ctx.config().fps;
        let frame_us = fps.frame_micros();
        let player = ctx.config().preview;
        let span = self.span();

        let (media, rect) = match self {
            Self::Video(v) => {
                let handle = ctx.video.decode(&v.source.id, None).await?;
                let audio = if v.silent || !handle.meta().has_audio {
                    None
                } else {
                    let pcm = ctx.audio.decode(&v.source.id, None).await?;
                    Some(split_clip(
                        ClipSpan::whole(pcm),
                        span.offset_l,
                        span.offset_r,
                        span.frame_count,
                        fps,
                    )?)
                };
                let clip = split_clip(
                    ClipSpan::whole(handle),
                    span.offset_l,
                    span.offset_r,
                    span.frame_count,
                    fps,
                )?;
                (
                    UnitMedia::Video { clip, audio },
                    Some(output_rect(&v.draw, player, ratio)),
                )
            }
            Self::Audio(a) => {
                let pcm = ctx.audio.decode(&a.source.id, None).await?;
                let clip = split_clip(
                    ClipSpan::whole(pcm),
                    span.offset_l,
                    span.offset_r,
                    span.frame_count,
                    fps,
                )?;
                (UnitMedia::Audio { clip }, None)
            }
            Self::Image(i) => {
                let frames = ctx.image.decode(&i.source.id, None).await?;
                (
                    UnitMedia::Image { frames },
                    Some(output_rect(&i.draw, player, ratio)),
                )
            }
            Self::Text(t) => {
                let mut surface = Surface::new(player)?;
                {
                    let mut engine = ctx.text_engine();
                    draw_text(t, &mut engine, &mut surface)?;
                }
                let frame = DecodedFrame::from_premul(
                    player.width,
                    player.height,
                    surface.data().to_vec(),
                )?;
                let rect = Rect::new(0.0, 0.0, player.w() * ratio, player.h() * ratio);
                (UnitMedia::Still { frame }, Some(rect))
            }
        };

        Ok(RenderUnit {
            item: self.id(),
            media,
            time: unit_time(span, frame_us),
            rect,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/combine.rs"]
mod tests;
