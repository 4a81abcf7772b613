//! Overlay mix of every unit soundtrack into one interleaved PCM buffer.

use std::path::Path;

use super::combine::RenderUnit;
use crate::decode::ffmpeg::{MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::foundation::error::{ReelError, ReelResult};

/// Mixed soundtrack covering the whole export.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioMix {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioMix {
    /// Samples covering `[start_us, end_us)`, clamped to the mix.
    pub fn window(&self, start_us: u64, end_us: u64) -> AudioMix {
        let ch = usize::from(self.channels.max(1));
        let len = self.interleaved_f32.len() / ch;
        let a = (us_to_sample(start_us, self.sample_rate) as usize).min(len);
        let b = (us_to_sample(end_us, self.sample_rate) as usize).clamp(a, len);
        AudioMix {
            sample_rate: self.sample_rate,
            channels: self.channels,
            interleaved_f32: self.interleaved_f32[a * ch..b * ch].to_vec(),
        }
    }
}

fn us_to_sample(us: u64, sample_rate: u32) -> u64 {
    (u128::from(us) * u128::from(sample_rate) / 1_000_000) as u64
}

/// Sum the soundtracks of `units` over `total_us` and clamp to `[-1, 1]`.
///
/// Returns `None` when no unit carries audio.
pub fn mix_units(units: &[RenderUnit], total_us: u64) -> Option<AudioMix> {
    let sample_rate = MIX_SAMPLE_RATE;
    let channels = usize::from(MIX_CHANNELS);
    let total = us_to_sample(total_us, sample_rate) as usize;
    let mut out = vec![0.0f32; total * channels];
    let mut any = false;

    for unit in units {
        let Some(clip) = unit.audio() else {
            continue;
        };
        let pcm = clip.handle();
        let src_channels = usize::from(pcm.channels.max(1));
        let src = pcm.interleaved_f32.as_slice();
        let src_frames = src.len() / src_channels;
        if pcm.sample_rate == 0 || src_frames == 0 {
            continue;
        }
        any = true;

        let dst_start = us_to_sample(unit.time.offset_us, sample_rate) as usize;
        let dst_end = (us_to_sample(unit.time.end_us(), sample_rate) as usize).min(total);
        let src_start = us_to_sample(clip.start_us(), pcm.sample_rate);
        let src_end = clip
            .end_us()
            .map(|e| us_to_sample(e, pcm.sample_rate) as usize)
            .unwrap_or(src_frames)
            .min(src_frames);

        for dst in dst_start..dst_end {
            let rel = (dst - dst_start) as u128 * u128::from(pcm.sample_rate)
                / u128::from(sample_rate);
            let src_frame = (u128::from(src_start) + rel) as usize;
            if src_frame >= src_end {
                break;
            }
            for c in 0..channels {
                out[dst * channels + c] += src[src_frame * src_channels + c % src_channels];
            }
        }
    }

    if !any {
        return None;
    }
    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    Some(AudioMix {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: out,
    })
}

/// Write samples as raw little-endian `f32`.
pub fn write_f32le(samples: &[f32], out_path: &Path) -> ReelResult<()> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for &s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::encode(format!(
            "failed to write audio mix '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/audio.rs"]
mod tests;
