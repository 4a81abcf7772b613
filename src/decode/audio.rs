use std::sync::Arc;

use async_trait::async_trait;

use super::ffmpeg::{MIX_CHANNELS, MIX_SAMPLE_RATE, decode_audio_f32_stereo, require_path};
use super::{MediaDecoder, blocking};
use crate::foundation::error::ReelResult;
use crate::store::StoredBlob;

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Arc<Vec<f32>>,
}

impl AudioPcm {
    /// Sample frames (one sample per channel).
    pub fn frame_len(&self) -> u64 {
        let ch = u64::from(self.channels.max(1));
        self.interleaved_f32.len() as u64 / ch
    }

    pub fn duration_us(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frame_len() * 1_000_000 / u64::from(self.sample_rate)
    }
}

/// Decodes any ffmpeg-readable audio (or video soundtrack) to stereo 48 kHz PCM.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegAudioDecoder;

#[async_trait]
impl MediaDecoder<AudioPcm> for FfmpegAudioDecoder {
    async fn decode(&self, blob: StoredBlob) -> ReelResult<Arc<AudioPcm>> {
        let path = require_path(&blob)?.to_path_buf();
        blocking(move || {
            let samples = decode_audio_f32_stereo(&path)?;
            Ok(Arc::new(AudioPcm {
                sample_rate: MIX_SAMPLE_RATE,
                channels: MIX_CHANNELS,
                interleaved_f32: Arc::new(samples),
            }))
        })
        .await
    }
}
