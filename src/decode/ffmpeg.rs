//! `ffprobe` / `ffmpeg` command-line helpers shared by the video and audio decoders.

use std::path::Path;

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate every audio source is decoded to.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Channel count every audio source is decoded to.
pub const MIX_CHANNELS: u16 = 2;

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) struct ProbeInfo {
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    pub(crate) duration_us: u64,
    pub(crate) has_video: bool,
    pub(crate) has_audio: bool,
}

#[cfg(feature = "media-ffmpeg")]
pub(crate) fn probe(path: &Path) -> ReelResult<ProbeInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| ReelError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::decode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| parsed.streams.iter().find_map(|s| s.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ReelError::decode("ffprobe reported no duration"))?;

    Ok(ProbeInfo {
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        duration_us: (secs * 1_000_000.0).round() as u64,
        has_video: video.is_some(),
        has_audio,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub(crate) fn probe(_path: &Path) -> ReelResult<ProbeInfo> {
    Err(disabled())
}

/// Decode one straight-alpha RGBA frame at `ts_us`. `None` past the end of the stream.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn decode_frame_rgba8(
    path: &Path,
    width: u32,
    height: u32,
    ts_us: u64,
) -> ReelResult<Option<Vec<u8>>> {
    let ts_sec = ts_us as f64 / 1_000_000.0;
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{ts_sec:.6}")])
        .arg("-i")
        .arg(path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::decode(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::decode(format!(
            "ffmpeg video decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = width as usize * height as usize * 4;
    if expected_len == 0 {
        return Err(ReelError::decode(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if out.stdout.is_empty() {
        return Ok(None);
    }
    if out.stdout.len() < expected_len {
        return Err(ReelError::decode(format!(
            "decoded video frame has {} bytes, expected {expected_len}",
            out.stdout.len()
        )));
    }
    let mut rgba = out.stdout;
    rgba.truncate(expected_len);
    Ok(Some(rgba))
}

#[cfg(not(feature = "media-ffmpeg"))]
pub(crate) fn decode_frame_rgba8(
    _path: &Path,
    _width: u32,
    _height: u32,
    _ts_us: u64,
) -> ReelResult<Option<Vec<u8>>> {
    Err(disabled())
}

/// Decode the audio of `path` to interleaved stereo `f32` at [`MIX_SAMPLE_RATE`].
///
/// A media file without an audio stream decodes to empty PCM.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn decode_audio_f32_stereo(path: &Path) -> ReelResult<Vec<f32>> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &MIX_CHANNELS.to_string(),
            "-ar",
            &MIX_SAMPLE_RATE.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::decode(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(Vec::new());
        }
        return Err(ReelError::decode(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::decode(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(not(feature = "media-ffmpeg"))]
pub(crate) fn decode_audio_f32_stereo(_path: &Path) -> ReelResult<Vec<f32>> {
    Err(disabled())
}

#[cfg(not(feature = "media-ffmpeg"))]
fn disabled() -> ReelError {
    ReelError::decode("video/audio decoding requires the 'media-ffmpeg' feature")
}

/// Path the ffmpeg tools can read, or a decode failure for in-memory stores.
pub(crate) fn require_path(blob: &crate::store::StoredBlob) -> ReelResult<&Path> {
    blob.path.as_deref().ok_or_else(|| {
        ReelError::decode(format!(
            "'{}' has no on-disk location; ffmpeg decoding needs a file-backed byte store",
            blob.id
        ))
    })
}
