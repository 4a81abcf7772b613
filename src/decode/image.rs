use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::AnimationDecoder;

use super::{DecodedFrame, MediaDecoder, blocking};
use crate::foundation::error::{ReelError, ReelResult};
use crate::store::StoredBlob;

/// Decoded still or animated image. Stills have exactly one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFrames {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<DecodedFrame>,
}

impl ImageFrames {
    /// Frame for a local frame index; animations loop.
    pub fn frame(&self, index: u64) -> Option<&DecodedFrame> {
        if self.frames.is_empty() {
            return None;
        }
        self.frames.get((index % self.frames.len() as u64) as usize)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Decode PNG/JPEG/WebP/... into one frame, or every frame of a GIF.
pub fn decode_image_frames(bytes: &[u8]) -> ReelResult<ImageFrames> {
    let format = image::guess_format(bytes)
        .map_err(|e| ReelError::decode(format!("unrecognized image format: {e}")))?;

    let frames = if format == image::ImageFormat::Gif {
        let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(bytes))
            .map_err(|e| ReelError::decode(format!("open gif: {e}")))?;
        decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| ReelError::decode(format!("decode gif frames: {e}")))?
            .into_iter()
            .map(|f| {
                let buf = f.into_buffer();
                let (w, h) = buf.dimensions();
                DecodedFrame::from_straight(w, h, buf.into_raw())
            })
            .collect::<ReelResult<Vec<_>>>()?
    } else {
        let rgba = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ReelError::decode(format!("decode image: {e}")))?
            .to_rgba8();
        let (w, h) = rgba.dimensions();
        vec![DecodedFrame::from_straight(w, h, rgba.into_raw())?]
    };

    let first = frames
        .first()
        .ok_or_else(|| ReelError::decode("image contains no frames"))?;
    Ok(ImageFrames {
        width: first.width,
        height: first.height,
        frames,
    })
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

#[async_trait]
impl MediaDecoder<ImageFrames> for ImageDecoder {
    async fn decode(&self, blob: StoredBlob) -> ReelResult<Arc<ImageFrames>> {
        blocking(move || decode_image_frames(&blob.bytes).map(Arc::new)).await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/image.rs"]
mod tests;
