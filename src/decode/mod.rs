//! Media decoding and memoized decoded handles.

pub mod audio;
pub mod cache;
pub(crate) mod ffmpeg;
pub mod image;
pub mod video;

use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::store::StoredBlob;

/// One decoded raster frame, premultiplied RGBA8, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedFrame {
    /// Wrap premultiplied pixels, checking the buffer length.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> ReelResult<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba8_premul.len() != expected {
            return Err(ReelError::decode(format!(
                "frame buffer has {} bytes, expected {expected} for {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Premultiply straight-alpha pixels and wrap them.
    pub fn from_straight(width: u32, height: u32, mut rgba8: Vec<u8>) -> ReelResult<Self> {
        premultiply_rgba8_in_place(&mut rgba8);
        Self::from_premul(width, height, rgba8)
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> Self {
        let px = color.to_array();
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        }
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba8_premul.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Turns stored bytes into a decoded handle of type `H`.
#[async_trait]
pub trait MediaDecoder<H: ?Sized + Send + Sync>: Send + Sync {
    async fn decode(&self, blob: StoredBlob) -> ReelResult<Arc<H>>;
}

/// Run blocking decode work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> ReelResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ReelResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ReelError::Other(anyhow::anyhow!("decode task failed: {e}")))?
}

#[cfg(test)]
#[path = "../../tests/unit/decode/mod.rs"]
mod tests;
