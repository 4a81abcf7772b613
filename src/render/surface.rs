use std::sync::Arc;

use vello_cpu::peniko::color::PremulRgba8;

use crate::decode::DecodedFrame;
use crate::foundation::core::{Canvas, Rect, Rgba8Premul};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{premul_over_in_place, unpremultiply_rgba8};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are premultiplied alpha by default; `premultiplied` makes this explicit at API
/// boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Wrap a decoded frame's premultiplied pixels.
    pub fn from_decoded(frame: &DecodedFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            data: frame.rgba8_premul.to_vec(),
            premultiplied: true,
        }
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_straight(&self) -> Vec<u8> {
        if self.premultiplied {
            unpremultiply_rgba8(&self.data)
        } else {
            self.data.clone()
        }
    }

    /// PNG bytes of the frame (straight alpha, as PNG requires).
    pub fn encode_png(&self) -> ReelResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_straight())
            .ok_or_else(|| ReelError::validation("frame data is not width*height*4"))?;
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .map_err(|e| ReelError::encode(format!("encode png: {e}")))?;
        Ok(out)
    }
}

/// Reject canvases `vello_cpu` cannot address.
pub(crate) fn check_canvas(canvas: Canvas) -> ReelResult<(u16, u16)> {
    let too_wide = |what: &str, v: u32| {
        ReelError::surface(format!("canvas {what} {v} exceeds u16"))
    };
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| too_wide("width", canvas.width))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| too_wide("height", canvas.height))?;
    if w == 0 || h == 0 {
        return Err(ReelError::surface(format!(
            "canvas {}x{} is empty",
            canvas.width, canvas.height
        )));
    }
    Ok((w, h))
}

fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::decode("frame width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::decode("frame height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::decode("frame byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

pub(crate) fn frame_to_image(frame: &DecodedFrame) -> ReelResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&frame.rgba8_premul, frame.width, frame.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// `vello_cpu` paints take straight-alpha colors.
pub(crate) fn paint_color(c: Rgba8Premul) -> vello_cpu::peniko::Color {
    let s = unpremultiply_rgba8(&c.to_array());
    vello_cpu::peniko::Color::from_rgba8(s[0], s[1], s[2], s[3])
}

pub(crate) fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

/// Off-screen drawing target.
///
/// Each draw call rasterizes into a scratch pixmap that is then composited source-over onto the
/// accumulated pixels, so later draws land on top of earlier ones.
pub struct Surface {
    canvas: Canvas,
    pixmap: vello_cpu::Pixmap,
    scratch: vello_cpu::Pixmap,
    ctx: vello_cpu::RenderContext,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("canvas", &self.canvas)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Allocate a transparent surface. Fails with `SurfaceUnavailable` for unusable sizes.
    pub fn new(canvas: Canvas) -> ReelResult<Self> {
        let (w, h) = check_canvas(canvas)?;
        Ok(Self {
            canvas,
            pixmap: vello_cpu::Pixmap::new(w, h),
            scratch: vello_cpu::Pixmap::new(w, h),
            ctx: vello_cpu::RenderContext::new(w, h),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn clear(&mut self) {
        clear_pixmap_to_transparent(&mut self.pixmap);
    }

    /// Premultiplied RGBA8 pixels.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.canvas.width || y >= self.canvas.height {
            return None;
        }
        let i = (y as usize * self.canvas.width as usize + x as usize) * 4;
        let px = self.data().get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy out the accumulated pixels.
    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.data().to_vec(),
            premultiplied: true,
        }
    }

    /// Rasterize one layer with `draw` and composite it over the current pixels.
    pub(crate) fn layer(
        &mut self,
        draw: impl FnOnce(&mut vello_cpu::RenderContext) -> ReelResult<()>,
    ) -> ReelResult<()> {
        self.ctx.reset();
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        draw(&mut self.ctx)?;
        self.ctx.flush();

        clear_pixmap_to_transparent(&mut self.scratch);
        self.ctx.render_to_pixmap(&mut self.scratch);
        if !premul_over_in_place(
            self.pixmap.data_as_u8_slice_mut(),
            self.scratch.data_as_u8_slice(),
        ) {
            return Err(ReelError::surface("layer size does not match surface"));
        }
        Ok(())
    }

    /// Draw `frame` stretched into `dest`.
    pub fn draw_frame(&mut self, frame: &DecodedFrame, dest: Rect) -> ReelResult<()> {
        if frame.width == 0 || frame.height == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return Ok(());
        }
        let image = frame_to_image(frame)?;
        let sx = dest.width() / f64::from(frame.width);
        let sy = dest.height() / f64::from(frame.height);
        self.layer(|ctx| {
            ctx.set_transform(
                vello_cpu::kurbo::Affine::translate((dest.x0, dest.y0))
                    * vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy),
            );
            ctx.set_paint(image);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(frame.width),
                f64::from(frame.height),
            ));
            Ok(())
        })
    }

    /// Fill `rect` with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) -> ReelResult<()> {
        self.layer(|ctx| {
            ctx.set_paint(paint_color(color));
            ctx.fill_rect(&rect_to_cpu(rect));
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
