//! Per-item drawing onto a [`Surface`].

use vello_cpu::kurbo::Shape;

use super::surface::{Surface, paint_color};
use crate::assets::color::parse_color;
use crate::assets::text::{TEXT_PADDING, TextBrushRgba8, TextLayoutEngine};
use crate::context::CompositionContext;
use crate::foundation::error::ReelResult;
use crate::timeline::item::{ImageItem, TextItem, TrackItem, VideoItem};

const TEXT_CORNER_RADIUS: f64 = 4.0;
const TEXT_STROKE_WIDTH: f64 = 4.0;

impl TrackItem {
    /// Draw this item's content for timeline `frame` onto `surface`.
    ///
    /// Audio items draw nothing.
    pub async fn draw(
        &self,
        ctx: &CompositionContext,
        surface: &mut Surface,
        frame: u64,
    ) -> ReelResult<()> {
        match self {
            Self::Video(v) => draw_video(v, ctx, surface, frame).await,
            Self::Image(i) => draw_image(i, ctx, surface, frame).await,
            Self::Text(t) => {
                let mut engine = ctx.text_engine();
                draw_text(t, &mut engine, surface)
            }
            Self::Audio(_) => Ok(()),
        }
    }
}

/// Source frame index shown at timeline `frame` (1-based, never below 1).
pub(crate) fn video_probe_frame(item: &VideoItem, frame: u64) -> u64 {
    let local = frame as i64 - item.span.start as i64 + item.span.offset_l as i64;
    local.max(1) as u64
}

async fn draw_video(
    item: &VideoItem,
    ctx: &CompositionContext,
    surface: &mut Surface,
    frame: u64,
) -> ReelResult<()> {
    let probe = video_probe_frame(item, frame);
    let Some(decoded) = ctx.video_frame(&item.source.id, probe).await? else {
        tracing::trace!(source = %item.source.id, probe, "no video frame at probe");
        return Ok(());
    };
    surface.draw_frame(&decoded, item.draw.dest_rect(surface.canvas()))
}

async fn draw_image(
    item: &ImageItem,
    ctx: &CompositionContext,
    surface: &mut Surface,
    frame: u64,
) -> ReelResult<()> {
    let local = frame.saturating_sub(item.span.start);
    let Some(decoded) = ctx.image_frame(&item.source.id, local).await? else {
        return Ok(());
    };
    surface.draw_frame(&decoded, item.draw.dest_rect(surface.canvas()))
}

/// Draw text lines top-aligned at the item's draw position, with an optional rounded
/// background box and an optional outline under the fill.
pub(crate) fn draw_text(
    item: &TextItem,
    engine: &mut TextLayoutEngine,
    surface: &mut Surface,
) -> ReelResult<()> {
    let style = item.style();
    let size = style.font_size * item.draw.scale / 100.0;
    if !(size.is_finite() && size > 0.0) {
        return Ok(());
    }

    let fill = parse_color(&style.fill)?;
    let stroke = style.stroke.as_deref().map(parse_color).transpose()?;
    let background = style
        .background_color
        .as_deref()
        .map(parse_color)
        .transpose()?;

    let brush = TextBrushRgba8 {
        r: fill.r,
        g: fill.g,
        b: fill.b,
        a: fill.a,
    };
    let mut layouts = Vec::new();
    let mut text_width = 0.0f64;
    for line in style.content.split('\n') {
        if line.is_empty() {
            layouts.push(None);
            continue;
        }
        let layout = engine.layout_line(line, &style.font_family, size as f32, brush)?;
        text_width = text_width.max(f64::from(layout.width()));
        layouts.push(Some(layout));
    }
    let font = engine.paint_font(&style.font_family)?;

    let canvas = surface.canvas();
    let left = item.draw.draw_x(canvas);
    let top = item.draw.draw_y(canvas);
    let total_height = layouts.len() as f64 * size;

    surface.layer(|ctx| {
        if let Some(bg) = background {
            let rr = vello_cpu::kurbo::RoundedRect::new(
                left,
                top,
                left + text_width + TEXT_PADDING * 2.0,
                top + total_height + TEXT_PADDING * 2.0,
                TEXT_CORNER_RADIUS,
            );
            let mut p = vello_cpu::kurbo::BezPath::new();
            for el in rr.path_elements(0.1) {
                p.push(el);
            }
            ctx.set_paint(paint_color(bg));
            ctx.fill_path(&p);
        }

        for (i, layout) in layouts.iter().enumerate() {
            let Some(layout) = layout else {
                continue;
            };
            let y = top + i as f64 * size;
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((left, y)));
            for line in layout.lines() {
                for run_item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = run_item else {
                        continue;
                    };
                    let font_size = run.run().font_size();
                    let glyphs = || {
                        run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        })
                    };
                    if let Some(s) = stroke {
                        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(TEXT_STROKE_WIDTH));
                        ctx.set_paint(paint_color(s));
                        ctx.glyph_run(&font)
                            .font_size(font_size)
                            .stroke_glyphs(glyphs());
                    }
                    ctx.set_paint(paint_color(fill));
                    ctx.glyph_run(&font)
                        .font_size(font_size)
                        .fill_glyphs(glyphs());
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/draw.rs"]
mod tests;
