use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};

/// Padding around measured text, in pixels, on every side.
pub const TEXT_PADDING: f64 = 4.0;
/// Line height used for measurement, as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Measured box of a (possibly multi-line) text block.
#[derive(Clone, Debug, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_height: f64,
    pub lines: Vec<String>,
}

/// Glyph advance measurement for a single line of text.
pub trait TextMeasure {
    /// Advance width of `line` rendered in `family` at `font_size` pixels.
    fn line_width(&mut self, line: &str, family: &str, font_size: f64) -> ReelResult<f64>;
}

/// Measure a text block: widest line plus padding by line count times line height plus padding.
///
/// Lines are split explicitly on `\n`; there is no wrapping.
pub fn measure_text(
    measure: &mut dyn TextMeasure,
    text: &str,
    family: &str,
    font_size: f64,
) -> ReelResult<TextMetrics> {
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(ReelError::validation("font size must be finite and > 0"));
    }
    if family.trim().is_empty() {
        return Err(ReelError::validation("font family must be non-empty"));
    }

    let lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let mut widest = 0.0f64;
    for line in &lines {
        widest = widest.max(measure.line_width(line, family, font_size)?);
    }

    Ok(TextMetrics {
        width: widest + TEXT_PADDING * 2.0,
        height: lines.len() as f64 * line_height + TEXT_PADDING * 2.0,
        line_height,
        lines,
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

struct RegisteredFont {
    bytes: Arc<Vec<u8>>,
    parley_family: Option<String>,
    paint_font: Option<vello_cpu::peniko::FontData>,
}

/// Stateful Parley layout engine over a set of registered font families.
///
/// Families are looked up case-insensitively; unknown families fall back to the first
/// registered one.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    fonts: HashMap<String, RegisteredFont>,
    fallback: Option<String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
            fallback: None,
        }
    }

    /// Register raw font bytes (TTF/OTF) under `family`.
    pub fn register_font(&mut self, family: &str, bytes: Vec<u8>) {
        let key = family.trim().to_ascii_lowercase();
        if self.fallback.is_none() {
            self.fallback = Some(key.clone());
        }
        self.fonts.insert(
            key,
            RegisteredFont {
                bytes: Arc::new(bytes),
                parley_family: None,
                paint_font: None,
            },
        );
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    fn resolve_key(&self, family: &str) -> ReelResult<String> {
        let key = family.trim().to_ascii_lowercase();
        if self.fonts.contains_key(&key) {
            return Ok(key);
        }
        self.fallback
            .clone()
            .ok_or_else(|| ReelError::validation(format!("no font registered for '{family}'")))
    }

    /// Glyph source for rasterizing text set in `family` (after fallback).
    pub(crate) fn paint_font(&mut self, family: &str) -> ReelResult<vello_cpu::peniko::FontData> {
        let key = self.resolve_key(family)?;
        let font = self
            .fonts
            .get_mut(&key)
            .ok_or_else(|| ReelError::validation(format!("no font registered for '{family}'")))?;
        let data = font.paint_font.get_or_insert_with(|| {
            vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
                0,
            )
        });
        Ok(data.clone())
    }

    fn parley_family(&mut self, family: &str) -> ReelResult<String> {
        let key = self.resolve_key(family)?;
        let font = self
            .fonts
            .get_mut(&key)
            .ok_or_else(|| ReelError::validation(format!("no font registered for '{family}'")))?;
        if let Some(name) = &font.parley_family {
            return Ok(name.clone());
        }

        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::decode(format!("font bytes for '{family}' contain no families"))
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::decode("registered font family has no name"))?
            .to_string();
        font.parley_family = Some(name.clone());
        Ok(name)
    }

    /// Shape and lay out one line of plain text.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ReelResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation("text size_px must be finite and > 0"));
        }
        let family_name = self.parley_family(family)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

impl TextMeasure for TextLayoutEngine {
    fn line_width(&mut self, line: &str, family: &str, font_size: f64) -> ReelResult<f64> {
        if line.is_empty() {
            return Ok(0.0);
        }
        let layout = self.layout_line(line, family, font_size as f32, TextBrushRgba8::default())?;
        Ok(f64::from(layout.width()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
