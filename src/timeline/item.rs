//! Track items: the timeline placement of one piece of media.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::assets::source::{MediaKind, Source};
use crate::assets::text::{TextMeasure, measure_text};
use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique item identity. Not persisted: loading a project assigns fresh ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u64);

impl ItemId {
    pub fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::next()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Where an item sits on the timeline and which part of its natural span it shows.
///
/// `[start, end)` in timeline frames. `offset_l`/`offset_r` are frames trimmed from the head and
/// tail of the `frame_count`-long natural span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub start: u64,
    pub end: u64,
    pub frame_count: u64,
    #[serde(default)]
    pub offset_l: u64,
    #[serde(default)]
    pub offset_r: u64,
}

impl Placement {
    /// Untrimmed placement of a `frame_count`-long span starting at `start`.
    pub fn natural(start: u64, frame_count: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(frame_count),
            frame_count,
            offset_l: 0,
            offset_r: 0,
        }
    }

    pub fn len_frames(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// `start <= f < end`.
    pub fn contains(&self, frame: u64) -> bool {
        self.start <= frame && frame < self.end
    }

    /// `start <= end`, and for trimmable kinds the span equals the untrimmed remainder.
    pub fn is_consistent(&self, trimmable: bool) -> bool {
        if self.start > self.end {
            return false;
        }
        if !trimmable {
            return true;
        }
        self.offset_l
            .checked_add(self.offset_r)
            .and_then(|trim| self.frame_count.checked_sub(trim))
            == Some(self.end - self.start)
    }

    /// Move to `start` keeping the length.
    pub fn move_to(&mut self, start: u64) {
        let len = self.len_frames();
        self.start = start;
        self.end = start.saturating_add(len);
    }

    /// Re-trim the natural span. The source frame shown at each remaining timeline frame is
    /// unchanged, so the start shifts by the change in `offset_l`.
    pub fn trim(&mut self, offset_l: u64, offset_r: u64) -> ReelResult<()> {
        let trimmed = offset_l.saturating_add(offset_r);
        if trimmed >= self.frame_count {
            return Err(ReelError::validation(format!(
                "trim {offset_l}+{offset_r} leaves nothing of a {}-frame span",
                self.frame_count
            )));
        }
        let origin = self.start as i64 - self.offset_l as i64;
        let start = origin + offset_l as i64;
        if start < 0 {
            return Err(ReelError::validation(
                "trim would move the item before frame 0",
            ));
        }
        self.start = start as u64;
        self.end = self.start + (self.frame_count - trimmed);
        self.offset_l = offset_l;
        self.offset_r = offset_r;
        Ok(())
    }
}

/// Geometry of a visual item relative to the preview canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawAttrs {
    /// Pixel offset of the item center from the canvas center.
    pub center_x: f64,
    pub center_y: f64,
    /// Percent; 100 draws at `width` x `height`.
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for DrawAttrs {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            scale: 100.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl DrawAttrs {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn draw_width(&self) -> f64 {
        self.width * self.scale / 100.0
    }

    pub fn draw_height(&self) -> f64 {
        self.height * self.scale / 100.0
    }

    pub fn draw_x(&self, canvas: Canvas) -> f64 {
        canvas.w() / 2.0 - self.draw_width() / 2.0 + self.center_x
    }

    pub fn draw_y(&self, canvas: Canvas) -> f64 {
        canvas.h() / 2.0 - self.draw_height() / 2.0 + self.center_y
    }

    /// Destination rectangle on `canvas`.
    pub fn dest_rect(&self, canvas: Canvas) -> Rect {
        let x = self.draw_x(canvas);
        let y = self.draw_y(canvas);
        Rect::new(x, y, x + self.draw_width(), y + self.draw_height())
    }

    /// Shrink the intrinsic size to fit inside `player`, keeping the aspect ratio.
    /// Never enlarges.
    pub fn fit_to(&mut self, player: Canvas) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }
        let ratio = (player.w() / self.width).min(player.h() / self.height);
        if ratio < 1.0 {
            self.width *= ratio;
            self.height *= ratio;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    #[serde(skip)]
    pub id: ItemId,
    pub source: Arc<Source>,
    pub span: Placement,
    pub draw: DrawAttrs,
    /// Drop the soundtrack in playback and export.
    #[serde(default)]
    pub silent: bool,
}

impl VideoItem {
    pub fn new(source: Arc<Source>, at: u64) -> Self {
        let draw = DrawAttrs::sized(
            f64::from(source.width.unwrap_or(0)),
            f64::from(source.height.unwrap_or(0)),
        );
        Self {
            id: ItemId::next(),
            span: Placement::natural(at, source.duration_frames),
            source,
            draw,
            silent: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioItem {
    #[serde(skip)]
    pub id: ItemId,
    pub source: Arc<Source>,
    pub span: Placement,
}

impl AudioItem {
    pub fn new(source: Arc<Source>, at: u64) -> Self {
        Self {
            id: ItemId::next(),
            span: Placement::natural(at, source.duration_frames),
            source,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    #[serde(skip)]
    pub id: ItemId,
    pub source: Arc<Source>,
    pub span: Placement,
    pub draw: DrawAttrs,
}

impl ImageItem {
    /// Stills have no natural duration; they are shown for `frame_count` frames.
    pub fn new(source: Arc<Source>, at: u64, frame_count: u64) -> Self {
        let draw = DrawAttrs::sized(
            f64::from(source.width.unwrap_or(0)),
            f64::from(source.height.unwrap_or(0)),
        );
        Self {
            id: ItemId::next(),
            span: Placement::natural(at, frame_count),
            source,
            draw,
        }
    }
}

/// Content and style of a text item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub content: String,
    /// CSS-style color (`#rrggbb`, named).
    pub fill: String,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    pub font_size: f64,
    pub font_family: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: String::new(),
            fill: "#ffffff".to_string(),
            stroke: None,
            background_color: None,
            font_size: 48.0,
            font_family: "sans-serif".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    pub span: Placement,
    pub draw: DrawAttrs,
    style: TextStyle,
}

impl TextItem {
    /// Create a text item and measure it.
    pub fn new(
        style: TextStyle,
        at: u64,
        frame_count: u64,
        measure: &mut dyn TextMeasure,
    ) -> ReelResult<Self> {
        let mut item = Self {
            id: ItemId::next(),
            name: style.content.clone(),
            span: Placement::natural(at, frame_count),
            draw: DrawAttrs::default(),
            style,
        };
        item.recompute_layout(measure)?;
        Ok(item)
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Apply `edit` to the style and re-measure before returning.
    ///
    /// On measurement failure the previous style and size are kept.
    pub fn restyle(
        &mut self,
        measure: &mut dyn TextMeasure,
        edit: impl FnOnce(&mut TextStyle),
    ) -> ReelResult<()> {
        let previous = self.style.clone();
        edit(&mut self.style);
        if let Err(e) = self.recompute_layout(measure) {
            self.style = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Measure the current style into `draw.width` / `draw.height`.
    pub fn recompute_layout(&mut self, measure: &mut dyn TextMeasure) -> ReelResult<()> {
        let m = measure_text(
            measure,
            &self.style.content,
            &self.style.font_family,
            self.style.font_size,
        )?;
        self.draw.width = m.width;
        self.draw.height = m.height;
        Ok(())
    }
}

/// One timeline item of any kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackItem {
    Video(VideoItem),
    Audio(AudioItem),
    Text(TextItem),
    Image(ImageItem),
}

impl From<VideoItem> for TrackItem {
    fn from(v: VideoItem) -> Self {
        Self::Video(v)
    }
}

impl From<AudioItem> for TrackItem {
    fn from(v: AudioItem) -> Self {
        Self::Audio(v)
    }
}

impl From<TextItem> for TrackItem {
    fn from(v: TextItem) -> Self {
        Self::Text(v)
    }
}

impl From<ImageItem> for TrackItem {
    fn from(v: ImageItem) -> Self {
        Self::Image(v)
    }
}

impl TrackItem {
    pub fn id(&self) -> ItemId {
        match self {
            Self::Video(v) => v.id,
            Self::Audio(a) => a.id,
            Self::Text(t) => t.id,
            Self::Image(i) => i.id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
            Self::Text(_) => MediaKind::Text,
            Self::Image(_) => MediaKind::Image,
        }
    }

    pub fn span(&self) -> &Placement {
        match self {
            Self::Video(v) => &v.span,
            Self::Audio(a) => &a.span,
            Self::Text(t) => &t.span,
            Self::Image(i) => &i.span,
        }
    }

    pub fn span_mut(&mut self) -> &mut Placement {
        match self {
            Self::Video(v) => &mut v.span,
            Self::Audio(a) => &mut a.span,
            Self::Text(t) => &mut t.span,
            Self::Image(i) => &mut i.span,
        }
    }

    pub fn start(&self) -> u64 {
        self.span().start
    }

    pub fn end(&self) -> u64 {
        self.span().end
    }

    /// Shared source, if the item is backed by imported media.
    pub fn source(&self) -> Option<&Arc<Source>> {
        match self {
            Self::Video(v) => Some(&v.source),
            Self::Audio(a) => Some(&a.source),
            Self::Image(i) => Some(&i.source),
            Self::Text(_) => None,
        }
    }

    pub(crate) fn source_mut(&mut self) -> Option<&mut Arc<Source>> {
        match self {
            Self::Video(v) => Some(&mut v.source),
            Self::Audio(a) => Some(&mut a.source),
            Self::Image(i) => Some(&mut i.source),
            Self::Text(_) => None,
        }
    }

    pub fn draw_attrs(&self) -> Option<&DrawAttrs> {
        match self {
            Self::Video(v) => Some(&v.draw),
            Self::Text(t) => Some(&t.draw),
            Self::Image(i) => Some(&i.draw),
            Self::Audio(_) => None,
        }
    }

    pub fn draw_attrs_mut(&mut self) -> Option<&mut DrawAttrs> {
        match self {
            Self::Video(v) => Some(&mut v.draw),
            Self::Text(t) => Some(&mut t.draw),
            Self::Image(i) => Some(&mut i.draw),
            Self::Audio(_) => None,
        }
    }

    /// Visible at `frame` in the compositor.
    pub fn is_visual_at(&self, frame: u64) -> bool {
        self.kind().is_visual() && self.span().contains(frame)
    }

    /// Has an audible track at `frame`: audio items and non-silent video.
    pub fn is_audible_at(&self, frame: u64) -> bool {
        let audible = match self {
            Self::Audio(_) => true,
            Self::Video(v) => !v.silent,
            _ => false,
        };
        audible && self.span().contains(frame)
    }

    /// Placement invariants for this item's kind.
    pub fn is_consistent(&self) -> bool {
        self.span().is_consistent(self.kind().is_trimmable())
    }

    /// Fit video and image items inside `player`. Text keeps its measured size.
    pub fn resize(&mut self, player: Canvas) {
        match self {
            Self::Video(v) => v.draw.fit_to(player),
            Self::Image(i) => i.draw.fit_to(player),
            Self::Text(_) | Self::Audio(_) => {}
        }
    }

    /// Clone with a fresh identity.
    pub(crate) fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        let id = ItemId::next();
        match &mut copy {
            Self::Video(v) => v.id = id,
            Self::Audio(a) => a.id = id,
            Self::Text(t) => t.id = id,
            Self::Image(i) => i.id = id,
        }
        copy
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/item.rs"]
mod tests;
