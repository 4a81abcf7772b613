//! Importing media: bytes in, a shared [`Source`] and a placed [`TrackItem`] out.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::assets::source::{ContentHash, MediaKind, Source};
use crate::context::CompositionContext;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::surface::FrameRGBA;
use crate::store::catalog::{CatalogEntry, ResourceCatalog};
use crate::store::stream_from_bytes;
use crate::timeline::item::{AudioItem, ImageItem, TextItem, TextStyle, TrackItem, VideoItem};
use crate::timeline::lane::{ItemLocation, Timeline};

/// Index of the video thumbnail used as the catalog preview.
const CATALOG_THUMBNAIL_INDEX: usize = 3;

/// A media payload as handed over by the user.
#[derive(Clone, Debug)]
pub struct MediaFile {
    pub name: String,
    /// MIME type (`video/mp4`, `image/png`, ...).
    pub mime: String,
    /// Where the bytes came from.
    pub locator: String,
    pub bytes: Bytes,
}

impl MediaFile {
    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn read(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let mime = mime_from_extension(path).ok_or_else(|| {
            ReelError::validation(format!("unsupported media file '{}'", path.display()))
        })?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ReelError::validation(format!("read media file '{}': {e}", path.display()))
        })?;
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime: mime.to_string(),
            locator: path.display().to_string(),
            bytes: Bytes::from(bytes),
        })
    }

    pub fn kind(&self) -> ReelResult<MediaKind> {
        MediaKind::from_mime(&self.mime)
            .ok_or_else(|| ReelError::validation(format!("unsupported media type '{}'", self.mime)))
    }
}

/// MIME type for common media extensions.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" | "aac" => "audio/aac",
        "flac" => "audio/flac",
        _ => return None,
    })
}

/// Result of importing one file.
#[derive(Clone, Debug)]
pub struct Imported {
    pub source: Arc<Source>,
    /// Item placed at the requested frame and fitted to the preview canvas.
    pub item: TrackItem,
}

/// Hash, persist and decode `file`, then build a source and an item starting at frame `at`.
///
/// Decoding goes through the context caches, so the handle is warm for preview and export.
/// Durations are whole seconds, rounded.
#[tracing::instrument(skip_all, fields(name = %file.name, mime = %file.mime, at))]
pub async fn import_media(
    ctx: &CompositionContext,
    file: &MediaFile,
    at: u64,
) -> ReelResult<Imported> {
    let kind = file.kind()?;
    let id = ContentHash::of(&file.bytes);
    let stream = Some(stream_from_bytes(file.bytes.clone()));
    let fps = ctx.config().fps;
    let whole_secs = |us: u64| (us as f64 / 1e6).round();

    let (width, height, duration_frames) = match kind {
        MediaKind::Video => {
            let meta = ctx.video.decode(&id, stream).await?.meta();
            (
                Some(meta.width),
                Some(meta.height),
                fps.secs_to_frames_round(whole_secs(meta.duration_us)),
            )
        }
        MediaKind::Image => {
            let frames = ctx.image.decode(&id, stream).await?;
            (Some(frames.width), Some(frames.height), 0)
        }
        MediaKind::Audio => {
            let pcm = ctx.audio.decode(&id, stream).await?;
            (None, None, fps.secs_to_frames_round(whole_secs(pcm.duration_us())))
        }
        MediaKind::Text => {
            return Err(ReelError::validation("text items are not imported from files"));
        }
    };

    let source = ctx.sources().intern(Source {
        id,
        locator: file.locator.clone(),
        name: file.name.clone(),
        format: file.mime.clone(),
        kind,
        width,
        height,
        duration_frames,
    });

    let mut item = match kind {
        MediaKind::Video => TrackItem::Video(VideoItem::new(source.clone(), at)),
        MediaKind::Audio => TrackItem::Audio(AudioItem::new(source.clone(), at)),
        _ => TrackItem::Image(ImageItem::new(
            source.clone(),
            at,
            ctx.config().image_default_frames,
        )),
    };
    item.resize(ctx.config().preview);
    tracing::info!(id = %source.id, kind = %kind, frames = item.span().len_frames(), "imported");
    Ok(Imported { source, item })
}

/// Catalog entry for an imported source.
///
/// Videos use their fourth thumbnail; images use their first frame. Audio has no preview.
pub async fn catalog_entry(
    ctx: &CompositionContext,
    file: &MediaFile,
    source: &Source,
) -> ReelResult<CatalogEntry> {
    let thumbnail_png = match source.kind {
        MediaKind::Video => {
            let thumbs = ctx.thumbnails(source).await?;
            match thumbs.get(CATALOG_THUMBNAIL_INDEX) {
                Some(t) => Some(Bytes::from(FrameRGBA::from_decoded(&t.frame).encode_png()?)),
                None => None,
            }
        }
        MediaKind::Image if file.mime == "image/png" => Some(file.bytes.clone()),
        MediaKind::Image => {
            let frames = ctx.image.decode(&source.id, None).await?;
            match frames.frame(0) {
                Some(f) => Some(Bytes::from(FrameRGBA::from_decoded(f).encode_png()?)),
                None => None,
            }
        }
        MediaKind::Audio | MediaKind::Text => None,
    };
    Ok(CatalogEntry {
        id: source.id.clone(),
        name: source.name.clone(),
        kind: source.kind,
        mime: file.mime.clone(),
        size_bytes: file.bytes.len() as u64,
        thumbnail_png,
    })
}

/// Import `file` at the play-head and add its item to `timeline`, recording it in `catalog`.
pub async fn import_into(
    ctx: &CompositionContext,
    timeline: &mut Timeline,
    file: &MediaFile,
    play_head: u64,
    catalog: Option<&dyn ResourceCatalog>,
) -> ReelResult<(Imported, ItemLocation)> {
    let imported = import_media(ctx, file, play_head).await?;
    if let Some(catalog) = catalog {
        catalog
            .add(catalog_entry(ctx, file, &imported.source).await?)
            .await?;
    }
    let loc = timeline.add_item(imported.item.clone());
    Ok((imported, loc))
}

/// New text item at `at`, spanning the configured default length.
pub fn text_item(ctx: &CompositionContext, style: TextStyle, at: u64) -> ReelResult<TrackItem> {
    let mut engine = ctx.text_engine();
    let item = TextItem::new(style, at, ctx.config().text_default_frames, &mut *engine)?;
    Ok(TrackItem::Text(item))
}

#[cfg(test)]
#[path = "../tests/unit/import.rs"]
mod tests;
