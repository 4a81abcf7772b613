use std::io::Cursor;

use async_trait::async_trait;

use super::*;
use crate::config::EngineConfig;
use crate::context::Decoders;
use crate::decode::audio::AudioPcm;
use crate::decode::video::{VideoClip, VideoMeta};
use crate::decode::{DecodedFrame, MediaDecoder};
use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::store::StoredBlob;
use crate::store::catalog::MemoryCatalog;
use crate::store::memory::MemoryByteStore;

#[derive(Debug)]
struct WideClip;

impl VideoClip for WideClip {
    fn meta(&self) -> VideoMeta {
        VideoMeta {
            width: 4000,
            height: 1000,
            duration_us: 2_400_000,
            has_audio: false,
        }
    }

    fn frame_at(&self, _ts_us: u64) -> ReelResult<Option<DecodedFrame>> {
        Ok(Some(DecodedFrame::solid(
            4,
            2,
            Rgba8Premul::from_straight_rgba(0, 255, 0, 255),
        )))
    }
}

struct WideDecoder;

#[async_trait]
impl MediaDecoder<dyn VideoClip> for WideDecoder {
    async fn decode(&self, _blob: StoredBlob) -> ReelResult<Arc<dyn VideoClip>> {
        Ok(Arc::new(WideClip))
    }
}

/// One second of stereo silence at 1 kHz.
struct SilenceDecoder;

#[async_trait]
impl MediaDecoder<AudioPcm> for SilenceDecoder {
    async fn decode(&self, _blob: StoredBlob) -> ReelResult<Arc<AudioPcm>> {
        Ok(Arc::new(AudioPcm {
            sample_rate: 1_000,
            channels: 2,
            interleaved_f32: Arc::new(vec![0.0; 2_000]),
        }))
    }
}

fn context() -> (CompositionContext, Arc<MemoryByteStore>) {
    let config = EngineConfig {
        preview: Canvas {
            width: 100,
            height: 50,
        },
        thumbnail_step_us: 100_000,
        ..EngineConfig::default()
    };
    let mut decoders = Decoders::standard(&config);
    decoders.video = Arc::new(WideDecoder);
    decoders.audio = Arc::new(SilenceDecoder);
    let store = Arc::new(MemoryByteStore::new());
    (
        CompositionContext::with_decoders(config, store.clone(), decoders),
        store,
    )
}

fn file(name: &str, mime: &str, bytes: Vec<u8>) -> MediaFile {
    MediaFile {
        name: name.into(),
        mime: mime.into(),
        locator: format!("/media/{name}"),
        bytes: Bytes::from(bytes),
    }
}

fn png_file(w: u32, h: u32) -> MediaFile {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    file("still.png", "image/png", buf)
}

#[tokio::test]
async fn video_import_rounds_duration_and_fits_player() {
    let (ctx, store) = context();
    let f = file("clip.mp4", "video/mp4", b"not really a video".to_vec());
    let imported = import_media(&ctx, &f, 12).await.unwrap();

    let src = &imported.source;
    assert_eq!(src.id, ContentHash::of(b"not really a video"));
    assert_eq!(src.kind, MediaKind::Video);
    assert_eq!((src.width, src.height), (Some(4000), Some(1000)));
    // 2.4 s rounds to 2 s.
    assert_eq!(src.duration_frames, 60);
    assert_eq!(src.locator, "/media/clip.mp4");
    assert_eq!(store.len(), 1);

    let TrackItem::Video(v) = &imported.item else {
        panic!("expected a video item");
    };
    assert_eq!((v.span.start, v.span.end), (12, 72));
    assert_eq!((v.draw.width, v.draw.height), (100.0, 25.0));
    assert!(ctx.video.cached(&src.id).is_some());
}

#[tokio::test]
async fn image_import_uses_default_span() {
    let (ctx, _store) = context();
    let imported = import_media(&ctx, &png_file(20, 10), 0).await.unwrap();
    let TrackItem::Image(i) = &imported.item else {
        panic!("expected an image item");
    };
    assert_eq!(i.span.len_frames(), ctx.config().image_default_frames);
    // Smaller than the player: left as is.
    assert_eq!((i.draw.width, i.draw.height), (20.0, 10.0));
}

#[tokio::test]
async fn audio_import_has_no_geometry() {
    let (ctx, _store) = context();
    let f = file("a.mp3", "audio/mpeg", b"mp3".to_vec());
    let imported = import_media(&ctx, &f, 5).await.unwrap();
    assert_eq!(imported.source.duration_frames, 30);
    assert_eq!(imported.source.width, None);
    assert_eq!(imported.item.end(), 35);
}

#[tokio::test]
async fn same_bytes_share_one_source_and_one_decode() {
    let (ctx, _store) = context();
    let f = png_file(2, 2);
    let a = import_media(&ctx, &f, 0).await.unwrap();
    let b = import_media(&ctx, &f, 90).await.unwrap();
    assert!(Arc::ptr_eq(&a.source, &b.source));
    assert_eq!(ctx.image.decode_count(), 1);
    assert_ne!(a.item.id(), b.item.id());
}

#[tokio::test]
async fn unsupported_mime_is_rejected() {
    let (ctx, store) = context();
    let f = file("notes.txt", "text/plain", b"hi".to_vec());
    let err = import_media(&ctx, &f, 0).await.unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn corrupt_image_is_a_decode_failure() {
    let (ctx, _store) = context();
    let f = file("bad.png", "image/png", b"garbage".to_vec());
    let err = import_media(&ctx, &f, 0).await.unwrap_err();
    assert!(matches!(err, ReelError::DecodeFailure(_)));
}

#[tokio::test]
async fn import_into_places_item_and_records_catalog_entry() {
    let (ctx, _store) = context();
    let catalog = MemoryCatalog::new();
    let mut tl = Timeline::new();
    let f = file("clip.mp4", "video/mp4", b"video bytes".to_vec());

    let (imported, loc) = import_into(&ctx, &mut tl, &f, 30, Some(&catalog))
        .await
        .unwrap();
    assert_eq!(tl.item(loc).map(TrackItem::id), Some(imported.item.id()));
    assert!(tl.lanes[loc.lane].main);

    let entry = catalog.get(&imported.source.id).await.unwrap().unwrap();
    assert_eq!(entry.name, "clip.mp4");
    assert_eq!(entry.size_bytes, 11);
    let png = entry.thumbnail_png.expect("video thumbnail");
    let thumb = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(thumb.dimensions(), (4, 2));
    assert_eq!(thumb.get_pixel(0, 0).0, [0, 255, 0, 255]);
}

#[tokio::test]
async fn png_catalog_entry_reuses_file_bytes() {
    let (ctx, _store) = context();
    let f = png_file(3, 3);
    let imported = import_media(&ctx, &f, 0).await.unwrap();
    let entry = catalog_entry(&ctx, &f, &imported.source).await.unwrap();
    assert_eq!(entry.thumbnail_png, Some(f.bytes.clone()));
    assert_eq!(entry.kind, MediaKind::Image);
}

#[test]
fn mime_is_guessed_from_extension() {
    assert_eq!(mime_from_extension(Path::new("a/b.MP4")), Some("video/mp4"));
    assert_eq!(mime_from_extension(Path::new("x.jpeg")), Some("image/jpeg"));
    assert_eq!(mime_from_extension(Path::new("song.flac")), Some("audio/flac"));
    assert_eq!(mime_from_extension(Path::new("readme")), None);
    assert_eq!(mime_from_extension(Path::new("doc.pdf")), None);
}

#[test]
fn text_item_spans_default_frames() {
    let Ok(font) = std::fs::read("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf") else {
        return;
    };
    let (ctx, _store) = context();
    ctx.register_font("DejaVu Sans", font);
    let item = text_item(
        &ctx,
        TextStyle {
            content: "Title".into(),
            font_family: "DejaVu Sans".into(),
            ..TextStyle::default()
        },
        10,
    )
    .unwrap();
    assert_eq!(item.start(), 10);
    assert_eq!(item.end(), 10 + ctx.config().text_default_frames);
    assert!(item.draw_attrs().unwrap().width > 8.0);
}
