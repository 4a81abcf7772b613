use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;

use super::*;
use crate::assets::source::{ContentHash, MediaKind, Source};
use crate::config::EngineConfig;
use crate::export::sink::InMemorySink;
use crate::store::memory::MemoryByteStore;
use crate::store::{ByteStore, stream_from_bytes};
use crate::timeline::item::{DrawAttrs, ImageItem, TrackItem};
use crate::timeline::lane::Lane;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn context(ratio: f64) -> (CompositionContext, Arc<MemoryByteStore>) {
    let config = EngineConfig {
        preview: Canvas {
            width: 20,
            height: 20,
        },
        output_ratio: ratio,
        ..EngineConfig::default()
    };
    let store = Arc::new(MemoryByteStore::new());
    (CompositionContext::new(config, store.clone()), store)
}

async fn solid_image(
    store: &MemoryByteStore,
    rgba: [u8; 4],
    start: u64,
    frames: u64,
) -> TrackItem {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    let id = ContentHash::of(&bytes);
    store
        .write(&id, stream_from_bytes(Bytes::from(bytes)))
        .await
        .unwrap();
    let source = Arc::new(Source {
        id,
        locator: "solid.png".into(),
        name: "solid.png".into(),
        format: "image/png".into(),
        kind: MediaKind::Image,
        width: Some(2),
        height: Some(2),
        duration_frames: 0,
    });
    let mut item = ImageItem::new(source, start, frames);
    item.draw = DrawAttrs::sized(20.0, 20.0);
    item.into()
}

async fn two_lanes(store: &MemoryByteStore) -> Timeline {
    let top = solid_image(store, RED, 0, 3).await;
    let bottom = solid_image(store, BLUE, 0, 5).await;
    let lane = |item| Lane {
        items: vec![item],
        ..Lane::new(MediaKind::Image)
    };
    Timeline {
        lanes: vec![lane(top), lane(bottom)],
    }
}

#[tokio::test]
async fn units_are_ordered_bottom_lane_first() {
    let (ctx, store) = context(1.0);
    let tl = two_lanes(&store).await;
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();
    assert_eq!(plan.frames(), 5);
    assert_eq!(plan.units().len(), 2);
    assert_eq!(plan.units()[0].item, tl.lanes[1].items[0].id());
    assert_eq!(plan.units()[1].item, tl.lanes[0].items[0].id());
    assert!(plan.audio().is_none());
}

#[tokio::test]
async fn exported_frames_follow_preview_z_order() {
    let (ctx, store) = context(1.0);
    let tl = two_lanes(&store).await;
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();

    let mut sink = InMemorySink::new();
    let stats = plan
        .render_to(&mut sink, &ExportThreading::default())
        .unwrap();
    assert_eq!(stats.frames, 5);
    assert_eq!(stats.visual_units, 2);
    assert_eq!(stats.audio_units, 0);
    assert!(sink.is_finished());

    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (20, 20));
    assert!(cfg.audio.is_none());

    let frames = sink.frames();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[0].0, FrameIndex(0));
    assert_eq!(frames[2].1.pixel(10, 10), Some(RED));
    assert_eq!(frames[3].1.pixel(10, 10), Some(BLUE));
}

#[tokio::test]
async fn output_ratio_scales_canvas_and_rects() {
    let (ctx, store) = context(2.0);
    let tl = two_lanes(&store).await;
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();
    assert_eq!(plan.canvas(), Canvas { width: 40, height: 40 });

    let mut surface = Surface::new(plan.canvas()).unwrap();
    let frame = plan.render_frame(4, &mut surface).unwrap();
    assert_eq!(frame.pixel(35, 35), Some(BLUE));
}

#[tokio::test]
async fn parallel_export_matches_sequential() {
    let (ctx, store) = context(1.0);
    let tl = two_lanes(&store).await;
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();

    let mut seq = InMemorySink::new();
    plan.render_to(&mut seq, &ExportThreading::default()).unwrap();
    let mut par = InMemorySink::new();
    plan.render_to(
        &mut par,
        &ExportThreading {
            parallel: true,
            chunk_size: 2,
            threads: Some(2),
        },
    )
    .unwrap();
    assert_eq!(seq.frames(), par.frames());
}

#[tokio::test]
async fn empty_timeline_is_rejected() {
    let (ctx, _store) = context(1.0);
    let plan = ExportPipeline::prepare(&ctx, &Timeline::new()).await.unwrap();
    let err = plan
        .render_to(&mut InMemorySink::new(), &ExportThreading::default())
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[tokio::test]
async fn zero_threads_is_rejected() {
    let (ctx, store) = context(1.0);
    let tl = two_lanes(&store).await;
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();
    let threading = ExportThreading {
        parallel: true,
        threads: Some(0),
        ..ExportThreading::default()
    };
    assert!(plan.render_to(&mut InMemorySink::new(), &threading).is_err());
}

#[tokio::test]
async fn range_export_keeps_absolute_indices() {
    let (ctx, store) = context(1.0);
    let tl = two_lanes(&store).await;
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();

    let mut sink = InMemorySink::new();
    let range = FrameRange::new(FrameIndex(2), FrameIndex(4)).unwrap();
    let stats = plan
        .render_range_to(&mut sink, range, &ExportThreading::default())
        .unwrap();
    assert_eq!(stats.frames, 2);
    let indices: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(indices, vec![2, 3]);
    assert_eq!(sink.frames()[0].1.pixel(10, 10), Some(RED));
    assert_eq!(sink.frames()[1].1.pixel(10, 10), Some(BLUE));

    let past_end = FrameRange::new(FrameIndex(3), FrameIndex(9)).unwrap();
    assert!(
        plan.render_range_to(&mut sink, past_end, &ExportThreading::default())
            .is_err()
    );
}

/// Clip that records every source timestamp it is asked for.
#[derive(Debug, Default)]
struct TimestampLog {
    seen: std::sync::Mutex<Vec<u64>>,
}

impl TimestampLog {
    fn take(&self) -> Vec<u64> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

impl crate::decode::video::VideoClip for TimestampLog {
    fn meta(&self) -> crate::decode::video::VideoMeta {
        crate::decode::video::VideoMeta {
            width: 20,
            height: 20,
            duration_us: 2_000_000,
            has_audio: false,
        }
    }

    fn frame_at(&self, ts_us: u64) -> ReelResult<Option<DecodedFrame>> {
        self.seen.lock().unwrap().push(ts_us);
        Ok(Some(DecodedFrame::solid(
            2,
            2,
            crate::foundation::core::Rgba8Premul::from_straight_rgba(0, 0, 255, 255),
        )))
    }
}

struct LoggedVideo(Arc<TimestampLog>);

#[async_trait::async_trait]
impl crate::decode::MediaDecoder<dyn crate::decode::video::VideoClip> for LoggedVideo {
    async fn decode(
        &self,
        _blob: crate::store::StoredBlob,
    ) -> ReelResult<Arc<dyn crate::decode::video::VideoClip>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn trimmed_video_exports_the_frame_preview_shows() {
    let log = Arc::new(TimestampLog::default());
    let config = EngineConfig {
        preview: Canvas {
            width: 20,
            height: 20,
        },
        ..EngineConfig::default()
    };
    let mut decoders = crate::context::Decoders::standard(&config);
    decoders.video = Arc::new(LoggedVideo(log.clone()));
    let store = Arc::new(MemoryByteStore::new());
    let ctx = CompositionContext::with_decoders(config, store.clone(), decoders);

    let bytes = b"not really a video".to_vec();
    let id = ContentHash::of(&bytes);
    store
        .write(&id, stream_from_bytes(Bytes::from(bytes)))
        .await
        .unwrap();
    let source = Arc::new(Source {
        id: id.clone(),
        locator: "clip.mp4".into(),
        name: "clip.mp4".into(),
        format: "video/mp4".into(),
        kind: MediaKind::Video,
        width: Some(20),
        height: Some(20),
        duration_frames: 60,
    });
    let mut video = crate::timeline::item::VideoItem::new(source, 0);
    video.span.trim(10, 5).unwrap();
    let frame = 25;
    let probe = crate::render::draw::video_probe_frame(&video, frame);
    ctx.video_frame(&id, probe).await.unwrap();
    let preview = log.take();

    let tl = Timeline {
        lanes: vec![Lane {
            items: vec![video.into()],
            ..Lane::new(MediaKind::Video)
        }],
    };
    let plan = ExportPipeline::prepare(&ctx, &tl).await.unwrap();
    log.take();
    let mut sink = InMemorySink::new();
    plan.render_range_to(
        &mut sink,
        FrameRange::new(FrameIndex(frame), FrameIndex(frame + 1)).unwrap(),
        &ExportThreading::default(),
    )
    .unwrap();

    // Frame 25 of an item trimmed by 10 at start 10 is source frame 25, read at 24 durations.
    assert_eq!(preview, vec![24 * 33_333]);
    assert_eq!(log.take(), preview);
}
