use super::*;
use crate::assets::source::ContentHash;

struct FixedAdvance(f64);

impl TextMeasure for FixedAdvance {
    fn line_width(&mut self, line: &str, _family: &str, _font_size: f64) -> ReelResult<f64> {
        Ok(line.chars().count() as f64 * self.0)
    }
}

fn image_source(w: u32, h: u32) -> Arc<Source> {
    Arc::new(Source {
        id: ContentHash::from_hex("c0"),
        locator: "i.png".into(),
        name: "i.png".into(),
        format: "image/png".into(),
        kind: MediaKind::Image,
        width: Some(w),
        height: Some(h),
        duration_frames: 0,
    })
}

#[test]
fn ids_are_unique() {
    let a = ItemId::next();
    let b = ItemId::next();
    assert_ne!(a, b);
}

#[test]
fn draw_geometry_is_relative_to_canvas_center() {
    let canvas = Canvas {
        width: 1080,
        height: 1920,
    };
    let attrs = DrawAttrs {
        center_x: 10.0,
        center_y: -20.0,
        scale: 50.0,
        width: 400.0,
        height: 200.0,
    };
    assert_eq!(attrs.draw_width(), 200.0);
    assert_eq!(attrs.draw_height(), 100.0);
    assert_eq!(attrs.draw_x(canvas), 540.0 - 100.0 + 10.0);
    assert_eq!(attrs.draw_y(canvas), 960.0 - 50.0 - 20.0);
    let r = attrs.dest_rect(canvas);
    assert_eq!((r.width(), r.height()), (200.0, 100.0));
}

#[test]
fn fit_to_shrinks_but_never_enlarges() {
    let player = Canvas {
        width: 1080,
        height: 1920,
    };
    let mut big = DrawAttrs::sized(3840.0, 2160.0);
    big.fit_to(player);
    assert!((big.width - 1080.0).abs() < 1e-9);
    assert!((big.height - 607.5).abs() < 1e-9);

    let mut small = DrawAttrs::sized(100.0, 50.0);
    small.fit_to(player);
    assert_eq!((small.width, small.height), (100.0, 50.0));
}

#[test]
fn image_item_resize_fits_player() {
    let mut item = TrackItem::Image(ImageItem::new(image_source(2160, 3840), 5, 90));
    item.resize(Canvas {
        width: 1080,
        height: 1920,
    });
    let d = item.draw_attrs().unwrap();
    assert_eq!((d.width, d.height), (1080.0, 1920.0));
    assert_eq!((item.start(), item.end()), (5, 95));
}

#[test]
fn placement_consistency() {
    assert!(Placement::natural(10, 100).is_consistent(true));
    let trimmed = Placement {
        start: 10,
        end: 80,
        frame_count: 100,
        offset_l: 20,
        offset_r: 10,
    };
    assert!(trimmed.is_consistent(true));
    let broken = Placement {
        end: 81,
        ..trimmed
    };
    assert!(!broken.is_consistent(true));
    assert!(broken.is_consistent(false));
}

#[test]
fn trim_keeps_source_alignment() {
    let mut p = Placement::natural(100, 300);
    p.trim(30, 20).unwrap();
    assert_eq!((p.start, p.end), (130, 380));
    assert!(p.is_consistent(true));

    p.trim(0, 0).unwrap();
    assert_eq!((p.start, p.end), (100, 400));

    assert!(p.trim(200, 100).is_err());
    let mut early = Placement::natural(0, 50);
    early.trim(10, 0).unwrap();
    assert_eq!(early.start, 10);
}

#[test]
fn text_item_is_measured_on_creation_and_restyle() {
    let mut m = FixedAdvance(10.0);
    let style = TextStyle {
        content: "hello".into(),
        font_size: 20.0,
        ..TextStyle::default()
    };
    let mut text = TextItem::new(style, 0, 1800, &mut m).unwrap();
    assert_eq!(text.draw.width, 58.0);
    assert!((text.draw.height - (20.0 * 1.2 + 8.0)).abs() < 1e-9);
    assert_eq!(text.span.end, 1800);

    text.restyle(&mut m, |s| s.content = "hello\nworld!!".into())
        .unwrap();
    assert_eq!(text.draw.width, 78.0);
    assert!((text.draw.height - (2.0 * 24.0 + 8.0)).abs() < 1e-9);
}

#[test]
fn failed_restyle_keeps_previous_style() {
    let mut m = FixedAdvance(10.0);
    let mut text = TextItem::new(
        TextStyle {
            content: "hi".into(),
            ..TextStyle::default()
        },
        0,
        10,
        &mut m,
    )
    .unwrap();
    let before = text.clone();
    assert!(text.restyle(&mut m, |s| s.font_size = 0.0).is_err());
    assert_eq!(text.style(), before.style());
    assert_eq!(text.draw, before.draw);
}

#[test]
fn audibility_follows_kind_and_silent_flag() {
    let src = Arc::new(Source {
        kind: MediaKind::Video,
        ..(*image_source(10, 10)).clone()
    });
    let mut v = VideoItem::new(src, 0);
    v.span = Placement::natural(0, 10);
    let item = TrackItem::Video(v.clone());
    assert!(item.is_audible_at(0));
    assert!(item.is_visual_at(9));
    assert!(!item.is_visual_at(10));

    v.silent = true;
    assert!(!TrackItem::Video(v).is_audible_at(0));
}

#[test]
fn items_round_trip_through_json_with_fresh_ids() {
    let item = TrackItem::Image(ImageItem::new(image_source(10, 10), 0, 30));
    let json = serde_json::to_string(&item).unwrap();
    assert!(json.contains("\"type\":\"image\""));
    let back: TrackItem = serde_json::from_str(&json).unwrap();
    assert_ne!(back.id(), item.id());
    assert_eq!(back.span(), item.span());
    assert_eq!(back.source(), item.source());
}
