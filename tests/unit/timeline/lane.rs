use std::sync::Arc;

use super::*;
use crate::assets::source::{ContentHash, Source};
use crate::timeline::item::{AudioItem, ImageItem, Placement, VideoItem};

fn src(kind: MediaKind, id: &str) -> Arc<Source> {
    Arc::new(Source {
        id: ContentHash::from_hex(id),
        locator: format!("{id}.bin"),
        name: id.to_string(),
        format: "application/octet-stream".into(),
        kind,
        width: Some(100),
        height: Some(100),
        duration_frames: 100,
    })
}

fn video_at(start: u64, len: u64) -> TrackItem {
    let mut v = VideoItem::new(src(MediaKind::Video, "v0"), start);
    v.span = Placement::natural(start, len);
    TrackItem::Video(v)
}

fn image_at(start: u64, len: u64) -> TrackItem {
    TrackItem::Image(ImageItem::new(src(MediaKind::Image, "i0"), start, len))
}

#[test]
fn add_item_reuses_fitting_lane_in_sorted_position() {
    let mut tl = Timeline::new();
    assert_eq!(tl.add_item(video_at(100, 100)), ItemLocation { lane: 0, index: 0 });
    assert!(tl.lanes[0].main);

    let loc = tl.add_item(video_at(0, 100));
    assert_eq!(loc, ItemLocation { lane: 0, index: 0 });
    let starts: Vec<u64> = tl.lanes[0].items.iter().map(TrackItem::start).collect();
    assert_eq!(starts, vec![0, 100]);
}

#[test]
fn add_item_opens_new_top_lane_on_overlap_or_kind_mismatch() {
    let mut tl = Timeline::new();
    tl.add_item(video_at(0, 100));
    let loc = tl.add_item(video_at(50, 100));
    assert_eq!(loc, ItemLocation { lane: 0, index: 0 });
    assert_eq!(tl.lanes.len(), 2);
    assert!(!tl.lanes[0].main);
    assert!(tl.lanes[1].main);

    tl.add_item(image_at(0, 10));
    assert_eq!(tl.lanes.len(), 3);
    assert_eq!(tl.lanes[0].kind, MediaKind::Image);
}

#[test]
fn remove_item_drops_empty_non_main_lane() {
    let mut tl = Timeline::new();
    tl.add_item(video_at(0, 100));
    tl.add_item(video_at(0, 100));
    assert_eq!(tl.lanes.len(), 2);

    tl.remove_item(0, 0).unwrap();
    assert_eq!(tl.lanes.len(), 1);

    tl.remove_item(0, 0).unwrap();
    assert_eq!(tl.lanes.len(), 1, "main lane stays");
    assert!(tl.lanes[0].items.is_empty());

    assert!(tl.remove_item(0, 0).is_err());
    assert!(tl.remove_item(5, 0).is_err());
}

#[test]
fn split_at_inserts_right_piece_after_original() {
    let mut tl = Timeline::new();
    let item = video_at(0, 300);
    let id = item.id();
    tl.add_item(item);

    let loc = tl.split_at(id, 120).unwrap();
    assert_eq!(loc, ItemLocation { lane: 0, index: 1 });
    let lane = &tl.lanes[0];
    assert_eq!(lane.items[0].end(), 120);
    assert_eq!(lane.items[1].start(), 120);
    assert_eq!(lane.items[1].span().offset_l, 120);

    assert!(tl.split_at(id, 500).is_err());
    assert!(tl.split_at(ItemId::next(), 10).is_err());
}

#[test]
fn split_copy_that_overlaps_a_neighbour_moves_to_its_own_lane() {
    let mut tl = Timeline::new();
    let a = video_at(0, 300);
    let id = a.id();
    tl.add_item(a);
    tl.add_item(video_at(300, 300));
    assert_eq!(tl.lanes.len(), 1);

    // The copy runs to 120 + 300 and would cover the neighbour at 300.
    let loc = tl.split_at(id, 120).unwrap();
    assert_eq!(loc, ItemLocation { lane: 0, index: 0 });
    assert_eq!(tl.lanes.len(), 2);
    assert_eq!(tl.item(loc).unwrap().start(), 120);
    let source_lane: Vec<(u64, u64)> = tl.lanes[1]
        .items
        .iter()
        .map(|it| (it.start(), it.end()))
        .collect();
    assert_eq!(source_lane, vec![(0, 120), (300, 600)]);
    tl.validate().unwrap();

    let mut json = Vec::new();
    tl.to_writer(&mut json).unwrap();
    let loaded = Timeline::from_reader(json.as_slice()).unwrap();
    assert_eq!(loaded.lanes.len(), 2);
    assert_eq!(loaded.lanes[0].items[0].span(), tl.lanes[0].items[0].span());
}

#[test]
fn visual_items_skip_audio_and_follow_lane_order() {
    let mut tl = Timeline::new();
    tl.lanes.push(Lane {
        kind: MediaKind::Image,
        main: false,
        items: vec![image_at(0, 10)],
    });
    tl.lanes.push(Lane {
        kind: MediaKind::Audio,
        main: false,
        items: vec![TrackItem::Audio(AudioItem::new(src(MediaKind::Audio, "a0"), 0))],
    });
    tl.lanes.push(Lane {
        kind: MediaKind::Video,
        main: true,
        items: vec![video_at(0, 5), video_at(5, 10)],
    });

    let at3: Vec<usize> = tl.visual_items_at(3).into_iter().map(|(l, _)| l).collect();
    assert_eq!(at3, vec![0, 2]);
    let (_, v) = tl.visual_items_at(7)[1];
    assert_eq!(v.start(), 5);
    assert!(tl.visual_items_at(15).is_empty());

    assert_eq!(tl.audible_items_at(3).len(), 2);
    assert_eq!(tl.duration_frames(), 100);
}

#[test]
fn json_round_trip_validates_and_interns_sources() {
    let mut tl = Timeline::new();
    tl.add_item(video_at(0, 100));
    tl.add_item(video_at(100, 100));

    let mut buf = Vec::new();
    tl.to_writer(&mut buf).unwrap();
    let mut back = Timeline::from_reader(buf.as_slice()).unwrap();
    assert_eq!(back.lanes.len(), 1);
    assert_eq!(back.lanes[0].items.len(), 2);

    let registry = SourceRegistry::new();
    back.intern_sources(&registry);
    let a = back.lanes[0].items[0].source().unwrap();
    let b = back.lanes[0].items[1].source().unwrap();
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(registry.live_count(), 1);
}

#[test]
fn validate_rejects_overlap_and_kind_mismatch() {
    let overlapping = Timeline {
        lanes: vec![Lane {
            kind: MediaKind::Video,
            main: true,
            items: vec![video_at(0, 100), video_at(50, 100)],
        }],
    };
    assert!(overlapping.validate().is_err());

    let mixed = Timeline {
        lanes: vec![Lane {
            kind: MediaKind::Video,
            main: true,
            items: vec![image_at(0, 10)],
        }],
    };
    assert!(mixed.validate().is_err());
}
