use super::*;

#[test]
fn frame_range_validation_and_contains() {
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(4)).is_err());
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert_eq!(r.len_frames(), 3);
    assert!(r.contains(FrameIndex(2)));
    assert!(!r.contains(FrameIndex(5)));
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(3)).unwrap().is_empty());
}

#[test]
fn fps_frame_micros_truncates() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.frame_micros(), 33_333);
    assert_eq!(fps.frames_to_micros(30), 999_990);
    assert_eq!(fps.micros_to_frame(999_990), 30);
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn fps_seconds_conversions() {
    let fps = Fps::default();
    assert_eq!(fps.secs_to_frames_round(2.0), 60);
    assert!((fps.frames_to_secs(-15) + 0.5).abs() < 1e-9);
}

#[test]
fn canvas_scaling_rounds() {
    let c = Canvas {
        width: 1080,
        height: 1920,
    };
    assert_eq!(
        c.scaled(0.5),
        Canvas {
            width: 540,
            height: 960
        }
    );
}

#[test]
fn premul_from_straight() {
    let c = Rgba8Premul::from_straight_rgba(255, 0, 0, 128);
    assert_eq!(c.to_array(), [128, 0, 0, 128]);
}

#[test]
fn timecode_formatting() {
    let fps = Fps::default();
    assert_eq!(format_timecode(0, fps), "00:00:00:00");
    assert_eq!(format_timecode(30 * 61 + 7, fps), "00:01:01:07");
    assert_eq!(format_timecode(30 * 3600, fps), "01:00:00:00");
}
