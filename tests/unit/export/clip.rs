use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn untrimmed_clip_is_returned_as_is() {
    let src = ClipSpan::whole(Arc::new(vec![1u8, 2, 3]));
    let out = split_clip(src.clone(), 0, 0, 300, fps30()).unwrap();
    assert!(out.shares_handle(&src));
    assert_eq!(out.start_us(), 0);
    assert_eq!(out.end_us(), None);
}

#[test]
fn both_sides_trimmed_keeps_only_the_middle() {
    let src = ClipSpan::whole(Arc::new(()));
    let out = split_clip(src.clone(), 30, 30, 300, fps30()).unwrap();
    assert_eq!(out.start_us(), 30 * 33_333);
    assert_eq!(out.end_us(), Some(270 * 33_333));
    assert_eq!(out.duration_us(), Some(240 * 33_333));
    assert!(out.shares_handle(&src));
}

#[test]
fn left_trim_only_runs_to_the_source_end() {
    let out = split_clip(ClipSpan::whole(Arc::new(())), 10, 0, 300, fps30()).unwrap();
    assert_eq!(out.start_us(), 333_330);
    assert_eq!(out.end_us(), None);
    assert_eq!(out.source_time(1_000), 334_330);
}

#[test]
fn right_trim_only_cuts_from_zero() {
    let out = split_clip(ClipSpan::whole(Arc::new(())), 0, 100, 300, fps30()).unwrap();
    assert_eq!(out.start_us(), 0);
    assert_eq!(out.end_us(), Some(200 * 33_333));
}

#[test]
fn trimming_everything_is_rejected() {
    assert!(split_clip(ClipSpan::whole(Arc::new(())), 150, 150, 300, fps30()).is_err());
}

#[test]
fn split_outside_a_bounded_view_is_rejected() {
    let (left, right) = ClipSpan::whole(Arc::new(())).split(1_000).unwrap();
    assert_eq!(left.duration_us(), Some(1_000));
    assert_eq!(right.start_us(), 1_000);
    assert!(left.split(1_000).is_err());
    assert!(left.split(0).is_err());
}
