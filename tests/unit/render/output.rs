use super::*;

fn frame(fill: u8) -> Arc<FrameRGBA> {
    Arc::new(FrameRGBA {
        width: 1,
        height: 1,
        data: vec![fill; 4],
        premultiplied: true,
    })
}

#[test]
fn front_buffer_starts_empty() {
    let fb = FrontBuffer::new();
    assert!(fb.current().is_none());
    assert_eq!(fb.presented(), 0);
}

#[test]
fn present_replaces_the_visible_frame() {
    let fb = FrontBuffer::new();
    fb.present(frame(10));
    fb.present(frame(20));
    assert_eq!(fb.presented(), 2);
    assert_eq!(fb.current().unwrap().data, vec![20; 4]);
}
