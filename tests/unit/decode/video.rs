use super::*;
use crate::foundation::core::Rgba8Premul;

#[derive(Debug)]
struct Ramp {
    duration_us: u64,
}

impl VideoClip for Ramp {
    fn meta(&self) -> VideoMeta {
        VideoMeta {
            width: 1,
            height: 1,
            duration_us: self.duration_us,
            has_audio: false,
        }
    }

    fn frame_at(&self, ts_us: u64) -> ReelResult<Option<DecodedFrame>> {
        if ts_us >= self.duration_us {
            return Ok(None);
        }
        let v = (ts_us / 1_000_000) as u8;
        Ok(Some(DecodedFrame::solid(
            1,
            1,
            Rgba8Premul::from_straight_rgba(v, v, v, 255),
        )))
    }
}

#[test]
fn thumbnails_stop_at_clip_end() {
    let clip = Ramp {
        duration_us: 3_500_000,
    };
    let thumbs = clip.thumbnails(50, 1_000_000).unwrap();
    let ts: Vec<u64> = thumbs.iter().map(|t| t.ts_us).collect();
    assert_eq!(ts, vec![0, 1_000_000, 2_000_000, 3_000_000]);
    assert_eq!(thumbs[3].frame.pixel(0, 0), Some([3, 3, 3, 255]));
}

#[test]
fn thumbnails_respect_count() {
    let clip = Ramp {
        duration_us: 60_000_000,
    };
    assert_eq!(clip.thumbnails(5, 1_000_000).unwrap().len(), 5);
}

#[test]
fn frame_lru_evicts_least_recently_used() {
    let mut lru = FrameLru::new(2);
    let f = DecodedFrame::solid(1, 1, Rgba8Premul::transparent());
    lru.insert(1, f.clone());
    lru.insert(2, f.clone());
    assert!(lru.get(1).is_some());
    lru.insert(3, f);
    assert_eq!(lru.len(), 2);
    assert!(lru.get(2).is_none());
    assert!(lru.get(1).is_some());
    assert!(lru.get(3).is_some());
}

#[test]
fn frame_lru_keys_by_millisecond() {
    assert_eq!(FrameLru::key_for(166_665), 166);
    assert_eq!(FrameLru::key_for(999), 0);
}

#[tokio::test]
async fn ffmpeg_decoder_needs_a_file_backed_store() {
    let blob = StoredBlob {
        id: ContentHash::from_hex("abc"),
        bytes: bytes::Bytes::from_static(b"not a video"),
        path: None,
    };
    let err = FfmpegVideoDecoder::default().decode(blob).await.unwrap_err();
    assert!(err.is_decode_failure());
}
