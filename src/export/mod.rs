//! Offline export: items to render units, rasterized into a frame sink.

pub mod audio;
pub mod clip;
pub mod combine;
pub mod ffmpeg;
pub mod render;
pub mod sink;

pub use audio::AudioMix;
pub use clip::{ClipSpan, split_clip};
pub use combine::{RenderUnit, UnitMedia, UnitTime};
pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use render::{ExportPipeline, ExportStats, ExportThreading};
pub use sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
