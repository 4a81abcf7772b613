#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod context;
pub mod decode;
pub mod export;
pub mod foundation;
pub mod import;
pub mod render;
pub mod store;
pub mod timeline;

pub use assets::source::{ContentHash, MediaKind, Source, SourceRegistry};
pub use config::{EngineConfig, LoggingConfig, init_logging};
pub use context::{CompositionContext, Decoders};
pub use export::{ExportPipeline, ExportThreading, FfmpegSink, FfmpegSinkOpts, InMemorySink};
pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rect, format_timecode};
pub use foundation::error::{ReelError, ReelResult};
pub use import::{MediaFile, import_media};
pub use render::{CompositionScheduler, FrameRGBA, FrontBuffer, RenderOutcome, Surface};
pub use store::ByteStore;
pub use store::local::LocalByteStore;
pub use store::memory::MemoryByteStore;
pub use timeline::item::{DrawAttrs, ItemId, Placement, TrackItem};
pub use timeline::lane::{Lane, Timeline};
