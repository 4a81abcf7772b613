//! Preview compositing: surfaces, per-item draws, the frame scheduler and audio sync.

pub mod draw;
pub mod output;
pub mod playback;
pub mod scheduler;
pub mod surface;

pub use output::{FrontBuffer, OutputSink};
pub use playback::{PlaybackController, Transport, TransportFactory};
pub use scheduler::{CompositionScheduler, DrawFailure, RenderOutcome, RenderPhase, RenderReport};
pub use surface::{FrameRGBA, Surface};
