//! Ordered per-frame compositing for preview.
//!
//! One render is in flight at a time. A request arriving while a render is building or drawing
//! is coalesced: it records the latest wanted frame, bumps the render generation and returns.
//! The in-flight render notices the generation change before committing, discards its surface
//! and renders the recorded frame instead.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::output::OutputSink;
use super::surface::{Surface, check_canvas};
use crate::context::CompositionContext;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::item::{ItemId, TrackItem};
use crate::timeline::lane::Timeline;

/// Where the scheduler is in its current render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderPhase {
    #[default]
    Idle,
    Building,
    Drawing,
    Committed,
}

/// An item whose draw failed. The rest of the pass still ran.
#[derive(Debug)]
pub struct DrawFailure {
    pub item: ItemId,
    pub lane: usize,
    pub error: ReelError,
}

/// Summary of the render that finally committed.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub frame: u64,
    pub generation: u64,
    /// Items drawn without error.
    pub drawn: usize,
    pub failures: Vec<DrawFailure>,
    /// Frames whose renders were discarded before commit because a newer request arrived.
    pub superseded: Vec<u64>,
}

#[derive(Debug)]
pub enum RenderOutcome {
    /// This call rendered and presented a frame (possibly a newer one than it was asked for).
    Committed(RenderReport),
    /// Another render was in flight; it will pick up this request.
    Coalesced,
    /// The render went stale (generation advanced elsewhere) and nothing newer was queued.
    Discarded { superseded: Vec<u64> },
}

struct PendingRender {
    timeline: Arc<Timeline>,
    frame: u64,
    generation: u64,
}

#[derive(Default)]
struct SchedState {
    in_flight: bool,
    pending: Option<PendingRender>,
    phase: RenderPhase,
}

/// Composites the visual items active at a frame in lane order and commits the result.
pub struct CompositionScheduler {
    ctx: Arc<CompositionContext>,
    sink: Arc<dyn OutputSink>,
    surface: tokio::sync::Mutex<Surface>,
    state: Mutex<SchedState>,
}

impl std::fmt::Debug for CompositionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionScheduler")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl CompositionScheduler {
    /// Allocate the back buffer. Fails with `SurfaceUnavailable` for unusable canvases.
    pub fn new(
        ctx: Arc<CompositionContext>,
        sink: Arc<dyn OutputSink>,
        canvas: Canvas,
    ) -> ReelResult<Self> {
        check_canvas(canvas)?;
        Ok(Self {
            ctx,
            sink,
            surface: tokio::sync::Mutex::new(Surface::new(canvas)?),
            state: Mutex::new(SchedState::default()),
        })
    }

    pub fn context(&self) -> &Arc<CompositionContext> {
        &self.ctx
    }

    pub fn phase(&self) -> RenderPhase {
        self.lock_state().phase
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SchedState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_phase(&self, phase: RenderPhase) {
        self.lock_state().phase = phase;
    }

    /// Render `frame` of `timeline` and present it, or hand it to the render already in flight.
    ///
    /// Per-item draw failures are reported in the outcome rather than aborting the pass.
    pub async fn request_render(&self, timeline: Arc<Timeline>, frame: u64) -> RenderOutcome {
        let generation = self.ctx.advance_generation();
        {
            let mut state = self.lock_state();
            if state.in_flight {
                debug!(frame, generation, "render in flight, coalescing");
                state.pending = Some(PendingRender {
                    timeline,
                    frame,
                    generation,
                });
                return RenderOutcome::Coalesced;
            }
            state.in_flight = true;
        }

        let mut superseded = Vec::new();
        let mut job = PendingRender {
            timeline,
            frame,
            generation,
        };
        loop {
            let report = self.render_once(&job).await;
            let next = {
                let mut state = self.lock_state();
                let next = state.pending.take();
                if next.is_none() {
                    state.in_flight = false;
                    if report.is_none() {
                        state.phase = RenderPhase::Idle;
                    }
                }
                next
            };
            if report.is_none() {
                superseded.push(job.frame);
            }
            match (report, next) {
                (Some(mut report), None) => {
                    report.superseded = superseded;
                    return RenderOutcome::Committed(report);
                }
                (None, None) => return RenderOutcome::Discarded { superseded },
                // A newer request arrived; render it on this call.
                (_, Some(next)) => job = next,
            }
        }
    }

    /// Build, draw and (unless stale) commit one frame. `None` means the work was superseded.
    #[tracing::instrument(skip_all, fields(frame = job.frame, generation = job.generation))]
    async fn render_once(&self, job: &PendingRender) -> Option<RenderReport> {
        self.set_phase(RenderPhase::Building);
        // Later lanes are enqueued first, so earlier lanes end up on top.
        let mut queue: Vec<(usize, &TrackItem)> = Vec::new();
        for (lane, item) in job.timeline.visual_items_at(job.frame) {
            queue.insert(0, (lane, item));
        }

        self.set_phase(RenderPhase::Drawing);
        let mut surface = self.surface.lock().await;
        surface.clear();
        let mut report = RenderReport {
            frame: job.frame,
            generation: job.generation,
            ..RenderReport::default()
        };
        for (lane, item) in queue {
            if !self.ctx.is_current(job.generation) {
                debug!(frame = job.frame, "render superseded mid-pass");
                return None;
            }
            match item.draw(&self.ctx, &mut surface, job.frame).await {
                Ok(()) => report.drawn += 1,
                Err(error) => {
                    warn!(item = %item.id(), lane, %error, "item draw failed");
                    report.failures.push(DrawFailure {
                        item: item.id(),
                        lane,
                        error,
                    });
                }
            }
        }

        if !self.ctx.is_current(job.generation) {
            debug!(frame = job.frame, "render superseded before commit");
            return None;
        }
        self.sink.present(Arc::new(surface.snapshot()));
        self.set_phase(RenderPhase::Committed);
        debug!(
            frame = job.frame,
            drawn = report.drawn,
            failed = report.failures.len(),
            "frame committed"
        );
        Some(report)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
