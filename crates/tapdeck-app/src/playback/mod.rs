//! Playback intent: the only place that knows what pause, play, and quit
//! mean in pipeline terms.

pub mod watch;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;

use crate::pipeline::{Pipeline, PipelineState};

/// Bounded wait for state queries issued from input handlers. A miss is
/// treated as state-unknown and the tap is dropped.
const STATE_QUERY_TIMEOUT: Duration = Duration::from_millis(500);

/// Terminal-transition flag observed by the event-loop driver.
///
/// Requesting shutdown never kills the process directly; the driver winds
/// the loop down and `main` turns the recorded code into the exit status.
/// The first requester wins.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    requested: AtomicBool,
    code: AtomicI32,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                requested: AtomicBool::new(false),
                code: AtomicI32::new(0),
            }),
        }
    }

    pub fn request(&self, code: i32) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            self.inner.code.store(code, Ordering::SeqCst);
        }
    }

    pub fn requested(&self) -> Option<i32> {
        self.inner
            .requested
            .load(Ordering::SeqCst)
            .then(|| self.inner.code.load(Ordering::SeqCst))
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PlaybackController {
    pipeline: Arc<dyn Pipeline>,
    shutdown: ShutdownSignal,
}

impl PlaybackController {
    pub fn new(pipeline: Arc<dyn Pipeline>, shutdown: ShutdownSignal) -> Self {
        Self { pipeline, shutdown }
    }

    /// Single tap or 'p': flip between paused and playing. Completion is
    /// observed asynchronously through the state watcher.
    pub fn toggle_play_pause(&self) {
        match self.pipeline.state(Some(STATE_QUERY_TIMEOUT)) {
            Ok(PipelineState::Paused) => self.pipeline.set_state(PipelineState::Playing),
            Ok(_) => self.pipeline.set_state(PipelineState::Paused),
            Err(e) => log::debug!("toggle skipped: {e}"),
        }
    }

    /// Double tap or 'q': release the engine and wind the process down.
    /// Deliberately irrecoverable.
    pub fn stop_and_shutdown(&self) {
        self.pipeline.set_state(PipelineState::Null);
        self.shutdown.request(1);
    }

    /// Raise to playing; the autoplay entry once the engine reports
    /// itself ready.
    pub fn start_playback(&self) {
        self.pipeline.set_state(PipelineState::Playing);
    }
}
