//! Asynchronous bus consumption: mirrors the engine's reported state and
//! drives startup, autoplay, playlist looping, and terminal transitions.

use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::bus::BusMessage;
use crate::pipeline::{Pipeline, PipelineState, SeekFlags};

use super::{PlaybackController, ShutdownSignal};

/// URIs played in order, wrapping back to the first.
pub struct Playlist {
    uris: Vec<String>,
    current: usize,
}

impl Playlist {
    pub fn new(uris: Vec<String>) -> Option<Self> {
        if uris.is_empty() {
            None
        } else {
            Some(Self { uris, current: 0 })
        }
    }

    pub fn current(&self) -> &str {
        &self.uris[self.current]
    }

    /// Advance to the next URI, wrapping to the first.
    pub fn advance(&mut self) -> &str {
        self.current = (self.current + 1) % self.uris.len();
        self.current()
    }
}

pub struct StateWatcher {
    pipeline: Arc<dyn Pipeline>,
    controller: Arc<PlaybackController>,
    shutdown: ShutdownSignal,
    playlist: Option<Playlist>,
    autoplay: bool,
    state: PipelineState,
}

impl StateWatcher {
    pub fn new(
        pipeline: Arc<dyn Pipeline>,
        controller: Arc<PlaybackController>,
        shutdown: ShutdownSignal,
        playlist: Option<Playlist>,
        autoplay: bool,
    ) -> Self {
        Self {
            pipeline,
            controller,
            shutdown,
            playlist,
            autoplay,
            state: PipelineState::VoidPending,
        }
    }

    /// Last state reported by the top-level pipeline.
    #[cfg(test)]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn handle(&mut self, message: BusMessage) {
        let kind = message.kind();
        match message {
            BusMessage::StateChanged { origin, old, new } => {
                // Internal elements ramp through states on their own;
                // only the top-level pipeline's reports drive behavior.
                if origin != self.pipeline.id() {
                    return;
                }
                log::info!("pipeline state: {old} -> {new}");
                self.state = new;
                if new == PipelineState::Ready && self.autoplay {
                    self.controller.start_playback();
                }
            }
            BusMessage::Error {
                origin,
                message,
                debug,
            } => {
                log::error!("pipeline error from element {}: {message}", origin.0);
                if let Some(debug) = debug {
                    log::error!("debug details: {debug}");
                }
                self.pipeline.set_state(PipelineState::Null);
                self.shutdown.request(1);
            }
            BusMessage::EndOfStream => {
                log::info!("end of stream");
                self.pipeline.set_state(PipelineState::Null);
                self.shutdown.request(1);
            }
            BusMessage::AboutToFinish => {
                if let Some(playlist) = &mut self.playlist {
                    let next = playlist.advance().to_string();
                    log::info!("now playing {next}");
                    self.pipeline.set_uri(&next);
                }
            }
            // Surface messages are normally intercepted synchronously;
            // reaching here means no sync handler was installed.
            BusMessage::NeedsContext { .. } | BusMessage::PrepareSurface { .. } => {
                log::warn!("unhandled {kind} message");
            }
        }
    }
}

/// Block until the engine reports Playing. Runs once at startup, before
/// input routing is armed. The overall wait is deliberately unbounded;
/// startup cannot proceed without a definite state.
pub fn wait_until_playing(pipeline: &dyn Pipeline) {
    loop {
        match pipeline.state(Some(Duration::from_secs(1))) {
            Ok(PipelineState::Playing) => return,
            Ok(state) => log::debug!("startup state: {state}"),
            Err(_) => {} // still transitioning, keep waiting
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Fixed-size preroll: pause, seek to a keyframe so the sink negotiates
/// caps, then drop back and re-pause. Lets the window be sized from the
/// stream before playback starts.
pub fn preroll_probe(pipeline: &dyn Pipeline) {
    pipeline.set_state(PipelineState::Paused);
    pipeline.seek(Duration::from_secs(1), SeekFlags::FLUSH_KEY_UNIT);
    match pipeline.state(Some(Duration::from_secs(5))) {
        Ok(state) => log::info!("preroll state: {state}"),
        Err(e) => log::warn!("preroll: {e}"),
    }
    pipeline.seek(Duration::ZERO, SeekFlags::FLUSH_KEY_UNIT);
    pipeline.set_state(PipelineState::Null);
    pipeline.set_state(PipelineState::Paused);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::pipeline::{CapsStructure, ElementId, StateTimeout};

    struct FakePipeline {
        requested: Mutex<Vec<PipelineState>>,
        uris: Mutex<Vec<String>>,
    }

    impl FakePipeline {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requested: Mutex::new(Vec::new()),
                uris: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<PipelineState> {
            self.requested.lock().unwrap().clone()
        }

        fn uris(&self) -> Vec<String> {
            self.uris.lock().unwrap().clone()
        }
    }

    impl Pipeline for FakePipeline {
        fn id(&self) -> ElementId {
            ElementId(1)
        }
        fn set_state(&self, target: PipelineState) {
            self.requested.lock().unwrap().push(target);
        }
        fn state(&self, _timeout: Option<Duration>) -> Result<PipelineState, StateTimeout> {
            Ok(PipelineState::Null)
        }
        fn seek(&self, _position: Duration, _flags: SeekFlags) {}
        fn set_uri(&self, uri: &str) {
            self.uris.lock().unwrap().push(uri.to_string());
        }
        fn set_element_property(&self, _element: &str, _property: &str, _value: &str) {}
        fn sink_caps(&self, _sink_name: &str) -> Option<Vec<CapsStructure>> {
            None
        }
    }

    fn watcher(
        pipeline: &Arc<FakePipeline>,
        shutdown: &ShutdownSignal,
        playlist: Option<Playlist>,
        autoplay: bool,
    ) -> StateWatcher {
        let controller = Arc::new(PlaybackController::new(
            pipeline.clone(),
            shutdown.clone(),
        ));
        StateWatcher::new(
            pipeline.clone(),
            controller,
            shutdown.clone(),
            playlist,
            autoplay,
        )
    }

    fn state_changed(origin: u64, old: PipelineState, new: PipelineState) -> BusMessage {
        BusMessage::StateChanged {
            origin: ElementId(origin),
            old,
            new,
        }
    }

    #[test]
    fn ready_with_autoplay_starts_playback() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let mut watcher = watcher(&pipeline, &shutdown, None, true);

        watcher.handle(state_changed(1, PipelineState::Null, PipelineState::Ready));

        assert_eq!(watcher.state(), PipelineState::Ready);
        assert_eq!(pipeline.requested(), vec![PipelineState::Playing]);
    }

    #[test]
    fn ready_without_autoplay_is_passive() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let mut watcher = watcher(&pipeline, &shutdown, None, false);

        watcher.handle(state_changed(1, PipelineState::Null, PipelineState::Ready));

        assert!(pipeline.requested().is_empty());
    }

    #[test]
    fn internal_element_states_are_ignored() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let mut watcher = watcher(&pipeline, &shutdown, None, true);

        watcher.handle(state_changed(99, PipelineState::Null, PipelineState::Ready));

        assert_eq!(watcher.state(), PipelineState::VoidPending);
        assert!(pipeline.requested().is_empty());
    }

    #[test]
    fn error_forces_null_and_shutdown() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let mut watcher = watcher(&pipeline, &shutdown, None, false);

        watcher.handle(BusMessage::Error {
            origin: ElementId(1),
            message: "decoder blew up".into(),
            debug: Some("stage: vdec".into()),
        });

        assert_eq!(pipeline.requested(), vec![PipelineState::Null]);
        assert_eq!(shutdown.requested(), Some(1));
    }

    #[test]
    fn end_of_stream_forces_null_and_shutdown() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let mut watcher = watcher(&pipeline, &shutdown, None, false);

        watcher.handle(BusMessage::EndOfStream);

        assert_eq!(pipeline.requested(), vec![PipelineState::Null]);
        assert_eq!(shutdown.requested(), Some(1));
    }

    #[test]
    fn about_to_finish_advances_and_wraps() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let playlist = Playlist::new(vec!["file:///a".into(), "file:///b".into()]);
        let mut watcher = watcher(&pipeline, &shutdown, playlist, false);

        watcher.handle(BusMessage::AboutToFinish);
        watcher.handle(BusMessage::AboutToFinish);
        watcher.handle(BusMessage::AboutToFinish);

        assert_eq!(
            pipeline.uris(),
            vec!["file:///b", "file:///a", "file:///b"]
        );
    }

    #[test]
    fn about_to_finish_without_playlist_is_a_no_op() {
        let pipeline = FakePipeline::new();
        let shutdown = ShutdownSignal::new();
        let mut watcher = watcher(&pipeline, &shutdown, None, false);

        watcher.handle(BusMessage::AboutToFinish);

        assert!(pipeline.uris().is_empty());
    }

    #[test]
    fn playlist_wraps_to_first() {
        let mut playlist =
            Playlist::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(playlist.current(), "a");
        assert_eq!(playlist.advance(), "b");
        assert_eq!(playlist.advance(), "c");
        assert_eq!(playlist.advance(), "a");
    }

    #[test]
    fn empty_playlist_is_none() {
        assert!(Playlist::new(Vec::new()).is_none());
    }
}
