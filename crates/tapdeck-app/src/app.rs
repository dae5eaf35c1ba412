//! Application wiring: owns the subsystems, runs startup sequencing, and
//! reacts to drained messages and classified gestures.

use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::Receiver;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::config::{LaunchPlan, Options, SHADER_ELEMENT};
use crate::input::Gesture;
use crate::input::keys::{self, KeyWatcher};
use crate::input::router::{GestureRouter, KeyCommand};
use crate::pipeline::bus::{Bus, BusMessage};
use crate::pipeline::{Pipeline, PipelineState};
use crate::playback::watch::{self, Playlist, StateWatcher};
use crate::playback::{PlaybackController, ShutdownSignal};
use crate::surface::handoff::SurfaceCoordinator;
use crate::surface::window::WinitSurface;

pub struct App {
    pipeline: Arc<dyn Pipeline>,
    bus_rx: Receiver<BusMessage>,
    router: GestureRouter,
    controller: Arc<PlaybackController>,
    watcher: StateWatcher,
    coordinator: Arc<SurfaceCoordinator>,
    keys: Option<KeyWatcher>,
    key_rx: Receiver<KeyCommand>,
    fixed_size: bool,
    /// Input routing stays dark until startup sequencing completes.
    armed: bool,
}

impl App {
    pub fn new(
        window: Arc<Window>,
        pipeline: Arc<dyn Pipeline>,
        bus: &Bus,
        plan: &LaunchPlan,
        options: &Options,
        shutdown: ShutdownSignal,
        wake: impl Fn() + Send + 'static,
    ) -> Result<Self> {
        // The provider keeps the window alive; its accessors are
        // thread-safe, which the handoff relies on.
        let provider = Arc::new(WinitSurface::new(window));
        let coordinator = SurfaceCoordinator::new(
            pipeline.clone(),
            provider,
            options.no_fullscreen,
            plan.autoplay,
        );
        bus.set_sync_handler(coordinator.clone());

        if let Some(program) = &plan.shader_program {
            pipeline.set_element_property(SHADER_ELEMENT, "fragment", program);
        }

        let playlist = Playlist::new(plan.playlist.clone());
        if let Some(playlist) = &playlist {
            log::info!("now playing {}", playlist.current());
            pipeline.set_uri(playlist.current());
        }

        let controller = Arc::new(PlaybackController::new(pipeline.clone(), shutdown.clone()));
        let watcher = StateWatcher::new(
            pipeline.clone(),
            controller.clone(),
            shutdown,
            playlist,
            plan.autoplay,
        );

        let (key_watcher, key_rx) = KeyWatcher::spawn(wake)?;
        log::info!("press 'h' for a list of keyboard shortcuts");

        Ok(Self {
            pipeline,
            bus_rx: bus.receiver(),
            router: GestureRouter::new(),
            controller,
            watcher,
            coordinator,
            keys: Some(key_watcher),
            key_rx,
            fixed_size: options.no_fullscreen,
            armed: false,
        })
    }

    /// Startup sequencing: optional caps preroll, raise to playing, block
    /// until the engine confirms, then arm input routing. Taps are not
    /// acted on until playback has actually begun.
    pub fn start(&mut self) {
        if self.fixed_size {
            watch::preroll_probe(self.pipeline.as_ref());
        }
        self.pipeline.set_state(PipelineState::Playing);
        watch::wait_until_playing(self.pipeline.as_ref());
        self.armed = true;
        log::info!("playback running, input armed");
    }

    /// Tap-relevant window events; everything else falls through.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if !self.armed {
            return;
        }
        if let Some(gesture) = self.router.route_window_event(event) {
            self.on_gesture(gesture);
        }
    }

    fn on_gesture(&self, gesture: Gesture) {
        match gesture {
            Gesture::SingleTap => self.controller.toggle_play_pause(),
            Gesture::DoubleTap => {
                log::info!("double tap, quitting");
                self.controller.stop_and_shutdown();
            }
        }
    }

    /// Drain both async inlets: keyboard commands and bus messages.
    pub fn drain(&mut self) {
        while let Ok(command) = self.key_rx.try_recv() {
            match command {
                KeyCommand::TogglePlayPause => self.controller.toggle_play_pause(),
                KeyCommand::Help => keys::print_help(),
                KeyCommand::Quit => {
                    // Detach the watcher before the terminal transition.
                    if let Some(key_watcher) = self.keys.take() {
                        key_watcher.detach();
                    }
                    self.controller.stop_and_shutdown();
                }
            }
        }
        while let Ok(message) = self.bus_rx.try_recv() {
            self.watcher.handle(message);
        }
    }

    /// Redraw/resize notification from the windowing layer.
    pub fn on_redraw(&self) {
        self.coordinator.on_redraw();
    }

    /// Force the engine to its terminal state on the graceful exit path.
    pub fn release(&self) {
        self.pipeline.set_state(PipelineState::Null);
    }
}
