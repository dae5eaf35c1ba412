//! Simulated media engine behind the [`Pipeline`] trait.
//!
//! A named worker thread walks requested state changes through the
//! intermediate states and posts the same message sequence a real engine
//! would: needs-context and prepare-surface while climbing from Ready to
//! Paused, one state-changed per hop from the top-level identity. The
//! binary runs against it end-to-end; a production engine binds to the
//! same traits.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use super::bus::{Bus, BusMessage};
use super::{
    CapsStructure, CapsValue, ElementId, OverlayTarget, Pipeline, PipelineState, SeekFlags,
    StateTimeout, VIDEO_SINK_NAME,
};
use crate::surface::{DisplayContext, Rect, SurfaceHandle};

const TOP_LEVEL_ID: ElementId = ElementId(1);

/// Wall-clock flavor per state hop; keeps transitions observably async.
const HOP_DELAY: Duration = Duration::from_millis(5);

pub struct SimPipeline {
    overlay: Arc<SimOverlay>,
    shared: Arc<Shared>,
    requests: Sender<PipelineState>,
}

struct Shared {
    state: Mutex<StateCell>,
    settled: Condvar,
    video_size: (i32, i32),
    uri: Mutex<Option<String>>,
    seeks: Mutex<Vec<(Duration, SeekFlags)>>,
    properties: Mutex<HashMap<(String, String), String>>,
}

struct StateCell {
    current: PipelineState,
    pending: Option<PipelineState>,
}

impl SimPipeline {
    pub fn launch(description: &str, bus: Arc<Bus>) -> anyhow::Result<Arc<Self>> {
        Self::launch_with_size(description, bus, (1280, 720))
    }

    pub fn launch_with_size(
        description: &str,
        bus: Arc<Bus>,
        video_size: (i32, i32),
    ) -> anyhow::Result<Arc<Self>> {
        if description.trim().is_empty() {
            anyhow::bail!("empty pipeline description");
        }
        log::debug!("sim pipeline: {description}");

        let overlay = Arc::new(SimOverlay {
            calls: Mutex::new(Vec::new()),
        });
        let shared = Arc::new(Shared {
            state: Mutex::new(StateCell {
                current: PipelineState::VoidPending,
                pending: None,
            }),
            settled: Condvar::new(),
            video_size,
            uri: Mutex::new(None),
            seeks: Mutex::new(Vec::new()),
            properties: Mutex::new(HashMap::new()),
        });
        let (requests, rx) = crossbeam_channel::unbounded();

        let worker_shared = shared.clone();
        let worker_overlay = overlay.clone();
        thread::Builder::new()
            .name("tapdeck-pipeline".into())
            .spawn(move || run_worker(&rx, &worker_shared, &worker_overlay, &bus))?;

        Ok(Arc::new(Self {
            overlay,
            shared,
            requests,
        }))
    }

    /// Render-target identity, for handshake assertions.
    #[cfg(test)]
    pub fn overlay(&self) -> &Arc<SimOverlay> {
        &self.overlay
    }

    #[cfg(test)]
    pub fn last_uri(&self) -> Option<String> {
        self.shared.uri.lock().unwrap().clone()
    }

    #[cfg(test)]
    pub fn seeks(&self) -> Vec<(Duration, SeekFlags)> {
        self.shared.seeks.lock().unwrap().clone()
    }

    #[cfg(test)]
    pub fn property(&self, element: &str, property: &str) -> Option<String> {
        self.shared
            .properties
            .lock()
            .unwrap()
            .get(&(element.to_string(), property.to_string()))
            .cloned()
    }
}

impl Pipeline for SimPipeline {
    fn id(&self) -> ElementId {
        TOP_LEVEL_ID
    }

    fn set_state(&self, target: PipelineState) {
        log::debug!("state change requested: {target}");
        self.shared.state.lock().unwrap().pending = Some(target);
        let _ = self.requests.send(target);
    }

    fn state(&self, timeout: Option<Duration>) -> Result<PipelineState, StateTimeout> {
        let mut cell = self.shared.state.lock().unwrap();
        match timeout {
            None => {
                while cell.pending.is_some() {
                    cell = self.shared.settled.wait(cell).unwrap();
                }
                Ok(cell.current)
            }
            Some(limit) => {
                let deadline = Instant::now() + limit;
                while cell.pending.is_some() {
                    let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                        return Err(StateTimeout);
                    };
                    let (guard, result) = self.shared.settled.wait_timeout(cell, left).unwrap();
                    cell = guard;
                    if result.timed_out() && cell.pending.is_some() {
                        return Err(StateTimeout);
                    }
                }
                Ok(cell.current)
            }
        }
    }

    fn seek(&self, position: Duration, flags: SeekFlags) {
        self.shared.seeks.lock().unwrap().push((position, flags));
    }

    fn set_uri(&self, uri: &str) {
        log::debug!("uri set to {uri}");
        *self.shared.uri.lock().unwrap() = Some(uri.to_string());
    }

    fn set_element_property(&self, element: &str, property: &str, value: &str) {
        log::debug!("property {element}.{property} set ({} bytes)", value.len());
        self.shared
            .properties
            .lock()
            .unwrap()
            .insert((element.to_string(), property.to_string()), value.to_string());
    }

    fn sink_caps(&self, sink_name: &str) -> Option<Vec<CapsStructure>> {
        if sink_name != VIDEO_SINK_NAME {
            return None;
        }
        let (width, height) = self.shared.video_size;
        Some(vec![CapsStructure {
            name: "video/raw".into(),
            fields: vec![
                ("format".into(), CapsValue::Text("RGBA".into())),
                ("width".into(), CapsValue::Int(width)),
                ("height".into(), CapsValue::Int(height)),
                ("framerate".into(), CapsValue::Fraction(30, 1)),
            ],
        }])
    }
}

/// Top-level render target, playbin-style: the pipeline object itself
/// asks for the surface.
pub struct SimOverlay {
    calls: Mutex<Vec<OverlayCall>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCall {
    Surface(SurfaceHandle),
    Region(Rect),
    Context(DisplayContext),
}

impl SimOverlay {
    pub fn calls(&self) -> Vec<OverlayCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl OverlayTarget for SimOverlay {
    fn id(&self) -> ElementId {
        TOP_LEVEL_ID
    }

    fn set_surface(&self, handle: SurfaceHandle) {
        self.calls.lock().unwrap().push(OverlayCall::Surface(handle));
    }

    fn set_render_region(&self, region: Rect) {
        self.calls.lock().unwrap().push(OverlayCall::Region(region));
    }

    fn set_context(&self, context: DisplayContext) {
        self.calls.lock().unwrap().push(OverlayCall::Context(context));
    }
}

fn run_worker(
    rx: &Receiver<PipelineState>,
    shared: &Arc<Shared>,
    overlay: &Arc<SimOverlay>,
    bus: &Arc<Bus>,
) {
    let mut prepared = false;
    while let Ok(target) = rx.recv() {
        walk(target, shared, overlay, bus, &mut prepared);
        let mut cell = shared.state.lock().unwrap();
        // Settle only if no newer request has been filed meanwhile.
        if rx.is_empty() && cell.pending == Some(target) {
            cell.pending = None;
            shared.settled.notify_all();
        }
    }
    log::debug!("sim pipeline worker exiting");
}

fn walk(
    target: PipelineState,
    shared: &Arc<Shared>,
    overlay: &Arc<SimOverlay>,
    bus: &Arc<Bus>,
    prepared: &mut bool,
) {
    loop {
        let current = shared.state.lock().unwrap().current;
        let Some(next) = step_toward(current, target) else {
            return;
        };

        // Real engines ask for their render surface while climbing from
        // Ready to Paused, before the first frame can be shown.
        if current == PipelineState::Ready && next == PipelineState::Paused && !*prepared {
            *prepared = true;
            bus.post(BusMessage::NeedsContext {
                origin: overlay.clone(),
            });
            bus.post(BusMessage::PrepareSurface {
                origin: overlay.clone(),
            });
        }
        if next == PipelineState::Null {
            *prepared = false;
        }

        thread::sleep(HOP_DELAY);
        shared.state.lock().unwrap().current = next;
        bus.post(BusMessage::StateChanged {
            origin: TOP_LEVEL_ID,
            old: current,
            new: next,
        });
    }
}

fn rank(state: PipelineState) -> u8 {
    match state {
        PipelineState::VoidPending | PipelineState::Null => 0,
        PipelineState::Ready => 1,
        PipelineState::Paused => 2,
        PipelineState::Playing => 3,
    }
}

fn from_rank(rank: u8) -> PipelineState {
    match rank {
        0 => PipelineState::Null,
        1 => PipelineState::Ready,
        2 => PipelineState::Paused,
        _ => PipelineState::Playing,
    }
}

fn step_toward(current: PipelineState, target: PipelineState) -> Option<PipelineState> {
    if current == target {
        return None;
    }
    let (c, t) = (rank(current), rank(target));
    if c < t {
        Some(from_rank(c + 1))
    } else if c > t {
        Some(from_rank(c - 1))
    } else {
        // VoidPending settling into a concrete bottom state.
        Some(target)
    }
}
