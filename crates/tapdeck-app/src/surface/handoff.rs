//! One-time surface binding between the windowing layer and the engine.
//!
//! Registered as the bus's synchronous handler: context and
//! prepare-surface requests are answered on the engine's own signaling
//! thread, before any async consumer sees them, and suppressed once
//! handled. The work here must stay small since it blocks the engine.

use std::sync::{Arc, Mutex};

use crate::pipeline::bus::{BusMessage, SyncHandler, SyncReply};
use crate::pipeline::{OverlayTarget, Pipeline, PipelineState, VIDEO_SINK_NAME};
use crate::surface::{DisplayContext, Rect, SurfaceProvider, VideoSize};

pub struct SurfaceCoordinator {
    pipeline: Arc<dyn Pipeline>,
    provider: Arc<dyn SurfaceProvider>,
    /// Fixed-size (no-fullscreen) mode: size the window to the stream and
    /// center the video instead of filling the allocation.
    fixed_size: bool,
    autoplay: bool,
    inner: Mutex<Binding>,
}

#[derive(Default)]
struct Binding {
    overlay: Option<Arc<dyn OverlayTarget>>,
    region: Option<Rect>,
    video_size: Option<VideoSize>,
    prepared_once: bool,
}

impl SurfaceCoordinator {
    pub fn new(
        pipeline: Arc<dyn Pipeline>,
        provider: Arc<dyn SurfaceProvider>,
        fixed_size: bool,
        autoplay: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            provider,
            fixed_size,
            autoplay,
            inner: Mutex::new(Binding::default()),
        })
    }

    fn on_needs_context(&self, origin: &Arc<dyn OverlayTarget>) {
        let context = DisplayContext {
            display: self.provider.display_handle(),
        };
        log::debug!("attaching display context {:#x}", context.display);
        origin.set_context(context);
    }

    fn on_prepare_surface(&self, origin: &Arc<dyn OverlayTarget>) {
        let mut inner = self.inner.lock().unwrap();

        // The asking element may be an internal sink or the top-level
        // pipeline. Once the top-level object has asked, keep answering
        // it: internal sinks are recreated across restarts and would
        // reset the handle and render region.
        let keep_held = inner
            .overlay
            .as_ref()
            .is_some_and(|held| held.id() == self.pipeline.id())
            && origin.id() != self.pipeline.id();
        if !keep_held {
            inner.overlay = Some(origin.clone());
        }

        inner.video_size = self.discover_video_size();
        if self.fixed_size {
            let size = inner.video_size.unwrap_or(VideoSize::FALLBACK).or_fallback();
            self.provider.resize_to(size);
            log::info!("sized window to {}x{}", size.width, size.height);
        }

        let allocation = self.provider.allocation();
        let handle = self.provider.surface_handle();
        log::info!(
            "binding surface {:#x}, region {}x{} at ({}, {})",
            handle.0,
            allocation.width,
            allocation.height,
            allocation.x,
            allocation.y
        );

        if let Some(overlay) = &inner.overlay {
            overlay.set_surface(handle);
            overlay.set_render_region(allocation);
            inner.region = Some(allocation);
        }

        if !inner.prepared_once {
            inner.prepared_once = true;
            if self.autoplay {
                self.pipeline.set_state(PipelineState::Playing);
            }
        }
    }

    /// Scan the sink's negotiated caps for dimension fields. Caps are a
    /// generic structure; width and height are located by name prefix.
    fn discover_video_size(&self) -> Option<VideoSize> {
        let structures = self.pipeline.sink_caps(VIDEO_SINK_NAME)?;
        let mut width = 0;
        let mut height = 0;
        for structure in &structures {
            if let Some(w) = structure.int_by_prefix("width") {
                width = w;
            }
            if let Some(h) = structure.int_by_prefix("height") {
                height = h;
            }
        }
        if width == 0 && height == 0 {
            None
        } else {
            Some(VideoSize { width, height })
        }
    }

    /// Recompute the render region after a redraw or resize. Never
    /// re-binds the surface; only the region is refreshed.
    pub fn on_redraw(&self) {
        let mut inner = self.inner.lock().unwrap();
        let Some(overlay) = inner.overlay.clone() else {
            return;
        };
        let allocation = self.provider.allocation();
        let region = if self.fixed_size {
            let size = inner.video_size.unwrap_or(VideoSize::FALLBACK).or_fallback();
            size.centered_in(allocation)
        } else {
            allocation
        };
        overlay.set_render_region(region);
        inner.region = Some(region);
    }

    /// The region most recently handed to the engine.
    #[cfg(test)]
    pub fn region(&self) -> Option<Rect> {
        self.inner.lock().unwrap().region
    }
}

impl SyncHandler for SurfaceCoordinator {
    fn on_message(&self, message: &BusMessage) -> SyncReply {
        match message {
            BusMessage::NeedsContext { origin } => {
                self.on_needs_context(origin);
                SyncReply::Drop
            }
            BusMessage::PrepareSurface { origin } => {
                self.on_prepare_surface(origin);
                SyncReply::Drop
            }
            _ => SyncReply::Pass,
        }
    }
}
