//! winit-backed surface provider. The window's methods are thread-safe,
//! which is what lets the handoff coordinator call these from the
//! engine's signaling thread.

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use winit::window::Window;

use super::{Rect, SurfaceHandle, SurfaceProvider, VideoSize};

pub struct WinitSurface {
    window: Arc<Window>,
}

impl WinitSurface {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl SurfaceProvider for WinitSurface {
    fn allocation(&self) -> Rect {
        let size = self.window.inner_size();
        Rect::new(0, 0, size.width as i32, size.height as i32)
    }

    fn surface_handle(&self) -> SurfaceHandle {
        let raw = match self.window.window_handle() {
            Ok(handle) => handle.as_raw(),
            Err(e) => {
                log::error!("no native window handle: {e}");
                return SurfaceHandle(0);
            }
        };
        SurfaceHandle(match raw {
            RawWindowHandle::Wayland(h) => h.surface.as_ptr() as usize,
            RawWindowHandle::Xlib(h) => h.window as usize,
            RawWindowHandle::Xcb(h) => h.window.get() as usize,
            RawWindowHandle::Win32(h) => h.hwnd.get() as usize,
            RawWindowHandle::AppKit(h) => h.ns_view.as_ptr() as usize,
            _ => 0,
        })
    }

    fn display_handle(&self) -> usize {
        let raw = match self.window.display_handle() {
            Ok(handle) => handle.as_raw(),
            Err(_) => return 0,
        };
        match raw {
            RawDisplayHandle::Wayland(h) => h.display.as_ptr() as usize,
            RawDisplayHandle::Xlib(h) => h.display.map_or(0, |d| d.as_ptr() as usize),
            RawDisplayHandle::Xcb(h) => h.connection.map_or(0, |c| c.as_ptr() as usize),
            _ => 0,
        }
    }

    fn resize_to(&self, size: VideoSize) {
        let width = size.width.max(1) as u32;
        let height = size.height.max(1) as u32;
        let _ = self
            .window
            .request_inner_size(winit::dpi::PhysicalSize::new(width, height));
    }
}
