//! Display-surface collaborator interface and the geometry the handoff
//! computes with.

pub mod handoff;
pub mod window;

/// Allocation of the drawable area, window-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Opaque native surface handle passed to the engine: a compositor
/// surface pointer or window id, depending on platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle(pub usize);

/// Display-connection handle wrapped for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayContext {
    pub display: usize,
}

/// Negotiated stream dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSize {
    pub width: i32,
    pub height: i32,
}

impl VideoSize {
    /// Used when discovery yields nothing usable.
    pub const FALLBACK: VideoSize = VideoSize {
        width: 640,
        height: 480,
    };

    /// Degenerate dimensions (200 or less on either axis) fall back to
    /// 640x480.
    pub fn or_fallback(self) -> VideoSize {
        if self.width <= 200 || self.height <= 200 {
            Self::FALLBACK
        } else {
            self
        }
    }

    /// Center this size inside an allocation: the size is kept, the
    /// origin shifts by half the slack on each axis.
    pub fn centered_in(self, allocation: Rect) -> Rect {
        Rect {
            x: allocation.x + (allocation.width - self.width) / 2,
            y: allocation.y + (allocation.height - self.height) / 2,
            width: self.width,
            height: self.height,
        }
    }
}

/// The windowing layer as the playback core sees it. Implementations are
/// called from the engine's threads and must only use thread-safe window
/// accessors.
pub trait SurfaceProvider: Send + Sync {
    fn allocation(&self) -> Rect;
    fn surface_handle(&self) -> SurfaceHandle;
    fn display_handle(&self) -> usize;
    /// Ask the window to take a fixed size (no-fullscreen mode).
    fn resize_to(&self, size: VideoSize);
}
