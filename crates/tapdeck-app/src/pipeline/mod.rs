//! Media-engine collaborator interface: states, control seams, and the
//! caps structures the core reads. The engine itself lives behind these
//! traits; `sim` provides the in-process stand-in the binary runs with.

pub mod bus;
pub mod sim;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::surface::{DisplayContext, Rect, SurfaceHandle};

/// Element type the launch description must reference so the handoff has
/// a render sink to bind, and the instance name queried for caps.
pub const VIDEO_SINK_ELEMENT: &str = "videosink";
pub const VIDEO_SINK_NAME: &str = "videosink0";

/// Mirror of the engine's coarse state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No definite state reported yet.
    VoidPending,
    Null,
    Ready,
    Paused,
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::VoidPending => "void-pending",
            PipelineState::Null => "null",
            PipelineState::Ready => "ready",
            PipelineState::Paused => "paused",
            PipelineState::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// A bounded state query gave up before the engine settled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("state query timed out")]
pub struct StateTimeout;

/// Seek behavior requested alongside a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekFlags {
    pub flush: bool,
    /// Snap to the nearest keyframe instead of decoding up to the exact
    /// position.
    pub key_unit: bool,
}

impl SeekFlags {
    pub const FLUSH_KEY_UNIT: SeekFlags = SeekFlags {
        flush: true,
        key_unit: true,
    };
}

/// Identity of an element inside the engine. Used to tell top-level
/// pipeline messages apart from internal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// A render destination handed out by bus messages. The element that asks
/// for a surface is the one that must receive it.
pub trait OverlayTarget: Send + Sync {
    fn id(&self) -> ElementId;
    fn set_surface(&self, handle: SurfaceHandle);
    fn set_render_region(&self, region: Rect);
    fn set_context(&self, context: DisplayContext);
}

/// Control surface of the external media engine.
///
/// `set_state` is fire-and-forget; completion is observed through bus
/// messages. `state` blocks the calling thread for up to `timeout`
/// (`None` waits until the engine settles, however long that takes).
pub trait Pipeline: Send + Sync {
    /// Top-level identity, for filtering bus messages by origin.
    fn id(&self) -> ElementId;

    fn set_state(&self, target: PipelineState);

    fn state(&self, timeout: Option<Duration>) -> Result<PipelineState, StateTimeout>;

    fn seek(&self, position: Duration, flags: SeekFlags);

    /// Swap the stream source; takes effect on the next track boundary.
    fn set_uri(&self, uri: &str);

    fn set_element_property(&self, element: &str, property: &str, value: &str);

    /// Negotiated stream format of the named sink, if it has one yet.
    fn sink_caps(&self, sink_name: &str) -> Option<Vec<CapsStructure>>;
}

/// One structure of a negotiated caps set: a named bag of typed fields.
#[derive(Debug, Clone)]
pub struct CapsStructure {
    pub name: String,
    pub fields: Vec<(String, CapsValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsValue {
    Int(i32),
    Fraction(i32, i32),
    Text(String),
}

impl CapsStructure {
    /// First integer field whose name starts with `prefix`. Dimension
    /// fields vary by format ("width", "width-padded", ...), so lookup is
    /// by name convention rather than exact key.
    pub fn int_by_prefix(&self, prefix: &str) -> Option<i32> {
        self.fields.iter().find_map(|(name, value)| match value {
            CapsValue::Int(v) if name.starts_with(prefix) => Some(*v),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_by_prefix_matches_name_convention() {
        let caps = CapsStructure {
            name: "video/raw".into(),
            fields: vec![
                ("format".into(), CapsValue::Text("RGBA".into())),
                ("width-padded".into(), CapsValue::Int(1920)),
                ("height".into(), CapsValue::Int(1080)),
                ("framerate".into(), CapsValue::Fraction(30, 1)),
            ],
        };
        assert_eq!(caps.int_by_prefix("width"), Some(1920));
        assert_eq!(caps.int_by_prefix("height"), Some(1080));
        assert_eq!(caps.int_by_prefix("depth"), None);
    }

    #[test]
    fn int_by_prefix_skips_non_integer_fields() {
        let caps = CapsStructure {
            name: "video/raw".into(),
            fields: vec![
                ("width-mode".into(), CapsValue::Text("auto".into())),
                ("width".into(), CapsValue::Int(640)),
            ],
        };
        assert_eq!(caps.int_by_prefix("width"), Some(640));
    }
}
