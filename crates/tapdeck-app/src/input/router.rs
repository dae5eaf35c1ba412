//! Per-channel gesture routing: adapts raw window events into canonical
//! input events and runs them through the tap clock.

use winit::event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent};

use super::tap::{self, TapState};
use super::{EventClock, EventKind, Gesture, InputChannel, InputEvent};

/// Commands arriving from the keyboard watcher. Keyboard input bypasses
/// tap timing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    TogglePlayPause,
    Quit,
    Help,
}

/// Map a raw key byte to its command. Unmapped keys are no-ops.
pub fn map_key(byte: u8) -> Option<KeyCommand> {
    match byte.to_ascii_lowercase() {
        b'p' => Some(KeyCommand::TogglePlayPause),
        b'q' => Some(KeyCommand::Quit),
        b'h' => Some(KeyCommand::Help),
        _ => None,
    }
}

/// Owns one debounce state per channel plus the stamping clock. Lives on
/// the event-loop thread; no locking required.
pub struct GestureRouter {
    clock: EventClock,
    pointer: TapState,
    touch: TapState,
}

impl GestureRouter {
    pub fn new() -> Self {
        Self {
            clock: EventClock::new(),
            pointer: TapState::new(),
            touch: TapState::new(),
        }
    }

    /// Adapt a window event into a gesture, if it is tap-relevant.
    pub fn route_window_event(&mut self, event: &WindowEvent) -> Option<Gesture> {
        let input = self.adapt(event)?;
        self.route(input)
    }

    /// Run a canonical event through its channel's tap state.
    pub fn route(&mut self, event: InputEvent) -> Option<Gesture> {
        let state = match event.channel {
            InputChannel::Pointer => &mut self.pointer,
            InputChannel::Touch => &mut self.touch,
        };
        let gesture = tap::classify(state, &event);
        if let Some(gesture) = gesture {
            log::debug!(
                "{gesture:?} on {:?} channel (t={}ms)",
                event.channel,
                event.timestamp_ms
            );
        }
        gesture
    }

    /// Field names and shapes vary per source; everything is collapsed to
    /// the canonical event here. Non-tap events map to kinds the tap clock
    /// drops without side effects.
    fn adapt(&self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let kind = match state {
                    ElementState::Pressed => EventKind::Press,
                    ElementState::Released => EventKind::Release,
                };
                Some(InputEvent {
                    channel: InputChannel::Pointer,
                    timestamp_ms: self.clock.now_ms(),
                    kind,
                })
            }
            WindowEvent::Touch(Touch { phase, .. }) => {
                let kind = match phase {
                    TouchPhase::Started => EventKind::Press,
                    TouchPhase::Ended => EventKind::Release,
                    TouchPhase::Moved => EventKind::Motion,
                    TouchPhase::Cancelled => EventKind::Cancel,
                };
                Some(InputEvent {
                    channel: InputChannel::Touch,
                    timestamp_ms: self.clock.now_ms(),
                    kind,
                })
            }
            _ => None,
        }
    }
}

impl Default for GestureRouter {
    fn default() -> Self {
        Self::new()
    }
}
