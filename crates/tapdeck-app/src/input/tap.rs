//! Tap debouncing: single vs double tap from timestamp pairs.

use super::{EventKind, Gesture, InputEvent};

/// Two presses on the same channel closer than this are a double tap.
pub const DOUBLE_TAP_WINDOW_MS: u32 = 600;

/// Per-channel debounce state. `None` means no pending tap.
#[derive(Debug, Default, Clone, Copy)]
pub struct TapState {
    last_tap_ms: Option<u32>,
}

impl TapState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Classify a raw event against its channel's debounce state.
///
/// Only `Press` events classify; everything else returns `None` and leaves
/// the state untouched. The first press of a pair is reported as a
/// `SingleTap` right away: at the moment it happens it is
/// indistinguishable from the first half of a double tap, and the
/// controller's response (toggle pause/play) is cheap to repeat.
///
/// The difference is computed with wrapping u32 subtraction, so a pair of
/// presses straddling the clock's rollover still measures the small real
/// elapsed time. A source whose timestamps step backwards produces a
/// spuriously huge diff and therefore a `SingleTap`. Accepted boundary
/// behavior.
pub fn classify(state: &mut TapState, event: &InputEvent) -> Option<Gesture> {
    if event.kind != EventKind::Press {
        return None;
    }

    let gesture = match state.last_tap_ms {
        None => Gesture::SingleTap,
        Some(last) => {
            let diff = event.timestamp_ms.wrapping_sub(last);
            if diff < DOUBLE_TAP_WINDOW_MS {
                Gesture::DoubleTap
            } else {
                Gesture::SingleTap
            }
        }
    };

    // A completed double tap clears the state so a third press shortly
    // after cannot re-trigger it.
    state.last_tap_ms = match gesture {
        Gesture::DoubleTap => None,
        Gesture::SingleTap => Some(event.timestamp_ms),
    };

    Some(gesture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputChannel;

    fn press(t: u32) -> InputEvent {
        InputEvent {
            channel: InputChannel::Touch,
            timestamp_ms: t,
            kind: EventKind::Press,
        }
    }

    #[test]
    fn first_press_is_single_tap() {
        let mut state = TapState::new();
        assert_eq!(classify(&mut state, &press(0)), Some(Gesture::SingleTap));
        assert_eq!(state.last_tap_ms, Some(0));
    }

    #[test]
    fn press_within_window_is_double_tap() {
        let mut state = TapState::new();
        classify(&mut state, &press(1000));
        assert_eq!(classify(&mut state, &press(1300)), Some(Gesture::DoubleTap));
    }

    #[test]
    fn press_just_inside_window_is_double_tap() {
        let mut state = TapState::new();
        classify(&mut state, &press(1000));
        assert_eq!(classify(&mut state, &press(1599)), Some(Gesture::DoubleTap));
    }

    #[test]
    fn press_at_window_boundary_is_single_tap() {
        let mut state = TapState::new();
        classify(&mut state, &press(1000));
        assert_eq!(classify(&mut state, &press(1600)), Some(Gesture::SingleTap));
        assert_eq!(state.last_tap_ms, Some(1600));
    }

    #[test]
    fn slow_press_updates_last_tap_time() {
        let mut state = TapState::new();
        classify(&mut state, &press(100));
        assert_eq!(classify(&mut state, &press(5000)), Some(Gesture::SingleTap));
        assert_eq!(state.last_tap_ms, Some(5000));
    }

    #[test]
    fn double_tap_clears_state() {
        let mut state = TapState::new();
        classify(&mut state, &press(0));
        classify(&mut state, &press(100));
        // Third press shortly after a double tap starts a fresh pair.
        assert_eq!(classify(&mut state, &press(200)), Some(Gesture::SingleTap));
    }

    #[test]
    fn non_press_events_are_ignored() {
        let mut state = TapState::new();
        classify(&mut state, &press(0));
        for kind in [EventKind::Release, EventKind::Motion, EventKind::Cancel] {
            let event = InputEvent {
                channel: InputChannel::Touch,
                timestamp_ms: 100,
                kind,
            };
            assert_eq!(classify(&mut state, &event), None);
        }
        assert_eq!(state.last_tap_ms, Some(0));
    }

    #[test]
    fn rollover_pair_measures_small_elapsed() {
        let mut state = TapState::new();
        classify(&mut state, &press(u32::MAX - 100));
        // 201ms of wall time straddling the u32 rollover.
        assert_eq!(classify(&mut state, &press(100)), Some(Gesture::DoubleTap));
    }

    #[test]
    fn backwards_timestamps_fall_back_to_single_tap() {
        let mut state = TapState::new();
        classify(&mut state, &press(1000));
        // A source stepping backwards yields a huge wrapped diff.
        assert_eq!(classify(&mut state, &press(900)), Some(Gesture::SingleTap));
    }
}
