//! Gesture selection: the only externally triggered state change.
//!
//! The window layer turns key presses and button clicks into
//! [`GestureEvent`]s and delivers them over an `mpsc` channel; the app
//! applies them to the [`GestureState`] cell.

use std::sync::atomic::{AtomicU8, Ordering};

use emg_stream::Gesture;

// ════════════════════════════════════════════════════════════════════════════
// GestureEvent
// ════════════════════════════════════════════════════════════════════════════

/// A discrete user action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEvent {
    /// Pick one of the five gestures as the simulation target.
    Select(Gesture),
    /// Close the demo view.
    Quit,
}

/// Keys the visualizer listens for (mapped from `minifb::Key`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKey {
    Digit(u8),  // 1–5
    R,          // rest
    F,          // fist
    O,          // open
    P,          // pinch
    I,          // point (index)
    Quit,       // Q / Escape
}

impl GestureEvent {
    /// Translate a key press; unmapped digits yield `None`.
    pub fn from_key(key: InputKey) -> Option<Self> {
        let g = match key {
            InputKey::Digit(d) => Gesture::from_index((d as usize).checked_sub(1)?)?,
            InputKey::R        => Gesture::Rest,
            InputKey::F        => Gesture::Fist,
            InputKey::O        => Gesture::Open,
            InputKey::P        => Gesture::Pinch,
            InputKey::I        => Gesture::Point,
            InputKey::Quit     => return Some(GestureEvent::Quit),
        };
        Some(GestureEvent::Select(g))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureState
// ════════════════════════════════════════════════════════════════════════════

/// Lock-free cell holding the currently selected gesture.
///
/// Exactly one gesture is active at any time.  Reads never block, so both
/// the render loop and the inference worker can poll it freely.
#[derive(Debug, Default)]
pub struct GestureState {
    current: AtomicU8,
}

impl GestureState {
    pub fn new(initial: Gesture) -> Self {
        GestureState { current: AtomicU8::new(initial as u8) }
    }

    pub fn get(&self) -> Gesture {
        Gesture::from_index(self.current.load(Ordering::Acquire) as usize)
            .unwrap_or_default()
    }

    /// Store `g`; returns `true` if it differs from the previous selection.
    pub fn select(&self, g: Gesture) -> bool {
        self.current.swap(g as u8, Ordering::AcqRel) != g as u8
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
