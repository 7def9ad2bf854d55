//! Frame-coherent keyboard state.
//!
//! Uses physical key codes so WASD works the same on every layout.

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::tracker::ButtonTracker;

/// Minimal description of a key event, independent of winit's non-constructible
/// [`KeyEvent`].
#[derive(Debug, Clone, Copy)]
pub struct RawKeyEvent {
    /// The physical key involved.
    pub key: PhysicalKey,
    /// Whether the key was pressed or released.
    pub state: ElementState,
    /// Whether this is an OS auto-repeat event.
    pub repeat: bool,
}

/// Keyboard state accumulated between two calls to
/// [`clear_transients`](Self::clear_transients).
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    keys: ButtonTracker<KeyCode>,
}

impl KeyboardState {
    /// Creates a new `KeyboardState` with no keys held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes a winit [`KeyEvent`].
    pub fn process_event(&mut self, event: &KeyEvent) {
        self.process_raw(RawKeyEvent {
            key: event.physical_key,
            state: event.state,
            repeat: event.repeat,
        });
    }

    /// Processes a [`RawKeyEvent`]. Repeats and unidentified keys are ignored.
    pub fn process_raw(&mut self, event: RawKeyEvent) {
        let PhysicalKey::Code(code) = event.key else {
            return;
        };
        if event.repeat {
            return;
        }
        match event.state {
            ElementState::Pressed => self.keys.press(code),
            ElementState::Released => self.keys.release(code),
        }
    }

    /// `true` while the key is held.
    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.is_held(key)
    }

    /// `true` during the frame the key went down.
    #[must_use]
    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.keys.just_pressed(key)
    }

    /// `true` during the frame the key went up.
    #[must_use]
    pub fn just_released(&self, key: KeyCode) -> bool {
        self.keys.just_released(key)
    }

    /// Clears per-frame edges. Call at end of frame.
    pub fn clear_transients(&mut self) {
        self.keys.clear_transients();
    }

    /// Forget all held keys (focus lost: the matching releases never arrive).
    pub fn reset(&mut self) {
        self.keys.reset();
    }
}
