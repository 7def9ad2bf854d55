//! Mouse buttons and look motion.
//!
//! Motion has two sources. While the cursor moves freely the delta is the
//! difference between `CursorMoved` positions. Once the app captures the
//! cursor for mouse-look, those events stop being meaningful and raw device
//! motion is used instead. Only one source feeds the delta at a time.

use glam::Vec2;
use winit::event::{ElementState, MouseButton};

use crate::tracker::ButtonTracker;

#[derive(Debug, Clone, Default)]
pub struct MouseState {
    cursor: Option<Vec2>,
    delta: Vec2,
    buttons: ButtonTracker<MouseButton>,
    captured: bool,
}

impl MouseState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `CursorMoved`. The first position after start or capture release only
    /// seeds the cursor.
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        let cursor = Vec2::new(x as f32, y as f32);
        if self.captured {
            return;
        }
        if let Some(previous) = self.cursor.replace(cursor) {
            self.delta += cursor - previous;
        }
    }

    /// `DeviceEvent::MouseMotion`. Ignored unless captured.
    pub fn on_raw_motion(&mut self, dx: f64, dy: f64) {
        if self.captured {
            self.delta += Vec2::new(dx as f32, dy as f32);
        }
    }

    pub fn on_button(&mut self, button: MouseButton, state: ElementState) {
        if state.is_pressed() {
            self.buttons.press(button);
        } else {
            self.buttons.release(button);
        }
    }

    /// Switch the delta source. Releasing capture forgets the cursor so the
    /// jump back to the visible pointer is not read as motion.
    pub fn set_captured(&mut self, captured: bool) {
        if self.captured && !captured {
            self.cursor = None;
        }
        self.captured = captured;
    }

    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// End of frame: drop motion and button edges.
    pub fn clear_transients(&mut self) {
        self.delta = Vec2::ZERO;
        self.buttons.clear_transients();
    }

    /// Focus lost. Held buttons will never see their release.
    pub fn reset(&mut self) {
        self.buttons.reset();
        self.delta = Vec2::ZERO;
    }

    /// Pixels of motion since the last [`clear_transients`](Self::clear_transients).
    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.delta
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.is_held(button)
    }

    #[must_use]
    pub fn just_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.just_pressed(button)
    }
}
