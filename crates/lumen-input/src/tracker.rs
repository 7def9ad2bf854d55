//! Press/hold/release bookkeeping shared by the keyboard and mouse trackers.

use std::collections::HashSet;
use std::hash::Hash;

/// Tracks which buttons are held, and which changed state since the last
/// [`clear_transients`](Self::clear_transients).
#[derive(Debug, Clone)]
pub(crate) struct ButtonTracker<T> {
    held: HashSet<T>,
    pressed: HashSet<T>,
    released: HashSet<T>,
}

impl<T> Default for ButtonTracker<T> {
    fn default() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> ButtonTracker<T> {
    /// A press only counts as an edge if the button was not already held.
    pub(crate) fn press(&mut self, button: T) {
        if self.held.insert(button) {
            self.pressed.insert(button);
        }
    }

    pub(crate) fn release(&mut self, button: T) {
        if self.held.remove(&button) {
            self.released.insert(button);
        }
    }

    pub(crate) fn is_held(&self, button: T) -> bool {
        self.held.contains(&button)
    }

    pub(crate) fn just_pressed(&self, button: T) -> bool {
        self.pressed.contains(&button)
    }

    pub(crate) fn just_released(&self, button: T) -> bool {
        self.released.contains(&button)
    }

    pub(crate) fn clear_transients(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    /// Drop everything, e.g. when the window loses focus and releases are lost.
    pub(crate) fn reset(&mut self) {
        self.held.clear();
        self.clear_transients();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_sets_held_and_edge() {
        let mut t = ButtonTracker::default();
        t.press(1u8);
        assert!(t.is_held(1));
        assert!(t.just_pressed(1));
        assert!(!t.just_released(1));
    }

    #[test]
    fn test_second_press_while_held_is_not_an_edge() {
        let mut t = ButtonTracker::default();
        t.press(1u8);
        t.clear_transients();
        t.press(1);
        assert!(!t.just_pressed(1));
        assert!(t.is_held(1));
    }

    #[test]
    fn test_press_and_release_in_one_frame_keeps_both_edges() {
        let mut t = ButtonTracker::default();
        t.press(7u8);
        t.release(7);
        assert!(!t.is_held(7));
        assert!(t.just_pressed(7));
        assert!(t.just_released(7));
    }

    #[test]
    fn test_release_without_press_ignored() {
        let mut t = ButtonTracker::<u8>::default();
        t.release(3);
        assert!(!t.just_released(3));
    }

    #[test]
    fn test_reset_clears_held() {
        let mut t = ButtonTracker::default();
        t.press(2u8);
        t.reset();
        assert!(!t.is_held(2));
        assert!(!t.just_pressed(2));
    }
}
