//! Maps demo [`Action`]s to physical bindings and resolves them once per frame.
//!
//! [`ActionState`] is the per-frame snapshot the rest of the demo reads: which
//! actions are held, and which were triggered (went down) this frame.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::keyboard::KeyboardState;
use crate::mouse::MouseState;

/// Everything the demo can be asked to do from the keyboard or mouse.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Action {
    /// Fly forward.
    MoveForward,
    /// Fly backward.
    MoveBack,
    /// Strafe left.
    MoveLeft,
    /// Strafe right.
    MoveRight,
    /// Rise along the camera's up axis.
    MoveUp,
    /// Sink along the camera's up axis.
    MoveDown,
    /// Ramp the camera speed up while held.
    Boost,
    /// Mouse-look while held.
    Look,
    /// Add one step of user blur.
    BlurIncrease,
    /// Remove one step of user blur.
    BlurDecrease,
    /// Mute or unmute camera-speed blur.
    CameraBlurToggle,
    /// Bloom threshold key labelled "increase". Holding it lowers the threshold.
    ThresholdIncrease,
    /// Bloom threshold key labelled "decrease". Holding it raises the threshold.
    ThresholdDecrease,
    /// One more bloom level.
    BloomLevelUp,
    /// One fewer bloom level.
    BloomLevelDown,
    /// Turn bloom on or off.
    BloomToggle,
    /// Request application exit.
    Quit,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 17] = [
        Action::MoveForward,
        Action::MoveBack,
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveDown,
        Action::Boost,
        Action::Look,
        Action::BlurIncrease,
        Action::BlurDecrease,
        Action::CameraBlurToggle,
        Action::ThresholdIncrease,
        Action::ThresholdDecrease,
        Action::BloomLevelUp,
        Action::BloomLevelDown,
        Action::BloomToggle,
        Action::Quit,
    ];
}

/// The mouse buttons a binding file may name. winit's `Back`, `Forward` and
/// `Other(u16)` are left out.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MouseButtonBinding {
    Left,
    Right,
    Middle,
}

impl From<MouseButtonBinding> for MouseButton {
    fn from(button: MouseButtonBinding) -> Self {
        match button {
            MouseButtonBinding::Left => Self::Left,
            MouseButtonBinding::Right => Self::Right,
            MouseButtonBinding::Middle => Self::Middle,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum InputBinding {
    /// Physical key position, independent of layout.
    Key(KeyCode),
    MouseButton(MouseButtonBinding),
}

impl InputBinding {
    /// `(held, went down this frame)`.
    fn poll(self, keyboard: &KeyboardState, mouse: &MouseState) -> (bool, bool) {
        match self {
            Self::Key(code) => (keyboard.is_pressed(code), keyboard.just_pressed(code)),
            Self::MouseButton(button) => {
                let button = MouseButton::from(button);
                (
                    mouse.is_button_pressed(button),
                    mouse.just_button_pressed(button),
                )
            }
        }
    }
}

/// Binding table. Several bindings per action combine with OR; an action
/// with no entry is never active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMap {
    pub bindings: HashMap<Action, Vec<InputBinding>>,
}

impl Default for InputMap {
    fn default() -> Self {
        use InputBinding::{Key, MouseButton};

        let mut map = Self::new();
        map.set_bindings(Action::MoveForward, vec![Key(KeyCode::KeyW)]);
        map.set_bindings(Action::MoveBack, vec![Key(KeyCode::KeyS)]);
        map.set_bindings(Action::MoveLeft, vec![Key(KeyCode::KeyA)]);
        map.set_bindings(Action::MoveRight, vec![Key(KeyCode::KeyD)]);
        map.set_bindings(Action::MoveUp, vec![Key(KeyCode::Space)]);
        map.set_bindings(Action::MoveDown, vec![Key(KeyCode::KeyX)]);
        map.set_bindings(
            Action::Boost,
            vec![Key(KeyCode::ShiftLeft), Key(KeyCode::ShiftRight)],
        );
        map.set_bindings(Action::Look, vec![MouseButton(MouseButtonBinding::Left)]);
        map.set_bindings(Action::BlurIncrease, vec![Key(KeyCode::ArrowUp)]);
        map.set_bindings(Action::BlurDecrease, vec![Key(KeyCode::ArrowDown)]);
        map.set_bindings(Action::CameraBlurToggle, vec![Key(KeyCode::KeyM)]);
        map.set_bindings(Action::ThresholdIncrease, vec![Key(KeyCode::ArrowLeft)]);
        map.set_bindings(Action::ThresholdDecrease, vec![Key(KeyCode::ArrowRight)]);
        map.set_bindings(Action::BloomLevelUp, vec![Key(KeyCode::KeyE)]);
        map.set_bindings(Action::BloomLevelDown, vec![Key(KeyCode::KeyQ)]);
        map.set_bindings(Action::BloomToggle, vec![Key(KeyCode::KeyF)]);
        map.set_bindings(Action::Quit, vec![Key(KeyCode::Escape)]);
        map
    }
}

impl InputMap {
    /// A map that binds nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::with_capacity(Action::ALL.len()),
        }
    }

    /// Replaces whatever `action` was bound to.
    pub fn set_bindings(&mut self, action: Action, bindings: Vec<InputBinding>) {
        self.bindings.insert(action, bindings);
    }

    #[must_use]
    pub fn get_bindings(&self, action: Action) -> &[InputBinding] {
        self.bindings.get(&action).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new().struct_names(false))
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

/// Per-frame action snapshot produced by [`ActionResolver`].
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    held: HashSet<Action>,
    triggered: HashSet<Action>,
}

impl ActionState {
    /// Create an empty action state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any binding of the action is held this frame.
    #[must_use]
    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// Whether any binding of the action went down this frame.
    ///
    /// A press and release inside one frame still counts.
    #[must_use]
    pub fn just_triggered(&self, action: Action) -> bool {
        self.triggered.contains(&action)
    }
}

/// Recomputes [`ActionState`] from the device trackers.
pub struct ActionResolver;

impl ActionResolver {
    /// Run after the frame's events are in and before the trackers clear
    /// their transients, or every edge is lost.
    pub fn resolve(
        map: &InputMap,
        keyboard: &KeyboardState,
        mouse: &MouseState,
        state: &mut ActionState,
    ) {
        state.held.clear();
        state.triggered.clear();

        for (&action, bindings) in &map.bindings {
            let (held, triggered) = bindings
                .iter()
                .map(|binding| binding.poll(keyboard, mouse))
                .fold((false, false), |(h, t), (bh, bt)| (h || bh, t || bt));
            if held {
                state.held.insert(action);
            }
            if triggered {
                state.triggered.insert(action);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::RawKeyEvent;
    use winit::event::ElementState;
    use winit::keyboard::PhysicalKey;

    fn key(kb: &mut KeyboardState, code: KeyCode, state: ElementState) {
        kb.process_raw(RawKeyEvent {
            key: PhysicalKey::Code(code),
            state,
            repeat: false,
        });
    }

    #[test]
    fn test_every_action_has_a_default_binding() {
        let map = InputMap::default();
        for action in Action::ALL {
            assert!(
                !map.get_bindings(action).is_empty(),
                "{action:?} has no default binding"
            );
        }
    }

    #[test]
    fn test_held_key_activates_action() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        key(&mut kb, KeyCode::KeyW, ElementState::Pressed);

        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &kb, &MouseState::new(), &mut state);
        assert!(state.is_held(Action::MoveForward));
        assert!(state.just_triggered(Action::MoveForward));
        assert!(!state.is_held(Action::MoveBack));
    }

    #[test]
    fn test_trigger_is_one_frame_only() {
        let map = InputMap::default();
        let mouse = MouseState::new();
        let mut kb = KeyboardState::new();
        let mut state = ActionState::new();

        key(&mut kb, KeyCode::ArrowUp, ElementState::Pressed);
        ActionResolver::resolve(&map, &kb, &mouse, &mut state);
        assert!(state.just_triggered(Action::BlurIncrease));
        kb.clear_transients();

        ActionResolver::resolve(&map, &kb, &mouse, &mut state);
        assert!(!state.just_triggered(Action::BlurIncrease));
        assert!(state.is_held(Action::BlurIncrease));
    }

    #[test]
    fn test_tap_within_one_frame_still_triggers() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        key(&mut kb, KeyCode::KeyF, ElementState::Pressed);
        key(&mut kb, KeyCode::KeyF, ElementState::Released);

        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &kb, &MouseState::new(), &mut state);
        assert!(state.just_triggered(Action::BloomToggle));
        assert!(!state.is_held(Action::BloomToggle));
    }

    #[test]
    fn test_either_shift_boosts() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        key(&mut kb, KeyCode::ShiftRight, ElementState::Pressed);

        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &kb, &MouseState::new(), &mut state);
        assert!(state.is_held(Action::Boost));
    }

    #[test]
    fn test_mouse_button_binding() {
        let map = InputMap::default();
        let mut mouse = MouseState::new();
        mouse.on_button(MouseButton::Left, ElementState::Pressed);

        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &KeyboardState::new(), &mouse, &mut state);
        assert!(state.is_held(Action::Look));
    }

    #[test]
    fn test_rebinding_at_runtime() {
        let mut map = InputMap::default();
        map.set_bindings(Action::Quit, vec![InputBinding::Key(KeyCode::KeyP)]);

        let mut kb = KeyboardState::new();
        key(&mut kb, KeyCode::Escape, ElementState::Pressed);
        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &kb, &MouseState::new(), &mut state);
        assert!(!state.just_triggered(Action::Quit));

        key(&mut kb, KeyCode::KeyP, ElementState::Pressed);
        ActionResolver::resolve(&map, &kb, &MouseState::new(), &mut state);
        assert!(state.just_triggered(Action::Quit));
    }
}
