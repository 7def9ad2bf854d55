//! Input for the Lumen demo: frame-coherent keyboard and mouse trackers, and a
//! RON-configurable map from physical inputs to demo [`Action`]s.

pub mod action_map;
pub mod keybindings;
pub mod keyboard;
pub mod mouse;
mod tracker;

pub use action_map::{Action, ActionResolver, ActionState, InputBinding, InputMap, MouseButtonBinding};
pub use keybindings::{Conflict, KeybindingError};
pub use keyboard::{KeyboardState, RawKeyEvent};
pub use mouse::MouseState;
