//! Keybinding persistence and conflict detection.
//!
//! Bindings live in `input.ron` next to the main config. Keys are stored by
//! winit's `KeyCode` variant name. A missing or malformed file never stops the
//! demo: [`InputMap::load`] falls back to the defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::action_map::{Action, InputBinding, InputMap};

pub const KEYBINDINGS_FILE: &str = "input.ron";

#[derive(Debug, Error)]
pub enum KeybindingError {
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("keybindings could not be encoded as RON: {0}")]
    Serialize(#[from] ron::Error),
}

/// One binding claimed by several actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub binding: InputBinding,
    /// Sorted.
    pub actions: Vec<Action>,
}

impl InputMap {
    /// Every binding claimed by more than one action.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        let mut owners: HashMap<InputBinding, Vec<Action>> = HashMap::new();
        for (&action, bindings) in &self.bindings {
            for &binding in bindings {
                owners.entry(binding).or_default().push(action);
            }
        }

        let mut conflicts: Vec<Conflict> = owners
            .into_iter()
            .filter_map(|(binding, mut actions)| {
                (actions.len() > 1).then(|| {
                    actions.sort();
                    Conflict { binding, actions }
                })
            })
            .collect();
        conflicts.sort_by(|a, b| a.actions.cmp(&b.actions));
        conflicts
    }

    /// Write the map as RON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), KeybindingError> {
        let text = self.to_ron()?;
        let write_error = |source| KeybindingError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, text).map_err(write_error)
    }

    /// The map stored at `path`. Falls back to the defaults when the file is
    /// unreadable or malformed; conflicts are logged but kept.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| Self::from_ron(&text).map_err(|e| e.to_string()));

        let map = match parsed {
            Ok(map) => map,
            Err(reason) => {
                warn!("Keybindings at {} ignored ({reason}), using defaults", path.display());
                return Self::default();
            }
        };
        for conflict in map.detect_conflicts() {
            warn!("{:?} is bound to {:?}", conflict.binding, conflict.actions);
        }
        info!("Keybindings loaded from {}", path.display());
        map
    }

    /// Platform location of the keybinding file.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lumen").join(KEYBINDINGS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_map::MouseButtonBinding;
    use winit::keyboard::KeyCode;

    #[test]
    fn test_default_bindings_have_no_conflicts() {
        assert!(InputMap::default().detect_conflicts().is_empty());
    }

    #[test]
    fn test_shared_binding_reported() {
        let mut map = InputMap::default();
        map.set_bindings(Action::BloomToggle, vec![InputBinding::Key(KeyCode::KeyW)]);
        let conflicts = map.detect_conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].binding, InputBinding::Key(KeyCode::KeyW));
        assert_eq!(
            conflicts[0].actions,
            vec![Action::MoveForward, Action::BloomToggle]
        );
    }

    #[test]
    fn test_save_then_load_preserves_custom_binding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("input.ron");

        let mut map = InputMap::default();
        map.set_bindings(
            Action::Look,
            vec![InputBinding::MouseButton(MouseButtonBinding::Right)],
        );
        map.set_bindings(Action::BlurIncrease, vec![InputBinding::Key(KeyCode::Equal)]);
        map.save(&path).unwrap();

        let loaded = InputMap::load(&path);
        assert_eq!(
            loaded.get_bindings(Action::Look),
            &[InputBinding::MouseButton(MouseButtonBinding::Right)]
        );
        assert_eq!(
            loaded.get_bindings(Action::BlurIncrease),
            &[InputBinding::Key(KeyCode::Equal)]
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let map = InputMap::load(&dir.path().join("absent.ron"));
        assert_eq!(
            map.get_bindings(Action::Quit),
            &[InputBinding::Key(KeyCode::Escape)]
        );
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.ron");
        std::fs::write(&path, "(bindings: {MoveForward: [Key(NotAKey)]})").unwrap();
        let map = InputMap::load(&path);
        assert_eq!(
            map.get_bindings(Action::MoveForward),
            &[InputBinding::Key(KeyCode::KeyW)]
        );
    }
}
