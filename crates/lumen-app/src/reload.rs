//! Periodic re-read of `config.ron` while the demo runs.

use std::path::PathBuf;

use lumen_config::Config;
use tracing::debug;

/// Seconds between two reads of the config file.
pub const RELOAD_INTERVAL: f32 = 1.0;

/// Polls the config file on a fixed interval of frame time.
///
/// Edits are detected against the file as last read, not against the running
/// config, so CLI overrides never count as a change.
#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    config_dir: PathBuf,
    on_disk: Config,
    since_check: f32,
}

impl ConfigWatcher {
    /// `on_disk` is the config as loaded from `config_dir`, before overrides.
    pub fn new(config_dir: PathBuf, on_disk: Config) -> Self {
        Self {
            config_dir,
            on_disk,
            since_check: 0.0,
        }
    }

    /// Advance by `dt` and, once per interval, re-read the file.
    ///
    /// Returns the file's contents only when they changed since the last read.
    /// A missing or half-written file is skipped until the next interval.
    pub fn poll(&mut self, dt: f32) -> Option<&Config> {
        self.since_check += dt;
        if self.since_check < RELOAD_INTERVAL {
            return None;
        }
        self.since_check = 0.0;

        match self.on_disk.reload(&self.config_dir) {
            Ok(Some(fresh)) => {
                self.on_disk = fresh;
                Some(&self.on_disk)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Config reload skipped: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watched_dir() -> (tempfile::TempDir, ConfigWatcher) {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = Config::load_or_create(dir.path()).unwrap();
        let watcher = ConfigWatcher::new(dir.path().to_path_buf(), on_disk);
        (dir, watcher)
    }

    #[test]
    fn test_unchanged_file_reports_nothing() {
        let (_dir, mut watcher) = watched_dir();
        assert!(watcher.poll(RELOAD_INTERVAL).is_none());
        assert!(watcher.poll(RELOAD_INTERVAL).is_none());
    }

    #[test]
    fn test_edit_is_picked_up_after_interval() {
        let (dir, mut watcher) = watched_dir();
        let mut edited = Config::default();
        edited.post_process.threshold_ramp_rate = 2.0;
        edited.save(dir.path()).unwrap();

        assert!(watcher.poll(RELOAD_INTERVAL * 0.5).is_none());
        let fresh = watcher.poll(RELOAD_INTERVAL * 0.5).unwrap();
        assert_eq!(fresh.post_process.threshold_ramp_rate, 2.0);

        // Same edit is not reported twice.
        assert!(watcher.poll(RELOAD_INTERVAL).is_none());
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let (dir, mut watcher) = watched_dir();
        std::fs::write(lumen_config::config_path(dir.path()), "(window: (width: ").unwrap();
        assert!(watcher.poll(RELOAD_INTERVAL).is_none());

        Config::default().save(dir.path()).unwrap();
        assert!(watcher.poll(RELOAD_INTERVAL).is_none());
    }
}
