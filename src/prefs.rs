//! Persisted local preferences.
//!
//! One small JSON file under the platform config dir holding the selected
//! notification mode as an integer. Read once at startup, rewritten whenever
//! the user changes the mode. A missing or unreadable file is never fatal.

use crate::error::{MonitorError, Result};
use crate::notify::NotifyMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Notification mode index: 0 off, 1 default sound, 2 siren sound.
    #[serde(default)]
    notification: u8,
}

impl Preferences {
    pub fn notify_mode(&self) -> NotifyMode {
        NotifyMode::from_index(self.notification)
    }

    pub fn set_notify_mode(&mut self, mode: NotifyMode) {
        self.notification = mode.index();
    }

    /// Default preferences file location under the platform config dir.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or(MonitorError::NoConfigDir)?;
        Ok(dir.join("door-alarm-monitor").join("prefs.json"))
    }

    /// Load preferences, falling back to defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write preferences, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
