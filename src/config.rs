/// Application preferences
///
/// User-tunable settings persisted as JSON in the platform config
/// directory:
/// - Linux: ~/.config/raw-culler/settings.json
/// - macOS: ~/Library/Application Support/raw-culler/settings.json
/// - Windows: %APPDATA%\raw-culler\settings.json
///
/// Loading tolerates a missing or unreadable file by falling back to
/// defaults; the countdown duration and tick rate live here rather than
/// as constants.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Queue destructive actions behind a countdown; false commits them
    /// on the next tick
    pub confirm_deletions: bool,
    /// Move to the next pair as soon as an action is issued
    pub auto_advance: bool,
    /// Resume at the first unprocessed pair when reopening a directory
    pub resume_session: bool,
    /// Countdown length for destructive actions, in seconds
    pub countdown_secs: f64,
    /// How often countdowns are advanced and reported, in milliseconds
    pub tick_interval_ms: u64,
    /// Last directory the user culled
    pub last_folder: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            confirm_deletions: true,
            auto_advance: true,
            resume_session: true,
            countdown_secs: 5.0,
            tick_interval_ms: 100,
            last_folder: None,
        }
    }
}

impl Preferences {
    /// Where the settings file lives, if a config directory exists
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("raw-culler").join("settings.json"))
    }

    /// Load from the default location; defaults on any failure
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path; defaults on a missing or corrupt file
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("⚠️  Settings file {} unreadable ({e}), using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::settings_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no config directory available")
        })?;
        self.save_to(&path)
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_secs_f64(self.countdown_secs.max(0.0))
    }

    pub fn tick_interval(&self) -> Duration {
        // A zero interval would spin the ticker
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
