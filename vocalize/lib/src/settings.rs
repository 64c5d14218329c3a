//! Persisted user settings.
//!
//! Two string keys survive restarts: the last-used API key and the
//! last-selected voice id. They live in a small JSON document guarded by
//! `fs2` file locks so two running instances never interleave writes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;

/// Directory under the platform config dir.
const SETTINGS_DIR: &str = "vocalize";

/// Settings file name.
const SETTINGS_FILE: &str = "settings.json";

/// The persisted key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Last-used ElevenLabs API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Last-selected voice id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

/// Storage backend for [`Settings`].
pub trait SettingsStore {
    /// Loads the stored settings. A missing store yields the defaults.
    ///
    /// ## Errors
    ///
    /// Returns an error if reading or parsing fails.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Replaces the stored settings.
    ///
    /// ## Errors
    ///
    /// Returns an error if writing fails.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// JSON file settings storage.
///
/// ## Examples
///
/// ```no_run
/// use vocalize_lib::{JsonSettingsStore, Settings, SettingsStore};
///
/// let store = JsonSettingsStore::new("/tmp/vocalize-settings.json".into());
/// store.save(&Settings { api_key: None, voice_id: Some("abc".into()) }).unwrap();
///
/// assert_eq!(store.load().unwrap().voice_id.as_deref(), Some("abc"));
/// ```
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Creates a store at the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a store at `{config_dir}/vocalize/settings.json`.
    ///
    /// Falls back to the current directory when the platform has no config
    /// directory.
    pub fn default_path() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Returns the path to the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let mut file = File::open(&self.path)?;
        file.lock_shared().map_err(|_| SettingsError::Lock)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        file.unlock().map_err(|_| SettingsError::Lock)?;

        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Truncate only after the lock is held.
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive().map_err(|_| SettingsError::Lock)?;

        file.set_len(0)?;
        let json = serde_json::to_string_pretty(settings)?;
        writeln!(file, "{json}")?;

        file.unlock().map_err(|_| SettingsError::Lock)?;
        debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}
