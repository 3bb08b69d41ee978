//! Local user settings, stored as a JSON file.
//!
//! Reads and writes happen only through [`SettingsStore::load`] and
//! [`SettingsStore::save`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use huddle_shared::validation::validate_timezone;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub theme: Theme,
    pub notifications_enabled: bool,
    pub compact_mode: bool,
    /// IANA name used to stamp outgoing messages; `None` means the system zone.
    pub timezone: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            notifications_enabled: true,
            compact_mode: false,
            timezone: None,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults. A timezone that fails validation is dropped.
    pub fn load(&self) -> ClientResult<UserSettings> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", self.path.display());
                return Ok(UserSettings::default());
            }
            Err(e) => return Err(ClientError::Io(e)),
        };

        let mut settings: UserSettings = serde_json::from_str(&json)?;
        if let Some(ref tz) = settings.timezone {
            if validate_timezone(tz).is_err() {
                tracing::warn!("Ignoring invalid timezone {:?} in {}", tz, self.path.display());
                settings.timezone = None;
            }
        }
        Ok(settings)
    }

    /// Write to a sibling temp file first, then rename over the target.
    pub fn save(&self, settings: &UserSettings) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(settings)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
