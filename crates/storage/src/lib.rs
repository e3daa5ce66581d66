//! Preferences persistence for the viewer.
//!
//! Preferences are stored as a versioned JSON envelope in the platform's
//! local data directory, or in an explicit root for tests and the CLI.

use directories::ProjectDirs;
use doc_model::Preferences;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PREFS_SCHEMA_VERSION: u32 = 1;
const PREFS_FILE_NAME: &str = "preferences.json";

/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "LUMINA_DATA_DIR";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("preferences schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesEnvelope {
    version: u32,
    preferences: Preferences,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Lumina", "LuminaReader")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    /// Uses `explicit`, then `LUMINA_DATA_DIR`, then the platform default.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, StorageError> {
        if let Some(root) = explicit {
            return Ok(Self::with_root(root));
        }
        match std::env::var_os(DATA_DIR_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::with_root(root)),
            _ => Self::from_default_project(),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join(PREFS_FILE_NAME)
    }

    /// Missing file yields defaults. Out-of-range values are clamped.
    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        let path = self.preferences_path();
        if !path.exists() {
            log::debug!("no preferences at {}, using defaults", path.display());
            return Ok(Preferences::default());
        }

        let bytes = fs::read(&path)?;
        let envelope: PreferencesEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > PREFS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: envelope.version,
                supported: PREFS_SCHEMA_VERSION,
            });
        }

        Ok(envelope.preferences.normalized())
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            PreferencesEnvelope { version: PREFS_SCHEMA_VERSION, preferences: preferences.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        // Write next to the target and rename so a crash never leaves half a file.
        let staging = self.root.join(format!("{PREFS_FILE_NAME}.tmp"));
        fs::write(&staging, bytes)?;
        fs::rename(&staging, self.preferences_path())?;
        log::debug!("saved preferences to {}", self.preferences_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Color, FontFamily, ThemeId};

    #[test]
    fn preferences_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let prefs = Preferences {
            theme: ThemeId::Light,
            font: FontFamily::Serif,
            brightness: 55,
            pen_color: Color::rgb(255, 0, 0),
            pen_width: 3.5,
            ..Preferences::default()
        };

        store.save_preferences(&prefs).expect("save should succeed");
        let loaded = store.load_preferences().expect("load should succeed");

        assert_eq!(loaded, prefs);
        assert!(!temp.path().join("preferences.json.tmp").exists());
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path().join("not-created-yet"));

        let loaded = store.load_preferences().expect("load should succeed");
        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(store.preferences_path(), r#"{"version":9,"preferences":{}}"#).unwrap();

        let err = store.load_preferences().expect_err("future schema should fail");
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 9, supported: 1 }));
    }

    #[test]
    fn corrupt_file_is_a_serde_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(store.preferences_path(), b"{ not json").unwrap();

        assert!(matches!(store.load_preferences(), Err(StorageError::Serde(_))));
    }

    #[test]
    fn out_of_range_brightness_is_clamped_on_load() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(store.preferences_path(), r#"{"version":1,"preferences":{"brightness":3}}"#)
            .unwrap();

        assert_eq!(store.load_preferences().unwrap().brightness, 20);
    }

    #[test]
    fn inverted_zoom_bounds_are_repaired_on_load() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(
            store.preferences_path(),
            r#"{"version":1,"preferences":{"zoom":{"min":3.0,"max":0.5,"step":0.1}}}"#,
        )
        .unwrap();

        let zoom = store.load_preferences().unwrap().zoom;
        assert_eq!((zoom.min, zoom.max), (0.5, 3.0));
    }

    #[test]
    fn explicit_root_wins() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::resolve(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(store.root(), temp.path());
    }
}
