//! Persisted defaults for the calibration CLI.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::DEFAULT_INTERVAL_SECS;

/// Settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Hostname of the RGBW sensor
    pub sensor: String,
    /// Hostname of the ledstrip
    pub ledstrip: String,
    /// Default CSV output path
    pub output: String,
    /// TrueType font replacing the built-in plot font (optional)
    pub font: String,
    /// Settling time in seconds
    pub interval: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            sensor: "sensor.local".to_string(),
            ledstrip: "lissabon.local".to_string(),
            output: "calibration_data.csv".to_string(),
            font: String::new(),
            interval: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "lissabon", "lissabon-calibrate")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load settings from `path`; a missing or unreadable file gives defaults.
    pub fn load_from(path: &Path) -> Self {
        let defaults = Self::default();

        let mut loaded: Self = fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        // Backfill fields blanked in older config files
        if loaded.sensor.is_empty() {
            loaded.sensor = defaults.sensor;
        }
        if loaded.ledstrip.is_empty() {
            loaded.ledstrip = defaults.ledstrip;
        }
        if loaded.output.is_empty() {
            loaded.output = defaults.output;
        }
        if !(loaded.interval.is_finite() && loaded.interval >= 0.0) {
            loaded.interval = defaults.interval;
        }

        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<PathBuf, String> {
        let path = Self::settings_path().ok_or("Cannot determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    /// Font path, if one is configured.
    pub fn font_path(&self) -> Option<PathBuf> {
        (!self.font.is_empty()).then(|| PathBuf::from(&self.font))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = AppSettings {
            sensor: "rgbw-sensor.local".to_string(),
            interval: 2.5,
            font: "/usr/share/fonts/DejaVuSans.ttf".to_string(),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.font_path(),
            Some(PathBuf::from("/usr/share/fonts/DejaVuSans.ttf"))
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppSettings::load_from(&dir.path().join("absent.json"));
        assert_eq!(loaded, AppSettings::default());
        assert_eq!(loaded.font_path(), None);
    }

    #[test]
    fn test_backfill_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"sensor": "", "ledstrip": "strip.local", "interval": -1}"#).unwrap();

        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded.sensor, "sensor.local");
        assert_eq!(loaded.ledstrip, "strip.local");
        assert_eq!(loaded.interval, DEFAULT_INTERVAL_SECS);
    }
}
