//! Configuration management
//!
//! Compatible with the desktop app settings.json format:
//! ```json
//! {
//!   "api": { "defaultTaskLimit": 100 },
//!   ...
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

fn default_task_limit() -> i64 {
    100
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default = "default_task_limit")]
    default_task_limit: i64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            default_task_limit: default_task_limit(),
            other: HashMap::new(),
        }
    }
}

/// Taskboard configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Bound applied to task listings when the caller omits `limit`
    pub default_task_limit: i64,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_task_limit: default_task_limit(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the taskboard directory
    ///
    /// The default task limit can be overridden via the environment
    /// variable TASKBOARD_DEFAULT_LIMIT (for CI/testing). A missing or
    /// malformed settings file degrades to defaults.
    pub fn load(taskboard_dir: &Path) -> Result<Self> {
        let settings_path = taskboard_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let default_task_limit = std::env::var("TASKBOARD_DEFAULT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(raw.api.default_task_limit);

        Ok(Self {
            default_task_limit,
            _raw_settings: raw,
        })
    }

    /// Save config to the taskboard directory
    /// Preserves other settings that the core doesn't manage
    pub fn save(&self, taskboard_dir: &Path) -> Result<()> {
        let settings_path = taskboard_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        // Update only the fields we manage
        settings.api.default_task_limit = self.default_task_limit;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_task_limit, 100);
    }

    #[test]
    fn test_load_malformed_file_degrades_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_task_limit, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.default_task_limit = 25;
        config.save(dir.path()).unwrap();

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.default_task_limit, 25);
    }

    #[test]
    fn test_save_preserves_unmanaged_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"api":{"defaultTaskLimit":10,"theme":"dark"},"plugins":{"a":1}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_task_limit, 10);
        config.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap())
                .unwrap();
        assert_eq!(raw["plugins"]["a"], 1);
        assert_eq!(raw["api"]["theme"], "dark");
    }
}
