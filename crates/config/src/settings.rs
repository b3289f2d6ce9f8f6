// Application settings
// Loaded from ~/.config/tally/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "tally";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reconciliation config (sources, domains, baselines)
    #[serde(rename = "recon.configPath")]
    pub recon_config_path: Option<PathBuf>,

    /// SQLite record store
    #[serde(rename = "store.databasePath")]
    pub database_path: Option<PathBuf>,

    /// tracing filter directive, e.g. "warn" or "tally_recon=debug"
    #[serde(rename = "log.filter")]
    pub log_filter: String,

    /// Window used by `report` when no dates are given
    #[serde(rename = "report.defaultDays")]
    pub report_default_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recon_config_path: None,  // None = <config_dir>/tally/tally.toml
            database_path: None,      // None = <data_dir>/tally/tally.db
            log_filter: "warn".into(),
            report_default_days: 7,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    /// Load settings from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "cannot parse settings, using defaults");
                Self::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with // are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Reconciliation config to use: explicit choice (flag or env) first,
    /// then settings, then the default location.
    pub fn resolve_config_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.recon_config_path.clone())
            .unwrap_or_else(|| Self::config_dir().join("tally.toml"))
    }

    /// Record store to use, same precedence as [`resolve_config_path`](Self::resolve_config_path).
    pub fn resolve_database_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR)
                    .join("tally.db")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_comments() {
        let settings = Settings::parse(
            r#"{
    // where the domain rules live
    "recon.configPath": "/etc/tally/tally.toml",
    "log.filter": "tally_recon=debug"
}"#,
        )
        .unwrap();
        assert_eq!(settings.recon_config_path, Some(PathBuf::from("/etc/tally/tally.toml")));
        assert_eq!(settings.log_filter, "tally_recon=debug");
        // unspecified keys keep defaults
        assert_eq!(settings.report_default_days, 7);
        assert!(settings.database_path.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn bad_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("settings.json");
        let settings = Settings {
            database_path: Some(PathBuf::from("/var/lib/tally/tally.db")),
            report_default_days: 30,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn explicit_path_wins() {
        let settings = Settings {
            recon_config_path: Some(PathBuf::from("from-settings.toml")),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolve_config_path(Some(PathBuf::from("flag.toml"))),
            PathBuf::from("flag.toml")
        );
        assert_eq!(settings.resolve_config_path(None), PathBuf::from("from-settings.toml"));
        assert!(Settings::default()
            .resolve_config_path(None)
            .ends_with("tally/tally.toml"));
        assert!(Settings::default()
            .resolve_database_path(None)
            .ends_with("tally/tally.db"));
    }
}
