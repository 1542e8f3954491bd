//! Configuration loading for the dossier CLI.
//!
//! Layered: built-in defaults -> YAML config file -> environment -> CLI flags.
//! The config file defaults to `<config_dir>/dossier/config.yaml`; a missing
//! default file is not an error, a missing explicit file is.
//!
//! Environment variables carry the `DOSSIER_` prefix: `DOSSIER_DB_PATH`,
//! `DOSSIER_LOG_LEVEL`.

use ::config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "DOSSIER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Default database path (~/.local/share/dossier/dossier.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("dossier").join("dossier.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default config file location (~/.config/dossier/config.yaml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dossier").join("config.yaml"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load defaults, then the config file, then environment overrides.
    ///
    /// `path` names an explicit config file, which must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// As [`load`](Self::load), reading environment overrides from `env`
    /// instead of the process environment when given.
    fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // 1. Built-in defaults
            .set_default("db_path", default_db_path().to_string_lossy().into_owned())?
            .set_default("log_level", default_log_level())?;

        // 2. Config file, explicit or default
        let builder = match path {
            Some(path) => builder.add_source(yaml_file(path).required(true)),
            None => match default_config_path() {
                Some(path) => builder.add_source(yaml_file(&path).required(false)),
                None => builder,
            },
        };

        // 3. Environment: DOSSIER_DB_PATH, DOSSIER_LOG_LEVEL
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .ignore_empty(true)
                .source(env),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Apply CLI flags, which take precedence over everything else
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, log_level: Option<String>) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if let Some(log_level) = log_level {
            self.log_level = log_level;
        }
        self
    }
}

fn yaml_file(path: &Path) -> File<::config::FileSourceFile, FileFormat> {
    File::new(&path.to_string_lossy(), FileFormat::Yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert!(settings.db_path.ends_with("dossier/dossier.db"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "log_level: debug\n");

        let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.db_path, Settings::default().db_path);
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");
        assert_eq!(
            Settings::load_with_env(Some(&path), env(&[])).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_file_then_env_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "db_path: /from/file.db\nlog_level: warn\n");

        let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(settings.db_path, PathBuf::from("/from/file.db"));
        assert_eq!(settings.log_level, "warn");

        let settings =
            Settings::load_with_env(Some(&path), env(&[("DOSSIER_LOG_LEVEL", "trace")])).unwrap();
        assert_eq!(settings.log_level, "trace");
        assert_eq!(settings.db_path, PathBuf::from("/from/file.db"));

        let settings = settings.with_overrides(Some(PathBuf::from("/from/flag.db")), None);
        assert_eq!(settings.db_path, PathBuf::from("/from/flag.db"));
        assert_eq!(settings.log_level, "trace");
    }

    #[test]
    fn test_env_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");
        let settings = Settings::load_with_env(
            Some(&path),
            env(&[("DOSSIER_DB_PATH", "/from/env.db"), ("DOSSIER_LOG_LEVEL", "")]),
        )
        .unwrap();
        assert_eq!(settings.db_path, PathBuf::from("/from/env.db"));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load_with_env(Some(Path::new("/definitely/not/here.yaml")), env(&[]));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "log_level: [unclosed\n");
        assert!(Settings::load_with_env(Some(&path), env(&[])).is_err());
    }
}
