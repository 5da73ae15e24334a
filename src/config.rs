//! Runtime configuration.
//!
//! Loaded once from `config.json` and passed explicitly to the components
//! that need it. The format-pattern keys keep the names used by existing
//! deployments (`STAFF_NO_FORMAT`, `STUDENT_REG_NO_FORMAT`, `SESSION_FORMAT`).

use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::sync::{get_db_path, get_dump_dir};

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(tams::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    #[diagnostic(
        code(tams::config::parse),
        help("config.json must be a JSON object of format patterns and paths")
    )]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {key} pattern '{pattern}': {message}")]
    #[diagnostic(code(tams::config::invalid_pattern))]
    InvalidPattern {
        key: &'static str,
        pattern: String,
        message: String,
    },
}

fn default_staff_no_format() -> String {
    r"^[A-Z]{2,4}[./]?\d{3,6}$".to_string()
}

fn default_student_reg_no_format() -> String {
    r"^\d{4}/\d{6}$".to_string()
}

fn default_session_format() -> String {
    r"^\d{4}/\d{4}$".to_string()
}

fn default_app_label() -> String {
    "db".to_string()
}

/// Regular expressions for institution-specific identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatConfig {
    #[serde(rename = "STAFF_NO_FORMAT", default = "default_staff_no_format")]
    pub staff_no_format: String,
    #[serde(
        rename = "STUDENT_REG_NO_FORMAT",
        default = "default_student_reg_no_format"
    )]
    pub student_reg_no_format: String,
    #[serde(rename = "SESSION_FORMAT", default = "default_session_format")]
    pub session_format: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            staff_no_format: default_staff_no_format(),
            student_reg_no_format: default_student_reg_no_format(),
            session_format: default_session_format(),
        }
    }
}

/// Which data layer performs export and import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process SQLite database.
    #[default]
    Sqlite,
    /// External management command, e.g. `python manage.py`.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_app_label")]
        app_label: String,
        #[serde(default)]
        working_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub formats: FormatConfig,
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Refuse node dumps on the server unless a registered device token is given.
    #[serde(default)]
    pub require_device_token: bool,
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn dump_dir(&self) -> PathBuf {
        self.dump_dir.clone().unwrap_or_else(get_dump_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(get_db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_original_format_keys() {
        let config = Config::from_json(
            r#"{
                "STAFF_NO_FORMAT": "^SS\\d{4}$",
                "STUDENT_REG_NO_FORMAT": "^\\d{4}/\\d{6}$",
                "SESSION_FORMAT": "^\\d{4}/\\d{4}$"
            }"#,
        )
        .unwrap();

        assert_eq!(config.formats.staff_no_format, r"^SS\d{4}$");
        assert_eq!(config.backend, BackendConfig::Sqlite);
        assert!(!config.require_device_token);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_command_backend() {
        let config = Config::from_json(
            r#"{"backend": {"kind": "command", "program": "python", "args": ["manage.py"]}}"#,
        )
        .unwrap();

        assert_eq!(
            config.backend,
            BackendConfig::Command {
                program: "python".to_string(),
                args: vec!["manage.py".to_string()],
                app_label: "db".to_string(),
                working_dir: None,
            }
        );
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "STAFF_NO_FORMAT=abc").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn explicit_paths_override_data_dir() {
        let config = Config::from_json(
            r#"{"dump_dir": "/srv/tams/dumps", "database": "/srv/tams/tams.db"}"#,
        )
        .unwrap();
        assert_eq!(config.dump_dir(), PathBuf::from("/srv/tams/dumps"));
        assert_eq!(config.database_path(), PathBuf::from("/srv/tams/tams.db"));
    }
}
