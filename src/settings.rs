//! Program settings, which apply to every run and live in the user's config folder.
//!
//! Options which describe a model belong in that model's `config.toml` instead.
use crate::get_empire_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for EMPIRE.
# Remove the leading `# ` from a setting to change it from its default.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_solver_output() -> bool {
    true
}

/// The path from which settings are read
pub fn get_settings_file_path() -> PathBuf {
    get_empire_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Log level (error, warn, info, debug, trace or off). EMPIRE_LOG_LEVEL takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether `run` may replace the contents of an existing output folder
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to show the LP solver's own progress output on the console
    #[serde(default = "default_solver_output")]
    pub solver_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            solver_output: default_solver_output(),
        }
    }
}

impl Settings {
    /// Read the settings file, using defaults if there is none
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// A settings file holding the defaults, commented out, with each setting described
    pub fn default_file_contents() -> String {
        let defaults = match toml::Value::try_from(Settings::default()) {
            Ok(toml::Value::Table(table)) => table,
            _ => toml::Table::new(),
        };

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for (field, value) in &defaults {
            for line in Settings::get_field_docs(field).unwrap_or_default().lines() {
                let _ = write!(out, "\n# # {}\n", line.trim());
            }
            let _ = writeln!(out, "# {field} = {value}");
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "log_level = \"warn\"\nsolver_output = false\n").unwrap();

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                overwrite: false,
                solver_output: false,
            }
        );
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# log_level = \"info\""));
        assert!(contents.contains("# overwrite = false"));
        assert!(contents.contains("# solver_output = true"));
        assert!(contents.contains("# # Whether to show the LP solver's own progress output"));

        // Uncommenting the file gives the defaults back
        let uncommented: String = contents
            .lines()
            .filter_map(|line| line.strip_prefix("# "))
            .filter(|line| !line.starts_with('#') && line.contains('='))
            .map(|line| format!("{line}\n"))
            .collect();
        let settings: Settings = toml::from_str(&uncommented).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
