//! The `settings` command, for inspecting and editing the program settings file.
use crate::log::LOG_LEVEL_ENV_VAR;
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::env;
use std::fs;
use std::path::Path;

/// Subcommands for the program settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in a text editor, creating it from the defaults if needed
    Edit,
    /// Print the location of the settings file
    Path,
    /// Print a commented settings file holding the defaults
    DumpDefault,
    /// Print the settings a run would use
    Show,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => handle_edit_command(&get_settings_file_path())?,
            Self::Path => println!("{}", get_settings_file_path().display()),
            Self::DumpDefault => print!("{}", Settings::default_file_contents()),
            Self::Show => handle_show_command()?,
        }

        Ok(())
    }
}

/// Write the commented defaults to `file_path` unless a settings file is already there.
///
/// Returns whether a new file was written.
fn write_settings_file_if_missing(file_path: &Path) -> Result<bool> {
    if file_path.is_file() {
        return Ok(false);
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents())
        .with_context(|| format!("Failed to write settings file: {}", file_path.display()))?;

    Ok(true)
}

/// Handle the `settings edit` command
fn handle_edit_command(file_path: &Path) -> Result<()> {
    if write_settings_file_if_missing(file_path)? {
        println!("Created settings file with default values");
    }

    println!("Opening settings file for editing: {}", file_path.display());
    edit::edit_file(file_path)?;

    Ok(())
}

/// Handle the `settings show` command
fn handle_show_command() -> Result<()> {
    let settings = Settings::load().context("Failed to load settings.")?;
    let log_level_override = env::var(LOG_LEVEL_ENV_VAR).ok();
    print!("{}", describe_settings(&settings, log_level_override.as_deref()));

    Ok(())
}

/// One line per setting, noting where the environment overrides the file
fn describe_settings(settings: &Settings, log_level_override: Option<&str>) -> String {
    let log_level = match log_level_override {
        Some(level) => format!("log_level = \"{level}\" (from {LOG_LEVEL_ENV_VAR})"),
        None => format!("log_level = \"{}\"", settings.log_level),
    };

    format!(
        "{log_level}\noverwrite = {}\nsolver_output = {}\n",
        settings.overwrite, settings.solver_output
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_settings_file_if_missing() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empire").join("settings.toml");

        assert!(write_settings_file_if_missing(&file_path).unwrap());
        let contents = fs::read_to_string(&file_path).unwrap();
        assert_eq!(contents, Settings::default_file_contents());

        // An existing file is left alone
        fs::write(&file_path, "log_level = \"debug\"\n").unwrap();
        assert!(!write_settings_file_if_missing(&file_path).unwrap());
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "log_level = \"debug\"\n"
        );
    }

    #[test]
    fn test_describe_settings() {
        let settings = Settings {
            log_level: "warn".into(),
            overwrite: true,
            solver_output: false,
        };
        assert_eq!(
            describe_settings(&settings, None),
            "log_level = \"warn\"\noverwrite = true\nsolver_output = false\n"
        );
        assert!(
            describe_settings(&settings, Some("debug"))
                .starts_with("log_level = \"debug\" (from EMPIRE_LOG_LEVEL)\n")
        );
    }
}
