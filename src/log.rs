//! Program logging.
//!
//! Console output is coloured when attached to a terminal. Full runs also write plain-text logs to
//! the output folder: `empire_info.log` for progress messages and `empire_error.log` for warnings
//! and errors.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Metadata, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable used to override the log level
pub const LOG_LEVEL_ENV_VAR: &str = "EMPIRE_LOG_LEVEL";

/// Log level used when neither the environment nor the settings file gives one
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_INFO_FILE_NAME: &str = "empire_info.log";
const LOG_ERROR_FILE_NAME: &str = "empire_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Whether the user has switched logging off via the environment variable.
///
/// The solver writes directly to the console, so this is checked separately from the logger.
pub fn is_logging_disabled() -> bool {
    env::var(LOG_LEVEL_ENV_VAR).is_ok_and(|level| level.eq_ignore_ascii_case("off"))
}

fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    log_level
        .parse()
        .map_err(|_| anyhow!("Unknown log level: {log_level}"))
}

/// The log level to use, with the environment variable taking precedence over the settings
fn resolve_log_level(log_level_from_settings: &str) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level).with_context(|| format!("Invalid {LOG_LEVEL_ENV_VAR}")),
        Err(_) => parse_log_level(log_level_from_settings),
    }
}

/// Format a record as `[HH:MM:SS LEVEL target] message`
fn format_record(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = record.target();
    match colours {
        Some(colours) => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            colours.color(record.level())
        )),
        None => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            record.level()
        )),
    }
}

/// Messages about the ordinary progress of a run, i.e. below warning severity
fn is_progress(metadata: &Metadata) -> bool {
    metadata.level() > Level::Warn
}

/// A dispatch for a console stream, coloured if the stream is a terminal
fn console_dispatch(level: LevelFilter, use_colour: bool) -> Dispatch {
    let colours = use_colour.then(|| {
        ColoredLevelConfig::new()
            .error(Color::Red)
            .warn(Color::Yellow)
            .info(Color::Green)
            .debug(Color::Blue)
            .trace(Color::Magenta)
    });

    Dispatch::new()
        .level(level)
        .format(move |out, message, record| {
            format_record(out, message, record, colours.as_ref());
        })
}

/// A dispatch writing plain text to a new file in `dir`
fn file_dispatch(dir: &Path, file_name: &str, level: LevelFilter) -> Result<Dispatch> {
    let file_path = dir.join(file_name);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))?;

    Ok(Dispatch::new()
        .level(level)
        .format(|out, message, record| format_record(out, message, record, None))
        .chain(file))
}

/// Install the program logger.
///
/// Progress messages go to stdout, warnings and errors to stderr. The level is taken from
/// `EMPIRE_LOG_LEVEL` if set, otherwise from the settings file.
///
/// # Arguments
///
/// * `log_level_from_settings` - The log level given in `settings.toml`
/// * `log_file_dir` - Folder for log files; none are written if `None`
pub fn init(log_level_from_settings: &str, log_file_dir: Option<&Path>) -> Result<()> {
    let level = resolve_log_level(log_level_from_settings)?;

    let mut dispatch = Dispatch::new()
        .chain(
            console_dispatch(level, io::stdout().is_terminal())
                .filter(is_progress)
                .chain(io::stdout()),
        )
        .chain(
            console_dispatch(level.min(LevelFilter::Warn), io::stderr().is_terminal())
                .chain(io::stderr()),
        );
    if let Some(dir) = log_file_dir {
        // The info log records progress even when the console is quieter
        dispatch = dispatch
            .chain(file_dispatch(dir, LOG_INFO_FILE_NAME, level.max(LevelFilter::Info))?.filter(is_progress))
            .chain(file_dispatch(dir, LOG_ERROR_FILE_NAME, LevelFilter::Warn)?);
    }

    dispatch.apply()?;
    LOGGER_INIT
        .set(())
        .map_err(|()| anyhow!("Logger already initialised"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("WARN", LevelFilter::Warn)]
    #[case("Info", LevelFilter::Info)]
    #[case("trace", LevelFilter::Trace)]
    fn test_parse_log_level(#[case] input: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_log_level_unknown() {
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_file_dispatch_truncates() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(LOG_INFO_FILE_NAME);
        std::fs::write(&file_path, "previous run").unwrap();

        file_dispatch(dir.path(), LOG_INFO_FILE_NAME, LevelFilter::Info).unwrap();
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "");
        assert!(file_dispatch(&dir.path().join("missing"), LOG_INFO_FILE_NAME, LevelFilter::Info).is_err());
    }
}
