//! The command line interface for EMPIRE.
use crate::log;
use crate::model::ModelStructure;
use crate::output::{create_output_directory, get_output_dir};
use crate::scenario::generate_scenarios;
use crate::settings::Settings;
use crate::simulation::{load_model, run};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for EMPIRE.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a planning model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Sample scenarios and write the stochastic tables of a model, without solving it.
    Sample {
        /// Path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Sample { model_dir } => handle_sample_command(&model_dir, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start EMPIRE
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ empire --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn settings_or_default(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = settings_or_default(settings)?;

    // Get path to output folder
    let output_path = opts
        .output_dir
        .clone()
        .unwrap_or_else(|| get_output_dir(model_path));
    let overwrite = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(&settings.log_level, Some(&output_path))
        .context("Failed to initialise logging.")?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }
    info!("Output folder: {}", output_path.display());

    let model = load_model(model_path, Some(&output_path)).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());

    run(&model, &output_path, settings.solver_output)?;
    info!("Run complete!");

    Ok(())
}

/// Handle the `sample` command.
pub fn handle_sample_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_default(settings)?;

    // No log files are written for this command
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let structure = ModelStructure::from_path(model_path).context("Failed to load model.")?;
    generate_scenarios(&structure, None).context("Failed to generate scenarios.")?;
    info!("Scenario generation successful!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_default(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    // Load/validate the model, using the stochastic tables already present
    ModelStructure::from_path(model_path)
        .and_then(ModelStructure::into_model)
        .context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
