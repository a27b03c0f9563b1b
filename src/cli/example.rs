//! The `example` command: demo models bundled into the executable.
use super::{RunOpts, handle_run_command};
use crate::model::config::RunConfig;
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

static DEMOS: Dir = include_dir!("demos");

/// Subcommands for the bundled demo models
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List the demo models with a one-line description of each
    List,
    /// Describe a demo model and its planning horizon
    Info {
        /// Name of the demo
        name: String,
    },
    /// Copy a demo model into a new folder
    Extract {
        /// Name of the demo
        name: String,
        /// Folder to create (defaults to the demo's name)
        new_path: Option<PathBuf>,
    },
    /// Solve a demo model without extracting it first
    Run {
        /// Name of the demo
        name: String,
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => {
                for demo in Demo::all() {
                    println!("{:<16}{}", demo.name(), demo.headline());
                }
            }
            Self::Info { name } => println!("{}", Demo::find(&name)?.describe()?),
            Self::Extract { name, new_path } => {
                let dest = new_path.unwrap_or_else(|| PathBuf::from(&name));
                extract_example(&name, &dest)?;
            }
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// A demo model embedded in the executable
struct Demo(&'static Dir<'static>);

impl Demo {
    fn all() -> impl Iterator<Item = Demo> {
        DEMOS.dirs().map(Demo)
    }

    fn find(name: &str) -> Result<Demo> {
        DEMOS
            .get_dir(name)
            .map(Demo)
            .with_context(|| format!("No demo model called '{name}'"))
    }

    fn name(&self) -> String {
        self.0.path().display().to_string()
    }

    fn text_file(&self, file_name: &str) -> Result<&'static str> {
        self.0
            .get_file(self.0.path().join(file_name))
            .with_context(|| format!("Demo {} has no {file_name}", self.name()))?
            .contents_utf8()
            .with_context(|| format!("{file_name} is not UTF-8 encoded"))
    }

    fn readme(&self) -> Result<&'static str> {
        self.text_file("README.txt")
    }

    /// First line of the README, or nothing if it is missing
    fn headline(&self) -> &'static str {
        self.readme()
            .ok()
            .and_then(|readme| readme.lines().next())
            .unwrap_or_default()
    }

    /// The README followed by the horizon and scenarios from `config.toml`
    fn describe(&self) -> Result<String> {
        let config: RunConfig = toml::from_str(self.text_file("config.toml")?)
            .with_context(|| format!("Invalid config.toml in demo {}", self.name()))?;

        Ok(format!(
            "{}\nPeriods: {} ({}-{}, {} years each)\nScenarios per period: {}\nEmission cap: {}",
            self.readme()?.trim_end(),
            config.num_periods(),
            config.first_period_year,
            config.forecast_horizon_year,
            config.leap_years_investment,
            config.number_of_scenarios,
            if config.use_emission_cap { "on" } else { "off" }
        ))
    }

    /// Write every embedded file below `dest`, which must not yet exist
    fn extract_to(&self, dest: &Path) -> Result<()> {
        ensure!(
            !dest.exists(),
            "Destination directory {} already exists",
            dest.display()
        );

        let mut pending = vec![self.0];
        while let Some(dir) = pending.pop() {
            let dir_path = dest.join(dir.path().strip_prefix(self.0.path())?);
            fs::create_dir_all(&dir_path)
                .with_context(|| format!("Failed to create {}", dir_path.display()))?;
            for file in dir.files() {
                let file_path = dest.join(file.path().strip_prefix(self.0.path())?);
                fs::write(&file_path, file.contents())
                    .with_context(|| format!("Failed to write {}", file_path.display()))?;
            }
            pending.extend(dir.dirs());
        }

        Ok(())
    }
}

/// Copy the named demo model into `new_path`
pub fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    Demo::find(name)?.extract_to(new_path)
}

/// Solve the named demo from a temporary copy.
///
/// Results go to `opts.output_dir`, or to a folder named after the demo.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_example(name, &model_path)?;

    let opts = RunOpts {
        output_dir: Some(opts.output_dir.clone().unwrap_or_else(|| PathBuf::from(name))),
        overwrite: opts.overwrite,
    };
    handle_run_command(&model_path, &opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("two_node");
        extract_example("two_node", &dest).unwrap();
        assert!(dest.join("config.toml").is_file());
        assert!(dest.join("Input/Tab/Sets_Node.tab").is_file());
        assert!(dest.join("ScenarioData/electricload.csv").is_file());

        // Cannot extract over an existing folder
        assert!(extract_example("two_node", &dest).is_err());
        assert!(extract_example("no_such_example", &dir.path().join("other")).is_err());
    }

    #[test]
    fn test_demo_describe() {
        let demo = Demo::find("two_node").unwrap();
        assert!(!demo.headline().is_empty());
        assert!(demo.readme().unwrap().starts_with(demo.headline()));

        let description = demo.describe().unwrap();
        assert!(description.contains("\nPeriods: "));
        assert!(description.contains("\nScenarios per period: "));
        assert!(Demo::all().any(|demo| demo.name() == "two_node"));
    }
}
