//! The `metadata.toml` file written alongside the results of each run.
//!
//! Records which model was solved with which horizon and scenario settings, along with the build
//! of empire and the host it ran on, so that a results folder can be traced back to its inputs.
use crate::model::config::RunConfig;
use anyhow::{Result, anyhow};
use chrono::Local;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
pub const METADATA_FILE_NAME: &str = "metadata.toml";

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunSection<'a>,
    build: BuildSection,
    host: HostSection,
}

#[derive(Serialize)]
struct RunSection<'a> {
    run_name: &'a str,
    model_path: &'a Path,
    written_at: String,
    first_period_year: u32,
    last_period_year: u32,
    years_per_period: u32,
    number_of_periods: u32,
    number_of_scenarios: u32,
    /// Absent when the sampler was seeded at random
    scenario_seed: Option<u64>,
    use_emission_cap: bool,
    use_fixed_sample: bool,
}

impl<'a> RunSection<'a> {
    fn new(model_path: &'a Path, config: &'a RunConfig) -> Self {
        Self {
            run_name: &config.run_name,
            model_path,
            written_at: Local::now().to_rfc3339(),
            first_period_year: config.first_period_year,
            last_period_year: config.forecast_horizon_year,
            years_per_period: config.leap_years_investment,
            number_of_periods: config.num_periods(),
            number_of_scenarios: config.number_of_scenarios,
            scenario_seed: config.scenario_seed,
            use_emission_cap: config.use_emission_cap,
            use_fixed_sample: config.use_fixed_sample,
        }
    }
}

#[derive(Serialize)]
struct BuildSection {
    version: &'static str,
    /// Short commit hash, suffixed with `-dirty` for uncommitted changes
    commit: String,
    profile: &'static str,
    target: &'static str,
    rustc: &'static str,
}

impl BuildSection {
    fn current() -> Self {
        let commit = match (built_info::GIT_COMMIT_HASH_SHORT, built_info::GIT_DIRTY) {
            (Some(hash), Some(true)) => format!("{hash}-dirty"),
            (Some(hash), _) => hash.to_string(),
            (None, _) => "unknown".to_string(),
        };

        Self {
            version: built_info::PKG_VERSION,
            commit,
            profile: built_info::PROFILE,
            target: built_info::TARGET,
            rustc: built_info::RUSTC_VERSION,
        }
    }
}

#[derive(Serialize)]
struct HostSection {
    os: String,
    release: String,
    machine: String,
}

impl HostSection {
    fn current() -> Result<Self> {
        let info = PlatformInfo::new().map_err(|err| anyhow!("Unable to query host: {err}"))?;
        let os = format!(
            "{} ({})",
            info.osname().to_string_lossy(),
            info.sysname().to_string_lossy()
        );

        Ok(Self {
            os,
            release: info.release().to_string_lossy().into_owned(),
            machine: info.machine().to_string_lossy().into_owned(),
        })
    }
}

/// Write `metadata.toml` for a run of the model at `model_path` into `output_path`
pub fn write_metadata(output_path: &Path, model_path: &Path, config: &RunConfig) -> Result<()> {
    let metadata = Metadata {
        run: RunSection::new(model_path, config),
        build: BuildSection::current(),
        host: HostSection::current()?,
    };
    fs::write(
        output_path.join(METADATA_FILE_NAME),
        toml::to_string(&metadata)?,
    )?;

    Ok(())
}
