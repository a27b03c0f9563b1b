//! Defines the [`RunConfig`] struct, which represents the contents of `config.toml`.
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::{Path, PathBuf};
use unicase::UniCase;

const CONFIG_FILE_NAME: &str = "config.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_first_period_year, u32, 2020);
define_param_default!(default_forecast_horizon_year, u32, 2060);
define_param_default!(default_leap_years_investment, u32, 5);
define_param_default!(default_number_of_scenarios, u32, 3);
define_param_default!(default_length_of_regular_season, u32, 168);
define_param_default!(default_n_peak_seasons, u32, 2);
define_param_default!(default_len_peak_season, u32, 24);
define_param_default!(default_discount_rate, f64, 0.05);
define_param_default!(default_wacc, f64, 0.05);
define_param_default!(default_optimization_solver, String, "HiGHS".into());
define_param_default!(default_true, bool, true);
define_param_default!(default_time_format, String, "%d/%m/%Y %H:%M".into());
define_param_default!(default_run_name, String, "run".into());
define_param_default!(default_n_cluster, u32, 10);
define_param_default!(default_window_stride, u32, 24);
define_param_default!(default_voronoi_percentile, f64, 0.9);
define_param_default!(default_n_tree_compare, u32, 20);
define_param_default!(default_iamc_model_name, String, "EMPIRE".into());
define_param_default!(
    default_regular_seasons,
    Vec<String>,
    ["winter", "spring", "summer", "fall"]
        .into_iter()
        .map(String::from)
        .collect()
);

/// The maximum number of peak seasons: one for the system-wide and one for the single-node peak
pub const MAX_PEAK_SEASONS: u32 = 2;

/// Represents the contents of the entire configuration file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Name used to label output artefacts of this run
    #[serde(default = "default_run_name")]
    pub run_name: String,
    /// Whether to route solver temporary files to `temporary_directory`
    #[serde(default)]
    pub use_temporary_directory: bool,
    /// Folder for solver temporary files
    #[serde(default)]
    pub temporary_directory: Option<PathBuf>,
    /// The first year of the first investment period
    #[serde(default = "default_first_period_year")]
    pub first_period_year: u32,
    /// The first year of the last investment period
    #[serde(default = "default_forecast_horizon_year")]
    pub forecast_horizon_year: u32,
    /// Number of years in each investment period (`L`)
    #[serde(default = "default_leap_years_investment")]
    pub leap_years_investment: u32,
    /// Number of operational scenarios per period
    #[serde(default = "default_number_of_scenarios")]
    pub number_of_scenarios: u32,
    /// Hours in each regular season (`L_R`)
    #[serde(default = "default_length_of_regular_season")]
    pub length_of_regular_season: u32,
    /// Names of the regular seasons
    #[serde(default = "default_regular_seasons")]
    pub regular_seasons: Vec<String>,
    /// Number of peak seasons (`N_P`)
    #[serde(default = "default_n_peak_seasons")]
    pub n_peak_seasons: u32,
    /// Hours in each peak season (`L_P`)
    #[serde(default = "default_len_peak_season")]
    pub len_peak_season: u32,
    /// Social discount rate
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,
    /// Weighted average cost of capital used to annuitise investments
    #[serde(default = "default_wacc")]
    pub wacc: f64,
    /// Name of the LP solver
    #[serde(default = "default_optimization_solver")]
    pub optimization_solver: String,
    /// Whether to regenerate the stochastic input tables from time series data
    #[serde(default = "default_true")]
    pub use_scenario_generation: bool,
    /// Whether to reproduce windows from `sampling_key.csv`
    #[serde(default)]
    pub use_fixed_sample: bool,
    /// Whether to apply an absolute CO₂ cap (otherwise a CO₂ price enters the marginal cost)
    #[serde(default = "default_true")]
    pub use_emission_cap: bool,
    /// Whether to write results in IAMC format
    #[serde(default)]
    pub print_in_iamc_format: bool,
    /// Whether to export the LP in CPLEX LP format
    #[serde(default)]
    pub write_in_lp_format: bool,
    /// Whether to export the model input as tab files after the run
    #[serde(default)]
    pub serialize_instance: bool,
    /// Whether to split offshore wind into grounded and floating technologies and enable
    /// offshore nodes
    #[serde(default)]
    pub north_sea: bool,
    /// Format of the timestamps in the scenario time series
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Seed for the scenario sampler (random if absent)
    #[serde(default)]
    pub scenario_seed: Option<u64>,
    /// Options for scenario generation
    #[serde(default)]
    pub scenario_generation: ScenarioGenerationConfig,
    /// Options for the LP solver
    #[serde(default)]
    pub solver: SolverConfig,
    /// Options for the IAMC export
    #[serde(default)]
    pub iamc: IamcConfig,
}

/// Method used to filter candidate windows before sampling
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum FilterMethod {
    /// Sample windows uniformly
    #[default]
    #[string = "none"]
    Uniform,
    /// Stratify windows by K-means clustering of summary statistics
    #[string = "kmeans"]
    KMeans,
    /// Stratify windows by Voronoi prototypes in principal-component space
    #[string = "voronoi"]
    Voronoi,
}

/// The `[scenario_generation]` section of the configuration file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioGenerationConfig {
    /// Stratification filter
    #[serde(default)]
    pub filter: FilterMethod,
    /// Number of clusters (or prototypes) used by the filter
    #[serde(default = "default_n_cluster")]
    pub n_cluster: u32,
    /// Hours between the starts of consecutive candidate windows
    #[serde(default = "default_window_stride")]
    pub window_stride: u32,
    /// Distance quantile beyond which windows become singletons in the Voronoi filter
    #[serde(default = "default_voronoi_percentile")]
    pub voronoi_percentile: f64,
    /// Whether to choose the candidate tree that best matches the load moments
    #[serde(default)]
    pub moment_matching: bool,
    /// Number of candidate trees for moment matching
    #[serde(default = "default_n_tree_compare")]
    pub n_tree_compare: u32,
    /// Overrides for the generators fed by each time series profile
    #[serde(default)]
    pub profile_generators: IndexMap<String, Vec<String>>,
}

impl Default for ScenarioGenerationConfig {
    fn default() -> Self {
        toml::from_str("").expect("Cannot create default scenario generation options")
    }
}

/// The `[solver]` section of the configuration file
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// Wall-clock limit for the solve in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
}

/// The `[iamc]` section of the configuration file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IamcConfig {
    /// The model name written to the IAMC file
    #[serde(default = "default_iamc_model_name")]
    pub model_name: String,
    /// The scenario name written to the IAMC file (defaults to the run name)
    #[serde(default)]
    pub scenario_name: Option<String>,
    /// Additional or replacement taxonomy entries, from generator name to IAMC label
    #[serde(default)]
    pub taxonomy: IndexMap<String, String>,
}

impl Default for IamcConfig {
    fn default() -> Self {
        toml::from_str("").expect("Cannot create default IAMC options")
    }
}

/// The LP solvers which can be named in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverName {
    /// The open-source HiGHS solver
    HiGHS,
    /// IBM CPLEX
    Cplex,
    /// FICO Xpress
    Xpress,
    /// Gurobi
    Gurobi,
}

impl SolverName {
    /// Parse a solver name, ignoring case
    pub fn parse(name: &str) -> Result<Self> {
        let key = UniCase::new(name);
        let solver = [
            ("HiGHS", Self::HiGHS),
            ("CPLEX", Self::Cplex),
            ("Xpress", Self::Xpress),
            ("Gurobi", Self::Gurobi),
        ]
        .into_iter()
        .find(|(label, _)| UniCase::new(*label) == key)
        .map(|(_, solver)| solver);

        solver.with_context(|| format!("Unknown optimization_solver: {name}"))
    }
}

/// Check that the period structure yields at least one period
fn check_horizon(first: u32, horizon: u32, leap_years: u32) -> Result<()> {
    ensure!(leap_years > 0, "leap_years_investment must be greater than zero");
    ensure!(
        horizon >= first,
        "forecast_horizon_year ({horizon}) cannot be before first_period_year ({first})"
    );
    if (horizon - first) % leap_years != 0 {
        warn!(
            "forecast_horizon_year is not a whole number of periods after first_period_year; \
            the last period starts in {}",
            first + (horizon - first) / leap_years * leap_years
        );
    }

    Ok(())
}

/// Check that a rate is a finite number in `[0, 1)`
fn check_rate(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && (0.0..1.0).contains(&value),
        "{name} must be a number between 0 and 1"
    );

    Ok(())
}

/// Check that the seasonal structure is valid
fn check_seasons(regular_seasons: &[String], n_peak: u32, len_regular: u32) -> Result<()> {
    ensure!(!regular_seasons.is_empty(), "regular_seasons cannot be empty");
    ensure!(
        len_regular > 0,
        "length_of_regular_season must be greater than zero"
    );
    ensure!(
        n_peak <= MAX_PEAK_SEASONS,
        "n_peak_seasons cannot be greater than {MAX_PEAK_SEASONS}"
    );

    Ok(())
}

/// Check that the chosen solver has a backend which exposes dual values
fn check_solver(name: &str) -> Result<()> {
    match SolverName::parse(name)? {
        SolverName::HiGHS => Ok(()),
        other => bail!(
            "Solver {other:?} is not available in this build; prices are derived from dual \
            values so a solver backend which exposes them is required. Use HiGHS instead."
        ),
    }
}

/// Check the scenario generation options
fn check_scenario_generation(options: &ScenarioGenerationConfig) -> Result<()> {
    ensure!(options.n_cluster > 0, "n_cluster must be greater than zero");
    ensure!(
        options.window_stride > 0,
        "window_stride must be greater than zero"
    );
    ensure!(
        (0.0..=1.0).contains(&options.voronoi_percentile),
        "voronoi_percentile must be between 0 and 1"
    );
    ensure!(
        options.n_tree_compare > 0,
        "n_tree_compare must be greater than zero"
    );

    Ok(())
}

impl RunConfig {
    /// Read a configuration file from the specified model directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing the model
    ///
    /// # Returns
    ///
    /// The configuration as a [`RunConfig`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<RunConfig> {
        let file_path = model_dir.as_ref().join(CONFIG_FILE_NAME);
        let config: RunConfig = read_toml(&file_path)?;

        config
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(config)
    }

    /// Validate options after reading in the file
    fn validate(&self) -> Result<()> {
        check_horizon(
            self.first_period_year,
            self.forecast_horizon_year,
            self.leap_years_investment,
        )?;
        ensure!(
            self.number_of_scenarios > 0,
            "number_of_scenarios must be greater than zero"
        );
        check_rate("discount_rate", self.discount_rate)?;
        check_rate("wacc", self.wacc)?;
        check_seasons(
            &self.regular_seasons,
            self.n_peak_seasons,
            self.length_of_regular_season,
        )?;
        check_solver(&self.optimization_solver)?;
        check_scenario_generation(&self.scenario_generation)?;

        if self.use_temporary_directory {
            ensure!(
                self.temporary_directory.is_some(),
                "temporary_directory must be given when use_temporary_directory is set"
            );
        }

        if let Some(limit) = self.solver.time_limit {
            ensure!(limit > 0.0, "solver time_limit must be positive");
        }

        if self.use_fixed_sample && !self.use_scenario_generation {
            warn!("use_fixed_sample has no effect because use_scenario_generation is off");
        }

        Ok(())
    }

    /// The number of investment periods
    pub fn num_periods(&self) -> u32 {
        (self.forecast_horizon_year - self.first_period_year) / self.leap_years_investment + 1
    }

    /// The investment periods, numbered from 1
    pub fn periods(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.num_periods()
    }

    /// The first calendar year of the given period
    pub fn period_start_year(&self, period: u32) -> u32 {
        self.first_period_year + self.leap_years_investment * (period - 1)
    }

    /// The operational scenarios, numbered from 1
    pub fn scenarios(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.number_of_scenarios
    }

    /// The folder for solver temporary files, if the user asked for one
    pub fn solver_temporary_directory(&self) -> Option<&Path> {
        if self.use_temporary_directory {
            self.temporary_directory.as_deref()
        } else {
            None
        }
    }

    /// The scenario name used in the IAMC export
    pub fn iamc_scenario_name(&self) -> &str {
        self.iamc.scenario_name.as_deref().unwrap_or(&self.run_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn config_from_str(contents: &str) -> Result<RunConfig> {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
            write!(file, "{contents}").unwrap();
        }
        RunConfig::from_path(dir.path())
    }

    #[test]
    fn test_defaults() {
        let config = config_from_str("").unwrap();
        assert_eq!(config.num_periods(), 9);
        assert_eq!(config.regular_seasons.len(), 4);
        assert_eq!(config.n_peak_seasons, 2);
        assert_eq!(config.scenario_generation.filter, FilterMethod::Uniform);
        assert_eq!(config.iamc_scenario_name(), "run");
    }

    #[test]
    fn test_full_config() {
        let config = config_from_str(
            r#"
            forecast_horizon_year = 2030
            first_period_year = 2020
            leap_years_investment = 5
            number_of_scenarios = 2
            optimization_solver = "highs"
            [scenario_generation]
            filter = "kmeans"
            n_cluster = 4
            [solver]
            time_limit = 60.0
            [iamc]
            taxonomy = { Solar = "Solar|PV" }
            "#,
        )
        .unwrap();
        assert_eq!(config.num_periods(), 3);
        assert_eq!(config.period_start_year(3), 2030);
        assert_eq!(config.scenario_generation.filter, FilterMethod::KMeans);
        assert_eq!(config.scenario_generation.n_cluster, 4);
        assert_eq!(config.solver.time_limit, Some(60.0));
        assert_eq!(config.iamc.taxonomy["Solar"], "Solar|PV");
    }

    #[test]
    fn test_unknown_option() {
        assert!(config_from_str("not_an_option = 1").is_err());
    }

    #[rstest]
    #[case("HiGHS", true)]
    #[case("highs", true)]
    #[case("CPLEX", false)] // Recognised but no backend with duals
    #[case("Gurobi", false)]
    #[case("glpk", false)]
    fn test_check_solver(#[case] name: &str, #[case] expected_valid: bool) {
        assert_eq!(check_solver(name).is_ok(), expected_valid);
    }

    #[rstest]
    #[case(2020, 2060, 5, true)]
    #[case(2020, 2020, 5, true)]
    #[case(2020, 2019, 5, false)]
    #[case(2020, 2060, 0, false)]
    fn test_check_horizon(
        #[case] first: u32,
        #[case] horizon: u32,
        #[case] leap_years: u32,
        #[case] expected_valid: bool,
    ) {
        assert_eq!(check_horizon(first, horizon, leap_years).is_ok(), expected_valid);
    }

    #[test]
    fn test_too_many_peak_seasons() {
        assert_error!(
            check_seasons(&["winter".into()], 3, 168),
            "n_peak_seasons cannot be greater than 2"
        );
    }

    #[rstest]
    #[case(0.05, true)]
    #[case(0.0, true)]
    #[case(1.0, false)]
    #[case(-0.01, false)]
    #[case(f64::NAN, false)]
    fn test_check_rate(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_rate("wacc", value).is_ok(), expected_valid);
    }

    #[test]
    fn test_temporary_directory_required() {
        assert!(config_from_str("use_temporary_directory = true").is_err());
        let config =
            config_from_str("use_temporary_directory = true\ntemporary_directory = \"/tmp\"")
                .unwrap();
        assert_eq!(config.solver_temporary_directory(), Some(Path::new("/tmp")));
    }
}
