//! The module responsible for writing output data to disk.
use crate::input::sets::write_sets;
use crate::input::{TAB_DIR, write_input_data};
use crate::model::Model;
use crate::model::config::RunConfig;
use crate::optimisation::Solution;
use crate::preparation::Parameters;
use crate::preparation::timeseries::LoadAdjustment;
use crate::time_index::TimeIndex;
use crate::units::Money;
use anyhow::{Context, Result, ensure};
use itertools::iproduct;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod iamc;
pub mod metadata;
mod operational;
mod summary;

/// The folder, relative to the model directory, in which results are written by default
const OUTPUT_DIR_NAME: &str = "Output";

/// The output file name for the objective value
const OBJECTIVE_FILE_NAME: &str = "results_objective.csv";

/// The folder, relative to the output directory, for the exported model instance
const INSTANCE_DIR_NAME: &str = "Instance";

/// MWh per GWh, for reporting annual volumes
const MWH_PER_GWH: f64 = 1000.0;

/// Get the default output folder for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> PathBuf {
    model_dir.join(OUTPUT_DIR_NAME)
}

/// Create a new output directory, clearing out old results if permitted.
///
/// # Returns
///
/// True if an existing, non-empty folder was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        if output_dir.read_dir()?.next().is_none() {
            return Ok(false);
        }
        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// A label for a period, e.g. `2020-2025`.
///
/// Periods are numbered from zero.
pub fn period_label(config: &RunConfig, i: usize) -> String {
    let start = config.period_start_year(i as u32 + 1);
    format!("{start}-{}", start + config.leap_years_investment)
}

/// The expected annual total of an hourly quantity.
///
/// Each `(hour, scenario)` value is weighted by the scale of its season and the probability of its
/// scenario. Hours and scenarios are numbered from zero.
fn expected_annual<F>(params: &Parameters, time_index: &TimeIndex, mut value: F) -> f64
where
    F: FnMut(usize, usize) -> f64,
{
    iproduct!(0..params.dims.hours, 0..params.dims.scenarios)
        .map(|(h, w)| {
            let s = time_index.season_index_of_hour(h as u32 + 1);
            params.season_scale[s] * params.scenario_probability[w] * value(h, w)
        })
        .sum()
}

/// Represents the single row of the objective CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ObjectiveRow {
    objective_value: Money,
}

/// Write the objective value to file
fn write_objective(output_dir: &Path, objective_value: Money) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(OBJECTIVE_FILE_NAME))?;
    writer.serialize(ObjectiveRow { objective_value })?;
    writer.flush()?;

    Ok(())
}

/// Write every result table for a solved problem.
///
/// The IAMC export is only written if the run asks for it.
pub fn write_results(output_dir: &Path, solution: &Solution) -> Result<()> {
    let model = solution.model();

    write_objective(output_dir, solution.objective_value)?;
    summary::write_generator_results(output_dir, solution)?;
    summary::write_storage_results(output_dir, solution)?;
    summary::write_transmission_results(output_dir, solution)?;
    summary::write_europe_summary(output_dir, solution)?;
    summary::write_europe_totals(output_dir, solution)?;
    if model.config.use_emission_cap {
        summary::write_co2_prices(output_dir, solution)?;
    }
    operational::write_operational_results(output_dir, solution)?;

    if model.config.print_in_iamc_format {
        iamc::write_iamc(output_dir, solution)?;
    }

    info!("Results written to {}", output_dir.display());

    Ok(())
}

/// The path of the record of clipped load values for a run
pub fn load_adjustments_file_path(output_dir: &Path, run_name: &str) -> PathBuf {
    output_dir.join(format!("AdjustedNegativeLoad_{run_name}.txt"))
}

/// Write a tab-separated record of the negative scaled loads which were clipped.
///
/// Nothing is written if no load was adjusted.
pub fn write_load_adjustments(
    output_dir: &Path,
    run_name: &str,
    adjustments: &[LoadAdjustment],
) -> Result<()> {
    if adjustments.is_empty() {
        return Ok(());
    }

    let file_path = load_adjustments_file_path(output_dir, run_name);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for adjustment in adjustments {
        writer.serialize(adjustment)?;
    }
    writer.flush()?;

    Ok(())
}

/// Export the sets and input tables of a model as tab files, in the form they are read
pub fn write_instance(output_dir: &Path, model: &Model) -> Result<PathBuf> {
    let instance_dir = output_dir.join(INSTANCE_DIR_NAME);
    let tab_dir = instance_dir.join(TAB_DIR);
    fs::create_dir_all(&tab_dir)
        .with_context(|| format!("Could not create {}", tab_dir.display()))?;

    write_sets(&tab_dir, &model.sets)?;
    write_input_data(&tab_dir, &model.data)?;
    info!("Model instance written to {}", instance_dir.display());

    Ok(instance_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{config, model};
    use crate::input::sets::read_sets;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("Output");

        // New folder
        assert!(!create_output_directory(&output_dir, false).unwrap());
        // Existing empty folder
        assert!(!create_output_directory(&output_dir, false).unwrap());

        fs::write(output_dir.join("results_objective.csv"), "old").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(output_dir.read_dir().unwrap().next().is_none());
    }

    #[rstest]
    fn test_period_label(config: RunConfig) {
        assert_eq!(period_label(&config, 0), "2020-2025");
        assert_eq!(period_label(&config, 1), "2025-2030");
    }

    #[test]
    fn test_write_objective() {
        let dir = tempdir().unwrap();
        write_objective(dir.path(), Money(1234.5)).unwrap();

        let rows: Vec<ObjectiveRow> = csv::Reader::from_path(dir.path().join(OBJECTIVE_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            [ObjectiveRow {
                objective_value: Money(1234.5)
            }]
        );
    }

    #[test]
    fn test_write_load_adjustments() {
        let dir = tempdir().unwrap();
        write_load_adjustments(dir.path(), "test", &[]).unwrap();
        assert!(!load_adjustments_file_path(dir.path(), "test").exists());

        let adjustment = LoadAdjustment {
            node: "NodeA".into(),
            hour: 3,
            scenario: 1,
            period: 2,
            original: -4.5,
        };
        write_load_adjustments(dir.path(), "test", &[adjustment]).unwrap();
        let contents = fs::read_to_string(load_adjustments_file_path(dir.path(), "test")).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines, ["node\thour\tscenario\tperiod\toriginal", "NodeA\t3\t1\t2\t-4.5"]);
    }

    #[rstest]
    fn test_write_instance(model: Model) {
        let dir = tempdir().unwrap();
        let instance_dir = write_instance(dir.path(), &model).unwrap();
        let sets = read_sets(&instance_dir.join(TAB_DIR), false).unwrap();
        assert_eq!(sets, model.sets);
    }

    #[rstest]
    fn test_expected_annual(model: Model) {
        let params = crate::preparation::prepare(&model).unwrap().parameters;
        // A constant value of one over every hour gives the number of hours in a year
        let total = expected_annual(&params, &model.time_index, |_, _| 1.0);
        assert!((total - crate::time_index::HOURS_PER_YEAR).abs() < 1e-6);
    }
}
