//! Integration tests for the `run` command.
use empire::cli::{RunOpts, handle_run_command};
use empire::settings::Settings;
use tempfile::tempdir;

mod demo;
use demo::{extract_demo, read_csv};

/// Emission caps of the demo model (Mt) in each period
const DEMO_CO2_CAPS: [f64; 3] = [250.0, 160.0, 90.0];

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("EMPIRE_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let model_dir = extract_demo(tempdir.path(), "model");

    // Save results to non-existent directory to check that directory creation works
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
    };
    handle_run_command(&model_dir, &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "results_objective.csv",
        "results_output_gen.csv",
        "results_output_stor.csv",
        "results_output_transmission.csv",
        "results_output_EuropeSummary.csv",
        "results_output_EuropeTotals.csv",
        "results_output_Operational.csv",
        "results_co2_price.csv",
        "sampling_key.csv",
        "metadata.toml",
        "IAMC/empire_iamc.csv",
    ] {
        assert!(output_dir.join(file_name).is_file(), "{file_name} missing");
    }

    let (_, rows) = read_csv(&output_dir.join("results_objective.csv"));
    let objective: f64 = rows[0][0].parse().unwrap();
    assert!(objective > 0.0);

    // Three periods, two scenarios and six seasons
    let (header, rows) = read_csv(&output_dir.join("sampling_key.csv"));
    assert_eq!(header, ["Period", "Scenario", "Season", "Year", "Hour"]);
    assert_eq!(rows.len(), 3 * 2 * 6);

    // The cap holds in every scenario, so it also holds in expectation
    let (header, rows) = read_csv(&output_dir.join("results_output_EuropeTotals.csv"));
    assert_eq!(header[1], "expected_co2_emissions_mt");
    assert_eq!(rows.len(), DEMO_CO2_CAPS.len());
    for (row, cap) in rows.iter().zip(DEMO_CO2_CAPS) {
        let emissions: f64 = row[1].parse().unwrap();
        assert!(emissions <= cap * (1.0 + 1e-6), "{emissions} exceeds {cap}");
        assert!(!row[4].is_empty(), "No CO2 price for {}", row[0]);
    }

    // Installed capacity never falls below zero or exceeds the installation limit
    let (header, rows) = read_csv(&output_dir.join("results_output_gen.csv"));
    assert_eq!(header[4], "installed_mw");
    assert_eq!(rows.len(), 7 * 3);
    for row in &rows {
        let installed: f64 = row[4].parse().unwrap();
        assert!(installed >= -1e-6);
        if row[0] == "Germany" && row[1] == "Coal" {
            assert!(installed <= 20000.0 * (1.0 + 1e-6));
        }
    }

    // Second time will fail because the logging is already initialised
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("results2")),
        overwrite: false,
    };
    assert_eq!(
        handle_run_command(&model_dir, &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
