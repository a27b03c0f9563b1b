//! Fixtures for tests

use crate::input::InputData;
use crate::input::sets::RawSets;
use crate::model::Model;
use crate::model::config::RunConfig;
use crate::model::sets::Sets;
use crate::scenario::time_series::{Profile, ScenarioData, TimeSeries};
use crate::time_index::TimeIndex;
use chrono::{NaiveDate, TimeDelta};
use indexmap::IndexMap;
use rstest::fixture;
use std::f64::consts::PI;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
        .collect()
}

/// Two nodes joined by a line in both directions, with a gas plant at both and solar plus a
/// battery at the first
#[fixture]
pub fn raw_sets() -> RawSets {
    RawSets {
        nodes: strings(&["NodeA", "NodeB"]),
        offshore_nodes: Vec::new(),
        generators: strings(&["GasCCGT", "Solar"]),
        technologies: strings(&["Gas", "Solar"]),
        storages: strings(&["Li-Ion"]),
        line_types: strings(&["HVAC_OHL"]),
        directional_links: pairs(&[("NodeA", "NodeB"), ("NodeB", "NodeA")]),
        line_type_of_links: vec![
            ("NodeA".into(), "NodeB".into(), "HVAC_OHL".into()),
            ("NodeB".into(), "NodeA".into(), "HVAC_OHL".into()),
        ],
        generators_of_node: pairs(&[
            ("NodeA", "GasCCGT"),
            ("NodeA", "Solar"),
            ("NodeB", "GasCCGT"),
        ]),
        generators_of_technology: pairs(&[("Gas", "GasCCGT"), ("Solar", "Solar")]),
        storages_of_node: pairs(&[("NodeA", "Li-Ion")]),
        thermal_generators: strings(&["GasCCGT"]),
        hydro_generators: Vec::new(),
        reservoir_generators: Vec::new(),
        dependent_storages: strings(&["Li-Ion"]),
    }
}

#[fixture]
pub fn sets(raw_sets: RawSets) -> Sets {
    Sets::from_raw(raw_sets, false).unwrap()
}

/// Two regular seasons of a day each plus one peak day
#[fixture]
pub fn time_index() -> TimeIndex {
    TimeIndex::new(&strings(&["winter", "summer"]), 24, 1, 24).unwrap()
}

/// The owned parts from which an `InputContext` is built
#[fixture]
pub fn input_context_parts(sets: Sets, time_index: TimeIndex) -> (Sets, TimeIndex) {
    (sets, time_index)
}

/// Two periods and two scenarios over the time structure of [`time_index`]
#[fixture]
pub fn config() -> RunConfig {
    toml::from_str(
        r#"
        first_period_year = 2020
        forecast_horizon_year = 2025
        number_of_scenarios = 2
        regular_seasons = ["winter", "summer"]
        length_of_regular_season = 24
        n_peak_seasons = 1
        len_peak_season = 24
        "#,
    )
    .unwrap()
}

/// A model over [`sets`] with no parameter data, so every parameter takes its default
#[fixture]
pub fn model(config: RunConfig, sets: Sets, time_index: TimeIndex) -> Model {
    Model {
        model_dir: PathBuf::new(),
        config,
        time_index,
        sets,
        data: InputData::default(),
    }
}

/// Two years of hourly data for `NodeA` and `NodeB`.
///
/// Load follows a daily and an annual cycle. Both nodes share a system peak at hour 234 of each
/// year, while `NodeB` alone peaks higher at hour 5000. Solar follows the sun, and there is no
/// reservoir hydro.
#[fixture]
pub fn scenario_data(sets: Sets) -> ScenarioData {
    let start = NaiveDate::from_ymd_opt(2018, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let times: Vec<_> = (0..2 * 8760)
        .map(|h| start + TimeDelta::hours(h))
        .collect();

    let load = |node: usize| -> Vec<f64> {
        (0..times.len())
            .map(|row| {
                let offset = row % 8760;
                let day = (offset / 24) as f64;
                let hour = (offset % 24) as f64;
                match (node, offset) {
                    (_, 234) => 400.0,
                    (0, 5000) => 50.0,
                    (1, 5000) => 600.0,
                    _ => {
                        100.0 + 30.0 * (2.0 * PI * hour / 24.0).sin()
                            + 20.0 * (2.0 * PI * day / 365.0).cos()
                            + 5.0 * node as f64
                    }
                }
            })
            .collect()
    };
    let solar: Vec<f64> = times
        .iter()
        .enumerate()
        .map(|(row, _)| (PI * ((row % 24) as f64 - 6.0) / 12.0).sin().max(0.0))
        .collect();
    let constant = |value: f64| vec![value; times.len()];

    let two_nodes = |a: Vec<f64>, b: Vec<f64>| -> IndexMap<String, Vec<f64>> {
        [("NodeA".to_string(), a), ("NodeB".to_string(), b)]
            .into_iter()
            .collect()
    };
    let series: IndexMap<Profile, TimeSeries> = [
        (Profile::Solar, two_nodes(solar.clone(), solar)),
        (Profile::WindOnshore, two_nodes(constant(0.3), constant(0.4))),
        (Profile::WindOffshore, two_nodes(constant(0.5), constant(0.5))),
        (Profile::HydroRor, two_nodes(constant(0.6), constant(0.6))),
        (Profile::HydroSeasonal, IndexMap::new()),
        (Profile::ElectricLoad, two_nodes(load(0), load(1))),
    ]
    .into_iter()
    .map(|(profile, columns)| {
        (
            profile,
            TimeSeries {
                times: times.clone(),
                columns,
            },
        )
    })
    .collect();

    ScenarioData::new(series, &sets.nodes).unwrap()
}
