//! Building the stochastic input tables from the windows of a sampling key.
use super::key::SamplingKey;
use super::time_series::{Profile, ScenarioData};
use crate::id::{GeneratorID, NodeID};
use crate::input::stochastic::StochasticData;
use crate::model::config::RunConfig;
use crate::model::sets::Sets;
use crate::time_index::TimeIndex;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use strum::IntoEnumIterator;

/// Values below this are written as zero
const SNAP_THRESHOLD: f64 = 0.001;

/// The undivided profile which is shared by the Norwegian price zones
const NORWAY: &str = "NO";

/// The number of Norwegian price zones
const NUM_NORWAY_ZONES: u32 = 5;

fn snap(value: f64) -> f64 {
    if value < SNAP_THRESHOLD { 0.0 } else { value }
}

/// The generators fed by each availability profile
pub fn profile_generators(config: &RunConfig) -> Result<IndexMap<Profile, Vec<GeneratorID>>> {
    let offshore: &[&str] = if config.north_sea {
        &["Windoffshoregrounded", "Windoffshorefloating"]
    } else {
        &["Windoffshore"]
    };
    let mut generators: IndexMap<Profile, Vec<GeneratorID>> = [
        (Profile::Solar, &["Solar"][..]),
        (Profile::WindOnshore, &["Windonshore"][..]),
        (Profile::WindOffshore, offshore),
        (Profile::HydroRor, &["Hydrorun-of-the-river"][..]),
    ]
    .into_iter()
    .map(|(profile, names)| (profile, names.iter().map(|name| (*name).into()).collect()))
    .collect();

    for (name, names) in &config.scenario_generation.profile_generators {
        let Some(profile) = Profile::iter().find(|profile| profile.name() == name) else {
            bail!("Unknown profile in profile_generators: {name}");
        };
        ensure!(
            profile.is_availability(),
            "The {name} profile does not give generator availability"
        );
        generators.insert(
            profile,
            names.iter().map(|name| name.as_str().into()).collect(),
        );
    }

    Ok(generators)
}

/// The nodes which take their values from a time series column.
///
/// The undivided Norwegian profile is shared by all price zones, except that offshore wind starts
/// at the second zone.
fn target_nodes(column: &str, profile: Profile) -> Vec<String> {
    if column != NORWAY {
        return vec![column.to_string()];
    }

    let first = if profile == Profile::WindOffshore { 2 } else { 1 };
    (first..=NUM_NORWAY_ZONES)
        .map(|zone| format!("{NORWAY}{zone}"))
        .collect()
}

/// Build the stochastic tables for the model from the windows of a sampling key
pub fn build_stochastic_data(
    key: &SamplingKey,
    data: &ScenarioData,
    sets: &Sets,
    time_index: &TimeIndex,
    config: &RunConfig,
) -> Result<StochasticData> {
    let generators = profile_generators(config)?;
    let mut tables = StochasticData::default();

    for ((period, scenario, season_id), window) in key.iter() {
        let season = time_index
            .get_season(season_id.as_str())
            .with_context(|| format!("Unknown season in sampling key: {season_id}"))?;
        let rows = data
            .year_rows(window.year)
            .with_context(|| format!("No time series data for year {}", window.year))?;
        let start = rows.start + window.hour as usize;
        ensure!(
            start + season.length as usize <= rows.end,
            "The window for season {season_id} starting at hour {} of {} extends beyond the year",
            window.hour,
            window.year
        );

        for (offset, hour) in season.hours().enumerate() {
            let row = start + offset;

            for (profile, profile_generators) in &generators {
                for (column, values) in &data.series(*profile).columns {
                    for node in target_nodes(column, *profile) {
                        let node: NodeID = node.into();
                        for generator in profile_generators {
                            if !sets
                                .generators_of_node
                                .contains(&(node.clone(), generator.clone()))
                            {
                                continue;
                            }
                            tables.availability.insert(
                                (node.clone(), generator.clone(), hour, *scenario, *period),
                                snap(values[row]).min(1.0),
                            );
                        }
                    }
                }
            }

            for (column, values) in &data.series(Profile::ElectricLoad).columns {
                if sets.nodes.contains(column.as_str()) {
                    tables.load_raw.insert(
                        (column.as_str().into(), hour, *scenario, *period),
                        snap(values[row]),
                    );
                }
            }

            for (column, values) in &data.series(Profile::HydroSeasonal).columns {
                if sets.nodes.contains(column.as_str()) {
                    tables.hydro_seasonal_raw.insert(
                        (
                            column.as_str().into(),
                            *period,
                            season.id.clone(),
                            hour,
                            *scenario,
                        ),
                        snap(values[row]),
                    );
                }
            }
        }
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{config, scenario_data, sets, time_index};
    use crate::scenario::window::Window;
    use rstest::rstest;

    #[test]
    fn test_target_nodes() {
        assert_eq!(target_nodes("Austria", Profile::Solar), ["Austria"]);
        assert_eq!(
            target_nodes("NO", Profile::Solar),
            ["NO1", "NO2", "NO3", "NO4", "NO5"]
        );
        assert_eq!(
            target_nodes("NO", Profile::WindOffshore),
            ["NO2", "NO3", "NO4", "NO5"]
        );
    }

    #[rstest]
    fn test_profile_generators(mut config: RunConfig) {
        let generators = profile_generators(&config).unwrap();
        assert_eq!(
            generators[&Profile::WindOffshore],
            [GeneratorID::from("Windoffshore")]
        );

        config.north_sea = true;
        config
            .scenario_generation
            .profile_generators
            .insert("solar".into(), vec!["SolarPV".into(), "SolarRoof".into()]);
        let generators = profile_generators(&config).unwrap();
        assert_eq!(generators[&Profile::WindOffshore].len(), 2);
        assert_eq!(
            generators[&Profile::Solar],
            [GeneratorID::from("SolarPV"), GeneratorID::from("SolarRoof")]
        );

        config
            .scenario_generation
            .profile_generators
            .insert("electricload".into(), vec![]);
        assert!(profile_generators(&config).is_err());
    }

    #[rstest]
    fn test_build_stochastic_data(
        scenario_data: ScenarioData,
        sets: Sets,
        time_index: TimeIndex,
        config: RunConfig,
    ) {
        let mut key = SamplingKey::default();
        key.insert(1, 2, "winter".into(), Window { year: 2019, hour: 0 });
        let tables = build_stochastic_data(&key, &scenario_data, &sets, &time_index, &config).unwrap();

        // Only NodeA has solar, and there is no hydro
        assert_eq!(tables.availability.len(), 24);
        assert!(
            tables
                .availability
                .keys()
                .all(|(node, generator, _, w, i)| node.as_str() == "NodeA"
                    && generator.as_str() == "Solar"
                    && *w == 2
                    && *i == 1)
        );
        // Night-time solar snaps to zero
        assert_eq!(
            tables.availability[&(NodeID::from("NodeA"), GeneratorID::from("Solar"), 1, 2, 1)],
            0.0
        );
        assert_eq!(tables.load_raw.len(), 2 * 24);
        let load = scenario_data.series(Profile::ElectricLoad).column("NodeB").unwrap();
        assert_eq!(tables.load_raw[&(NodeID::from("NodeB"), 5, 2, 1)], load[8760 + 4]);
    }

    #[rstest]
    fn test_window_beyond_year(
        scenario_data: ScenarioData,
        sets: Sets,
        time_index: TimeIndex,
        config: RunConfig,
    ) {
        let mut key = SamplingKey::default();
        key.insert(1, 1, "summer".into(), Window { year: 2019, hour: 8750 });
        assert!(build_stochastic_data(&key, &scenario_data, &sets, &time_index, &config).is_err());
    }
}
