//! Code for reading the `Stochastic_*` tab files.
//!
//! These tables hold the scenario-dependent time series and are usually written by the scenario
//! generator (see [`crate::scenario`]).
use super::*;
use crate::id::{GeneratorID, NodeID, SeasonID};

/// The workbook name for scenario-dependent tables
pub const WORKBOOK: &str = "Stochastic";

/// Sheet holding generator availability profiles
pub const AVAILABILITY_SHEET: &str = "StochasticAvailability";
/// Sheet holding raw electric load
pub const LOAD_SHEET: &str = "ElectricLoadRaw";
/// Sheet holding reservoir hydro inflow
pub const HYDRO_SHEET: &str = "HydroGenMaxSeasonalProduction";

/// Header of the availability table
pub const AVAILABILITY_COLUMNS: [&str; 6] = [
    "Node",
    "IntermitentGenerators",
    "Operationalhour",
    "Scenario",
    "Period",
    "GeneratorStochasticAvailabilityRaw",
];
/// Header of the load table
pub const LOAD_COLUMNS: [&str; 5] = [
    "Node",
    "Operationalhour",
    "Scenario",
    "Period",
    "ElectricLoadRaw_in_MW",
];
/// Header of the hydro inflow table
pub const HYDRO_COLUMNS: [&str; 6] = [
    "Node",
    "Period",
    "Season",
    "Operationalhour",
    "Scenario",
    "HydroGenMaxSeasonalProduction",
];

/// Key of an availability value: node, generator, hour, scenario, period
pub type AvailabilityKey = (NodeID, GeneratorID, u32, u32, u32);
/// Key of a load value: node, hour, scenario, period
pub type LoadKey = (NodeID, u32, u32, u32);
/// Key of a hydro inflow value: node, period, season, hour, scenario
pub type HydroKey = (NodeID, u32, SeasonID, u32, u32);

/// Scenario-dependent parameters
#[derive(Debug, PartialEq, Default)]
pub struct StochasticData {
    /// Hourly availability of variable generators
    pub availability: ParamMap<AvailabilityKey>,
    /// Hourly load (MW) before scaling to annual demand
    pub load_raw: ParamMap<LoadKey>,
    /// Hourly reservoir inflow (MWh)
    pub hydro_seasonal_raw: ParamMap<HydroKey>,
}

/// Read the scenario-dependent tables
pub fn read_stochastic_data(tab_dir: &Path, ctx: &InputContext) -> Result<StochasticData> {
    let availability = read_param_table(
        tab_dir,
        WORKBOOK,
        AVAILABILITY_SHEET,
        &AVAILABILITY_COLUMNS,
        |(n, g, h, w, i, v): (String, String, u32, String, u32, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            let key = (
                node,
                ctx.generator(&g)?,
                ctx.hour(h)?,
                ctx.scenario(&w)?,
                ctx.period(i)?,
            );
            Ok(Some((key, check_proportion(AVAILABILITY_COLUMNS[5], v)?)))
        },
    )?;
    let load_raw = read_param_table(
        tab_dir,
        WORKBOOK,
        LOAD_SHEET,
        &LOAD_COLUMNS,
        |(n, h, w, i, v): (String, u32, String, u32, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            ensure!(v.is_finite(), "Load must be finite");
            let key = (node, ctx.hour(h)?, ctx.scenario(&w)?, ctx.period(i)?);
            Ok(Some((key, v)))
        },
    )?;
    let hydro_seasonal_raw = read_param_table(
        tab_dir,
        WORKBOOK,
        HYDRO_SHEET,
        &HYDRO_COLUMNS,
        |(n, i, s, h, w, v): (String, u32, String, u32, String, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            let season = ctx.season(&s)?;
            let hour = ctx.hour(h)?;
            ensure!(
                ctx.time_index.season_of_hour(hour).id == season,
                "Hour {hour} is not in season {season}"
            );
            let key = (node, ctx.period(i)?, season, hour, ctx.scenario(&w)?);
            Ok(Some((key, check_non_negative(HYDRO_COLUMNS[5], v)?)))
        },
    )?;

    Ok(StochasticData {
        availability,
        load_raw,
        hydro_seasonal_raw,
    })
}

/// Write the scenario-dependent tables
pub fn write_stochastic_data(tab_dir: &Path, data: &StochasticData) -> Result<()> {
    write_tab(
        &tab_path(tab_dir, WORKBOOK, AVAILABILITY_SHEET),
        &AVAILABILITY_COLUMNS,
        data.availability
            .iter()
            .map(|((n, g, h, w, i), v)| (n, g, h, scenario_label(*w), i, v)),
    )?;
    write_tab(
        &tab_path(tab_dir, WORKBOOK, LOAD_SHEET),
        &LOAD_COLUMNS,
        data.load_raw
            .iter()
            .map(|((n, h, w, i), v)| (n, h, scenario_label(*w), i, v)),
    )?;
    write_tab(
        &tab_path(tab_dir, WORKBOOK, HYDRO_SHEET),
        &HYDRO_COLUMNS,
        data.hydro_seasonal_raw
            .iter()
            .map(|((n, i, s, h, w), v)| (n, i, s, h, scenario_label(*w), v)),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::input_context_parts;
    use crate::model::sets::Sets;
    use crate::time_index::TimeIndex;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn write_tables(tab_dir: &Path, availability: &str, load: &str, hydro: &str) {
        let header = |columns: &[&str]| columns.join("\t");
        fs::write(
            tab_path(tab_dir, WORKBOOK, AVAILABILITY_SHEET),
            format!("{}\n{availability}", header(&AVAILABILITY_COLUMNS)),
        )
        .unwrap();
        fs::write(
            tab_path(tab_dir, WORKBOOK, LOAD_SHEET),
            format!("{}\n{load}", header(&LOAD_COLUMNS)),
        )
        .unwrap();
        fs::write(
            tab_path(tab_dir, WORKBOOK, HYDRO_SHEET),
            format!("{}\n{hydro}", header(&HYDRO_COLUMNS)),
        )
        .unwrap();
    }

    #[rstest]
    fn test_read_stochastic_data(input_context_parts: (Sets, TimeIndex)) {
        let (sets, time_index) = input_context_parts;
        let ctx = InputContext {
            sets: &sets,
            time_index: &time_index,
            num_periods: 2,
            num_scenarios: 2,
        };
        let dir = tempdir().unwrap();
        write_tables(
            dir.path(),
            "NodeA\tSolar\t1\tscenario2\t1\t0.25\n",
            "NodeA\t1\tscenario1\t1\t1000\nNodeB\t2\tscenario1\t2\t900.5\n",
            "",
        );

        let data = read_stochastic_data(dir.path(), &ctx).unwrap();
        assert_eq!(data.availability[&("NodeA".into(), "Solar".into(), 1, 2, 1)], 0.25);
        assert_eq!(data.load_raw[&("NodeB".into(), 2, 1, 2)], 900.5);
        assert!(data.hydro_seasonal_raw.is_empty());

        let out = tempdir().unwrap();
        write_stochastic_data(out.path(), &data).unwrap();
        assert_eq!(read_stochastic_data(out.path(), &ctx).unwrap(), data);
    }

    #[rstest]
    #[case("NodeA\tSolar\t1\tscenario3\t1\t0.25\n")] // Unknown scenario
    #[case("NodeA\tSolar\t1\tscenario1\t1\t1.25\n")] // Availability above one
    #[case("NodeA\tSolar\t9999\tscenario1\t1\t0.5\n")] // Hour out of range
    fn test_invalid_availability(
        input_context_parts: (Sets, TimeIndex),
        #[case] availability: &str,
    ) {
        let (sets, time_index) = input_context_parts;
        let ctx = InputContext {
            sets: &sets,
            time_index: &time_index,
            num_periods: 2,
            num_scenarios: 2,
        };
        let dir = tempdir().unwrap();
        write_tables(dir.path(), availability, "", "");
        assert!(read_stochastic_data(dir.path(), &ctx).is_err());
    }

    #[rstest]
    fn test_hydro_hour_outside_season(input_context_parts: (Sets, TimeIndex)) {
        let (sets, time_index) = input_context_parts;
        let ctx = InputContext {
            sets: &sets,
            time_index: &time_index,
            num_periods: 2,
            num_scenarios: 2,
        };
        let dir = tempdir().unwrap();
        // Hour 1 is in winter
        write_tables(dir.path(), "", "", "NodeA\t1\tsummer\t1\tscenario1\t10\n");
        assert!(read_stochastic_data(dir.path(), &ctx).is_err());
    }
}
