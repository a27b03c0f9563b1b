//! Code for reading the `General_*` tab files.
use super::*;
use crate::id::SeasonID;

const WORKBOOK: &str = "General";

/// System-wide parameters
#[derive(Debug, PartialEq, Default)]
pub struct GeneralData {
    /// Hours of the year represented by each hour of a season. Defaults are derived from the time
    /// structure when absent.
    pub season_scale: Option<ParamMap<SeasonID>>,
    /// CO₂ cap (Mt) per period
    pub co2_cap: ParamMap<u32>,
    /// CO₂ price (EUR/t) per period
    pub co2_price: ParamMap<u32>,
    /// Fixed CO₂ transport and storage cost (EUR/tCO₂)
    pub ccs_ts_fixed_cost: f64,
    /// Share of CO₂ removed by CCS generators
    pub ccs_removal_fraction: f64,
    /// Scenario probabilities. Equiprobable when absent.
    pub scenario_probability: Option<ParamMap<u32>>,
}

const SEASON_SCALE: [&str; 2] = ["Season", "seasScale"];
const CO2_CAP: [&str; 2] = ["Period", "CO2Cap"];
const CO2_PRICE: [&str; 2] = ["Period", "CO2Price"];
const CCS_TS_FIX: &str = "CCS_TSFix";
const CCS_REM_FRAC: &str = "CCS_remFrac";
const SCENARIO_PROBABILITY: [&str; 2] = ["Scenario", "scenarioProbability"];

/// Tolerance for scenario probabilities summing to one
const PROBABILITY_TOLERANCE: f64 = 1e-9;

fn read_by_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
    check: fn(&str, f64) -> Result<f64>,
) -> Result<ParamMap<u32>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(i, v): (u32, f64)| {
        Ok(Some((ctx.period(i)?, check(columns[1], v)?)))
    })
}

/// Check that scenario probabilities are given for every scenario and sum to one
fn check_scenario_probabilities(probabilities: &ParamMap<u32>, num_scenarios: u32) -> Result<()> {
    ensure!(
        probabilities.len() == num_scenarios as usize,
        "Probabilities must be given for all {num_scenarios} scenarios"
    );
    let total: f64 = probabilities.values().sum();
    ensure!(
        (total - 1.0).abs() <= PROBABILITY_TOLERANCE,
        "Scenario probabilities must sum to one (sum is {total})"
    );

    Ok(())
}

/// Read the general parameter tables
pub fn read_general_data(tab_dir: &Path, ctx: &InputContext) -> Result<GeneralData> {
    let season_scale = read_param_table_optional(
        tab_dir,
        WORKBOOK,
        "seasonScale",
        &SEASON_SCALE,
        |(s, v): (String, f64)| Ok(Some((ctx.season(&s)?, check_non_negative(SEASON_SCALE[1], v)?))),
    )?;
    if let Some(scale) = &season_scale {
        for season in ctx.time_index.iter_seasons() {
            ensure!(
                scale.contains_key(&season.id),
                "{}: no scale given for season {}",
                input_err_msg(tab_path(tab_dir, WORKBOOK, "seasonScale")),
                season.id
            );
        }
    }

    let scenario_probability = read_param_table_optional(
        tab_dir,
        WORKBOOK,
        "ScenarioProbability",
        &SCENARIO_PROBABILITY,
        |(w, v): (String, f64)| {
            Ok(Some((ctx.scenario(&w)?, check_proportion(SCENARIO_PROBABILITY[1], v)?)))
        },
    )?;
    if let Some(probabilities) = &scenario_probability {
        check_scenario_probabilities(probabilities, ctx.num_scenarios).with_context(|| {
            input_err_msg(tab_path(tab_dir, WORKBOOK, "ScenarioProbability"))
        })?;
    }

    Ok(GeneralData {
        season_scale,
        co2_cap: read_by_period(tab_dir, ctx, "CO2Cap", &CO2_CAP, check_capacity_limit)?,
        co2_price: read_by_period(tab_dir, ctx, "CO2Price", &CO2_PRICE, check_non_negative)?,
        ccs_ts_fixed_cost: read_single_value(tab_dir, WORKBOOK, "CCSCostTSFix", CCS_TS_FIX)?,
        ccs_removal_fraction: check_proportion(
            CCS_REM_FRAC,
            read_single_value(tab_dir, WORKBOOK, "CCSRemFrac", CCS_REM_FRAC)?,
        )?,
        scenario_probability,
    })
}

/// Write the general parameter tables
pub fn write_general_data(tab_dir: &Path, data: &GeneralData) -> Result<()> {
    let path = |sheet: &str| tab_path(tab_dir, WORKBOOK, sheet);
    if let Some(scale) = &data.season_scale {
        write_tab(&path("seasonScale"), &SEASON_SCALE, scale.iter())?;
    }
    write_tab(&path("CO2Cap"), &CO2_CAP, data.co2_cap.iter())?;
    write_tab(&path("CO2Price"), &CO2_PRICE, data.co2_price.iter())?;
    write_tab(&path("CCSCostTSFix"), &[CCS_TS_FIX], [(data.ccs_ts_fixed_cost,)])?;
    write_tab(&path("CCSRemFrac"), &[CCS_REM_FRAC], [(data.ccs_removal_fraction,)])?;
    if let Some(probabilities) = &data.scenario_probability {
        write_tab(
            &path("ScenarioProbability"),
            &SCENARIO_PROBABILITY,
            probabilities.iter().map(|(w, p)| (scenario_label(*w), p)),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_macro::hash_map;
    use rstest::rstest;

    #[rstest]
    #[case(hash_map! {1 => 0.5, 2 => 0.5}, true)]
    #[case(hash_map! {1 => 0.3, 2 => 0.3}, false)]
    #[case(hash_map! {1 => 1.0}, false)] // Missing scenario
    fn test_check_scenario_probabilities(
        #[case] probabilities: std::collections::HashMap<u32, f64>,
        #[case] expected_valid: bool,
    ) {
        let probabilities: ParamMap<u32> = probabilities.into_iter().collect();
        assert_eq!(
            check_scenario_probabilities(&probabilities, 2).is_ok(),
            expected_valid
        );
    }
}
