//! Code for reading the `Generator_*` tab files.
use super::*;
use crate::id::{GeneratorID, NodeID, TechnologyID};

const WORKBOOK: &str = "Generator";

/// Generator parameters as given in the input
#[derive(Debug, PartialEq, Default)]
pub struct GeneratorData {
    /// Capital cost (EUR/kW) per generator and period
    pub capital_cost: ParamMap<(GeneratorID, u32)>,
    /// Fixed O&M cost (EUR/kW/year) per generator and period
    pub fixed_om_cost: ParamMap<(GeneratorID, u32)>,
    /// Variable O&M cost (EUR/MWh)
    pub variable_om_cost: ParamMap<GeneratorID>,
    /// Fuel cost (EUR/GJ) per generator and period
    pub fuel_cost: ParamMap<(GeneratorID, u32)>,
    /// Variable CO₂ transport and storage cost (EUR/tCO₂) per period
    pub ccs_ts_variable_cost: ParamMap<u32>,
    /// Electrical efficiency per generator and period
    pub efficiency: ParamMap<(GeneratorID, u32)>,
    /// Reference capacity (MW) of the existing fleet
    pub ref_initial_capacity: ParamMap<(NodeID, GeneratorID)>,
    /// Share of the reference fleet retired by each period
    pub scale_factor_initial_capacity: ParamMap<(GeneratorID, u32)>,
    /// Initial capacity (MW) per node, generator and period
    pub initial_capacity: ParamMap<(NodeID, GeneratorID, u32)>,
    /// Maximum capacity (MW) which may be built per node, technology and period
    pub max_built_capacity: ParamMap<(NodeID, TechnologyID, u32)>,
    /// Maximum installed capacity (MW) per node and technology
    pub max_installed_capacity: ParamMap<(NodeID, TechnologyID)>,
    /// Maximum ramp per hour as a share of installed capacity
    pub ramp_rate: ParamMap<GeneratorID>,
    /// Availability of generators without a stochastic profile
    pub type_availability: ParamMap<GeneratorID>,
    /// CO₂ content of the fuel (tCO₂/GJ)
    pub co2_content: ParamMap<GeneratorID>,
    /// Lifetime in years
    pub lifetime: ParamMap<GeneratorID>,
}

const CAPITAL_COST: [&str; 3] = ["Generator", "Period", "generatorCapitalCost"];
const FIXED_OM_COST: [&str; 3] = [
    "Generator",
    "Period",
    "generatorFixedOMCost|generatorCapitalCost",
];
const VARIABLE_OM_COST: [&str; 2] = ["Generator", "generatorVariableOMcosts"];
const FUEL_COST: [&str; 3] = ["Generator", "Period", "generatorTypeFuelCost"];
const CCS_TS_VARIABLE: [&str; 2] = ["Period", "CCS_TSCost"];
const EFFICIENCY: [&str; 3] = ["Generator", "Period", "generatorEfficiency"];
const REF_INITIAL_CAP: [&str; 3] = ["Node", "Generator", "generatorRefInitialCap"];
const SCALE_FACTOR: [&str; 3] = ["Generator", "Period", "generatorScaleFactorInitialCap"];
const INITIAL_CAPACITY: [&str; 4] = ["Node", "Generator", "Period", "generatorInitialCapacity"];
const MAX_BUILT: [&str; 4] = ["Node", "Technology", "Period", "generatorMaxBuildCapacity"];
const MAX_INSTALLED: [&str; 3] = ["Node", "Technology", "generatorMaxInstallCapacity"];
const RAMP_RATE: [&str; 2] = ["Generator", "RampRate"];
const AVAILABILITY: [&str; 2] = ["Generator", "generatorTypeAvailability"];
const CO2_CONTENT: [&str; 2] = ["Generator", "CO2Content"];
const LIFETIME: [&str; 2] = ["Generator", "generatorLifetime"];

/// Read a table keyed on generator and period
fn read_generator_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
    check: fn(&str, f64) -> Result<f64>,
) -> Result<ParamMap<(GeneratorID, u32)>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(g, i, v): (String, u32, f64)| {
        Ok(Some((
            (ctx.generator(&g)?, ctx.period(i)?),
            check(columns[2], v)?,
        )))
    })
}

/// Read a table keyed on generator only
fn read_generator(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
    check: fn(&str, f64) -> Result<f64>,
) -> Result<ParamMap<GeneratorID>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(g, v): (String, f64)| {
        Ok(Some((ctx.generator(&g)?, check(columns[1], v)?)))
    })
}

/// Read the generator parameter tables
pub fn read_generator_data(tab_dir: &Path, ctx: &InputContext) -> Result<GeneratorData> {
    let ccs_ts_variable_cost = read_param_table(
        tab_dir,
        WORKBOOK,
        "CCSCostTSVariable",
        &CCS_TS_VARIABLE,
        |(i, v): (u32, f64)| Ok(Some((ctx.period(i)?, check_non_negative(CCS_TS_VARIABLE[1], v)?))),
    )?;
    let ref_initial_capacity = read_param_table(
        tab_dir,
        WORKBOOK,
        "RefInitialCap",
        &REF_INITIAL_CAP,
        |(n, g, v): (String, String, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            Ok(Some((
                (node, ctx.generator(&g)?),
                check_non_negative(REF_INITIAL_CAP[2], v)?,
            )))
        },
    )?;
    let initial_capacity = read_param_table(
        tab_dir,
        WORKBOOK,
        "InitialCapacity",
        &INITIAL_CAPACITY,
        |(n, g, i, v): (String, String, u32, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            Ok(Some((
                (node, ctx.generator(&g)?, ctx.period(i)?),
                check_non_negative(INITIAL_CAPACITY[3], v)?,
            )))
        },
    )?;
    let max_built_capacity = read_param_table(
        tab_dir,
        WORKBOOK,
        "MaxBuiltCapacity",
        &MAX_BUILT,
        |(n, t, i, v): (String, String, u32, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            Ok(Some((
                (node, ctx.technology(&t)?, ctx.period(i)?),
                check_capacity_limit(MAX_BUILT[3], v)?,
            )))
        },
    )?;
    let max_installed_capacity = read_param_table(
        tab_dir,
        WORKBOOK,
        "MaxInstalledCapacity",
        &MAX_INSTALLED,
        |(n, t, v): (String, String, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            Ok(Some((
                (node, ctx.technology(&t)?),
                check_capacity_limit(MAX_INSTALLED[2], v)?,
            )))
        },
    )?;

    Ok(GeneratorData {
        capital_cost: read_generator_period(
            tab_dir,
            ctx,
            "CapitalCosts",
            &CAPITAL_COST,
            check_non_negative,
        )?,
        fixed_om_cost: read_generator_period(
            tab_dir,
            ctx,
            "FixedOMCosts",
            &FIXED_OM_COST,
            check_non_negative,
        )?,
        variable_om_cost: read_generator(
            tab_dir,
            ctx,
            "VariableOMCosts",
            &VARIABLE_OM_COST,
            check_non_negative,
        )?,
        fuel_cost: read_generator_period(tab_dir, ctx, "FuelCosts", &FUEL_COST, check_non_negative)?,
        ccs_ts_variable_cost,
        efficiency: read_generator_period(
            tab_dir,
            ctx,
            "Efficiency",
            &EFFICIENCY,
            check_efficiency,
        )?,
        ref_initial_capacity,
        scale_factor_initial_capacity: read_generator_period(
            tab_dir,
            ctx,
            "ScaleFactorInitialCap",
            &SCALE_FACTOR,
            check_proportion,
        )?,
        initial_capacity,
        max_built_capacity,
        max_installed_capacity,
        ramp_rate: read_generator(tab_dir, ctx, "RampRate", &RAMP_RATE, check_proportion)?,
        type_availability: read_generator(
            tab_dir,
            ctx,
            "GeneratorTypeAvailability",
            &AVAILABILITY,
            check_proportion,
        )?,
        co2_content: read_generator(tab_dir, ctx, "CO2Content", &CO2_CONTENT, check_non_negative)?,
        lifetime: read_generator(tab_dir, ctx, "Lifetime", &LIFETIME, check_lifetime)?,
    })
}

/// Write the generator parameter tables
pub fn write_generator_data(tab_dir: &Path, data: &GeneratorData) -> Result<()> {
    let path = |sheet: &str| tab_path(tab_dir, WORKBOOK, sheet);
    let by_generator_period = |map: &ParamMap<(GeneratorID, u32)>| {
        map.iter()
            .map(|((g, i), v)| (g.clone(), *i, *v))
            .collect::<Vec<_>>()
    };
    let by_generator = |map: &ParamMap<GeneratorID>| {
        map.iter().map(|(g, v)| (g.clone(), *v)).collect::<Vec<_>>()
    };

    write_tab(&path("CapitalCosts"), &CAPITAL_COST, by_generator_period(&data.capital_cost))?;
    write_tab(&path("FixedOMCosts"), &FIXED_OM_COST, by_generator_period(&data.fixed_om_cost))?;
    write_tab(
        &path("VariableOMCosts"),
        &VARIABLE_OM_COST,
        by_generator(&data.variable_om_cost),
    )?;
    write_tab(&path("FuelCosts"), &FUEL_COST, by_generator_period(&data.fuel_cost))?;
    write_tab(&path("CCSCostTSVariable"), &CCS_TS_VARIABLE, &data.ccs_ts_variable_cost)?;
    write_tab(&path("Efficiency"), &EFFICIENCY, by_generator_period(&data.efficiency))?;
    write_tab(
        &path("RefInitialCap"),
        &REF_INITIAL_CAP,
        data.ref_initial_capacity
            .iter()
            .map(|((n, g), v)| (n, g, v)),
    )?;
    write_tab(
        &path("ScaleFactorInitialCap"),
        &SCALE_FACTOR,
        by_generator_period(&data.scale_factor_initial_capacity),
    )?;
    write_tab(
        &path("InitialCapacity"),
        &INITIAL_CAPACITY,
        data.initial_capacity
            .iter()
            .map(|((n, g, i), v)| (n, g, i, v)),
    )?;
    write_tab(
        &path("MaxBuiltCapacity"),
        &MAX_BUILT,
        data.max_built_capacity
            .iter()
            .map(|((n, t, i), v)| (n, t, i, v)),
    )?;
    write_tab(
        &path("MaxInstalledCapacity"),
        &MAX_INSTALLED,
        data.max_installed_capacity
            .iter()
            .map(|((n, t), v)| (n, t, v)),
    )?;
    write_tab(&path("RampRate"), &RAMP_RATE, by_generator(&data.ramp_rate))?;
    write_tab(
        &path("GeneratorTypeAvailability"),
        &AVAILABILITY,
        by_generator(&data.type_availability),
    )?;
    write_tab(&path("CO2Content"), &CO2_CONTENT, by_generator(&data.co2_content))?;
    write_tab(&path("Lifetime"), &LIFETIME, by_generator(&data.lifetime))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, input_context_parts};
    use crate::model::sets::Sets;
    use crate::time_index::TimeIndex;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn write_empty_tables(tab_dir: &Path) {
        let tables: [(&str, &[&str]); 15] = [
            ("CapitalCosts", &CAPITAL_COST),
            ("FixedOMCosts", &FIXED_OM_COST),
            ("VariableOMCosts", &VARIABLE_OM_COST),
            ("FuelCosts", &FUEL_COST),
            ("CCSCostTSVariable", &CCS_TS_VARIABLE),
            ("Efficiency", &EFFICIENCY),
            ("RefInitialCap", &REF_INITIAL_CAP),
            ("ScaleFactorInitialCap", &SCALE_FACTOR),
            ("InitialCapacity", &INITIAL_CAPACITY),
            ("MaxBuiltCapacity", &MAX_BUILT),
            ("MaxInstalledCapacity", &MAX_INSTALLED),
            ("RampRate", &RAMP_RATE),
            ("GeneratorTypeAvailability", &AVAILABILITY),
            ("CO2Content", &CO2_CONTENT),
            ("Lifetime", &LIFETIME),
        ];
        for (sheet, columns) in tables {
            write_tab(&tab_path(tab_dir, WORKBOOK, sheet), columns, Vec::<(f64,)>::new()).unwrap();
        }
    }

    #[rstest]
    fn test_read_generator_data(input_context_parts: (Sets, TimeIndex)) {
        let (sets, time_index) = input_context_parts;
        let ctx = InputContext {
            sets: &sets,
            time_index: &time_index,
            num_periods: 2,
            num_scenarios: 1,
        };
        let dir = tempdir().unwrap();
        write_empty_tables(dir.path());
        fs::write(
            tab_path(dir.path(), WORKBOOK, "Efficiency"),
            "Generator\tPeriod\tgeneratorEfficiency\nGasCCGT\t1\t0.6\nGasCCGT\t2\t 0.62\n",
        )
        .unwrap();
        // Older datasets name the fixed O&M column after the capital cost
        fs::write(
            tab_path(dir.path(), WORKBOOK, "FixedOMCosts"),
            "Generator\tPeriod\tgeneratorCapitalCost\nGasCCGT\t1\t20\n",
        )
        .unwrap();

        let data = read_generator_data(dir.path(), &ctx).unwrap();
        assert_eq!(data.efficiency[&("GasCCGT".into(), 2)], 0.62);
        assert_eq!(data.fixed_om_cost[&("GasCCGT".into(), 1)], 20.0);
        assert!(data.capital_cost.is_empty());

        let out = tempdir().unwrap();
        write_generator_data(out.path(), &data).unwrap();
        assert_eq!(read_generator_data(out.path(), &ctx).unwrap(), data);
    }

    #[rstest]
    fn test_invalid_efficiency(input_context_parts: (Sets, TimeIndex)) {
        let (sets, time_index) = input_context_parts;
        let ctx = InputContext {
            sets: &sets,
            time_index: &time_index,
            num_periods: 2,
            num_scenarios: 1,
        };
        let dir = tempdir().unwrap();
        write_empty_tables(dir.path());
        let file_path = tab_path(dir.path(), WORKBOOK, "Efficiency");
        fs::write(
            &file_path,
            "Generator\tPeriod\tgeneratorEfficiency\nGasCCGT\t1\t1.5\n",
        )
        .unwrap();
        assert_error!(read_generator_data(dir.path(), &ctx), input_err_msg(&file_path));
    }

    #[rstest]
    fn test_period_out_of_range(input_context_parts: (Sets, TimeIndex)) {
        let (sets, time_index) = input_context_parts;
        let ctx = InputContext {
            sets: &sets,
            time_index: &time_index,
            num_periods: 2,
            num_scenarios: 1,
        };
        let dir = tempdir().unwrap();
        write_empty_tables(dir.path());
        fs::write(
            tab_path(dir.path(), WORKBOOK, "FuelCosts"),
            "Generator\tPeriod\tgeneratorTypeFuelCost\nGasCCGT\t3\t5\n",
        )
        .unwrap();
        assert!(read_generator_data(dir.path(), &ctx).is_err());
    }
}
