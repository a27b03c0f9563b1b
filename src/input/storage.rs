//! Code for reading the `Storage_*` tab files.
use super::*;
use crate::id::{NodeID, StorageID};

const WORKBOOK: &str = "Storage";

/// Storage parameters as given in the input
#[derive(Debug, PartialEq, Default)]
pub struct StorageData {
    /// Share of stored energy retained from one hour to the next
    pub bleed_efficiency: ParamMap<StorageID>,
    /// Charging efficiency
    pub charge_efficiency: ParamMap<StorageID>,
    /// Discharging efficiency
    pub discharge_efficiency: ParamMap<StorageID>,
    /// Ratio of power capacity to energy capacity for dependent storage
    pub power_to_energy: ParamMap<StorageID>,
    /// Energy level at the start and end of each season as a share of energy capacity
    pub initial_energy_level: ParamMap<StorageID>,
    /// Lifetime in years
    pub lifetime: ParamMap<StorageID>,
    /// Power capital cost (EUR/kW) per storage and period
    pub power_capital_cost: ParamMap<(StorageID, u32)>,
    /// Power fixed O&M cost (EUR/kW/year) per storage and period
    pub power_fixed_om_cost: ParamMap<(StorageID, u32)>,
    /// Energy capital cost (EUR/kWh) per storage and period
    pub energy_capital_cost: ParamMap<(StorageID, u32)>,
    /// Energy fixed O&M cost (EUR/kWh/year) per storage and period
    pub energy_fixed_om_cost: ParamMap<(StorageID, u32)>,
    /// Initial power capacity (MW)
    pub initial_power_capacity: ParamMap<(NodeID, StorageID, u32)>,
    /// Initial energy capacity (MWh)
    pub initial_energy_capacity: ParamMap<(NodeID, StorageID, u32)>,
    /// Maximum power capacity which may be built per period (MW)
    pub power_max_built_capacity: ParamMap<(NodeID, StorageID, u32)>,
    /// Maximum energy capacity which may be built per period (MWh)
    pub energy_max_built_capacity: ParamMap<(NodeID, StorageID, u32)>,
    /// Maximum installed power capacity (MW)
    pub power_max_installed_capacity: ParamMap<(NodeID, StorageID)>,
    /// Maximum installed energy capacity (MWh)
    pub energy_max_installed_capacity: ParamMap<(NodeID, StorageID)>,
}

const BLEED_EFFICIENCY: [&str; 2] = ["StorageTypes", "storageBleedEff"];
const CHARGE_EFFICIENCY: [&str; 2] = ["StorageTypes", "storageChargeEff"];
const DISCHARGE_EFFICIENCY: [&str; 2] = ["StorageTypes", "storageDischargeEff"];
const POWER_TO_ENERGY: [&str; 2] = ["StorageTypes", "storagePowToEnergy"];
const INITIAL_ENERGY_LEVEL: [&str; 2] = ["StorageTypes", "storageInitialEnergyLevel"];
const LIFETIME: [&str; 2] = ["StorageTypes", "storageLifetime"];
const POWER_CAPITAL_COST: [&str; 3] = ["StorageTypes", "Period", "storPWCapitalCost"];
const POWER_FIXED_OM_COST: [&str; 3] = ["StorageTypes", "Period", "storPWFixedOMCost"];
const ENERGY_CAPITAL_COST: [&str; 3] = ["StorageTypes", "Period", "storENCapitalCost"];
const ENERGY_FIXED_OM_COST: [&str; 3] = ["StorageTypes", "Period", "storENFixedOMCost"];
const INITIAL_POWER: [&str; 4] = ["Node", "StorageTypes", "Period", "storPWInitCap"];
const INITIAL_ENERGY: [&str; 4] = ["Node", "StorageTypes", "Period", "storENInitCap"];
const POWER_MAX_BUILT: [&str; 4] = ["Node", "StorageTypes", "Period", "storPWMaxBuiltCap"];
const ENERGY_MAX_BUILT: [&str; 4] = ["Node", "StorageTypes", "Period", "storENMaxBuiltCap"];
const POWER_MAX_INSTALLED: [&str; 3] = ["Node", "StorageTypes", "storPWMaxInstallCap"];
const ENERGY_MAX_INSTALLED: [&str; 3] = ["Node", "StorageTypes", "storENMaxInstallCap"];

fn read_storage(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
    check: fn(&str, f64) -> Result<f64>,
) -> Result<ParamMap<StorageID>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(b, v): (String, f64)| {
        Ok(Some((ctx.storage(&b)?, check(columns[1], v)?)))
    })
}

fn read_storage_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
) -> Result<ParamMap<(StorageID, u32)>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(b, i, v): (String, u32, f64)| {
        Ok(Some((
            (ctx.storage(&b)?, ctx.period(i)?),
            check_non_negative(columns[2], v)?,
        )))
    })
}

fn read_node_storage_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
) -> Result<ParamMap<(NodeID, StorageID, u32)>> {
    read_param_table(
        tab_dir,
        WORKBOOK,
        sheet,
        columns,
        |(n, b, i, v): (String, String, u32, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            Ok(Some((
                (node, ctx.storage(&b)?, ctx.period(i)?),
                check_capacity_limit(columns[3], v)?,
            )))
        },
    )
}

fn read_node_storage(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
) -> Result<ParamMap<(NodeID, StorageID)>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(n, b, v): (String, String, f64)| {
        let Some(node) = ctx.node_opt(&n)? else {
            return Ok(None);
        };
        Ok(Some((
            (node, ctx.storage(&b)?),
            check_capacity_limit(columns[2], v)?,
        )))
    })
}

/// Check that a power-to-energy ratio is positive
fn check_ratio(name: &str, value: f64) -> Result<f64> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be positive (found {value})"
    );
    Ok(value)
}

/// Read the storage parameter tables
pub fn read_storage_data(tab_dir: &Path, ctx: &InputContext) -> Result<StorageData> {
    Ok(StorageData {
        bleed_efficiency: read_storage(
            tab_dir,
            ctx,
            "StorageBleedEfficiency",
            &BLEED_EFFICIENCY,
            check_efficiency,
        )?,
        charge_efficiency: read_storage(
            tab_dir,
            ctx,
            "StorageChargeEff",
            &CHARGE_EFFICIENCY,
            check_efficiency,
        )?,
        discharge_efficiency: read_storage(
            tab_dir,
            ctx,
            "StorageDischargeEff",
            &DISCHARGE_EFFICIENCY,
            check_efficiency,
        )?,
        power_to_energy: read_storage(
            tab_dir,
            ctx,
            "StoragePowToEnergy",
            &POWER_TO_ENERGY,
            check_ratio,
        )?,
        initial_energy_level: read_storage(
            tab_dir,
            ctx,
            "StorageInitialEnergyLevel",
            &INITIAL_ENERGY_LEVEL,
            check_proportion,
        )?,
        lifetime: read_storage(tab_dir, ctx, "Lifetime", &LIFETIME, check_lifetime)?,
        power_capital_cost: read_storage_period(
            tab_dir,
            ctx,
            "PowerCapitalCost",
            &POWER_CAPITAL_COST,
        )?,
        power_fixed_om_cost: read_storage_period(
            tab_dir,
            ctx,
            "PowerFixedOMCost",
            &POWER_FIXED_OM_COST,
        )?,
        energy_capital_cost: read_storage_period(
            tab_dir,
            ctx,
            "EnergyCapitalCost",
            &ENERGY_CAPITAL_COST,
        )?,
        energy_fixed_om_cost: read_storage_period(
            tab_dir,
            ctx,
            "EnergyFixedOMCost",
            &ENERGY_FIXED_OM_COST,
        )?,
        initial_power_capacity: read_node_storage_period(
            tab_dir,
            ctx,
            "InitialPowerCapacity",
            &INITIAL_POWER,
        )?,
        initial_energy_capacity: read_node_storage_period(
            tab_dir,
            ctx,
            "EnergyInitialCapacity",
            &INITIAL_ENERGY,
        )?,
        power_max_built_capacity: read_node_storage_period(
            tab_dir,
            ctx,
            "PowerMaxBuiltCapacity",
            &POWER_MAX_BUILT,
        )?,
        energy_max_built_capacity: read_node_storage_period(
            tab_dir,
            ctx,
            "EnergyMaxBuiltCapacity",
            &ENERGY_MAX_BUILT,
        )?,
        power_max_installed_capacity: read_node_storage(
            tab_dir,
            ctx,
            "PowerMaxInstalledCapacity",
            &POWER_MAX_INSTALLED,
        )?,
        energy_max_installed_capacity: read_node_storage(
            tab_dir,
            ctx,
            "EnergyMaxInstalledCapacity",
            &ENERGY_MAX_INSTALLED,
        )?,
    })
}

/// Write the storage parameter tables
pub fn write_storage_data(tab_dir: &Path, data: &StorageData) -> Result<()> {
    let path = |sheet: &str| tab_path(tab_dir, WORKBOOK, sheet);
    let write_by_storage = |sheet: &str, columns: &[&str], map: &ParamMap<StorageID>| {
        write_tab(&path(sheet), columns, map.iter())
    };
    let write_by_storage_period =
        |sheet: &str, columns: &[&str], map: &ParamMap<(StorageID, u32)>| {
            write_tab(&path(sheet), columns, map.iter().map(|((b, i), v)| (b, i, v)))
        };
    let write_by_node_storage_period =
        |sheet: &str, columns: &[&str], map: &ParamMap<(NodeID, StorageID, u32)>| {
            write_tab(
                &path(sheet),
                columns,
                map.iter().map(|((n, b, i), v)| (n, b, i, v)),
            )
        };
    let write_by_node_storage =
        |sheet: &str, columns: &[&str], map: &ParamMap<(NodeID, StorageID)>| {
            write_tab(&path(sheet), columns, map.iter().map(|((n, b), v)| (n, b, v)))
        };

    write_by_storage(
        "StorageBleedEfficiency",
        &BLEED_EFFICIENCY,
        &data.bleed_efficiency,
    )?;
    write_by_storage("StorageChargeEff", &CHARGE_EFFICIENCY, &data.charge_efficiency)?;
    write_by_storage(
        "StorageDischargeEff",
        &DISCHARGE_EFFICIENCY,
        &data.discharge_efficiency,
    )?;
    write_by_storage("StoragePowToEnergy", &POWER_TO_ENERGY, &data.power_to_energy)?;
    write_by_storage(
        "StorageInitialEnergyLevel",
        &INITIAL_ENERGY_LEVEL,
        &data.initial_energy_level,
    )?;
    write_by_storage("Lifetime", &LIFETIME, &data.lifetime)?;
    write_by_storage_period(
        "PowerCapitalCost",
        &POWER_CAPITAL_COST,
        &data.power_capital_cost,
    )?;
    write_by_storage_period(
        "PowerFixedOMCost",
        &POWER_FIXED_OM_COST,
        &data.power_fixed_om_cost,
    )?;
    write_by_storage_period(
        "EnergyCapitalCost",
        &ENERGY_CAPITAL_COST,
        &data.energy_capital_cost,
    )?;
    write_by_storage_period(
        "EnergyFixedOMCost",
        &ENERGY_FIXED_OM_COST,
        &data.energy_fixed_om_cost,
    )?;
    write_by_node_storage_period(
        "InitialPowerCapacity",
        &INITIAL_POWER,
        &data.initial_power_capacity,
    )?;
    write_by_node_storage_period(
        "EnergyInitialCapacity",
        &INITIAL_ENERGY,
        &data.initial_energy_capacity,
    )?;
    write_by_node_storage_period(
        "PowerMaxBuiltCapacity",
        &POWER_MAX_BUILT,
        &data.power_max_built_capacity,
    )?;
    write_by_node_storage_period(
        "EnergyMaxBuiltCapacity",
        &ENERGY_MAX_BUILT,
        &data.energy_max_built_capacity,
    )?;
    write_by_node_storage(
        "PowerMaxInstalledCapacity",
        &POWER_MAX_INSTALLED,
        &data.power_max_installed_capacity,
    )?;
    write_by_node_storage(
        "EnergyMaxInstalledCapacity",
        &ENERGY_MAX_INSTALLED,
        &data.energy_max_installed_capacity,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, true)]
    #[case(0.25, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    fn test_check_ratio(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_ratio("storagePowToEnergy", value).is_ok(), expected_valid);
    }
}
