//! Code for reading the `Node_*` tab files.
use super::*;
use crate::id::NodeID;

const WORKBOOK: &str = "Node";

/// Node parameters as given in the input
#[derive(Debug, PartialEq, Default)]
pub struct NodeData {
    /// Value of lost load (EUR/MWh) per node and period
    pub lost_load_cost: ParamMap<(NodeID, u32)>,
    /// Annual electricity demand (MWh) per node and period, used to scale the load profiles
    pub annual_demand: ParamMap<(NodeID, u32)>,
    /// Maximum annual hydro production (MWh) per node
    pub hydro_max_annual_production: ParamMap<NodeID>,
}

const LOST_LOAD_COST: [&str; 3] = ["Node", "Period", "NodeLostLoadCost"];
const ANNUAL_DEMAND: [&str; 3] = ["Node", "Period", "ElectricAdjustment"];
const HYDRO_MAX_ANNUAL: [&str; 2] = ["Node", "maxHydroNode"];

fn read_node_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
) -> Result<ParamMap<(NodeID, u32)>> {
    read_param_table(tab_dir, WORKBOOK, sheet, columns, |(n, i, v): (String, u32, f64)| {
        let Some(node) = ctx.node_opt(&n)? else {
            return Ok(None);
        };
        Ok(Some((
            (node, ctx.period(i)?),
            check_non_negative(columns[2], v)?,
        )))
    })
}

/// Read the node parameter tables
pub fn read_node_data(tab_dir: &Path, ctx: &InputContext) -> Result<NodeData> {
    let hydro_max_annual_production = read_param_table(
        tab_dir,
        WORKBOOK,
        "HydroGenMaxAnnualProduction",
        &HYDRO_MAX_ANNUAL,
        |(n, v): (String, f64)| {
            let Some(node) = ctx.node_opt(&n)? else {
                return Ok(None);
            };
            Ok(Some((node, check_capacity_limit(HYDRO_MAX_ANNUAL[1], v)?)))
        },
    )?;

    Ok(NodeData {
        lost_load_cost: read_node_period(tab_dir, ctx, "NodeLostLoadCost", &LOST_LOAD_COST)?,
        annual_demand: read_node_period(tab_dir, ctx, "ElectricAnnualDemand", &ANNUAL_DEMAND)?,
        hydro_max_annual_production,
    })
}

/// Write the node parameter tables
pub fn write_node_data(tab_dir: &Path, data: &NodeData) -> Result<()> {
    let path = |sheet: &str| tab_path(tab_dir, WORKBOOK, sheet);
    write_tab(
        &path("NodeLostLoadCost"),
        &LOST_LOAD_COST,
        data.lost_load_cost.iter().map(|((n, i), v)| (n, i, v)),
    )?;
    write_tab(
        &path("ElectricAnnualDemand"),
        &ANNUAL_DEMAND,
        data.annual_demand.iter().map(|((n, i), v)| (n, i, v)),
    )?;
    write_tab(
        &path("HydroGenMaxAnnualProduction"),
        &HYDRO_MAX_ANNUAL,
        data.hydro_max_annual_production.iter(),
    )?;

    Ok(())
}
