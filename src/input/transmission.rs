//! Code for reading the `Transmission_*` tab files.
//!
//! Transmission parameters are given per pair of nodes in either orientation and stored under the
//! canonical orientation of the arc joining them.
use super::*;
use crate::id::LineTypeID;

const WORKBOOK: &str = "Transmission";

/// Transmission parameters as given in the input
#[derive(Debug, PartialEq, Default)]
pub struct TransmissionData {
    /// Initial capacity (MW) per arc and period
    pub initial_capacity: ParamMap<(Link, u32)>,
    /// Maximum capacity (MW) which may be built per arc and period
    pub max_built_capacity: ParamMap<(Link, u32)>,
    /// Maximum installed capacity (MW) per arc, before lifting to the initial capacity
    pub max_installed_capacity_raw: ParamMap<Link>,
    /// Line length (km)
    pub length: ParamMap<Link>,
    /// Capital cost (EUR/MW/km) per line type and period
    pub type_capital_cost: ParamMap<(LineTypeID, u32)>,
    /// Fixed O&M cost (EUR/MW/km/year) per line type and period
    pub type_fixed_om_cost: ParamMap<(LineTypeID, u32)>,
    /// Share of power arriving at the far end of the line
    pub line_efficiency: ParamMap<Link>,
    /// Lifetime in years
    pub lifetime: ParamMap<Link>,
}

const INITIAL_CAPACITY: [&str; 4] = ["FromNode", "ToNode", "Period", "transmissionInitialCapacity"];
const MAX_BUILT: [&str; 4] = ["FromNode", "ToNode", "Period", "transmissionMaxBuiltCapacity"];
const MAX_INSTALLED_RAW: [&str; 3] = ["FromNode", "ToNode", "transmissionMaxInstallCapacityRaw"];
const LENGTH: [&str; 3] = ["FromNode", "ToNode", "transmissionLength"];
const TYPE_CAPITAL_COST: [&str; 3] = ["Type", "Period", "transmissionTypeCapitalCost"];
const TYPE_FIXED_OM_COST: [&str; 3] = ["Type", "Period", "transmissionTypeFixedOMCost"];
const LINE_EFFICIENCY: [&str; 3] = ["FromNode", "ToNode", "lineEfficiency"];
const LIFETIME: [&str; 3] = ["FromNode", "ToNode", "transmissionLifetime"];

fn read_arc_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
) -> Result<ParamMap<(Link, u32)>> {
    read_param_table(
        tab_dir,
        WORKBOOK,
        sheet,
        columns,
        |(from, to, i, v): (String, String, u32, f64)| {
            let Some(arc) = ctx.arc(&from, &to)? else {
                return Ok(None);
            };
            Ok(Some(((arc, ctx.period(i)?), check_capacity_limit(columns[3], v)?)))
        },
    )
}

fn read_arc(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
    check: fn(&str, f64) -> Result<f64>,
) -> Result<ParamMap<Link>> {
    read_param_table(
        tab_dir,
        WORKBOOK,
        sheet,
        columns,
        |(from, to, v): (String, String, f64)| {
            let Some(arc) = ctx.arc(&from, &to)? else {
                return Ok(None);
            };
            Ok(Some((arc, check(columns[2], v)?)))
        },
    )
}

fn read_line_type_period(
    tab_dir: &Path,
    ctx: &InputContext,
    sheet: &str,
    columns: &[&str],
) -> Result<ParamMap<(LineTypeID, u32)>> {
    read_param_table(
        tab_dir,
        WORKBOOK,
        sheet,
        columns,
        |(line_type, i, v): (String, u32, f64)| {
            Ok(Some((
                (ctx.line_type(&line_type)?, ctx.period(i)?),
                check_non_negative(columns[2], v)?,
            )))
        },
    )
}

/// Read the transmission parameter tables
pub fn read_transmission_data(tab_dir: &Path, ctx: &InputContext) -> Result<TransmissionData> {
    Ok(TransmissionData {
        initial_capacity: read_arc_period(tab_dir, ctx, "InitialCapacity", &INITIAL_CAPACITY)?,
        max_built_capacity: read_arc_period(tab_dir, ctx, "MaxBuiltCapacity", &MAX_BUILT)?,
        max_installed_capacity_raw: read_arc(
            tab_dir,
            ctx,
            "MaxInstallCapacityRaw",
            &MAX_INSTALLED_RAW,
            check_capacity_limit,
        )?,
        length: read_arc(tab_dir, ctx, "Length", &LENGTH, check_non_negative)?,
        type_capital_cost: read_line_type_period(
            tab_dir,
            ctx,
            "TypeCapitalCost",
            &TYPE_CAPITAL_COST,
        )?,
        type_fixed_om_cost: read_line_type_period(
            tab_dir,
            ctx,
            "TypeFixedOMCost",
            &TYPE_FIXED_OM_COST,
        )?,
        line_efficiency: read_arc(
            tab_dir,
            ctx,
            "lineEfficiency",
            &LINE_EFFICIENCY,
            check_efficiency,
        )?,
        lifetime: read_arc(tab_dir, ctx, "Lifetime", &LIFETIME, check_lifetime)?,
    })
}

/// Write the transmission parameter tables
pub fn write_transmission_data(tab_dir: &Path, data: &TransmissionData) -> Result<()> {
    let path = |sheet: &str| tab_path(tab_dir, WORKBOOK, sheet);
    let by_arc_period = |map: &ParamMap<(Link, u32)>| {
        map.iter()
            .map(|(((from, to), i), v)| (from.clone(), to.clone(), *i, *v))
            .collect::<Vec<_>>()
    };
    let by_arc = |map: &ParamMap<Link>| {
        map.iter()
            .map(|((from, to), v)| (from.clone(), to.clone(), *v))
            .collect::<Vec<_>>()
    };

    write_tab(
        &path("InitialCapacity"),
        &INITIAL_CAPACITY,
        by_arc_period(&data.initial_capacity),
    )?;
    write_tab(
        &path("MaxBuiltCapacity"),
        &MAX_BUILT,
        by_arc_period(&data.max_built_capacity),
    )?;
    write_tab(
        &path("MaxInstallCapacityRaw"),
        &MAX_INSTALLED_RAW,
        by_arc(&data.max_installed_capacity_raw),
    )?;
    write_tab(&path("Length"), &LENGTH, by_arc(&data.length))?;
    write_tab(
        &path("TypeCapitalCost"),
        &TYPE_CAPITAL_COST,
        data.type_capital_cost.iter().map(|((t, i), v)| (t, i, v)),
    )?;
    write_tab(
        &path("TypeFixedOMCost"),
        &TYPE_FIXED_OM_COST,
        data.type_fixed_om_cost.iter().map(|((t, i), v)| (t, i, v)),
    )?;
    write_tab(
        &path("lineEfficiency"),
        &LINE_EFFICIENCY,
        by_arc(&data.line_efficiency),
    )?;
    write_tab(&path("Lifetime"), &LIFETIME, by_arc(&data.lifetime))?;

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

    fn write_empty_tables(tab_dir: &Path) {
        let tables: [(&str, &[&str]); 8] = [
            ("InitialCapacity", &INITIAL_CAPACITY),
            ("MaxBuiltCapacity", &MAX_BUILT),
            ("MaxInstallCapacityRaw", &MAX_INSTALLED_RAW),
            ("Length", &LENGTH),
            ("TypeCapitalCost", &TYPE_CAPITAL_COST),
            ("TypeFixedOMCost", &TYPE_FIXED_OM_COST),
            ("lineEfficiency", &LINE_EFFICIENCY),
            ("Lifetime", &LIFETIME),
        ];
        for (sheet, columns) in tables {
            write_tab(&tab_path(tab_dir, WORKBOOK, sheet), columns, Vec::<(f64,)>::new()).unwrap();
        }
    }

    #[rstest]
    fn test_reverse_orientation_is_canonicalised(input_context_parts: (Sets, TimeIndex)) {
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
            tab_path(dir.path(), WORKBOOK, "Length"),
            "FromNode\tToNode\ttransmissionLength\nNodeB\tNodeA\t300\n",
        )
        .unwrap();

        let data = read_transmission_data(dir.path(), &ctx).unwrap();
        assert_eq!(data.length[&("NodeA".into(), "NodeB".into())], 300.0);
    }

    #[rstest]
    fn test_both_orientations_is_duplicate(input_context_parts: (Sets, TimeIndex)) {
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
            tab_path(dir.path(), WORKBOOK, "lineEfficiency"),
            "FromNode\tToNode\tlineEfficiency\nNodeA\tNodeB\t0.95\nNodeB\tNodeA\t0.95\n",
        )
        .unwrap();
        assert!(read_transmission_data(dir.path(), &ctx).is_err());
    }

    #[rstest]
    fn test_unknown_link(input_context_parts: (Sets, TimeIndex)) {
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
            tab_path(dir.path(), WORKBOOK, "Length"),
            "FromNode\tToNode\ttransmissionLength\nNodeA\tNodeA\t300\n",
        )
        .unwrap();
        assert!(read_transmission_data(dir.path(), &ctx).is_err());
    }
}
