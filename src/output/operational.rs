//! The hourly operational record of every node.
use super::period_label;
use crate::input::scenario_label;
use crate::optimisation::Solution;
use crate::preparation::ParamTable;
use anyhow::Result;
use itertools::iproduct;
use std::path::Path;

/// The output file name for hourly operational results
pub const OPERATIONAL_FILE_NAME: &str = "results_output_Operational.csv";

/// kg per tonne, for reporting CO₂ intensity in kg/MWh
const KG_PER_TONNE: f64 = 1000.0;

/// The columns written before the per-generator dispatch columns
const KEY_COLUMNS: [&str; 6] = ["node", "period", "scenario", "season", "hour", "all_gen_mw"];

/// The columns written after the per-generator dispatch columns
const VALUE_COLUMNS: [&str; 12] = [
    "stor_charge_mw",
    "stor_discharge_mw",
    "stor_energy_level_mwh",
    "stor_losses_mw",
    "flow_out_mw",
    "flow_in_mw",
    "flow_in_losses_mw",
    "load_mw",
    "load_shed_mw",
    "price_eur_per_mwh",
    "avg_co2_kg_per_mwh",
    "co2_emissions_t",
];

/// The header of the operational file: one dispatch column per generator type
fn header(solution: &Solution) -> Vec<String> {
    let generators = solution.model().sets.generators.iter();
    KEY_COLUMNS
        .iter()
        .map(|col| col.to_string())
        .chain(generators.map(|generator| format!("{generator}_mw")))
        .chain(VALUE_COLUMNS.iter().map(|col| col.to_string()))
        .collect()
}

/// Gather the node prices into a table indexed like the load
fn price_table(solution: &Solution) -> ParamTable<4> {
    let mut prices = ParamTable::filled(solution.params().load.shape(), 0.0);
    for (index, price) in solution.iter_prices() {
        let (n, h, i, w) = index;
        prices[[n, h, i, w]] = price;
    }

    prices
}

/// Write one record per node, period, scenario and operational hour.
///
/// Storage losses include the energy lost while charging and discharging and through
/// self-discharge. Flows are measured at the sending end, so losses on incoming flows are
/// reported separately.
pub fn write_operational_results(output_dir: &Path, solution: &Solution) -> Result<()> {
    let model = solution.model();
    let sets = &model.sets;
    let params = solution.params();
    let vars = solution.variables();
    let dims = params.dims;
    let prices = price_table(solution);

    let mut writer = csv::Writer::from_path(output_dir.join(OPERATIONAL_FILE_NAME))?;
    writer.write_record(header(solution))?;

    for (n, i, w, h) in iproduct!(0..dims.nodes, 0..dims.periods, 0..dims.scenarios, 0..dims.hours)
    {
        let hour = h as u32 + 1;
        let season = model.time_index.season_of_hour(hour);

        let mut dispatch = vec![0.0; dims.generators];
        let mut emissions = 0.0;
        for &ng in sets.ng_of_node(n) {
            let g = sets.generator_of_ng(ng);
            let value = solution.value(&vars.gen_op, [ng, h, i, w]);
            dispatch[g] += value;
            emissions += params.gen_emission_intensity[[g, i]] * value;
        }
        let all_gen: f64 = dispatch.iter().sum();

        let (mut charge, mut discharge, mut level, mut stor_losses) = (0.0, 0.0, 0.0, 0.0);
        for &nb in sets.nb_of_node(n) {
            let b = sets.storage_of_nb(nb);
            let stor_charge = solution.value(&vars.stor_charge, [nb, h, i, w]);
            let stor_discharge = solution.value(&vars.stor_discharge, [nb, h, i, w]);
            let previous_level = if model.time_index.is_first_hour(hour) {
                params.stor_initial_level[b] * solution.value(&vars.stor_en_installed, [nb, i])
            } else {
                solution.value(&vars.stor_op, [nb, h - 1, i, w])
            };

            charge += stor_charge;
            discharge += stor_discharge;
            level += solution.value(&vars.stor_op, [nb, h, i, w]);
            stor_losses += (1.0 - params.stor_charge_efficiency[b]) * stor_charge
                + (1.0 - params.stor_discharge_efficiency[b]) * stor_discharge
                + (1.0 - params.stor_bleed_efficiency[b]) * previous_level;
        }

        let flow_out: f64 = sets
            .links_out_of(n)
            .iter()
            .map(|&l| solution.value(&vars.trans_op, [l, h, i, w]))
            .sum();
        let (mut flow_in, mut flow_in_losses) = (0.0, 0.0);
        for &l in sets.links_into(n) {
            let flow = solution.value(&vars.trans_op, [l, h, i, w]);
            flow_in += flow;
            flow_in_losses += (1.0 - params.line_efficiency[sets.arc_of_link(l)]) * flow;
        }

        let avg_co2 = if all_gen > 0.0 {
            emissions * KG_PER_TONNE / all_gen
        } else {
            0.0
        };

        let mut record = vec![
            sets.nodes[n].to_string(),
            period_label(&model.config, i),
            scenario_label(w as u32 + 1),
            season.id.to_string(),
            hour.to_string(),
            all_gen.to_string(),
        ];
        record.extend(dispatch.iter().map(ToString::to_string));
        record.extend(
            [
                charge,
                discharge,
                level,
                stor_losses,
                flow_out,
                flow_in,
                flow_in_losses,
                params.load[[n, h, i, w]],
                solution.value(&vars.load_shed, [n, h, i, w]),
                prices[[n, h, i, w]],
                avg_co2,
                emissions,
            ]
            .iter()
            .map(ToString::to_string),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::model::Model;
    use crate::optimisation::{PlanningProblem, SolverOptions};
    use crate::preparation::prepare;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_operational_results(model: Model) {
        let params = prepare(&model).unwrap().parameters;
        let solution = PlanningProblem::build(&model, &params)
            .solve(&SolverOptions::default())
            .unwrap();

        let dir = tempdir().unwrap();
        write_operational_results(dir.path(), &solution).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join(OPERATIONAL_FILE_NAME)).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[6], "GasCCGT_mw");
        assert_eq!(&headers[7], "Solar_mw");
        assert_eq!(headers.len(), KEY_COLUMNS.len() + 2 + VALUE_COLUMNS.len());

        let records: Vec<_> = reader.records().map(|record| record.unwrap()).collect();
        let dims = params.dims;
        assert_eq!(
            records.len(),
            dims.nodes * dims.periods * dims.scenarios * dims.hours
        );
        assert_eq!(&records[0][0], "NodeA");
        assert_eq!(&records[0][2], "scenario1");
        assert_eq!(&records[0][3], "winter");
        assert_eq!(&records[0][4], "1");
    }
}
