//! Per-asset result tables and system-wide summaries.
use super::{MWH_PER_GWH, expected_annual, period_label};
use crate::id::{GeneratorID, NodeID, StorageID};
use crate::input::scenario_label;
use crate::optimisation::Solution;
use crate::time_index::HOURS_PER_YEAR;
use anyhow::Result;
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The output file name for generator results
pub const GENERATOR_FILE_NAME: &str = "results_output_gen.csv";

/// The output file name for storage results
pub const STORAGE_FILE_NAME: &str = "results_output_stor.csv";

/// The output file name for transmission results
pub const TRANSMISSION_FILE_NAME: &str = "results_output_transmission.csv";

/// The output file name for the per-generator European summary
pub const EUROPE_SUMMARY_FILE_NAME: &str = "results_output_EuropeSummary.csv";

/// The output file name for European totals per period
pub const EUROPE_TOTALS_FILE_NAME: &str = "results_output_EuropeTotals.csv";

/// The output file name for CO₂ prices
pub const CO2_PRICE_FILE_NAME: &str = "results_co2_price.csv";

/// Tonnes per megatonne
const TONNES_PER_MEGATONNE: f64 = 1e6;

/// Represents a row in the generator results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct GeneratorRow {
    node: NodeID,
    generator: GeneratorID,
    period: String,
    invested_mw: f64,
    installed_mw: f64,
    expected_capacity_factor: f64,
    discounted_investment_cost_eur: f64,
    expected_annual_production_gwh: f64,
}

/// Represents a row in the storage results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct StorageRow {
    node: NodeID,
    storage: StorageID,
    period: String,
    power_invested_mw: f64,
    power_installed_mw: f64,
    energy_invested_mwh: f64,
    energy_installed_mwh: f64,
    discounted_investment_cost_eur: f64,
    expected_annual_discharge_gwh: f64,
    expected_annual_losses_gwh: f64,
}

/// Represents a row in the transmission results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct TransmissionRow {
    between_node: NodeID,
    and_node: NodeID,
    period: String,
    invested_mw: f64,
    installed_mw: f64,
    discounted_investment_cost_eur: f64,
    expected_annual_volume_gwh: f64,
    expected_annual_losses_gwh: f64,
}

/// Represents a row in the European summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EuropeSummaryRow {
    period: String,
    generator: GeneratorID,
    invested_mw: f64,
    installed_mw: f64,
    expected_annual_production_gwh: f64,
}

/// Represents a row in the European totals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EuropeTotalsRow {
    period: String,
    expected_co2_emissions_mt: f64,
    average_price_eur_per_mwh: f64,
    expected_load_shed_gwh: f64,
    expected_co2_price_eur_per_t: Option<f64>,
}

/// Represents a row in the CO₂ price CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Co2PriceRow {
    period: String,
    scenario: String,
    co2_price_eur_per_t: f64,
}

/// The expected annual production (MWh) of a node-generator pair in period `i`
pub fn expected_production(solution: &Solution, ng: usize, i: usize) -> f64 {
    let vars = solution.variables();
    expected_annual(solution.params(), &solution.model().time_index, |h, w| {
        solution.value(&vars.gen_op, [ng, h, i, w])
    })
}

/// The expected annual CO₂ emissions (t) of the whole system in period `i`
pub fn expected_emissions(solution: &Solution, i: usize) -> f64 {
    let sets = &solution.model().sets;
    let params = solution.params();
    (0..params.dims.node_generators)
        .map(|ng| {
            let intensity = params.gen_emission_intensity[[sets.generator_of_ng(ng), i]];
            if intensity == 0.0 {
                0.0
            } else {
                intensity * expected_production(solution, ng, i)
            }
        })
        .sum()
}

/// Build the rows of the generator results file
pub fn generator_rows(solution: &Solution) -> Vec<GeneratorRow> {
    let model = solution.model();
    let params = solution.params();
    let vars = solution.variables();

    iproduct!(0..params.dims.node_generators, 0..params.dims.periods)
        .map(|(ng, i)| {
            let (node, generator) = &model.sets.generators_of_node[ng];
            let g = model.sets.generator_of_ng(ng);
            let invested = solution.value(&vars.gen_inv, [ng, i]);
            let installed = solution.value(&vars.gen_installed, [ng, i]);
            let production = expected_production(solution, ng, i);
            let capacity_factor = if installed > 0.0 {
                production / (installed * HOURS_PER_YEAR)
            } else {
                0.0
            };

            GeneratorRow {
                node: node.clone(),
                generator: generator.clone(),
                period: period_label(&model.config, i),
                invested_mw: invested,
                installed_mw: installed,
                expected_capacity_factor: capacity_factor,
                discounted_investment_cost_eur: params.discount_multiplier[i]
                    * params.gen_inv_cost[[g, i]]
                    * invested,
                expected_annual_production_gwh: production / MWH_PER_GWH,
            }
        })
        .collect()
}

/// Write generator results to file
pub fn write_generator_results(output_dir: &Path, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(GENERATOR_FILE_NAME))?;
    for row in generator_rows(solution) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Build the rows of the storage results file.
///
/// Losses count the energy lost while charging and discharging.
pub fn storage_rows(solution: &Solution) -> Vec<StorageRow> {
    let model = solution.model();
    let params = solution.params();
    let vars = solution.variables();

    iproduct!(0..params.dims.node_storages, 0..params.dims.periods)
        .map(|(nb, i)| {
            let (node, storage) = &model.sets.storages_of_node[nb];
            let b = model.sets.storage_of_nb(nb);
            let power_invested = solution.value(&vars.stor_pw_inv, [nb, i]);
            let energy_invested = solution.value(&vars.stor_en_inv, [nb, i]);
            let discharge = expected_annual(params, &model.time_index, |h, w| {
                solution.value(&vars.stor_discharge, [nb, h, i, w])
            });
            let losses = expected_annual(params, &model.time_index, |h, w| {
                (1.0 - params.stor_charge_efficiency[b])
                    * solution.value(&vars.stor_charge, [nb, h, i, w])
                    + (1.0 - params.stor_discharge_efficiency[b])
                        * solution.value(&vars.stor_discharge, [nb, h, i, w])
            });

            StorageRow {
                node: node.clone(),
                storage: storage.clone(),
                period: period_label(&model.config, i),
                power_invested_mw: power_invested,
                power_installed_mw: solution.value(&vars.stor_pw_installed, [nb, i]),
                energy_invested_mwh: energy_invested,
                energy_installed_mwh: solution.value(&vars.stor_en_installed, [nb, i]),
                discounted_investment_cost_eur: params.discount_multiplier[i]
                    * (params.stor_pw_inv_cost[[b, i]] * power_invested
                        + params.stor_en_inv_cost[[b, i]] * energy_invested),
                expected_annual_discharge_gwh: discharge / MWH_PER_GWH,
                expected_annual_losses_gwh: losses / MWH_PER_GWH,
            }
        })
        .collect()
}

/// Write storage results to file
pub fn write_storage_results(output_dir: &Path, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(STORAGE_FILE_NAME))?;
    for row in storage_rows(solution) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Build the rows of the transmission results file.
///
/// Volumes and losses are summed over both directions of each arc.
pub fn transmission_rows(solution: &Solution) -> Vec<TransmissionRow> {
    let model = solution.model();
    let sets = &model.sets;
    let params = solution.params();
    let vars = solution.variables();

    iproduct!(0..params.dims.arcs, 0..params.dims.periods)
        .map(|(a, i)| {
            let (between, and) = &sets.arcs[a];
            let links: Vec<_> = (0..sets.directional_links.len())
                .filter(|&l| sets.arc_of_link(l) == a)
                .collect();
            let volume = expected_annual(params, &model.time_index, |h, w| {
                links
                    .iter()
                    .map(|&l| solution.value(&vars.trans_op, [l, h, i, w]))
                    .sum()
            });
            let invested = solution.value(&vars.trans_inv, [a, i]);

            TransmissionRow {
                between_node: between.clone(),
                and_node: and.clone(),
                period: period_label(&model.config, i),
                invested_mw: invested,
                installed_mw: solution.value(&vars.trans_installed, [a, i]),
                discounted_investment_cost_eur: params.discount_multiplier[i]
                    * params.trans_inv_cost[[a, i]]
                    * invested,
                expected_annual_volume_gwh: volume / MWH_PER_GWH,
                expected_annual_losses_gwh: (1.0 - params.line_efficiency[a]) * volume
                    / MWH_PER_GWH,
            }
        })
        .collect()
}

/// Write transmission results to file
pub fn write_transmission_results(output_dir: &Path, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(TRANSMISSION_FILE_NAME))?;
    for row in transmission_rows(solution) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write investment, installed capacity and production per generator type, summed over nodes
pub fn write_europe_summary(output_dir: &Path, solution: &Solution) -> Result<()> {
    let model = solution.model();
    let params = solution.params();
    let vars = solution.variables();

    let mut writer = csv::Writer::from_path(output_dir.join(EUROPE_SUMMARY_FILE_NAME))?;
    for (i, (g, generator)) in iproduct!(
        0..params.dims.periods,
        model.sets.generators.iter().enumerate()
    ) {
        let ngs: Vec<_> = (0..params.dims.node_generators)
            .filter(|&ng| model.sets.generator_of_ng(ng) == g)
            .collect();
        if ngs.is_empty() {
            continue;
        }
        let sum = |value: &dyn Fn(usize) -> f64| ngs.iter().map(|&ng| value(ng)).sum::<f64>();

        writer.serialize(EuropeSummaryRow {
            period: period_label(&model.config, i),
            generator: generator.clone(),
            invested_mw: sum(&|ng| solution.value(&vars.gen_inv, [ng, i])),
            installed_mw: sum(&|ng| solution.value(&vars.gen_installed, [ng, i])),
            expected_annual_production_gwh: sum(&|ng| expected_production(solution, ng, i))
                / MWH_PER_GWH,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// The load-weighted average electricity price (EUR/MWh) of each period
fn average_prices(solution: &Solution) -> Vec<f64> {
    let model = solution.model();
    let params = solution.params();
    let mut weighted = vec![0.0; params.dims.periods];
    let mut total_load = vec![0.0; params.dims.periods];

    for ((n, h, i, w), price) in solution.iter_prices() {
        let s = model.time_index.season_index_of_hour(h as u32 + 1);
        let load = params.season_scale[s] * params.scenario_probability[w] * params.load[[n, h, i, w]];
        weighted[i] += price * load;
        total_load[i] += load;
    }

    weighted
        .into_iter()
        .zip(total_load)
        .map(|(weighted, load)| if load > 0.0 { weighted / load } else { 0.0 })
        .collect()
}

/// The expected CO₂ price of each period, or `None` if no scenario of the period has a cap
fn expected_co2_prices(solution: &Solution) -> Vec<Option<f64>> {
    let params = solution.params();
    let mut prices = vec![None; params.dims.periods];
    for ((i, w), price) in solution.iter_co2_prices() {
        let expected = prices[i].get_or_insert(0.0);
        *expected += params.scenario_probability[w] * price;
    }

    prices
}

/// Write expected emissions, average price, load shed and CO₂ price for each period
pub fn write_europe_totals(output_dir: &Path, solution: &Solution) -> Result<()> {
    let model = solution.model();
    let params = solution.params();
    let vars = solution.variables();
    let prices = average_prices(solution);
    let co2_prices = expected_co2_prices(solution);

    let mut writer = csv::Writer::from_path(output_dir.join(EUROPE_TOTALS_FILE_NAME))?;
    for i in 0..params.dims.periods {
        let load_shed: f64 = (0..params.dims.nodes)
            .map(|n| {
                expected_annual(params, &model.time_index, |h, w| {
                    solution.value(&vars.load_shed, [n, h, i, w])
                })
            })
            .sum();

        writer.serialize(EuropeTotalsRow {
            period: period_label(&model.config, i),
            expected_co2_emissions_mt: expected_emissions(solution, i) / TONNES_PER_MEGATONNE,
            average_price_eur_per_mwh: prices[i],
            expected_load_shed_gwh: load_shed / MWH_PER_GWH,
            expected_co2_price_eur_per_t: co2_prices[i],
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the CO₂ price of every period and scenario with an emission cap
pub fn write_co2_prices(output_dir: &Path, solution: &Solution) -> Result<()> {
    let config = &solution.model().config;
    let mut writer = csv::Writer::from_path(output_dir.join(CO2_PRICE_FILE_NAME))?;
    for ((i, w), price) in solution.iter_co2_prices() {
        writer.serialize(Co2PriceRow {
            period: period_label(config, i),
            scenario: scenario_label(w as u32 + 1),
            co2_price_eur_per_t: price,
        })?;
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

    #[rstest]
    fn test_rows_without_load(model: Model) {
        let params = prepare(&model).unwrap().parameters;
        let solution = PlanningProblem::build(&model, &params)
            .solve(&SolverOptions::default())
            .unwrap();

        let rows = generator_rows(&solution);
        assert_eq!(rows.len(), params.dims.node_generators * params.dims.periods);
        assert_eq!(rows[0].period, "2020-2025");
        assert_eq!(storage_rows(&solution).len(), params.dims.periods);
        let transmission = transmission_rows(&solution);
        assert_eq!(transmission.len(), params.dims.periods);
        assert_eq!(transmission[0].between_node, "NodeA".into());
        assert_eq!(expected_co2_prices(&solution), [None, None]);
    }
}
