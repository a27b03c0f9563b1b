//! Derivation of the parameters of the LP from the input data.
//!
//! Parameters are first declared as dense tables holding their defaults, then filled by a fixed
//! sequence of preparation steps:
//!
//! probabilities → investment-cost annuities → marginal cost → initial capacity → installed-cap
//! floors → hydro aggregation → availability expansion → load scaling.
//!
//! The finished [`Parameters`] are only ever handed out by shared reference.
use crate::finance::{discount_multiplier, operational_discount};
use crate::input::ParamMap;
use crate::model::Model;
use crate::units::Dimensionless;
use anyhow::Result;
use log::info;

pub mod capacity;
pub mod costs;
pub mod table;
pub mod timeseries;

pub use table::ParamTable;
use timeseries::LoadAdjustment;

/// Default lifetime (years) of generators and transmission lines
pub const DEFAULT_LIFETIME: f64 = 40.0;
/// Default lifetime (years) of storage
pub const DEFAULT_STORAGE_LIFETIME: f64 = 20.0;
/// Default value of lost load (EUR/MWh)
pub const DEFAULT_LOST_LOAD_COST: f64 = 22000.0;
/// Default storage level at the start and end of each season, as a share of energy capacity
pub const DEFAULT_STORAGE_INITIAL_LEVEL: f64 = 0.5;

/// The sizes of the index sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Nodes
    pub nodes: usize,
    /// Generator types
    pub generators: usize,
    /// Technologies
    pub technologies: usize,
    /// Storage types
    pub storages: usize,
    /// `(node, generator)` pairs
    pub node_generators: usize,
    /// `(node, storage)` pairs
    pub node_storages: usize,
    /// Bidirectional arcs
    pub arcs: usize,
    /// Investment periods
    pub periods: usize,
    /// Operational hours
    pub hours: usize,
    /// Seasons
    pub seasons: usize,
    /// Scenarios
    pub scenarios: usize,
}

impl Dimensions {
    /// The dimensions of the given model
    pub fn of(model: &Model) -> Self {
        let sets = &model.sets;
        Self {
            nodes: sets.nodes.len(),
            generators: sets.generators.len(),
            technologies: sets.technologies.len(),
            storages: sets.storages.len(),
            node_generators: sets.generators_of_node.len(),
            node_storages: sets.storages_of_node.len(),
            arcs: sets.arcs.len(),
            periods: model.config.num_periods() as usize,
            hours: model.time_index.num_hours() as usize,
            seasons: model.time_index.num_seasons(),
            scenarios: model.config.number_of_scenarios as usize,
        }
    }
}

/// The parameters of the LP.
///
/// Tables are indexed by zero-based positions in the model's sets; periods, hours and scenarios,
/// which are numbered from one in the input, are shifted down by one.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Sizes of the index sets
    pub dims: Dimensions,
    /// Probability of each scenario
    pub scenario_probability: Vec<f64>,
    /// Hours of the year represented by each hour of a season
    pub season_scale: Vec<f64>,
    /// Sum of discount factors over the years of one period
    pub operational_discount: f64,
    /// Discount factor of each period relative to the first
    pub discount_multiplier: Vec<f64>,

    /// Discounted investment cost over the remaining horizon (EUR/MW) `[g, i]`
    pub gen_inv_cost: ParamTable<2>,
    /// Marginal generation cost (EUR/MWh) `[g, i]`
    pub gen_marginal_cost: ParamTable<2>,
    /// CO₂ emitted per MWh generated (t/MWh) `[g, i]`
    pub gen_emission_intensity: ParamTable<2>,
    /// Ramp rate as a share of installed capacity `[g]`
    pub gen_ramp_rate: Vec<f64>,
    /// Lifetime in years `[g]`
    pub gen_lifetime: Vec<f64>,
    /// Initial capacity (MW) `[ng, i]`
    pub gen_initial_capacity: ParamTable<2>,
    /// Maximum investment (MW) per node and technology `[n, t, i]`
    pub gen_max_built_capacity: ParamTable<3>,
    /// Maximum installed capacity (MW) per node and technology, at least the initial capacity
    /// `[n, t, i]`
    pub gen_max_installed_capacity: ParamTable<3>,
    /// Hourly availability `[ng, h, i, w]`
    pub gen_availability: ParamTable<4>,

    /// Discounted investment cost (EUR/MW) `[a, i]`
    pub trans_inv_cost: ParamTable<2>,
    /// Initial capacity (MW) `[a, i]`
    pub trans_initial_capacity: ParamTable<2>,
    /// Maximum investment (MW) `[a, i]`
    pub trans_max_built_capacity: ParamTable<2>,
    /// Maximum installed capacity (MW), at least the initial capacity `[a, i]`
    pub trans_max_installed_capacity: ParamTable<2>,
    /// Lifetime in years `[a]`
    pub trans_lifetime: Vec<f64>,
    /// Share of power arriving at the far end `[a]`
    pub line_efficiency: Vec<f64>,

    /// Discounted power investment cost (EUR/MW) `[b, i]`
    pub stor_pw_inv_cost: ParamTable<2>,
    /// Discounted energy investment cost (EUR/MWh) `[b, i]`
    pub stor_en_inv_cost: ParamTable<2>,
    /// Initial power capacity (MW) `[nb, i]`
    pub stor_pw_initial_capacity: ParamTable<2>,
    /// Initial energy capacity (MWh) `[nb, i]`
    pub stor_en_initial_capacity: ParamTable<2>,
    /// Maximum power investment (MW) `[nb, i]`
    pub stor_pw_max_built_capacity: ParamTable<2>,
    /// Maximum energy investment (MWh) `[nb, i]`
    pub stor_en_max_built_capacity: ParamTable<2>,
    /// Maximum installed power capacity (MW) `[nb, i]`
    pub stor_pw_max_installed_capacity: ParamTable<2>,
    /// Maximum installed energy capacity (MWh) `[nb, i]`
    pub stor_en_max_installed_capacity: ParamTable<2>,
    /// Lifetime in years `[b]`
    pub stor_lifetime: Vec<f64>,
    /// Hour-to-hour retention `[b]`
    pub stor_bleed_efficiency: Vec<f64>,
    /// Charging efficiency `[b]`
    pub stor_charge_efficiency: Vec<f64>,
    /// Discharging efficiency `[b]`
    pub stor_discharge_efficiency: Vec<f64>,
    /// Level at the start and end of each season as a share of energy capacity `[b]`
    pub stor_initial_level: Vec<f64>,
    /// Power capacity per unit of energy capacity for dependent storage `[b]`
    pub stor_power_to_energy: Vec<f64>,
    /// Ratio of discharge to charge capacity `[b]`
    pub stor_discharge_to_charge: Vec<f64>,

    /// Scaled hourly load (MW) `[n, h, i, w]`
    pub load: ParamTable<4>,
    /// Value of lost load (EUR/MWh) `[n, i]`
    pub lost_load_cost: ParamTable<2>,
    /// Reservoir inflow per season (MWh) `[n, i, s, w]`
    pub max_reg_hydro: ParamTable<4>,
    /// Maximum annual hydro production (MWh) `[n]`
    pub max_hydro_node: Vec<f64>,
    /// CO₂ cap (Mt) `[i]`
    pub co2_cap: Vec<f64>,
}

impl Parameters {
    /// Declare all parameters with their default values
    pub fn declare(dims: Dimensions) -> Self {
        let Dimensions {
            nodes,
            generators,
            technologies,
            storages,
            node_generators,
            node_storages,
            arcs,
            periods,
            hours,
            seasons,
            scenarios,
        } = dims;
        let inf = f64::INFINITY;

        Self {
            dims,
            scenario_probability: vec![1.0 / scenarios as f64; scenarios],
            season_scale: vec![1.0; seasons],
            operational_discount: 1.0,
            discount_multiplier: vec![1.0; periods],
            gen_inv_cost: ParamTable::filled([generators, periods], 0.0),
            gen_marginal_cost: ParamTable::filled([generators, periods], 0.0),
            gen_emission_intensity: ParamTable::filled([generators, periods], 0.0),
            gen_ramp_rate: vec![1.0; generators],
            gen_lifetime: vec![DEFAULT_LIFETIME; generators],
            gen_initial_capacity: ParamTable::filled([node_generators, periods], 0.0),
            gen_max_built_capacity: ParamTable::filled([nodes, technologies, periods], inf),
            gen_max_installed_capacity: ParamTable::filled([nodes, technologies, periods], inf),
            gen_availability: ParamTable::filled([node_generators, hours, periods, scenarios], 1.0),
            trans_inv_cost: ParamTable::filled([arcs, periods], 0.0),
            trans_initial_capacity: ParamTable::filled([arcs, periods], 0.0),
            trans_max_built_capacity: ParamTable::filled([arcs, periods], inf),
            trans_max_installed_capacity: ParamTable::filled([arcs, periods], inf),
            trans_lifetime: vec![DEFAULT_LIFETIME; arcs],
            line_efficiency: vec![1.0; arcs],
            stor_pw_inv_cost: ParamTable::filled([storages, periods], 0.0),
            stor_en_inv_cost: ParamTable::filled([storages, periods], 0.0),
            stor_pw_initial_capacity: ParamTable::filled([node_storages, periods], 0.0),
            stor_en_initial_capacity: ParamTable::filled([node_storages, periods], 0.0),
            stor_pw_max_built_capacity: ParamTable::filled([node_storages, periods], inf),
            stor_en_max_built_capacity: ParamTable::filled([node_storages, periods], inf),
            stor_pw_max_installed_capacity: ParamTable::filled([node_storages, periods], inf),
            stor_en_max_installed_capacity: ParamTable::filled([node_storages, periods], inf),
            stor_lifetime: vec![DEFAULT_STORAGE_LIFETIME; storages],
            stor_bleed_efficiency: vec![1.0; storages],
            stor_charge_efficiency: vec![1.0; storages],
            stor_discharge_efficiency: vec![1.0; storages],
            stor_initial_level: vec![DEFAULT_STORAGE_INITIAL_LEVEL; storages],
            stor_power_to_energy: vec![1.0; storages],
            stor_discharge_to_charge: vec![1.0; storages],
            load: ParamTable::filled([nodes, hours, periods, scenarios], 0.0),
            lost_load_cost: ParamTable::filled([nodes, periods], DEFAULT_LOST_LOAD_COST),
            max_reg_hydro: ParamTable::filled([nodes, periods, seasons, scenarios], 0.0),
            max_hydro_node: vec![inf; nodes],
            co2_cap: vec![inf; periods],
        }
    }
}

/// The outcome of preparation
#[derive(Debug)]
pub struct Prepared {
    /// The LP parameters
    pub parameters: Parameters,
    /// Scaled load values which were negative and have been clipped
    pub load_adjustments: Vec<LoadAdjustment>,
}

/// Set scenario probabilities, season scales and discount factors
fn prepare_probabilities(params: &mut Parameters, model: &Model) {
    if let Some(probabilities) = &model.data.general.scenario_probability {
        for (&w, &p) in probabilities {
            params.scenario_probability[w as usize - 1] = p;
        }
    }

    let season_scale = model
        .data
        .general
        .season_scale
        .clone()
        .unwrap_or_else(|| model.time_index.default_season_scale());
    for (s, season) in model.time_index.iter_seasons().enumerate() {
        params.season_scale[s] = season_scale[&season.id];
    }

    let rate = Dimensionless(model.config.discount_rate);
    let years = model.config.leap_years_investment;
    params.operational_discount = operational_discount(rate, years).value();
    for i in model.config.periods() {
        params.discount_multiplier[i as usize - 1] = discount_multiplier(rate, years, i).value();
    }
}

/// Copy technical characteristics which need no derivation, applying defaults for missing values
fn prepare_characteristics(params: &mut Parameters, model: &Model) {
    let sets = &model.sets;
    let data = &model.data;

    for (g, generator) in sets.generators.iter().enumerate() {
        if let Some(&ramp) = data.generator.ramp_rate.get(generator) {
            params.gen_ramp_rate[g] = ramp;
        }
    }
    for (a, arc) in sets.arcs.iter().enumerate() {
        if let Some(&efficiency) = data.transmission.line_efficiency.get(arc) {
            params.line_efficiency[a] = efficiency;
        }
    }

    let storage = &data.storage;
    for (b, id) in sets.storages.iter().enumerate() {
        let get = |map: &ParamMap<_>, default| map.get(id).copied().unwrap_or(default);
        params.stor_bleed_efficiency[b] = get(&storage.bleed_efficiency, 1.0);
        params.stor_charge_efficiency[b] = get(&storage.charge_efficiency, 1.0);
        params.stor_discharge_efficiency[b] = get(&storage.discharge_efficiency, 1.0);
        params.stor_initial_level[b] =
            get(&storage.initial_energy_level, DEFAULT_STORAGE_INITIAL_LEVEL);
        params.stor_power_to_energy[b] = get(&storage.power_to_energy, 1.0);
        if sets.dependent_storages.contains(id) {
            params.stor_discharge_to_charge[b] =
                params.stor_discharge_efficiency[b] / params.stor_charge_efficiency[b];
        }
    }

    for (n, node) in sets.nodes.iter().enumerate() {
        if let Some(&cap) = data.node.hydro_max_annual_production.get(node) {
            params.max_hydro_node[n] = cap;
        }
        for i in model.config.periods() {
            if let Some(&cost) = data.node.lost_load_cost.get(&(node.clone(), i)) {
                params.lost_load_cost[[n, i as usize - 1]] = cost;
            }
        }
    }

    for (&i, &cap) in &data.general.co2_cap {
        params.co2_cap[i as usize - 1] = cap;
    }
}

/// Derive the LP parameters for a model.
///
/// Steps run in an order such that every step only uses values produced by earlier ones.
pub fn prepare(model: &Model) -> Result<Prepared> {
    let mut params = Parameters::declare(Dimensions::of(model));

    prepare_probabilities(&mut params, model);
    prepare_characteristics(&mut params, model);
    costs::prepare_investment_costs(&mut params, model)?;
    costs::prepare_marginal_costs(&mut params, model);
    capacity::prepare_initial_capacity(&mut params, model);
    capacity::prepare_capacity_limits(&mut params, model);
    timeseries::prepare_hydro(&mut params, model);
    timeseries::prepare_availability(&mut params, model);
    let load_adjustments = timeseries::prepare_load(&mut params, model);

    info!("Prepared model parameters");

    Ok(Prepared {
        parameters: params,
        load_adjustments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_prepare_probabilities_defaults(model: Model) {
        let mut params = Parameters::declare(Dimensions::of(&model));
        prepare_probabilities(&mut params, &model);

        assert_eq!(params.scenario_probability, [0.5, 0.5]);
        // The peak day represents itself and the regular days share the rest of the year
        assert_approx_eq!(f64, params.season_scale[0], (8760.0 - 24.0) / 48.0);
        assert_approx_eq!(f64, params.season_scale[2], 1.0);
        assert_approx_eq!(f64, params.discount_multiplier[0], 1.0);
        assert_approx_eq!(f64, params.discount_multiplier[1], 1.05f64.powi(-5));
    }

    #[rstest]
    fn test_prepare_probabilities_given(mut model: Model) {
        model.data.general.scenario_probability = Some([(1, 0.25), (2, 0.75)].into_iter().collect());
        model.data.general.season_scale = Some(
            [("winter", 100.0), ("summer", 200.0), ("peak1", 3.0)]
                .into_iter()
                .map(|(season, scale)| (season.into(), scale))
                .collect(),
        );

        let mut params = Parameters::declare(Dimensions::of(&model));
        prepare_probabilities(&mut params, &model);
        assert_eq!(params.scenario_probability, [0.25, 0.75]);
        assert_eq!(params.season_scale, [100.0, 200.0, 3.0]);
    }

    #[rstest]
    fn test_discharge_to_charge(mut model: Model) {
        let storage = &mut model.data.storage;
        storage.charge_efficiency.insert("Li-Ion".into(), 0.9);
        storage.discharge_efficiency.insert("Li-Ion".into(), 0.81);

        let mut params = Parameters::declare(Dimensions::of(&model));
        prepare_characteristics(&mut params, &model);
        assert_approx_eq!(f64, params.stor_discharge_to_charge[0], 0.9);

        // Independent storage keeps a ratio of one
        model.sets.dependent_storages.clear();
        let mut params = Parameters::declare(Dimensions::of(&model));
        prepare_characteristics(&mut params, &model);
        assert_approx_eq!(f64, params.stor_discharge_to_charge[0], 1.0);
    }

    #[rstest]
    fn test_prepare(model: Model) {
        let prepared = prepare(&model).unwrap();
        assert!(prepared.load_adjustments.is_empty());
        assert_eq!(prepared.parameters.co2_cap, [f64::INFINITY; 2]);
    }
}
