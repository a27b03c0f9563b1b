//! Preparation of the scenario-dependent parameters: hydro inflow, availability and load.
use super::Parameters;
use crate::id::NodeID;
use crate::model::Model;
use log::{debug, warn};
use serde::Serialize;

/// Load (MW) substituted for negative scaled load
pub const MIN_ADJUSTED_LOAD: f64 = 10.0;

/// A negative scaled load which has been replaced by [`MIN_ADJUSTED_LOAD`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadAdjustment {
    /// The node
    pub node: NodeID,
    /// The operational hour
    pub hour: u32,
    /// The scenario
    pub scenario: u32,
    /// The period
    pub period: u32,
    /// The scaled load before clipping
    pub original: f64,
}

/// Sum hourly reservoir inflow into a seasonal budget per node, period and scenario
pub fn prepare_hydro(params: &mut Parameters, model: &Model) {
    let sets = &model.sets;
    let raw = &model.data.stochastic.hydro_seasonal_raw;

    for ((node, i, season, _h, w), &value) in raw {
        let (Some(n), Some(s)) = (
            sets.nodes.get_index_of(node),
            model.time_index.season_index(season.as_str()),
        ) else {
            continue;
        };
        params.max_reg_hydro[[n, *i as usize - 1, s, *w as usize - 1]] += value;
    }

    for (n, node) in sets.nodes.iter().enumerate() {
        let has_reservoir = sets.ng_of_node(n).iter().any(|&ng| {
            let generator = &sets.generators[sets.generator_of_ng(ng)];
            sets.reservoir_generators.contains(generator)
        });
        if has_reservoir && !raw.keys().any(|key| key.0 == *node) {
            warn!("Node {node} has reservoir hydro generators but no inflow data");
        }
    }
}

/// Expand availability to every `(node, generator)` pair and hour.
///
/// Hourly availability from the stochastic tables takes precedence over the generator type
/// availability, which defaults to 1.
pub fn prepare_availability(params: &mut Parameters, model: &Model) {
    let sets = &model.sets;
    let data = &model.data;
    let dims = params.dims;

    for ng in 0..dims.node_generators {
        let generator = &sets.generators[sets.generator_of_ng(ng)];
        let Some(&availability) = data.generator.type_availability.get(generator) else {
            continue;
        };
        for h in 0..dims.hours {
            for i in 0..dims.periods {
                for w in 0..dims.scenarios {
                    params.gen_availability[[ng, h, i, w]] = availability;
                }
            }
        }
    }

    for ((node, generator, h, w, i), &value) in &data.stochastic.availability {
        let Some(ng) = sets
            .generators_of_node
            .get_index_of(&(node.clone(), generator.clone()))
        else {
            debug!("Ignoring availability of {generator} at {node}, which has no such generator");
            continue;
        };
        params.gen_availability[[ng, *h as usize - 1, *i as usize - 1, *w as usize - 1]] = value;
    }
}

/// Scale raw load to the annual demand of each node and period.
///
/// The expected annual energy of the raw load over the regular seasons is scaled to the given
/// annual demand. Returns the scaled values which were negative and have been clipped.
pub fn prepare_load(params: &mut Parameters, model: &Model) -> Vec<LoadAdjustment> {
    let sets = &model.sets;
    let time_index = &model.time_index;
    let dims = params.dims;

    for ((node, h, w, i), &value) in &model.data.stochastic.load_raw {
        if let Some(n) = sets.nodes.get_index_of(node) {
            params.load[[n, *h as usize - 1, *i as usize - 1, *w as usize - 1]] = value;
        }
    }

    let mut adjustments = Vec::new();
    for (n, node) in sets.nodes.iter().enumerate() {
        for i in 0..dims.periods {
            let period = i as u32 + 1;
            let Some(&demand) = model.data.node.annual_demand.get(&(node.clone(), period)) else {
                debug!("No annual demand for {node} in period {period}; load left unscaled");
                continue;
            };

            let mut node_raw = 0.0;
            let regular_seasons = time_index
                .iter_seasons()
                .enumerate()
                .filter(|(_, season)| !season.is_peak());
            for (s, season) in regular_seasons {
                for h in season.hours() {
                    for w in 0..dims.scenarios {
                        node_raw += params.scenario_probability[w]
                            * params.season_scale[s]
                            * params.load[[n, h as usize - 1, i, w]];
                    }
                }
            }

            if node_raw == 0.0 {
                if demand != 0.0 {
                    warn!(
                        "Raw load of {node} in period {period} is zero; it cannot be scaled to an \
                        annual demand of {demand}"
                    );
                }
                continue;
            }

            let scale = demand / node_raw;
            for h in 0..dims.hours {
                for w in 0..dims.scenarios {
                    let load = &mut params.load[[n, h, i, w]];
                    *load *= scale;
                    if *load < 0.0 {
                        adjustments.push(LoadAdjustment {
                            node: node.clone(),
                            hour: h as u32 + 1,
                            scenario: w as u32 + 1,
                            period,
                            original: *load,
                        });
                        *load = MIN_ADJUSTED_LOAD;
                    }
                }
            }
        }
    }

    if !adjustments.is_empty() {
        warn!(
            "{} negative load values were replaced by {MIN_ADJUSTED_LOAD} MW",
            adjustments.len()
        );
    }

    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::preparation::Dimensions;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn declare(model: &Model) -> Parameters {
        let mut params = Parameters::declare(Dimensions::of(model));
        // Regular hours count twice
        params.season_scale = vec![2.0, 2.0, 1.0];
        params
    }

    #[rstest]
    fn test_hydro_sum(mut model: Model) {
        let raw = &mut model.data.stochastic.hydro_seasonal_raw;
        raw.insert(("NodeA".into(), 1, "summer".into(), 25, 2), 10.0);
        raw.insert(("NodeA".into(), 1, "summer".into(), 26, 2), 5.0);
        raw.insert(("NodeB".into(), 2, "winter".into(), 1, 1), 3.0);

        let mut params = declare(&model);
        prepare_hydro(&mut params, &model);
        assert_approx_eq!(f64, params.max_reg_hydro[[0, 0, 1, 1]], 15.0);
        assert_approx_eq!(f64, params.max_reg_hydro[[1, 1, 0, 0]], 3.0);
        assert_approx_eq!(f64, params.max_reg_hydro[[0, 0, 0, 0]], 0.0);
    }

    #[rstest]
    fn test_availability(mut model: Model) {
        model
            .data
            .generator
            .type_availability
            .insert("GasCCGT".into(), 0.9);
        model
            .data
            .stochastic
            .availability
            .insert(("NodeA".into(), "Solar".into(), 12, 1, 2), 0.7);

        let mut params = declare(&model);
        prepare_availability(&mut params, &model);
        assert_approx_eq!(f64, params.gen_availability[[0, 5, 1, 1]], 0.9);
        assert_approx_eq!(f64, params.gen_availability[[2, 71, 0, 0]], 0.9);
        assert_approx_eq!(f64, params.gen_availability[[1, 11, 1, 0]], 0.7);
        assert_approx_eq!(f64, params.gen_availability[[1, 12, 1, 0]], 1.0);
    }

    #[rstest]
    fn test_load_scaling(mut model: Model) {
        // 100 MW in every regular hour of both scenarios at NodeA in period 1
        for h in 1..=48 {
            for w in 1..=2 {
                model
                    .data
                    .stochastic
                    .load_raw
                    .insert(("NodeA".into(), h, w, 1), 100.0);
            }
        }
        model
            .data
            .stochastic
            .load_raw
            .insert(("NodeA".into(), 60, 1, 1), -1.0);
        model
            .data
            .node
            .annual_demand
            .insert(("NodeA".into(), 1), 48.0 * 2.0 * 100.0 * 3.0);

        let mut params = declare(&model);
        let adjustments = prepare_load(&mut params, &model);

        // Raw energy is 48 h x scale 2 x 100 MW, so every value is tripled
        assert_approx_eq!(f64, params.load[[0, 0, 0, 0]], 300.0);
        assert_approx_eq!(f64, params.load[[0, 47, 0, 1]], 300.0);
        assert_approx_eq!(f64, params.load[[0, 59, 0, 0]], MIN_ADJUSTED_LOAD);
        assert_eq!(
            adjustments,
            [LoadAdjustment {
                node: "NodeA".into(),
                hour: 60,
                scenario: 1,
                period: 1,
                original: -3.0,
            }]
        );
    }

    #[rstest]
    fn test_load_without_raw_energy(mut model: Model) {
        model
            .data
            .node
            .annual_demand
            .insert(("NodeB".into(), 1), 1000.0);
        let mut params = declare(&model);
        assert!(prepare_load(&mut params, &model).is_empty());
        assert_approx_eq!(f64, params.load[[1, 0, 0, 0]], 0.0);
    }
}
