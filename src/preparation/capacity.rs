//! Initial capacities and capacity limits.
use super::Parameters;
use crate::model::Model;
use log::info;

/// Set the initial capacity of generators, transmission and storage.
///
/// A generator with no (or zero) initial capacity in a period is given the reference capacity of
/// its node, scaled down by the retirement factor of that period.
pub fn prepare_initial_capacity(params: &mut Parameters, model: &Model) {
    let sets = &model.sets;
    let data = &model.data;
    let generator = &data.generator;

    for (ng, (node, gen_id)) in sets.generators_of_node.iter().enumerate() {
        let reference = generator
            .ref_initial_capacity
            .get(&(node.clone(), gen_id.clone()))
            .copied()
            .unwrap_or(0.0);
        for i in model.config.periods() {
            let given = generator
                .initial_capacity
                .get(&(node.clone(), gen_id.clone(), i))
                .copied()
                .unwrap_or(0.0);
            let capacity = if given == 0.0 {
                let scale = generator
                    .scale_factor_initial_capacity
                    .get(&(gen_id.clone(), i))
                    .copied()
                    .unwrap_or(0.0);
                reference * (1.0 - scale)
            } else {
                given
            };
            params.gen_initial_capacity[[ng, i as usize - 1]] = capacity;
        }
    }

    for (a, arc) in sets.arcs.iter().enumerate() {
        for i in model.config.periods() {
            if let Some(&capacity) = data.transmission.initial_capacity.get(&(arc.clone(), i)) {
                params.trans_initial_capacity[[a, i as usize - 1]] = capacity;
            }
        }
    }

    let storage = &data.storage;
    for (nb, (node, id)) in sets.storages_of_node.iter().enumerate() {
        for i in model.config.periods() {
            let key = (node.clone(), id.clone(), i);
            if let Some(&capacity) = storage.initial_power_capacity.get(&key) {
                params.stor_pw_initial_capacity[[nb, i as usize - 1]] = capacity;
            }
            if let Some(&capacity) = storage.initial_energy_capacity.get(&key) {
                params.stor_en_initial_capacity[[nb, i as usize - 1]] = capacity;
            }
        }
    }
}

/// Raise a maximum installed capacity to the initial capacity if it is lower, logging the lift
fn lift_to_initial(limit: &mut f64, initial: f64, describe: impl FnOnce() -> String) {
    if *limit < initial {
        info!(
            "Raising maximum installed capacity of {} from {} to its initial capacity {initial}",
            describe(),
            *limit
        );
        *limit = initial;
    }
}

/// Set per-period investment limits and installed-capacity limits.
///
/// Installed-capacity limits are never below the initial capacity, so a model with no new
/// investment is always within its limits.
pub fn prepare_capacity_limits(params: &mut Parameters, model: &Model) {
    let sets = &model.sets;
    let data = &model.data;

    for ((n, t), ngs) in sets.iter_node_technologies() {
        let node = &sets.nodes[n];
        let technology = &sets.technologies[t];
        let raw = data
            .generator
            .max_installed_capacity
            .get(&(node.clone(), technology.clone()))
            .copied()
            .unwrap_or(f64::INFINITY);

        for i in model.config.periods() {
            let ii = i as usize - 1;
            if let Some(&built) = data
                .generator
                .max_built_capacity
                .get(&(node.clone(), technology.clone(), i))
            {
                params.gen_max_built_capacity[[n, t, ii]] = built;
            }

            let initial: f64 = ngs
                .iter()
                .map(|&ng| params.gen_initial_capacity[[ng, ii]])
                .sum();
            let mut limit = raw;
            lift_to_initial(&mut limit, initial, || {
                format!("{technology} at {node} in period {i}")
            });
            params.gen_max_installed_capacity[[n, t, ii]] = limit;
        }
    }

    let transmission = &data.transmission;
    for (a, arc) in sets.arcs.iter().enumerate() {
        let raw = transmission
            .max_installed_capacity_raw
            .get(arc)
            .copied()
            .unwrap_or(f64::INFINITY);
        for i in model.config.periods() {
            let ii = i as usize - 1;
            if let Some(&built) = transmission.max_built_capacity.get(&(arc.clone(), i)) {
                params.trans_max_built_capacity[[a, ii]] = built;
            }
            let mut limit = raw;
            lift_to_initial(&mut limit, params.trans_initial_capacity[[a, ii]], || {
                format!("the line {}-{} in period {i}", arc.0, arc.1)
            });
            params.trans_max_installed_capacity[[a, ii]] = limit;
        }
    }

    let storage = &data.storage;
    for (nb, (node, id)) in sets.storages_of_node.iter().enumerate() {
        let pair = (node.clone(), id.clone());
        let raw_power = storage
            .power_max_installed_capacity
            .get(&pair)
            .copied()
            .unwrap_or(f64::INFINITY);
        let raw_energy = storage
            .energy_max_installed_capacity
            .get(&pair)
            .copied()
            .unwrap_or(f64::INFINITY);

        for i in model.config.periods() {
            let ii = i as usize - 1;
            let key = (node.clone(), id.clone(), i);
            if let Some(&built) = storage.power_max_built_capacity.get(&key) {
                params.stor_pw_max_built_capacity[[nb, ii]] = built;
            }
            if let Some(&built) = storage.energy_max_built_capacity.get(&key) {
                params.stor_en_max_built_capacity[[nb, ii]] = built;
            }

            let mut power = raw_power;
            lift_to_initial(&mut power, params.stor_pw_initial_capacity[[nb, ii]], || {
                format!("{id} power at {node} in period {i}")
            });
            params.stor_pw_max_installed_capacity[[nb, ii]] = power;

            let mut energy = raw_energy;
            lift_to_initial(&mut energy, params.stor_en_initial_capacity[[nb, ii]], || {
                format!("{id} energy at {node} in period {i}")
            });
            params.stor_en_max_installed_capacity[[nb, ii]] = energy;
        }
    }
}
