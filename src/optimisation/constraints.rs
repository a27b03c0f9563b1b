//! Code for adding constraints to the planning problem.
use super::problem::Problem;
use super::variables::{VariableTable, Variables};
use crate::model::Model;
use crate::preparation::{ParamTable, Parameters};
use itertools::iproduct;

/// Emissions in the cap are expressed in Mt
const TONNES_PER_MEGATONNE: f64 = 1e6;

/// Corresponding keys for a constraint family along with the row offset in the solution
#[derive(Debug, Clone, PartialEq)]
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }

    /// The keys, in row order
    pub fn keys(&self) -> &[T] {
        &self.keys
    }
}

/// Indicates the node, hour, period and scenario covered by each flow balance constraint
pub type FlowBalanceKeys = KeysWithOffset<(usize, usize, usize, usize)>;

/// Indicates the period and scenario covered by each emission cap constraint
pub type EmissionCapKeys = KeysWithOffset<(usize, usize)>;

/// The keys for constraints whose duals are reported
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintKeys {
    /// Keys for nodal flow balance constraints
    pub flow_balance_keys: FlowBalanceKeys,
    /// Keys for emission cap constraints (empty if the cap is disabled)
    pub emission_cap_keys: EmissionCapKeys,
}

/// The first period (1-based) whose investments are still alive in `period`.
///
/// `max(1, ⌈1 + period − lifetime/L⌉)`
pub fn start_period(period: usize, lifetime: f64, years_per_period: u32) -> usize {
    let start = (1.0 + period as f64 - lifetime / f64::from(years_per_period)).ceil();
    if start < 1.0 { 1 } else { start as usize }
}

/// Add all constraints of the planning problem.
///
/// Note: the ordering of constraints is important, as the dual values of the constraints must later
/// be retrieved to calculate prices.
///
/// # Arguments:
///
/// * `problem` - The optimisation problem
/// * `vars` - The variables in the problem
/// * `model` - The model
/// * `params` - The prepared parameters
pub fn add_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) -> ConstraintKeys {
    let flow_balance_keys = add_flow_balance_constraints(problem, vars, model, params);
    add_generation_constraints(problem, vars, model, params);
    add_storage_constraints(problem, vars, model, params);
    add_hydro_constraints(problem, vars, model, params);
    add_transmission_constraints(problem, vars, model, params);
    let emission_cap_keys = add_emission_cap_constraints(problem, vars, model, params);
    add_vintage_constraints(problem, vars, model, params);
    add_capacity_limit_constraints(problem, vars, model, params);
    add_dependent_storage_constraints(problem, vars, model, params);

    ConstraintKeys {
        flow_balance_keys,
        emission_cap_keys,
    }
}

/// Add nodal energy balance constraints.
///
/// Generation, storage discharge net of charging, imports net of line losses and load shed meet
/// the load at every node in every hour.
fn add_flow_balance_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) -> FlowBalanceKeys {
    let sets = &model.sets;
    let dims = params.dims;
    let mut keys = Vec::new();

    let offset = problem.add_group("FlowBalance", |problem| {
        for (n, h, i, w) in iproduct!(
            0..dims.nodes,
            0..dims.hours,
            0..dims.periods,
            0..dims.scenarios
        ) {
            let mut terms = Vec::new();
            for &ng in sets.ng_of_node(n) {
                terms.push((vars.gen_op.get([ng, h, i, w]), 1.0));
            }
            for &nb in sets.nb_of_node(n) {
                let b = sets.storage_of_nb(nb);
                terms.push((
                    vars.stor_discharge.get([nb, h, i, w]),
                    params.stor_discharge_efficiency[b],
                ));
                terms.push((vars.stor_charge.get([nb, h, i, w]), -1.0));
            }
            for &l in sets.links_into(n) {
                let efficiency = params.line_efficiency[sets.arc_of_link(l)];
                terms.push((vars.trans_op.get([l, h, i, w]), efficiency));
            }
            for &l in sets.links_out_of(n) {
                terms.push((vars.trans_op.get([l, h, i, w]), -1.0));
            }
            terms.push((vars.load_shed.get([n, h, i, w]), 1.0));

            problem.add_eq(params.load[[n, h, i, w]], terms);
            keys.push((n, h, i, w));
        }
    });

    KeysWithOffset { offset, keys }
}

/// Add maximum generation and thermal ramping constraints
fn add_generation_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;
    let dims = params.dims;

    problem.add_group("MaxGeneration", |problem| {
        for (ng, h, i, w) in iproduct!(
            0..dims.node_generators,
            0..dims.hours,
            0..dims.periods,
            0..dims.scenarios
        ) {
            problem.add_le(
                0.0,
                [
                    (vars.gen_op.get([ng, h, i, w]), 1.0),
                    (
                        vars.gen_installed.get([ng, i]),
                        -params.gen_availability[[ng, h, i, w]],
                    ),
                ],
            );
        }
    });

    problem.add_group("Ramping", |problem| {
        for ng in 0..dims.node_generators {
            let g = sets.generator_of_ng(ng);
            if !sets.thermal_generators.contains(&sets.generators[g]) {
                continue;
            }
            for (h, i, w) in iproduct!(0..dims.hours, 0..dims.periods, 0..dims.scenarios) {
                // No ramping across season boundaries
                if model.time_index.is_first_hour(h as u32 + 1) {
                    continue;
                }
                problem.add_le(
                    0.0,
                    [
                        (vars.gen_op.get([ng, h, i, w]), 1.0),
                        (vars.gen_op.get([ng, h - 1, i, w]), -1.0),
                        (vars.gen_installed.get([ng, i]), -params.gen_ramp_rate[g]),
                    ],
                );
            }
        }
    });
}

/// Add storage energy balance, seasonal net-zero and storage capacity constraints.
///
/// The content at the start of each season is fixed to the initial level and must return to it by
/// the end of the season.
fn add_storage_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;
    let dims = params.dims;
    let time_index = &model.time_index;
    let storage_hours = || {
        iproduct!(
            0..dims.node_storages,
            0..dims.hours,
            0..dims.periods,
            0..dims.scenarios
        )
    };

    problem.add_group("StorageBalance", |problem| {
        for (nb, h, i, w) in storage_hours() {
            let b = sets.storage_of_nb(nb);
            let previous = if time_index.is_first_hour(h as u32 + 1) {
                (vars.stor_en_installed.get([nb, i]), params.stor_initial_level[b])
            } else {
                (
                    vars.stor_op.get([nb, h - 1, i, w]),
                    params.stor_bleed_efficiency[b],
                )
            };
            problem.add_eq(
                0.0,
                [
                    previous,
                    (
                        vars.stor_charge.get([nb, h, i, w]),
                        params.stor_charge_efficiency[b],
                    ),
                    (vars.stor_discharge.get([nb, h, i, w]), -1.0),
                    (vars.stor_op.get([nb, h, i, w]), -1.0),
                ],
            );
        }
    });

    problem.add_group("StorageSeasonalNetZero", |problem| {
        for (nb, h, i, w) in storage_hours() {
            if !time_index.is_last_hour(h as u32 + 1) {
                continue;
            }
            let b = sets.storage_of_nb(nb);
            problem.add_eq(
                0.0,
                [
                    (vars.stor_op.get([nb, h, i, w]), 1.0),
                    (
                        vars.stor_en_installed.get([nb, i]),
                        -params.stor_initial_level[b],
                    ),
                ],
            );
        }
    });

    problem.add_group("StorageEnergyCap", |problem| {
        for (nb, h, i, w) in storage_hours() {
            problem.add_le(
                0.0,
                [
                    (vars.stor_op.get([nb, h, i, w]), 1.0),
                    (vars.stor_en_installed.get([nb, i]), -1.0),
                ],
            );
        }
    });

    problem.add_group("StorageDischargeCap", |problem| {
        for (nb, h, i, w) in storage_hours() {
            let b = sets.storage_of_nb(nb);
            problem.add_le(
                0.0,
                [
                    (vars.stor_discharge.get([nb, h, i, w]), 1.0),
                    (
                        vars.stor_pw_installed.get([nb, i]),
                        -params.stor_discharge_to_charge[b],
                    ),
                ],
            );
        }
    });

    problem.add_group("StorageChargeCap", |problem| {
        for (nb, h, i, w) in storage_hours() {
            problem.add_le(
                0.0,
                [
                    (vars.stor_charge.get([nb, h, i, w]), 1.0),
                    (vars.stor_pw_installed.get([nb, i]), -1.0),
                ],
            );
        }
    });
}

/// Add the seasonal reservoir limit and the annual hydro limit of each node
fn add_hydro_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;
    let dims = params.dims;
    let time_index = &model.time_index;
    let node_generators_in = |n: usize, subset: &indexmap::IndexSet<_>| -> Vec<usize> {
        sets.ng_of_node(n)
            .iter()
            .copied()
            .filter(|&ng| subset.contains(&sets.generators[sets.generator_of_ng(ng)]))
            .collect()
    };

    problem.add_group("ReservoirHydroSeasonalCap", |problem| {
        for n in 0..dims.nodes {
            let reservoirs = node_generators_in(n, &sets.reservoir_generators);
            if reservoirs.is_empty() {
                continue;
            }
            for (i, (s, season), w) in iproduct!(
                0..dims.periods,
                time_index.iter_seasons().enumerate(),
                0..dims.scenarios
            ) {
                let terms = iproduct!(&reservoirs, season.hours())
                    .map(|(&ng, h)| (vars.gen_op.get([ng, h as usize - 1, i, w]), 1.0));
                problem.add_le(params.max_reg_hydro[[n, i, s, w]], terms);
            }
        }
    });

    problem.add_group("HydroAnnualCap", |problem| {
        for n in 0..dims.nodes {
            let cap = params.max_hydro_node[n];
            let hydro = node_generators_in(n, &sets.hydro_generators);
            if hydro.is_empty() || !cap.is_finite() {
                continue;
            }
            for i in 0..dims.periods {
                let terms = iproduct!(&hydro, 0..dims.hours, 0..dims.scenarios).map(|(&ng, h, w)| {
                    let s = time_index.season_index_of_hour(h as u32 + 1);
                    (
                        vars.gen_op.get([ng, h, i, w]),
                        params.season_scale[s] * params.scenario_probability[w],
                    )
                });
                problem.add_le(cap, terms);
            }
        }
    });
}

/// Limit flow on each directional link to the installed capacity of its arc
fn add_transmission_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;
    let dims = params.dims;

    problem.add_group("TransmissionCap", |problem| {
        for (l, h, i, w) in iproduct!(
            0..sets.directional_links.len(),
            0..dims.hours,
            0..dims.periods,
            0..dims.scenarios
        ) {
            problem.add_le(
                0.0,
                [
                    (vars.trans_op.get([l, h, i, w]), 1.0),
                    (vars.trans_installed.get([sets.arc_of_link(l), i]), -1.0),
                ],
            );
        }
    });
}

/// Limit expected annual emissions (Mt) of each period and scenario when the cap is enabled
fn add_emission_cap_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) -> EmissionCapKeys {
    let sets = &model.sets;
    let dims = params.dims;
    let mut keys = Vec::new();

    let offset = problem.add_group("EmissionCap", |problem| {
        if !model.config.use_emission_cap {
            return;
        }
        for (i, w) in iproduct!(0..dims.periods, 0..dims.scenarios) {
            let cap = params.co2_cap[i];
            if !cap.is_finite() {
                continue;
            }
            let terms = iproduct!(0..dims.node_generators, 0..dims.hours).map(|(ng, h)| {
                let s = model.time_index.season_index_of_hour(h as u32 + 1);
                let intensity = params.gen_emission_intensity[[sets.generator_of_ng(ng), i]];
                (
                    vars.gen_op.get([ng, h, i, w]),
                    params.season_scale[s] * intensity / TONNES_PER_MEGATONNE,
                )
            });
            problem.add_le(cap, terms);
            keys.push((i, w));
        }
    });

    KeysWithOffset { offset, keys }
}

/// Installed capacity equals the initial capacity plus investments which are still alive
fn add_vintage_rows(
    problem: &mut Problem,
    inv: &VariableTable<2>,
    installed: &VariableTable<2>,
    initial: &ParamTable<2>,
    lifetime: impl Fn(usize) -> f64,
    years_per_period: u32,
) {
    let [count, periods] = inv.shape();
    for (x, i) in iproduct!(0..count, 0..periods) {
        let start = start_period(i + 1, lifetime(x), years_per_period) - 1;
        let terms = (start..=i)
            .map(|j| (inv.get([x, j]), 1.0))
            .chain([(installed.get([x, i]), -1.0)]);
        problem.add_eq(-initial[[x, i]], terms);
    }
}

/// Add vintage accounting for generation, transmission and storage power and energy
fn add_vintage_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;
    let years = model.config.leap_years_investment;

    problem.add_group("GeneratorVintage", |problem| {
        add_vintage_rows(
            problem,
            &vars.gen_inv,
            &vars.gen_installed,
            &params.gen_initial_capacity,
            |ng| params.gen_lifetime[sets.generator_of_ng(ng)],
            years,
        );
    });
    problem.add_group("TransmissionVintage", |problem| {
        add_vintage_rows(
            problem,
            &vars.trans_inv,
            &vars.trans_installed,
            &params.trans_initial_capacity,
            |a| params.trans_lifetime[a],
            years,
        );
    });
    let storage_lifetime = |nb| params.stor_lifetime[sets.storage_of_nb(nb)];
    problem.add_group("StoragePowerVintage", |problem| {
        add_vintage_rows(
            problem,
            &vars.stor_pw_inv,
            &vars.stor_pw_installed,
            &params.stor_pw_initial_capacity,
            storage_lifetime,
            years,
        );
    });
    problem.add_group("StorageEnergyVintage", |problem| {
        add_vintage_rows(
            problem,
            &vars.stor_en_inv,
            &vars.stor_en_installed,
            &params.stor_en_initial_capacity,
            storage_lifetime,
            years,
        );
    });
}

/// Add a `vars[x, i] <= limit[x, i]` row for each finite limit
fn add_limit_rows(problem: &mut Problem, vars: &VariableTable<2>, limits: &ParamTable<2>) {
    let [count, periods] = vars.shape();
    for (x, i) in iproduct!(0..count, 0..periods) {
        let limit = limits[[x, i]];
        if limit.is_finite() {
            problem.add_le(limit, [(vars.get([x, i]), 1.0)]);
        }
    }
}

/// Add per-period investment limits and installed-capacity limits.
///
/// Generator limits apply to the sum over all generators of a technology at a node.
fn add_capacity_limit_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;
    let periods = params.dims.periods;
    let add_generator_rows =
        |problem: &mut Problem, table: &VariableTable<2>, limits: &ParamTable<3>| {
            for ((n, t), ngs) in sets.iter_node_technologies() {
                for i in 0..periods {
                    let limit = limits[[n, t, i]];
                    if limit.is_finite() {
                        problem.add_le(limit, ngs.iter().map(|&ng| (table.get([ng, i]), 1.0)));
                    }
                }
            }
        };

    problem.add_group("InvestmentCap", |problem| {
        add_generator_rows(problem, &vars.gen_inv, &params.gen_max_built_capacity);
        add_limit_rows(problem, &vars.trans_inv, &params.trans_max_built_capacity);
        add_limit_rows(problem, &vars.stor_pw_inv, &params.stor_pw_max_built_capacity);
        add_limit_rows(problem, &vars.stor_en_inv, &params.stor_en_max_built_capacity);
    });

    problem.add_group("InstalledCap", |problem| {
        add_generator_rows(
            problem,
            &vars.gen_installed,
            &params.gen_max_installed_capacity,
        );
        add_limit_rows(
            problem,
            &vars.trans_installed,
            &params.trans_max_installed_capacity,
        );
        add_limit_rows(
            problem,
            &vars.stor_pw_installed,
            &params.stor_pw_max_installed_capacity,
        );
        add_limit_rows(
            problem,
            &vars.stor_en_installed,
            &params.stor_en_max_installed_capacity,
        );
    });
}

/// Fix the power capacity of dependent storage to a multiple of its energy capacity
fn add_dependent_storage_constraints(
    problem: &mut Problem,
    vars: &Variables,
    model: &Model,
    params: &Parameters,
) {
    let sets = &model.sets;

    problem.add_group("DependentStorage", |problem| {
        for nb in 0..params.dims.node_storages {
            let b = sets.storage_of_nb(nb);
            if !sets.dependent_storages.contains(&sets.storages[b]) {
                continue;
            }
            for i in 0..params.dims.periods {
                problem.add_eq(
                    0.0,
                    [
                        (vars.stor_pw_installed.get([nb, i]), 1.0),
                        (
                            vars.stor_en_installed.get([nb, i]),
                            -params.stor_power_to_energy[b],
                        ),
                    ],
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::preparation::prepare;
    use rstest::rstest;

    #[rstest]
    #[case(1, 40.0, 1)]
    #[case(9, 40.0, 2)] // Built in period 1 retires after 8 periods of 5 years
    #[case(3, 10.0, 2)]
    #[case(4, 15.0, 2)]
    #[case(4, 12.0, 3)] // Partial periods round up
    fn test_start_period(#[case] period: usize, #[case] lifetime: f64, #[case] expected: usize) {
        assert_eq!(start_period(period, lifetime, 5), expected);
    }

    #[test]
    fn test_zip_duals() {
        let keys = KeysWithOffset {
            offset: 1,
            keys: vec!['a', 'b'],
        };
        let duals = [0.0, 1.0, 2.0, 3.0];
        let zipped: Vec<_> = keys.zip_duals(&duals).collect();
        assert_eq!(zipped, [(&'a', 1.0), (&'b', 2.0)]);
    }

    #[rstest]
    fn test_constraint_rows(model: Model) {
        let params = prepare(&model).unwrap().parameters;
        let mut problem = Problem::default();
        let vars = Variables::add(&mut problem, &model, &params);
        let keys = add_constraints(&mut problem, &vars, &model, &params);

        let dims = params.dims;
        let hours_per_period = dims.hours * dims.periods * dims.scenarios;

        // Flow balance rows come first
        assert_eq!(keys.flow_balance_keys.offset, 0);
        assert_eq!(keys.flow_balance_keys.keys.len(), dims.nodes * hours_per_period);

        let group_len = |name| {
            let group = problem.groups().iter().find(|g| g.name == name).unwrap();
            group.rows.len()
        };
        assert_eq!(group_len("MaxGeneration"), dims.node_generators * hours_per_period);
        // Two thermal node-generators and no ramping into the first hour of each of 3 seasons
        assert_eq!(
            group_len("Ramping"),
            2 * (dims.hours - 3) * dims.periods * dims.scenarios
        );
        // One closing row per season
        assert_eq!(
            group_len("StorageSeasonalNetZero"),
            3 * dims.periods * dims.scenarios
        );
        // No caps given, so nothing to limit
        assert_eq!(group_len("InvestmentCap"), 0);
        assert_eq!(group_len("EmissionCap"), 0);
        assert!(keys.emission_cap_keys.keys.is_empty());
        // Li-Ion is dependent storage
        assert_eq!(group_len("DependentStorage"), dims.periods);
    }
}
