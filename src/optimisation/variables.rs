//! The decision variables of the planning problem.
//!
//! Each family of variables occupies a contiguous block of columns, laid out row-major over the
//! dense indices of its domain.
use super::problem::{Problem, Variable};
use crate::model::Model;
use crate::preparation::Parameters;

/// A family of variables over the cross product of `N` index ranges
#[derive(Debug, Clone, PartialEq)]
pub struct VariableTable<const N: usize> {
    name: &'static str,
    offset: usize,
    shape: [usize; N],
}

impl<const N: usize> VariableTable<N> {
    /// Add one column per index to the problem.
    ///
    /// Indices are visited in row-major order and `cost` gives the objective coefficient of each.
    fn add<F>(problem: &mut Problem, name: &'static str, shape: [usize; N], mut cost: F) -> Self
    where
        F: FnMut([usize; N]) -> f64,
    {
        let offset = problem.columns().len();
        let len: usize = shape.iter().product();
        for flat in 0..len {
            problem.add_column(cost(unflatten(flat, shape)));
        }

        Self {
            name,
            offset,
            shape,
        }
    }

    /// The variable at the given index
    pub fn get(&self, index: [usize; N]) -> Variable {
        let flat = index.iter().zip(self.shape).fold(0, |flat, (&idx, dim)| {
            assert!(idx < dim, "Index {index:?} out of bounds for {}", self.name);
            flat * dim + idx
        });

        Variable(self.offset + flat)
    }

    /// The name of the family
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The extent of each dimension
    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// The index of a variable within this family, if it belongs to it
    fn index_of(&self, var: Variable) -> Option<Vec<usize>> {
        let flat = var.0.checked_sub(self.offset)?;
        (flat < self.len()).then(|| unflatten(flat, self.shape).to_vec())
    }

    /// The value of the variable at the given index in a solution
    pub fn value(&self, values: &[f64], index: [usize; N]) -> f64 {
        values[self.get(index).0]
    }
}

/// Convert a row-major offset back into an index
fn unflatten<const N: usize>(mut flat: usize, shape: [usize; N]) -> [usize; N] {
    let mut index = [0; N];
    for (idx, dim) in index.iter_mut().zip(shape).rev() {
        *idx = flat % dim;
        flat /= dim;
    }

    index
}

/// All variables of the planning problem.
///
/// Indices are dense positions: `ng` and `nb` are positions in the node-generator and
/// node-storage pairs, `a` in the bidirectional arcs and `l` in the directional links.
#[derive(Debug, Clone, PartialEq)]
pub struct Variables {
    /// New generation capacity (MW) `[ng, i]`
    pub gen_inv: VariableTable<2>,
    /// Installed generation capacity (MW) `[ng, i]`
    pub gen_installed: VariableTable<2>,
    /// New transmission capacity (MW) `[a, i]`
    pub trans_inv: VariableTable<2>,
    /// Installed transmission capacity (MW) `[a, i]`
    pub trans_installed: VariableTable<2>,
    /// New storage power capacity (MW) `[nb, i]`
    pub stor_pw_inv: VariableTable<2>,
    /// Installed storage power capacity (MW) `[nb, i]`
    pub stor_pw_installed: VariableTable<2>,
    /// New storage energy capacity (MWh) `[nb, i]`
    pub stor_en_inv: VariableTable<2>,
    /// Installed storage energy capacity (MWh) `[nb, i]`
    pub stor_en_installed: VariableTable<2>,
    /// Generation (MW) `[ng, h, i, w]`
    pub gen_op: VariableTable<4>,
    /// Storage content at the end of the hour (MWh) `[nb, h, i, w]`
    pub stor_op: VariableTable<4>,
    /// Storage charging (MW) `[nb, h, i, w]`
    pub stor_charge: VariableTable<4>,
    /// Storage discharging (MW) `[nb, h, i, w]`
    pub stor_discharge: VariableTable<4>,
    /// Flow along a directional link, measured at the sending end (MW) `[l, h, i, w]`
    pub trans_op: VariableTable<4>,
    /// Unserved load (MW) `[n, h, i, w]`
    pub load_shed: VariableTable<4>,
}

/// The objective weight of one operational hour: discounting, season scaling and probability
pub fn operational_weight(params: &Parameters, model: &Model, h: usize, i: usize, w: usize) -> f64 {
    let s = model.time_index.season_index_of_hour(h as u32 + 1);
    params.discount_multiplier[i]
        * params.operational_discount
        * params.season_scale[s]
        * params.scenario_probability[w]
}

impl Variables {
    /// Add every variable to the problem with its objective coefficient
    pub fn add(problem: &mut Problem, model: &Model, params: &Parameters) -> Self {
        let sets = &model.sets;
        let dims = params.dims;
        let periods = dims.periods;
        let operational = |len| [len, dims.hours, periods, dims.scenarios];
        let disc = &params.discount_multiplier;

        let gen_inv = VariableTable::add(
            problem,
            "genInvCap",
            [dims.node_generators, periods],
            |[ng, i]| disc[i] * params.gen_inv_cost[[sets.generator_of_ng(ng), i]],
        );
        let gen_installed = VariableTable::add(
            problem,
            "genInstalledCap",
            [dims.node_generators, periods],
            |_| 0.0,
        );
        let trans_inv = VariableTable::add(problem, "transInvCap", [dims.arcs, periods], |[a, i]| {
            disc[i] * params.trans_inv_cost[[a, i]]
        });
        let trans_installed =
            VariableTable::add(problem, "transInstalledCap", [dims.arcs, periods], |_| 0.0);
        let stor_pw_inv = VariableTable::add(
            problem,
            "storPWInvCap",
            [dims.node_storages, periods],
            |[nb, i]| disc[i] * params.stor_pw_inv_cost[[sets.storage_of_nb(nb), i]],
        );
        let stor_pw_installed = VariableTable::add(
            problem,
            "storPWInstalledCap",
            [dims.node_storages, periods],
            |_| 0.0,
        );
        let stor_en_inv = VariableTable::add(
            problem,
            "storENInvCap",
            [dims.node_storages, periods],
            |[nb, i]| disc[i] * params.stor_en_inv_cost[[sets.storage_of_nb(nb), i]],
        );
        let stor_en_installed = VariableTable::add(
            problem,
            "storENInstalledCap",
            [dims.node_storages, periods],
            |_| 0.0,
        );

        let gen_op = VariableTable::add(
            problem,
            "genOperational",
            operational(dims.node_generators),
            |[ng, h, i, w]| {
                operational_weight(params, model, h, i, w)
                    * params.gen_marginal_cost[[sets.generator_of_ng(ng), i]]
            },
        );
        let storage_shape = operational(dims.node_storages);
        let stor_op = VariableTable::add(problem, "storOperational", storage_shape, |_| 0.0);
        let stor_charge = VariableTable::add(problem, "storCharge", storage_shape, |_| 0.0);
        let stor_discharge = VariableTable::add(problem, "storDischarge", storage_shape, |_| 0.0);
        let trans_op = VariableTable::add(
            problem,
            "transOperational",
            operational(sets.directional_links.len()),
            |_| 0.0,
        );
        let load_shed = VariableTable::add(
            problem,
            "loadShed",
            operational(dims.nodes),
            |[n, h, i, w]| {
                operational_weight(params, model, h, i, w) * params.lost_load_cost[[n, i]]
            },
        );

        Self {
            gen_inv,
            gen_installed,
            trans_inv,
            trans_installed,
            stor_pw_inv,
            stor_pw_installed,
            stor_en_inv,
            stor_en_installed,
            gen_op,
            stor_op,
            stor_charge,
            stor_discharge,
            trans_op,
            load_shed,
        }
    }

    /// A readable name for a variable, e.g. `genOperational(3,17,0,1)`
    pub fn name_of(&self, var: Variable) -> String {
        let capacity = [
            &self.gen_inv,
            &self.gen_installed,
            &self.trans_inv,
            &self.trans_installed,
            &self.stor_pw_inv,
            &self.stor_pw_installed,
            &self.stor_en_inv,
            &self.stor_en_installed,
        ];
        let operational = [
            &self.gen_op,
            &self.stor_op,
            &self.stor_charge,
            &self.stor_discharge,
            &self.trans_op,
            &self.load_shed,
        ];

        let found = capacity
            .iter()
            .find_map(|table| Some((table.name(), table.index_of(var)?)))
            .or_else(|| {
                operational
                    .iter()
                    .find_map(|table| Some((table.name(), table.index_of(var)?)))
            });
        match found {
            Some((name, index)) => {
                let index: Vec<_> = index.iter().map(ToString::to_string).collect();
                format!("{name}({})", index.join(","))
            }
            None => format!("x{}", var.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, [0, 0, 0])]
    #[case(5, [0, 1, 1])]
    #[case(23, [1, 2, 3])]
    fn test_unflatten(#[case] flat: usize, #[case] expected: [usize; 3]) {
        assert_eq!(unflatten(flat, [2, 3, 4]), expected);
    }

    #[test]
    fn test_variable_table() {
        let mut problem = Problem::default();
        problem.add_column(0.0);
        let table = VariableTable::add(&mut problem, "x", [2, 3], |[a, b]| (a * 10 + b) as f64);

        assert_eq!(problem.columns().len(), 7);
        assert_eq!(table.get([0, 0]), Variable(1));
        assert_eq!(table.get([1, 2]), Variable(6));
        assert_eq!(problem.columns()[6].cost, 12.0);
        assert_eq!(table.index_of(Variable(4)), Some(vec![1, 0]));
        assert_eq!(table.index_of(Variable(0)), None);
        assert_eq!(table.index_of(Variable(7)), None);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_variable_table_out_of_bounds() {
        let mut problem = Problem::default();
        let table = VariableTable::add(&mut problem, "x", [2, 3], |_| 0.0);
        table.get([2, 0]);
    }
}
