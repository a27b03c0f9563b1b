//! Code for assembling and solving the planning problem.
//!
//! The problem is a two-stage stochastic LP: investment in generation, transmission and storage
//! capacity for each period is shared by all scenarios, while dispatch is decided separately for
//! each scenario and operational hour. Prices are recovered from the dual values of the flow
//! balance and emission cap constraints.
use crate::log::is_logging_disabled;
use crate::model::Model;
use crate::preparation::Parameters;
use crate::units::Money;
use anyhow::Result;
use highs::{HighsModelStatus, HighsStatus, Sense};
use log::info;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod constraints;
pub mod lp_file;
pub mod problem;
pub mod variables;

use constraints::{ConstraintKeys, add_constraints};
use problem::Problem;
use variables::{VariableTable, Variables, operational_weight};

/// The name of the HiGHS log file written to the temporary directory
const HIGHS_LOG_FILE_NAME: &str = "highs.log";

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Try to solve the model, returning an error if the model is incoherent or result is non-optimal
pub fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Options passed to HiGHS
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolverOptions {
    /// Wall-clock limit in seconds
    pub time_limit: Option<f64>,
    /// File to which HiGHS writes its log
    pub log_file: Option<PathBuf>,
    /// Whether HiGHS echoes its progress to the console
    pub console_output: bool,
}

impl SolverOptions {
    /// Solver options for a model run
    pub fn for_model(model: &Model, console_output: bool) -> Self {
        Self {
            time_limit: model.config.solver.time_limit,
            log_file: model
                .config
                .solver_temporary_directory()
                .map(|dir| dir.join(HIGHS_LOG_FILE_NAME)),
            console_output: console_output && !is_logging_disabled(),
        }
    }

    /// Apply the options to a HiGHS model
    fn apply(&self, highs_model: &mut highs::Model) {
        // The problem is built and solved sequentially
        highs_model.set_option("threads", 1);
        if let Some(limit) = self.time_limit {
            highs_model.set_option("time_limit", limit);
        }
        if let Some(log_file) = &self.log_file {
            highs_model.set_option("log_file", &*log_file.to_string_lossy());
        }
        highs_model.set_option("log_to_console", self.console_output);
        highs_model.set_option("output_flag", self.console_output || self.log_file.is_some());
    }
}

/// The assembled planning problem, ready to be solved
pub struct PlanningProblem<'a> {
    model: &'a Model,
    params: &'a Parameters,
    problem: Problem,
    variables: Variables,
    constraint_keys: ConstraintKeys,
}

impl<'a> PlanningProblem<'a> {
    /// Declare the variables, objective and constraints of the problem.
    ///
    /// # Arguments
    ///
    /// * `model` - The model
    /// * `params` - The prepared parameters
    pub fn build(model: &'a Model, params: &'a Parameters) -> Self {
        let mut problem = Problem::default();
        let variables = Variables::add(&mut problem, model, params);
        let constraint_keys = add_constraints(&mut problem, &variables, model, params);
        info!(
            "Built problem with {} variables and {} constraints",
            problem.columns().len(),
            problem.num_rows()
        );

        Self {
            model,
            params,
            problem,
            variables,
            constraint_keys,
        }
    }

    /// The variables of the problem
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The recorded problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Export the problem in CPLEX LP format
    pub fn write_lp_file(&self, file_path: &Path) -> Result<()> {
        lp_file::write_lp_file(file_path, &self.problem, |var| self.variables.name_of(var))?;
        info!("Wrote LP file to {}", file_path.display());

        Ok(())
    }

    /// Solve the problem with HiGHS
    pub fn solve(self, options: &SolverOptions) -> Result<Solution<'a>, ModelError> {
        let mut highs_model = self.problem.to_highs().optimise(Sense::Minimise);
        options.apply(&mut highs_model);

        let solved = solve_optimal(highs_model)?;
        let objective_value = Money(solved.objective_value());
        let solution = solved.get_solution();
        info!("Solved problem with objective value {objective_value}");

        Ok(Solution {
            model: self.model,
            params: self.params,
            columns: solution.columns().to_vec(),
            dual_rows: solution.dual_rows().to_vec(),
            variables: self.variables,
            constraint_keys: self.constraint_keys,
            objective_value,
        })
    }
}

/// Convert a dual value in objective units to a price, given the objective weight of its row
fn price_from_dual(dual: f64, weight: f64) -> f64 {
    if weight > 0.0 { dual / weight } else { 0.0 }
}

/// The solution to the planning problem
pub struct Solution<'a> {
    model: &'a Model,
    params: &'a Parameters,
    columns: Vec<f64>,
    dual_rows: Vec<f64>,
    variables: Variables,
    constraint_keys: ConstraintKeys,
    /// The minimised expected discounted system cost
    pub objective_value: Money,
}

impl<'a> Solution<'a> {
    /// The model which was solved
    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// The parameters of the solved problem
    pub fn params(&self) -> &'a Parameters {
        self.params
    }

    /// The variables of the problem
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The value of a variable in the solution
    pub fn value<const N: usize>(&self, table: &VariableTable<N>, index: [usize; N]) -> f64 {
        table.value(&self.columns, index)
    }

    /// Iterate over the electricity price (EUR/MWh) of each node, hour, period and scenario.
    ///
    /// Flow balance duals are in discounted, probability-weighted objective units, so they are
    /// divided by the objective weight of the hour to give an undiscounted price. Hours of a season
    /// or scenario with no weight are priced at zero.
    pub fn iter_prices(&self) -> impl Iterator<Item = ((usize, usize, usize, usize), f64)> + '_ {
        self.constraint_keys
            .flow_balance_keys
            .zip_duals(&self.dual_rows)
            .map(|(&(n, h, i, w), dual)| {
                let weight = operational_weight(self.params, self.model, h, i, w);
                ((n, h, i, w), price_from_dual(dual, weight))
            })
    }

    /// Iterate over the CO₂ price (EUR/t) of each period and scenario with a finite cap.
    ///
    /// Empty unless the emission cap is enabled.
    pub fn iter_co2_prices(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        let params = self.params;
        self.constraint_keys
            .emission_cap_keys
            .zip_duals(&self.dual_rows)
            .map(move |(&(i, w), dual)| {
                let weight = params.discount_multiplier[i]
                    * params.operational_discount
                    * params.scenario_probability[w]
                    * 1e6;
                // The dual of a `<=` row is non-positive in a minimisation
                ((i, w), price_from_dual(-dual, weight))
            })
    }
}
