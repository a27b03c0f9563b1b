//! Functionality for carrying out a planning run, from scenario sampling to results.
use crate::model::{Model, ModelStructure};
use crate::optimisation::{PlanningProblem, SolverOptions};
use crate::output::metadata::write_metadata;
use crate::output::{write_instance, write_load_adjustments, write_results};
use crate::preparation::prepare;
use crate::scenario::generate_scenarios;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Load a model, regenerating its stochastic tables first if the configuration asks for it.
///
/// # Arguments
///
/// * `model_dir` - Folder containing the model
/// * `output_dir` - Folder to which the sampling key is written, if sampling takes place
pub fn load_model(model_dir: &Path, output_dir: Option<&Path>) -> Result<Model> {
    let structure = ModelStructure::from_path(model_dir)?;
    if structure.config.use_scenario_generation {
        generate_scenarios(&structure, output_dir).context("Failed to generate scenarios.")?;
    } else {
        info!("Using existing stochastic tables");
    }

    structure.into_model()
}

/// Prepare, build and solve a model, writing all results to `output_dir`.
///
/// # Arguments
///
/// * `model` - The model to solve
/// * `output_dir` - Folder for results
/// * `solver_output` - Whether to show the solver's own output on the console
pub fn run(model: &Model, output_dir: &Path, solver_output: bool) -> Result<()> {
    let config = &model.config;
    info!("Starting run {}", config.run_name);

    let prepared = prepare(model).context("Failed to prepare model parameters.")?;
    write_load_adjustments(output_dir, &config.run_name, &prepared.load_adjustments)?;

    let problem = PlanningProblem::build(model, &prepared.parameters);
    if config.write_in_lp_format {
        problem.write_lp_file(&output_dir.join(format!("{}.lp", config.run_name)))?;
    }

    let solution = problem.solve(&SolverOptions::for_model(model, solver_output))?;
    write_results(output_dir, &solution)?;

    if config.serialize_instance {
        write_instance(output_dir, model)?;
    }
    write_metadata(output_dir, &model.model_dir, config)?;

    Ok(())
}
