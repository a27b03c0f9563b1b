//! Generation of the stochastic input tables by sampling windows of historical time series.
//!
//! For every period, scenario and season a window of the historical data is chosen. The choice
//! is recorded in a [`SamplingKey`] and the stochastic tables are then built from the key alone,
//! so a key always reproduces the same tables.
use crate::input::stochastic::write_stochastic_data;
use crate::model::ModelStructure;
use crate::model::config::FilterMethod;
use anyhow::{Context, Result, ensure};
use log::info;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::Path;

pub mod emit;
pub mod key;
pub mod moments;
pub mod naming;
pub mod strategy;
pub mod stratified;
pub mod time_series;
pub mod voronoi;
pub mod window;

use emit::build_stochastic_data;
use key::{SAMPLING_KEY_FILE_NAME, SamplingKey};
use naming::NodeNames;
use strategy::{FixedSampler, StratifiedSampler, UniformSampler, WindowSampler, draw_windows};
use time_series::ScenarioData;
use window::WindowCatalogue;

/// Create the random number generator for sampling, logging the seed so a run can be repeated
pub fn create_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    info!("Scenario sampling seed: {seed}");
    StdRng::seed_from_u64(seed)
}

/// Choose the windows of every scenario according to the run configuration
fn sample_key(
    rng: &mut StdRng,
    structure: &ModelStructure,
    data: &ScenarioData,
) -> Result<SamplingKey> {
    let config = &structure.config;
    let time_index = &structure.time_index;

    if config.use_fixed_sample {
        let file_path = structure.scenario_data_dir().join(SAMPLING_KEY_FILE_NAME);
        ensure!(
            file_path.is_file(),
            "A fixed sample was requested but {} does not exist",
            file_path.display()
        );
        let key = SamplingKey::read(&file_path)?;
        info!("Using fixed sample from {}", file_path.display());
        return draw_windows(&mut FixedSampler::new(&key), rng, config, time_index);
    }

    let catalogue = WindowCatalogue::new(data, time_index)?;
    let mut sampler: Box<dyn WindowSampler + '_> = match config.scenario_generation.filter {
        FilterMethod::Uniform => Box::new(UniformSampler::new(&catalogue, time_index)),
        FilterMethod::KMeans | FilterMethod::Voronoi => Box::new(StratifiedSampler::new(
            rng,
            data,
            &catalogue,
            time_index,
            config,
        )?),
    };

    let options = &config.scenario_generation;
    if !options.moment_matching {
        return draw_windows(sampler.as_mut(), rng, config, time_index);
    }

    info!(
        "Comparing {} candidate scenario trees by their load moments",
        options.n_tree_compare
    );
    let trees = (0..options.n_tree_compare.max(1))
        .map(|_| draw_windows(sampler.as_mut(), rng, config, time_index))
        .collect::<Result<Vec<_>>>()?;
    moments::choose_tree(trees, data, time_index)
}

/// Sample scenarios and write the stochastic tables to the model's tab folder.
///
/// # Arguments
///
/// * `structure` - The model, without its parameter tables
/// * `output_dir` - Folder to which the sampling key used is written, if any
pub fn generate_scenarios(
    structure: &ModelStructure,
    output_dir: Option<&Path>,
) -> Result<SamplingKey> {
    let config = &structure.config;
    let scenario_dir = structure.scenario_data_dir();
    let names = NodeNames::from_dir(&scenario_dir)?;
    let data = ScenarioData::read(&scenario_dir, &config.time_format, &names, &structure.sets.nodes)
        .context("Could not read scenario time series")?;
    info!(
        "Read scenario time series for {} years",
        data.years().count()
    );

    let mut rng = create_rng(config.scenario_seed);
    let key = sample_key(&mut rng, structure, &data)?;
    let tables = build_stochastic_data(&key, &data, &structure.sets, &structure.time_index, config)?;

    let tab_dir = structure.tab_dir();
    write_stochastic_data(&tab_dir, &tables)?;
    info!(
        "Wrote stochastic tables for {} periods and {} scenarios to {}",
        config.num_periods(),
        config.number_of_scenarios,
        tab_dir.display()
    );

    if let Some(output_dir) = output_dir {
        key.write(&output_dir.join(SAMPLING_KEY_FILE_NAME))?;
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_create_rng_with_seed() {
        let a: u64 = create_rng(Some(5)).r#gen();
        let b: u64 = create_rng(Some(5)).r#gen();
        assert_eq!(a, b);
    }
}
