//! The model definition: configuration, time structure, sets and input data.
use crate::graph::check_network;
use crate::input::sets::read_sets;
use crate::input::{InputContext, InputData, SCENARIO_DATA_DIR, read_input_data, tab_dir};
use crate::time_index::TimeIndex;
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

pub mod config;
pub mod sets;

use config::RunConfig;
use sets::Sets;

/// The structural part of a model, available before the stochastic tables exist
#[derive(Debug)]
pub struct ModelStructure {
    /// Folder containing the model
    pub model_dir: PathBuf,
    /// Run configuration
    pub config: RunConfig,
    /// The operational time structure
    pub time_index: TimeIndex,
    /// Index sets
    pub sets: Sets,
}

/// A complete model, ready to be prepared and solved
#[derive(Debug)]
pub struct Model {
    /// Folder containing the model
    pub model_dir: PathBuf,
    /// Run configuration
    pub config: RunConfig,
    /// The operational time structure
    pub time_index: TimeIndex,
    /// Index sets
    pub sets: Sets,
    /// Parameter tables
    pub data: InputData,
}

/// Build the time index described by the configuration
pub fn build_time_index(config: &RunConfig) -> Result<TimeIndex> {
    TimeIndex::new(
        &config.regular_seasons,
        config.length_of_regular_season,
        config.n_peak_seasons,
        config.len_peak_season,
    )
}

impl ModelStructure {
    /// Read the configuration and sets of the model in the given folder
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref().to_path_buf();
        let config = RunConfig::from_path(&model_dir)?;
        let time_index = build_time_index(&config)?;
        let sets = read_sets(&tab_dir(&model_dir), config.north_sea)?;
        check_network(&sets);

        Ok(Self {
            model_dir,
            config,
            time_index,
            sets,
        })
    }

    /// The folder containing the tab files
    pub fn tab_dir(&self) -> PathBuf {
        tab_dir(&self.model_dir)
    }

    /// The folder containing scenario time series
    pub fn scenario_data_dir(&self) -> PathBuf {
        self.model_dir.join(SCENARIO_DATA_DIR)
    }

    /// Read the parameter tables, completing the model
    pub fn into_model(self) -> Result<Model> {
        let ctx = InputContext {
            sets: &self.sets,
            time_index: &self.time_index,
            num_periods: self.config.num_periods(),
            num_scenarios: self.config.number_of_scenarios,
        };
        let data = read_input_data(&self.tab_dir(), &ctx)
            .with_context(|| format!("Could not read input data for {}", self.model_dir.display()))?;

        info!(
            "Loaded model with {} nodes, {} generator types, {} storage types and {} links",
            self.sets.nodes.len(),
            self.sets.generators.len(),
            self.sets.storages.len(),
            self.sets.directional_links.len()
        );

        Ok(Model {
            model_dir: self.model_dir,
            config: self.config,
            time_index: self.time_index,
            sets: self.sets,
            data,
        })
    }
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        ModelStructure::from_path(model_dir)?.into_model()
    }

    /// The folder containing the tab files
    pub fn tab_dir(&self) -> PathBuf {
        tab_dir(&self.model_dir)
    }
}
