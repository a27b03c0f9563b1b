//! Common functionality for EMPIRE, a stochastic capacity-expansion planner for interconnected
//! power systems.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod finance;
pub mod graph;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod preparation;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod time_index;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program.
///
/// This is where the program settings file is stored.
pub fn get_empire_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // I have no idea on what kind of system this would happen, but let's be safe
        return PathBuf::default();
    };

    config_dir.push("empire");
    config_dir
}
