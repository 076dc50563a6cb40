//! Ratemaking simulator for non-pipeline alternatives (NPAs) to gas pipe replacement.
//!
//! Given a set of gas utility, electric utility and program assumptions, the model projects rate
//! bases, revenue requirements, tariffs and household bills for every combination of who pays for
//! the NPA program and how the cost is recovered.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod asset;
pub mod bills;
pub mod cli;
pub mod engine;
pub mod finance;
pub mod input;
pub mod log;
pub mod output;
pub mod params;
pub mod results;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod time_series;
pub mod units;
pub mod warning;

#[cfg(test)]
mod fixture;

/// The name of the folder holding program configuration files
const CONFIG_DIR_NAME: &str = "npa_howtopay";

/// Get the folder where program configuration files are stored
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push(CONFIG_DIR_NAME);

    path
}
