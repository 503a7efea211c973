//! Common routines for handling input data.
//!
//! Each table in a model directory has its own reader in a submodule; this module provides the
//! shared CSV/TOML helpers and the top-level [`load_model`] glue.
use crate::model::{Model, Parameters};
use anyhow::{Context, Result, ensure};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod cost;
use cost::read_direct_costs;
pub mod damage;
use damage::read_damage_costs;
pub mod def;
use def::read_def_inputs;
pub mod fleet;
use fleet::read_fleet;
pub mod fuel;
use fuel::read_fuel_prices;
pub mod markup;
use markup::read_markups;
pub mod option;
use option::read_options;
pub mod provision;
use provision::read_provisions;
pub mod repair;
use repair::read_repair_params;

/// Read a series of type Ts from a CSV file into a `Vec<T>`.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_vec_from_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;

    let mut vec = Vec::new();
    for result in reader.deserialize() {
        let record: T =
            result.with_context(|| format!("Error parsing {}", file_path.display()))?;
        vec.push(record);
    }
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Error parsing {}", file_path.display()))
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value is not between 0 and 1"))?;
    }

    Ok(value)
}

/// Read and cross-validate a complete model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = Parameters::from_path(model_dir)?;
    let (options, baseline) = read_options(model_dir)?;
    let fleet = read_fleet(model_dir, &options, &baseline)?;
    let direct_cost_inputs = read_direct_costs(model_dir, &options)?;
    let markup_inputs = read_markups(model_dir)?;
    let provision_schedule = read_provisions(model_dir)?;
    let repair_params = read_repair_params(model_dir)?;
    let def_inputs = read_def_inputs(model_dir)?;
    let fuel_prices = read_fuel_prices(model_dir)?;
    let damage_inputs = read_damage_costs(model_dir)?;

    Ok(Model {
        parameters,
        options,
        baseline,
        fleet,
        direct_cost_inputs,
        markup_inputs,
        provision_schedule,
        repair_params,
        def_inputs,
        fuel_prices,
        damage_inputs,
    })
}
