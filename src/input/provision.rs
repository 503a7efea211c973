//! Code for reading the warranty/useful-life provision schedule from a CSV file.
use crate::input::read_vec_from_csv;
use crate::provision::{Provision, ProvisionMeasure, ProvisionSchedule};
use crate::vehicle::{EngineKey, FuelType, RegClassID};
use crate::year::ModelYear;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const PROVISIONS_FILE_NAME: &str = "provisions.csv";

/// A provision row retrieved from the provisions CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct ProvisionRaw {
    reg_class_id: RegClassID,
    fuel_type: FuelType,
    provision: Provision,
    measure: ProvisionMeasure,
    model_year: ModelYear,
    value: f64,
}

/// Read the provision schedule from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_provisions(model_dir: &Path) -> Result<ProvisionSchedule> {
    let file_path = model_dir.join(PROVISIONS_FILE_NAME);
    let rows = read_vec_from_csv::<ProvisionRaw>(&file_path)?;

    let mut schedule = ProvisionSchedule::new();
    for row in rows {
        let engine = EngineKey {
            reg_class: row.reg_class_id,
            fuel_type: row.fuel_type,
        };
        schedule
            .insert(engine, row.provision, row.measure, row.model_year, row.value)
            .with_context(|| format!("Duplicate provision entry in {}", file_path.display()))?;
    }

    Ok(schedule)
}
