//! Code for reading the fleet projection from a CSV file.
use crate::fleet::{Fleet, FleetRecord};
use crate::input::read_vec_from_csv;
use crate::vehicle::{OptionID, OptionMap};
use anyhow::{Context, Result};
use std::path::Path;

const FLEET_FILE_NAME: &str = "fleet.csv";

/// Read and validate the fleet projection from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `options` - The declared regulatory options
/// * `baseline` - The ID of the no-action option
pub fn read_fleet(model_dir: &Path, options: &OptionMap, baseline: &OptionID) -> Result<Fleet> {
    let file_path = model_dir.join(FLEET_FILE_NAME);
    let records = read_vec_from_csv::<FleetRecord>(&file_path)?;
    Fleet::from_records(records, options, baseline)
        .with_context(|| format!("Invalid fleet projection in {}", file_path.display()))
}
