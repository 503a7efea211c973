//! Code for reading the regulatory options table from a CSV file.
use crate::input::read_vec_from_csv;
use crate::vehicle::{OptionID, OptionKind, OptionMap, RegulatoryOption};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::path::Path;

const OPTIONS_FILE_NAME: &str = "options.csv";

/// Read the regulatory options from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The map of options and the ID of the no-action option, or an error. Exactly one option must
/// be declared as the no-action baseline.
pub fn read_options(model_dir: &Path) -> Result<(OptionMap, OptionID)> {
    let options = read_vec_from_csv::<RegulatoryOption>(&model_dir.join(OPTIONS_FILE_NAME))?;
    read_options_from_iter(options.into_iter())
}

fn read_options_from_iter<I>(iter: I) -> Result<(OptionMap, OptionID)>
where
    I: Iterator<Item = RegulatoryOption>,
{
    let mut map = OptionMap::new();
    for option in iter {
        let id = option.id.clone();
        ensure!(
            map.insert(id.clone(), option).is_none(),
            "Duplicate option ID {id}"
        );
    }

    let baseline = map
        .values()
        .filter(|option| option.kind == OptionKind::NoAction)
        .map(|option| option.id.clone())
        .exactly_one()
        .ok()
        .context("Exactly one option must be declared as no-action")?;

    Ok((map, baseline))
}
