//! Code for reading markup factor inputs from a CSV file.
use crate::input::read_vec_from_csv;
use crate::markup::{MarkupFactor, MarkupInput, MarkupInputs, Scaler};
use crate::provision::{Provision, ProvisionMeasure};
use crate::vehicle::FuelType;
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MARKUPS_FILE_NAME: &str = "markups.csv";

/// A markup row retrieved from the markups CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct MarkupRaw {
    fuel_type: FuelType,
    factor: MarkupFactor,
    value: f64,
    scaler: Scaler,
    scaled_by: Option<Provision>,
    scaled_measure: Option<ProvisionMeasure>,
    num_years: Option<u32>,
}

/// Read markup inputs from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// Markup inputs keyed by (fuel type, factor), or an error.
pub fn read_markups(model_dir: &Path) -> Result<MarkupInputs> {
    let file_path = model_dir.join(MARKUPS_FILE_NAME);
    let markups = read_vec_from_csv::<MarkupRaw>(&file_path)?;
    read_markups_from_iter(markups.into_iter())
}

fn read_markups_from_iter<I>(iter: I) -> Result<MarkupInputs>
where
    I: Iterator<Item = MarkupRaw>,
{
    let mut inputs = MarkupInputs::new();
    for markup in iter {
        let scaled = markup.scaler != Scaler::None;
        ensure!(
            !scaled || (markup.scaled_by.is_some() && markup.scaled_measure.is_some()),
            "The {} {} markup is scaled but has no scaled_by/scaled_measure",
            markup.fuel_type,
            markup.factor
        );
        ensure!(
            markup.scaler != Scaler::Relative || markup.num_years.is_some(),
            "The {} {} markup uses relative scaling but has no num_years",
            markup.fuel_type,
            markup.factor
        );

        let input = MarkupInput {
            value: markup.value,
            scaler: markup.scaler,
            scaled_by: markup.scaled_by,
            scaled_measure: markup.scaled_measure,
            num_years: markup.num_years,
        };
        ensure!(
            inputs.insert((markup.fuel_type, markup.factor), input).is_none(),
            "Duplicate {} markup for {} vehicles",
            markup.factor,
            markup.fuel_type
        );
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_markups_file(dir_path: &Path, rows: &str) {
        let file_path = dir_path.join(MARKUPS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "fuel_type,factor,value,scaler,scaled_by,scaled_measure,num_years
{rows}"
        )
        .unwrap();
    }

    #[test]
    fn test_read_markups() {
        let dir = tempdir().unwrap();
        create_markups_file(
            dir.path(),
            "diesel,Warranty,0.03,absolute,Warranty,Miles,
diesel,RnD,0.05,none,,,
diesel,Profit,0.06,relative,UsefulLife,Age,3",
        );

        let inputs = read_markups(dir.path()).unwrap();
        assert_eq!(inputs.len(), 3);

        let warranty = &inputs[&(FuelType::Diesel, MarkupFactor::Warranty)];
        assert_eq!(warranty.scaler, Scaler::Absolute);
        assert_eq!(warranty.scaled_by, Some(Provision::Warranty));

        let profit = &inputs[&(FuelType::Diesel, MarkupFactor::Profit)];
        assert_eq!(profit.num_years, Some(3));
    }

    #[test]
    fn test_scaled_markup_without_reference_is_error() {
        let dir = tempdir().unwrap();
        create_markups_file(dir.path(), "diesel,Warranty,0.03,absolute,,,");
        assert!(read_markups(dir.path()).is_err());
    }

    #[test]
    fn test_relative_markup_without_num_years_is_error() {
        let dir = tempdir().unwrap();
        create_markups_file(dir.path(), "diesel,Profit,0.06,relative,UsefulLife,Age,");
        assert!(read_markups(dir.path()).is_err());
    }

    #[test]
    fn test_duplicate_markup_is_error() {
        let dir = tempdir().unwrap();
        create_markups_file(
            dir.path(),
            "diesel,RnD,0.05,none,,,
diesel,RnD,0.06,none,,,",
        );
        assert!(read_markups(dir.path()).is_err());
    }
}
