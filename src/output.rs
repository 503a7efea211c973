//! The module responsible for writing output data to disk.
use crate::analysis::AnalysisOutput;
use crate::finance::DiscountRate;
use crate::records::{CostRecords, MetricID};
use crate::repair::{EstimatedAge, EstimatedAgeKey};
use crate::vehicle::{FuelType, OptionID, RegClassID, SourceTypeID, VehicleKey};
use crate::year::{Age, CalendarYear, ModelYear};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "fleetbca_results";

/// The output file name for the annual summary table
const SUMMARY_FILE_NAME: &str = "annual_summary.csv";

/// The output file name for the derived estimated-age records
const ESTIMATED_AGES_FILE_NAME: &str = "estimated_ages.csv";

/// The output file name for per-record cost detail
const DETAIL_FILE_NAME: &str = "cost_records.csv";

/// Get the default output folder for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model.
///
/// # Returns
///
/// Whether an existing directory will be overwritten, or an error if the directory exists and
/// `overwrite` was not given.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        ensure!(
            overwrite,
            "Output directory {} already exists (pass --overwrite to replace its contents)",
            output_dir.display()
        );
        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;
    Ok(false)
}

/// Represents a row in the per-record cost detail CSV file
#[derive(Serialize, Debug, PartialEq)]
struct DetailRow {
    analysis: String,
    option_id: OptionID,
    source_type_id: SourceTypeID,
    reg_class_id: RegClassID,
    fuel_type: FuelType,
    model_year: ModelYear,
    age: Age,
    calendar_year: CalendarYear,
    discount_rate: DiscountRate,
    metric: MetricID,
    value: f64,
}

/// Represents a row in the estimated ages CSV file
#[derive(Serialize, Debug, PartialEq)]
struct EstimatedAgeRow {
    option_id: OptionID,
    source_type_id: SourceTypeID,
    reg_class_id: RegClassID,
    fuel_type: FuelType,
    model_year: ModelYear,
    identifier: String,
    required_age: f64,
    calculated_age: f64,
    estimated_age: f64,
}

impl EstimatedAgeRow {
    /// Create a new [`EstimatedAgeRow`]
    fn new(key: &EstimatedAgeKey, estimate: &EstimatedAge) -> Self {
        let (vehicle, model_year, provision) = key;
        Self {
            option_id: vehicle.option.clone(),
            source_type_id: vehicle.source_type.clone(),
            reg_class_id: vehicle.reg_class.clone(),
            fuel_type: vehicle.fuel_type,
            model_year: *model_year,
            identifier: provision.to_string(),
            required_age: estimate.required,
            calculated_age: estimate.calculated,
            estimated_age: estimate.estimated,
        }
    }
}

/// An object for writing analysis results to CSV files
pub struct DataWriter {
    summary_writer: csv::Writer<File>,
    ages_writer: csv::Writer<File>,
    detail_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to.
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `write_detail` - Whether to also write the (large) per-record detail file
    pub fn create(output_path: &Path, write_detail: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let detail_writer = if write_detail {
            Some(new_writer(DETAIL_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            ages_writer: new_writer(ESTIMATED_AGES_FILE_NAME)?,
            detail_writer,
        })
    }

    /// Write all results from an analysis run to the output files
    pub fn write_results(&mut self, output: &AnalysisOutput) -> Result<()> {
        for row in &output.summary {
            self.summary_writer.serialize(row)?;
        }

        self.write_estimated_ages(&output.estimated_ages)?;

        if let Some(writer) = self.detail_writer.as_mut() {
            write_detail(writer, "absolute", &output.records)?;
            write_detail(writer, "delta-vs-no-action", &output.deltas)?;
        }

        Ok(())
    }

    /// Write the derived estimated-age records, sorted for deterministic output
    fn write_estimated_ages(
        &mut self,
        estimated_ages: &std::collections::HashMap<EstimatedAgeKey, EstimatedAge>,
    ) -> Result<()> {
        let rows = estimated_ages
            .iter()
            .map(|(key, estimate)| EstimatedAgeRow::new(key, estimate))
            .sorted_by(|a, b| {
                sort_key_for_ages(a).cmp(&sort_key_for_ages(b))
            });
        for row in rows {
            self.ages_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.summary_writer.flush()?;
        self.ages_writer.flush()?;
        if let Some(writer) = &mut self.detail_writer {
            writer.flush()?;
        }

        Ok(())
    }
}

/// Write one record table to the detail file in long format
fn write_detail(
    writer: &mut csv::Writer<File>,
    analysis: &str,
    records: &CostRecords,
) -> Result<()> {
    for (key, bag) in records.iter() {
        let VehicleKey {
            option,
            source_type,
            reg_class,
            fuel_type,
        } = &key.vehicle;
        for (name, &value) in bag {
            let row = DetailRow {
                analysis: analysis.to_string(),
                option_id: option.clone(),
                source_type_id: source_type.clone(),
                reg_class_id: reg_class.clone(),
                fuel_type: *fuel_type,
                model_year: key.model_year,
                age: key.age,
                calendar_year: key.calendar_year(),
                discount_rate: key.rate,
                metric: name.clone(),
                value,
            };
            writer.serialize(row)?;
        }
    }

    Ok(())
}

/// Sort key for estimated-age rows
fn sort_key_for_ages(row: &EstimatedAgeRow) -> (String, String, String, u32, String) {
    (
        row.option_id.to_string(),
        row.source_type_id.to_string(),
        row.reg_class_id.to_string(),
        row.model_year.0,
        row.identifier.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // Creating a fresh directory does not overwrite
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // A second run requires the overwrite flag
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
    }

    #[test]
    fn test_write_results() {
        let model = model();
        let output = crate::analysis::run(&model).unwrap();

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer.write_results(&output).unwrap();
            writer.flush().unwrap();
        }

        for file_name in [SUMMARY_FILE_NAME, ESTIMATED_AGES_FILE_NAME, DETAIL_FILE_NAME] {
            let contents = fs::read_to_string(dir.path().join(file_name)).unwrap();
            assert!(contents.lines().count() > 1, "{file_name} is empty");
        }
    }

    #[test]
    fn test_detail_file_optional() {
        let model = model();
        let output = crate::analysis::run(&model).unwrap();

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_results(&output).unwrap();
            writer.flush().unwrap();
        }

        assert!(!dir.path().join(DETAIL_FILE_NAME).exists());
    }
}
