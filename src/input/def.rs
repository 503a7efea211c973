//! Code for reading DEF dose-rate and price tables from CSV files.
use crate::def_cost::{DefInputs, DoseRateInput};
use crate::input::read_vec_from_csv;
use crate::vehicle::RegClassID;
use crate::year::{CalendarYear, ModelYear};
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

const DEF_DOSERATES_FILE_NAME: &str = "def_doserates.csv";
const DEF_PRICES_FILE_NAME: &str = "def_prices.csv";

/// A dose-rate row retrieved from the DEF dose-rates CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DoseRateRaw {
    reg_class_id: RegClassID,
    model_year: ModelYear,
    nox_standard: f64,
    nox_engine_out: f64,
    slope: f64,
    intercept: f64,
}

/// A price row retrieved from the DEF prices CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DefPriceRaw {
    calendar_year: CalendarYear,
    price_per_gallon: f64,
}

/// Read the DEF input tables from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_def_inputs(model_dir: &Path) -> Result<DefInputs> {
    let doserates_path = model_dir.join(DEF_DOSERATES_FILE_NAME);
    let mut inputs = DefInputs::default();
    for row in read_vec_from_csv::<DoseRateRaw>(&doserates_path)? {
        let value = DoseRateInput {
            nox_standard: row.nox_standard,
            nox_engine_out: row.nox_engine_out,
            slope: row.slope,
            intercept: row.intercept,
        };
        let key = (row.reg_class_id, row.model_year);
        ensure!(
            inputs.doserates.insert(key.clone(), value).is_none(),
            "Duplicate dose-rate entry for {}, MY {} in {}",
            key.0,
            key.1,
            doserates_path.display()
        );
    }

    let prices_path = model_dir.join(DEF_PRICES_FILE_NAME);
    for row in read_vec_from_csv::<DefPriceRaw>(&prices_path)? {
        ensure!(
            inputs
                .prices
                .insert(row.calendar_year, row.price_per_gallon)
                .is_none(),
            "Duplicate price entry for {} in {}",
            row.calendar_year,
            prices_path.display()
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

    fn create_def_files(dir_path: &Path) {
        let mut file = File::create(dir_path.join(DEF_DOSERATES_FILE_NAME)).unwrap();
        writeln!(
            file,
            "reg_class_id,model_year,nox_standard,nox_engine_out,slope,intercept
HHD8,2027,0.2,4.0,-100.0,0.0"
        )
        .unwrap();

        let mut file = File::create(dir_path.join(DEF_PRICES_FILE_NAME)).unwrap();
        writeln!(
            file,
            "calendar_year,price_per_gallon
2027,2.80
2028,2.85"
        )
        .unwrap();
    }

    #[test]
    fn test_read_def_inputs() {
        let dir = tempdir().unwrap();
        create_def_files(dir.path());

        let inputs = read_def_inputs(dir.path()).unwrap();
        assert_eq!(inputs.doserates.len(), 1);
        assert_eq!(inputs.prices[&CalendarYear(2028)], 2.85);

        let doserate = &inputs.doserates[&("HHD8".into(), ModelYear(2027))];
        assert_eq!(doserate.nox_engine_out, 4.0);
    }
}
