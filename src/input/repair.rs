//! Code for reading emission-repair cost parameters from a CSV file.
use crate::input::read_vec_from_csv;
use crate::repair::RepairParams;
use anyhow::{Result, ensure};
use std::path::Path;

const REPAIR_FILE_NAME: &str = "repair.csv";

/// Read repair cost parameters from the specified model directory.
///
/// The table holds a single parameter row applied fleet-wide.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_repair_params(model_dir: &Path) -> Result<RepairParams> {
    let file_path = model_dir.join(REPAIR_FILE_NAME);
    let mut rows = read_vec_from_csv::<RepairParams>(&file_path)?;
    ensure!(
        rows.len() == 1,
        "Expected exactly one parameter row in {}",
        file_path.display()
    );

    Ok(rows.pop().unwrap()) // will never fail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::FuelType;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_repair_file(dir_path: &Path, rows: &str) {
        let file_path = dir_path.join(REPAIR_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "in_warranty_cpm,at_usefullife_cpm,max_cpm,emission_repair_share,reference_reg_class,reference_fuel_type
{rows}"
        )
        .unwrap();
    }

    #[test]
    fn test_read_repair_params() {
        let dir = tempdir().unwrap();
        create_repair_file(dir.path(), "0.01,0.03,0.05,0.85,HHD8,diesel");

        let params = read_repair_params(dir.path()).unwrap();
        assert_eq!(params.in_warranty_cpm, 0.01);
        assert_eq!(params.emission_repair_share, 0.85);
        assert_eq!(params.reference_fuel_type, FuelType::Diesel);
    }

    #[test]
    fn test_share_out_of_range_is_error() {
        let dir = tempdir().unwrap();
        create_repair_file(dir.path(), "0.01,0.03,0.05,1.85,HHD8,diesel");
        assert!(read_repair_params(dir.path()).is_err());
    }

    #[test]
    fn test_multiple_rows_is_error() {
        let dir = tempdir().unwrap();
        create_repair_file(
            dir.path(),
            "0.01,0.03,0.05,0.85,HHD8,diesel
0.02,0.04,0.06,0.85,HHD8,diesel",
        );
        assert!(read_repair_params(dir.path()).is_err());
    }
}
