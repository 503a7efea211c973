//! Code for reading emission damage valuations from a CSV file.
use crate::damages::DamageCostInputs;
use crate::finance::DiscountRate;
use crate::fleet::Pollutant;
use crate::input::read_vec_from_csv;
use crate::year::CalendarYear;
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

const DAMAGE_COSTS_FILE_NAME: &str = "damage_costs.csv";

/// A valuation row retrieved from the damage costs CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DamageCostRaw {
    pollutant: Pollutant,
    criteria_rate: DiscountRate,
    calendar_year: CalendarYear,
    cost_per_ton: f64,
}

/// Read emission damage valuations from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_damage_costs(model_dir: &Path) -> Result<DamageCostInputs> {
    let file_path = model_dir.join(DAMAGE_COSTS_FILE_NAME);
    let rows = read_vec_from_csv::<DamageCostRaw>(&file_path)?;

    let mut inputs = DamageCostInputs::default();
    for row in rows {
        ensure!(
            row.criteria_rate.value() > 0.0,
            "Non-positive criteria rate for {} valuation in {}",
            row.pollutant,
            file_path.display()
        );
        let key = (row.pollutant, row.criteria_rate, row.calendar_year);
        ensure!(
            inputs.0.insert(key, row.cost_per_ton).is_none(),
            "Duplicate {} valuation at {} for {} in {}",
            row.pollutant,
            row.criteria_rate,
            row.calendar_year,
            file_path.display()
        );
    }

    Ok(inputs)
}
