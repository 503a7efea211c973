//! Code for reading fuel prices from a CSV file.
use crate::fuel_cost::{FuelPrice, FuelPrices};
use crate::input::read_vec_from_csv;
use crate::vehicle::FuelType;
use crate::year::CalendarYear;
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const FUEL_PRICES_FILE_NAME: &str = "fuel_prices.csv";

/// A price row retrieved from the fuel prices CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct FuelPriceRaw {
    calendar_year: CalendarYear,
    fuel_type: FuelType,
    retail_price: f64,
    pretax_price: f64,
}

/// Read fuel prices from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_fuel_prices(model_dir: &Path) -> Result<FuelPrices> {
    let file_path = model_dir.join(FUEL_PRICES_FILE_NAME);
    let rows = read_vec_from_csv::<FuelPriceRaw>(&file_path)?;

    let mut prices = HashMap::new();
    for row in rows {
        // Keying prices by (year, fuel) keeps the retail and pre-tax series together; they are
        // split into separate metrics downstream
        let price = FuelPrice {
            retail: row.retail_price,
            pretax: row.pretax_price,
        };
        ensure!(
            prices
                .insert((row.calendar_year, row.fuel_type), price)
                .is_none(),
            "Duplicate {} price for {} in {}",
            row.fuel_type,
            row.calendar_year,
            file_path.display()
        );
    }

    Ok(FuelPrices(prices))
}
