//! The fuel cost model, with the ORVR capture adjustment.
//!
//! On-board refuelling vapour recovery (ORVR) returns fuel vapour to the tank that would
//! otherwise evaporate, so hydrocarbon reductions relative to the no-action option are credited
//! against the gallons a gasoline vehicle's owner pays for. Retail prices drive owner-facing
//! averages; pre-tax prices drive program totals. The two series must never be conflated.
use crate::vehicle::FuelType;
use crate::year::CalendarYear;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Grams per US short ton
pub const GRAMS_PER_SHORT_TON: f64 = 907_185.0;

/// Gallons per millilitre
pub const GALLONS_PER_ML: f64 = 0.000_264_172;

/// Retail and pre-tax prices for one fuel in one calendar year
#[derive(Clone, Debug, PartialEq)]
pub struct FuelPrice {
    /// Retail price per gallon, including taxes
    pub retail: f64,
    /// Pre-tax price per gallon
    pub pretax: f64,
}

/// Fuel prices keyed by calendar year and fuel type
#[derive(Debug, Default, PartialEq)]
pub struct FuelPrices(pub HashMap<(CalendarYear, FuelType), FuelPrice>);

impl FuelPrices {
    /// The price for a fuel in a calendar year, failing if absent
    pub fn get(&self, year: CalendarYear, fuel_type: FuelType) -> Result<&FuelPrice> {
        self.0
            .get(&(year, fuel_type))
            .with_context(|| format!("No {fuel_type} fuel price for {year}"))
    }
}

/// Fuel expenditure for one record
#[derive(Debug, PartialEq)]
pub struct FuelCosts {
    /// Gallons paid for: consumption net of ORVR-captured gallons
    pub gallons_paid_for: f64,
    /// Expenditure at retail prices
    pub retail: f64,
    /// Expenditure at pre-tax prices
    pub pretax: f64,
}

/// Computes retail and pre-tax fuel expenditure
pub struct FuelCostModel<'a> {
    prices: &'a FuelPrices,
    orvr_ml_per_gram: f64,
}

impl<'a> FuelCostModel<'a> {
    /// Create a model over the given price table.
    ///
    /// # Arguments
    ///
    /// * `prices` - Fuel prices by calendar year and fuel type
    /// * `orvr_ml_per_gram` - Millilitres of fuel captured per gram of hydrocarbon reduced
    pub fn new(prices: &'a FuelPrices, orvr_ml_per_gram: f64) -> Self {
        Self {
            prices,
            orvr_ml_per_gram,
        }
    }

    /// Gallons of fuel captured by ORVR for a hydrocarbon reduction in US tons
    pub fn captured_gallons(&self, thc_reduction_tons: f64) -> f64 {
        thc_reduction_tons * self.orvr_ml_per_gram * GRAMS_PER_SHORT_TON * GALLONS_PER_ML
    }

    /// Fuel expenditure for a record.
    ///
    /// The ORVR adjustment applies to gasoline vehicles only; `thc_reduction_tons` is ignored
    /// for other fuels.
    pub fn costs(
        &self,
        fuel_type: FuelType,
        year: CalendarYear,
        gallons_consumed: f64,
        thc_reduction_tons: f64,
    ) -> Result<FuelCosts> {
        let captured = match fuel_type {
            FuelType::Gasoline => self.captured_gallons(thc_reduction_tons),
            FuelType::Diesel | FuelType::Cng => 0.0,
        };
        let gallons_paid_for = gallons_consumed - captured;
        let price = self.prices.get(year, fuel_type)?;

        Ok(FuelCosts {
            gallons_paid_for,
            retail: price.retail * gallons_paid_for,
            pretax: price.pretax * gallons_paid_for,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::fuel_prices;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_captured_gallons() {
        let prices = fuel_prices();
        let model = FuelCostModel::new(&prices, 0.166);
        let result = model.captured_gallons(2.0);
        assert_approx_eq!(
            f64,
            result,
            2.0 * 0.166 * GRAMS_PER_SHORT_TON * GALLONS_PER_ML,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_gasoline_gallons_adjusted() {
        let prices = fuel_prices();
        let model = FuelCostModel::new(&prices, 0.166);
        let costs = model
            .costs(FuelType::Gasoline, CalendarYear(2027), 1000.0, 1.0)
            .unwrap();
        assert!(costs.gallons_paid_for < 1000.0);
    }

    #[test]
    fn test_diesel_gallons_not_adjusted() {
        let prices = fuel_prices();
        let model = FuelCostModel::new(&prices, 0.166);
        let costs = model
            .costs(FuelType::Diesel, CalendarYear(2027), 1000.0, 1.0)
            .unwrap();
        assert_eq!(costs.gallons_paid_for, 1000.0);
    }

    /// Retail and pre-tax costs differ whenever the two prices differ
    #[test]
    fn test_retail_and_pretax_series_distinct() {
        let prices = fuel_prices();
        let model = FuelCostModel::new(&prices, 0.166);
        let costs = model
            .costs(FuelType::Diesel, CalendarYear(2027), 1000.0, 0.0)
            .unwrap();
        let price = prices.get(CalendarYear(2027), FuelType::Diesel).unwrap();
        assert!(price.retail != price.pretax);
        assert_approx_eq!(f64, costs.retail, price.retail * 1000.0, epsilon = 1e-9);
        assert_approx_eq!(f64, costs.pretax, price.pretax * 1000.0, epsilon = 1e-9);
        assert!(costs.retail != costs.pretax);
    }

    #[test]
    fn test_missing_price_is_error() {
        let prices = fuel_prices();
        let model = FuelCostModel::new(&prices, 0.166);
        assert!(
            model
                .costs(FuelType::Cng, CalendarYear(2027), 1000.0, 0.0)
                .is_err()
        );
    }
}
