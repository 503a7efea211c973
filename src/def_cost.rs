//! The diesel exhaust fluid (DEF) cost model.
//!
//! Diesel vehicles consume DEF in proportion to the NOx reduction their aftertreatment must
//! deliver: a base dose rate derived from the NOx standard and engine-out NOx, plus an increment
//! for NOx reduced relative to the no-action option.
use crate::vehicle::RegClassID;
use crate::year::{CalendarYear, ModelYear};
use anyhow::{Context, Result, ensure};
use std::collections::HashMap;

/// Dose-rate inputs for one regulatory class and model year
#[derive(Clone, Debug, PartialEq)]
pub struct DoseRateInput {
    /// The NOx emission standard (g/hp-hr)
    pub nox_standard: f64,
    /// Engine-out NOx before aftertreatment (g/hp-hr)
    pub nox_engine_out: f64,
    /// Dose-rate curve slope
    pub slope: f64,
    /// Dose-rate curve intercept
    pub intercept: f64,
}

/// DEF input tables: dose rates by (regulatory class, model year) and prices by calendar year
#[derive(Debug, Default, PartialEq)]
pub struct DefInputs {
    /// Dose-rate inputs keyed by regulatory class and model year
    pub doserates: HashMap<(RegClassID, ModelYear), DoseRateInput>,
    /// DEF price per gallon by calendar year
    pub prices: HashMap<CalendarYear, f64>,
}

/// Computes DEF consumption and cost for diesel vehicles
pub struct DefCostModel<'a> {
    inputs: &'a DefInputs,
    gallons_per_ton_nox: f64,
}

impl<'a> DefCostModel<'a> {
    /// Create a model over the given inputs.
    ///
    /// # Arguments
    ///
    /// * `inputs` - DEF dose-rate and price tables
    /// * `gallons_per_ton_nox` - DEF gallons consumed per US ton of NOx reduced
    pub fn new(inputs: &'a DefInputs, gallons_per_ton_nox: f64) -> Self {
        Self {
            inputs,
            gallons_per_ton_nox,
        }
    }

    /// The base DEF dose rate (as a fraction of fuel gallons) for a regulatory class and model
    /// year
    pub fn base_doserate(&self, reg_class: &RegClassID, model_year: ModelYear) -> Result<f64> {
        let input = self
            .inputs
            .doserates
            .get(&(reg_class.clone(), model_year))
            .with_context(|| format!("No DEF dose-rate input for {reg_class}, MY {model_year}"))?;
        ensure!(
            input.slope != 0.0,
            "Zero DEF dose-rate slope for {reg_class}, MY {model_year}"
        );

        Ok(((input.nox_standard - input.nox_engine_out) - input.intercept) / input.slope)
    }

    /// DEF gallons consumed given fuel use and NOx reduced relative to the no-action option
    pub fn gallons(&self, fuel_gallons: f64, base_doserate: f64, nox_reduction: f64) -> f64 {
        fuel_gallons * base_doserate + nox_reduction * self.gallons_per_ton_nox
    }

    /// The DEF price per gallon in a calendar year
    pub fn price(&self, year: CalendarYear) -> Result<f64> {
        self.inputs
            .prices
            .get(&year)
            .copied()
            .with_context(|| format!("No DEF price for {year}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, def_inputs};
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_base_doserate() {
        let inputs = def_inputs();
        let model = DefCostModel::new(&inputs, 47.0);
        // ((0.2 - 4.0) - 0.0) / -100.0
        let result = model
            .base_doserate(&"HHD8".into(), ModelYear(2027))
            .unwrap();
        assert_approx_eq!(f64, result, 0.038, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_doserate_is_error() {
        let inputs = def_inputs();
        let model = DefCostModel::new(&inputs, 47.0);
        assert_error!(
            model.base_doserate(&"Urban Bus".into(), ModelYear(2027)),
            "No DEF dose-rate input for Urban Bus, MY 2027"
        );
    }

    #[test]
    fn test_gallons() {
        let inputs = def_inputs();
        let model = DefCostModel::new(&inputs, 47.0);
        let result = model.gallons(100_000.0, 0.038, 2.0);
        assert_approx_eq!(f64, result, 100_000.0 * 0.038 + 94.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_price_is_error() {
        let inputs = def_inputs();
        let model = DefCostModel::new(&inputs, 47.0);
        assert!(model.price(CalendarYear(1999)).is_err());
    }
}
