//! The indirect cost / markup model.
//!
//! Indirect costs are computed by marking up direct manufacturing cost with a set of markup
//! factors. A factor's input value can be used as-is, or scaled by the projected growth in
//! warranty or useful-life coverage relative to a base year (absolute scaling) or relative to a
//! lookback window (relative scaling, a step function that reverts once provisions stop
//! changing).
use crate::provision::{Provision, ProvisionMeasure, ProvisionSchedule};
use crate::vehicle::{EngineKey, FuelType};
use crate::year::ModelYear;
use anyhow::{Context, Result, ensure};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// An indirect cost markup factor
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
    strum::EnumIter,
)]
pub enum MarkupFactor {
    /// Warranty provisioning cost
    #[string = "Warranty"]
    Warranty,
    /// Research and development
    #[string = "RnD"]
    RnD,
    /// Other indirect costs
    #[string = "Other"]
    Other,
    /// Manufacturer profit
    #[string = "Profit"]
    Profit,
}

/// How a markup factor's input value is scaled over time
#[derive(Clone, Copy, PartialEq, Debug, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum Scaler {
    /// The input value is used unscaled
    #[string = "none"]
    None,
    /// Scaled by provision growth relative to a fixed base year
    #[string = "absolute"]
    Absolute,
    /// Scaled by provision growth relative to a lookback window
    #[string = "relative"]
    Relative,
}

/// The markup input for one (fuel type, factor)
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupInput {
    /// The input markup value (a multiplier on direct cost)
    pub value: f64,
    /// How the value is scaled over time
    pub scaler: Scaler,
    /// The provision whose growth drives the scaling (required unless unscaled)
    pub scaled_by: Option<Provision>,
    /// The measure of the scaling provision (required unless unscaled)
    pub scaled_measure: Option<ProvisionMeasure>,
    /// Lookback window in years for relative scaling
    pub num_years: Option<u32>,
}

/// Markup inputs keyed by fuel type and factor
pub type MarkupInputs = HashMap<(FuelType, MarkupFactor), MarkupInput>;

/// Computes per-vehicle project markup values and indirect costs.
///
/// Holds a per-run scaler cache only; construct a fresh instance for each analysis run.
pub struct IndirectCostModel<'a> {
    markups: &'a MarkupInputs,
    schedule: &'a ProvisionSchedule,
    base_year: ModelYear,
    /// Scaler cache keyed by (factor, engine, model year)
    scaler_cache: HashMap<(MarkupFactor, EngineKey, ModelYear), f64>,
}

impl<'a> IndirectCostModel<'a> {
    /// Create a model over the given markup inputs and provision schedule.
    ///
    /// # Arguments
    ///
    /// * `markups` - Markup inputs by fuel type and factor
    /// * `schedule` - The warranty/useful-life provision schedule
    /// * `base_year` - The base year for absolute scaling
    pub fn new(
        markups: &'a MarkupInputs,
        schedule: &'a ProvisionSchedule,
        base_year: ModelYear,
    ) -> Self {
        Self {
            markups,
            schedule,
            base_year,
            scaler_cache: HashMap::new(),
        }
    }

    /// The project markup value for one factor, engine and model year
    pub fn markup_value(
        &mut self,
        factor: MarkupFactor,
        engine: &EngineKey,
        model_year: ModelYear,
    ) -> Result<f64> {
        let input = self
            .markups
            .get(&(engine.fuel_type, factor))
            .with_context(|| {
                format!(
                    "No {factor} markup input for {} vehicles",
                    engine.fuel_type
                )
            })?;

        let scale = match input.scaler {
            Scaler::None => 1.0,
            Scaler::Absolute => {
                self.provision_growth(input, factor, engine, model_year, self.base_year)?
            }
            Scaler::Relative => {
                let num_years = input.num_years.with_context(|| {
                    format!("The {factor} markup uses relative scaling but has no num_years")
                })?;
                let reference_year = model_year.years_before(num_years);
                self.provision_growth(input, factor, engine, model_year, reference_year)?
            }
        };

        Ok(input.value * scale)
    }

    /// Growth in the scaling provision from `reference_year` to `model_year`, cached per run
    fn provision_growth(
        &mut self,
        input: &MarkupInput,
        factor: MarkupFactor,
        engine: &EngineKey,
        model_year: ModelYear,
        reference_year: ModelYear,
    ) -> Result<f64> {
        let key = (factor, engine.clone(), model_year);
        if let Some(&scale) = self.scaler_cache.get(&key) {
            return Ok(scale);
        }

        let provision = input
            .scaled_by
            .with_context(|| format!("The {factor} markup is scaled but has no scaled_by"))?;
        let measure = input
            .scaled_measure
            .with_context(|| format!("The {factor} markup is scaled but has no scaled_measure"))?;

        let current = self.schedule.get(engine, provision, measure, model_year)?;
        let reference = self
            .schedule
            .get(engine, provision, measure, reference_year)?;
        ensure!(
            reference != 0.0,
            "Zero {provision} {measure} provision for {engine} in {reference_year}"
        );

        let scale = current / reference;
        self.scaler_cache.insert(key, scale);
        Ok(scale)
    }

    /// Per-vehicle indirect cost for an engine and model year.
    ///
    /// Returns the indirect cost contribution of each markup factor along with their sum, which
    /// is itself recorded downstream as the synthetic `Indirect` factor.
    pub fn per_vehicle_cost(
        &mut self,
        engine: &EngineKey,
        model_year: ModelYear,
        direct_cost: f64,
    ) -> Result<IndirectCost> {
        let mut by_factor = Vec::new();
        let mut total = 0.0;
        for factor in MarkupFactor::iter() {
            let value = self.markup_value(factor, engine, model_year)? * direct_cost;
            by_factor.push((factor, value));
            total += value;
        }

        Ok(IndirectCost { by_factor, total })
    }
}

/// Per-vehicle indirect cost, broken down by markup factor
#[derive(Debug, PartialEq)]
pub struct IndirectCost {
    /// The contribution of each markup factor
    pub by_factor: Vec<(MarkupFactor, f64)>,
    /// The sum over all factors (the synthetic `Indirect` factor)
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{markup_inputs, provision_schedule};
    use float_cmp::assert_approx_eq;

    fn engine() -> EngineKey {
        EngineKey {
            reg_class: "HHD8".into(),
            fuel_type: FuelType::Diesel,
        }
    }

    /// The fixture schedule doubles warranty miles between 2024 and 2027, so the absolute-scaled
    /// Warranty markup doubles too.
    #[test]
    fn test_absolute_scaling() {
        let markups = markup_inputs();
        let schedule = provision_schedule();
        let mut model = IndirectCostModel::new(&markups, &schedule, ModelYear(2024));

        let value = model
            .markup_value(MarkupFactor::Warranty, &engine(), ModelYear(2027))
            .unwrap();
        assert_approx_eq!(f64, value, 0.03 * 2.0, epsilon = 1e-12);
    }

    /// Relative scaling compares against the lookback year, so once provisions stop growing the
    /// scale reverts to 1.
    #[test]
    fn test_relative_scaling_reverts() {
        let markups = markup_inputs();
        let schedule = provision_schedule();
        let mut model = IndirectCostModel::new(&markups, &schedule, ModelYear(2024));

        // 2027 looks back to 2024: useful-life age grew from 8 to 10
        let grown = model
            .markup_value(MarkupFactor::Profit, &engine(), ModelYear(2027))
            .unwrap();
        assert_approx_eq!(f64, grown, 0.06 * 10.0 / 8.0, epsilon = 1e-12);

        // 2028 looks back to 2025, after which the provision is flat at 10
        let reverted = model
            .markup_value(MarkupFactor::Profit, &engine(), ModelYear(2028))
            .unwrap();
        assert_approx_eq!(f64, reverted, 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_unscaled_factor() {
        let markups = markup_inputs();
        let schedule = provision_schedule();
        let mut model = IndirectCostModel::new(&markups, &schedule, ModelYear(2024));

        let value = model
            .markup_value(MarkupFactor::RnD, &engine(), ModelYear(2028))
            .unwrap();
        assert_eq!(value, 0.05);
    }

    #[test]
    fn test_per_vehicle_cost_sums_factors() {
        let markups = markup_inputs();
        let schedule = provision_schedule();
        let mut model = IndirectCostModel::new(&markups, &schedule, ModelYear(2024));

        let indirect = model
            .per_vehicle_cost(&engine(), ModelYear(2028), 1000.0)
            .unwrap();
        assert_eq!(indirect.by_factor.len(), 4);
        let sum: f64 = indirect.by_factor.iter().map(|(_, value)| value).sum();
        assert_approx_eq!(f64, indirect.total, sum, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_markup_is_error() {
        let markups = MarkupInputs::new();
        let schedule = provision_schedule();
        let mut model = IndirectCostModel::new(&markups, &schedule, ModelYear(2024));
        assert!(
            model
                .markup_value(MarkupFactor::Warranty, &engine(), ModelYear(2027))
                .is_err()
        );
    }
}
