//! The learning-curve direct manufacturing cost model.
//!
//! Each regulatory standard introduces a "cost step": a model year at which a package of new
//! technology is added to an engine. The per-vehicle cost of each package declines with
//! cumulative production volume since the step, and an engine's total direct cost in a model year
//! is the layered sum of every step in effect, incremental to the no-action option.
use crate::fleet::Fleet;
use crate::vehicle::{EngineKey, OptionID};
use crate::year::ModelYear;
use anyhow::{Context, Result, ensure};
use std::collections::HashMap;

/// The undiscounted, unlearned technology package cost for one (option, engine, cost step)
#[derive(Clone, Debug, PartialEq)]
pub struct CostPackage {
    /// The summed cost of the package's technology line items, per vehicle
    pub pkg_cost: f64,
    /// Scaling constant for the learning seed volume
    pub seed_volume_factor: f64,
}

/// Technology package costs keyed by option, engine and cost step
pub type DirectCostInputs = HashMap<(OptionID, EngineKey, ModelYear), CostPackage>;

/// The learned per-vehicle cost of a package at a given cumulative production volume.
///
/// `learning_rate` is a negative-or-zero exponent, so cost declines as cumulative sales grow.
/// At `cumulative_sales == sales_year1` with a zero seed volume factor this reduces to exactly
/// `pkg_cost`.
pub fn learned_cost(
    pkg_cost: f64,
    seed_volume_factor: f64,
    learning_rate: f64,
    cumulative_sales: f64,
    sales_year1: f64,
) -> f64 {
    let seed = sales_year1 * seed_volume_factor;
    pkg_cost * ((cumulative_sales + seed) / (sales_year1 + seed)).powf(learning_rate)
}

/// Cumulative age-0 sales for one (option, engine) from a cost step's first year onwards
#[derive(Debug)]
struct CumulativeSales {
    /// Sales in the cost step's first year
    sales_year1: f64,
    /// Running sum of sales from the step year through each model year
    through_year: HashMap<ModelYear, f64>,
}

/// Computes per-vehicle direct manufacturing costs.
///
/// Holds per-run caches only; construct a fresh instance for each analysis run.
pub struct DirectCostModel<'a> {
    inputs: &'a DirectCostInputs,
    learning_rate: f64,
    baseline: OptionID,
    /// Cost steps per (option, engine), sorted by step year
    steps: HashMap<(OptionID, EngineKey), Vec<ModelYear>>,
    /// Cumulative-sales cache, keyed by (option, engine, cost step)
    sales_cache: HashMap<(OptionID, EngineKey, ModelYear), CumulativeSales>,
}

impl<'a> DirectCostModel<'a> {
    /// Create a model over the given package inputs.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Technology package costs by option, engine and cost step
    /// * `learning_rate` - The global learning exponent (must be <= 0)
    /// * `baseline` - The ID of the no-action option
    pub fn new(inputs: &'a DirectCostInputs, learning_rate: f64, baseline: OptionID) -> Self {
        let mut steps: HashMap<(OptionID, EngineKey), Vec<ModelYear>> = HashMap::new();
        for (option, engine, step) in inputs.keys() {
            steps
                .entry((option.clone(), engine.clone()))
                .or_default()
                .push(*step);
        }
        for step_years in steps.values_mut() {
            step_years.sort();
        }

        Self {
            inputs,
            learning_rate,
            baseline,
            steps,
            sales_cache: HashMap::new(),
        }
    }

    /// Total per-vehicle direct cost for an option and engine in a model year.
    ///
    /// For the no-action option this is the layered sum of its own cost steps; for action
    /// options the no-action total for the same engine and model year is added, since action
    /// package costs are incremental to the baseline.
    pub fn per_vehicle_cost(
        &mut self,
        fleet: &Fleet,
        option: &OptionID,
        engine: &EngineKey,
        model_year: ModelYear,
    ) -> Result<f64> {
        let steps = self
            .steps
            .get(&(option.clone(), engine.clone()))
            .with_context(|| format!("No direct cost packages for option {option}, {engine}"))?
            .clone();

        let mut total = 0.0;
        for step in steps {
            if step > model_year {
                break;
            }
            total += self.learned_step_cost(fleet, option, engine, step, model_year)?;
        }

        if option != &self.baseline {
            let baseline = self.baseline.clone();
            total += self.per_vehicle_cost(fleet, &baseline, engine, model_year)?;
        }

        Ok(total)
    }

    /// The learned contribution of one cost step to a model year's cost.
    ///
    /// A step with no sales in its first year has not yet started for this engine, so its
    /// contribution is 0.
    fn learned_step_cost(
        &mut self,
        fleet: &Fleet,
        option: &OptionID,
        engine: &EngineKey,
        step: ModelYear,
        model_year: ModelYear,
    ) -> Result<f64> {
        let package = self
            .inputs
            .get(&(option.clone(), engine.clone(), step))
            .with_context(|| {
                format!("No direct cost package for option {option}, {engine}, cost step {step}")
            })?;

        let learning_rate = self.learning_rate;
        let sales = self.cumulative_sales(fleet, option, engine, step)?;
        if sales.sales_year1 == 0.0 {
            return Ok(0.0);
        }
        let cumulative = sales
            .through_year
            .get(&model_year)
            .copied()
            .with_context(|| {
                format!("Model year {model_year} precedes cost step {step} for option {option}")
            })?;

        Ok(learned_cost(
            package.pkg_cost,
            package.seed_volume_factor,
            learning_rate,
            cumulative,
            sales.sales_year1,
        ))
    }

    /// Cumulative sales for a cost step, computed once per (option, engine, step) and cached
    fn cumulative_sales(
        &mut self,
        fleet: &Fleet,
        option: &OptionID,
        engine: &EngineKey,
        step: ModelYear,
    ) -> Result<&CumulativeSales> {
        let key = (option.clone(), engine.clone(), step);
        if !self.sales_cache.contains_key(&key) {
            let last_year = fleet.last_model_year()?;
            ensure!(
                step <= last_year,
                "Cost step {step} is beyond the fleet projection (last model year {last_year})"
            );

            let mut through_year = HashMap::new();
            let mut running = 0.0;
            for year in step.0..=last_year.0 {
                running += fleet.sales(option, engine, ModelYear(year));
                through_year.insert(ModelYear(year), running);
            }

            let sales = CumulativeSales {
                sales_year1: fleet.sales(option, engine, step),
                through_year,
            };
            self.sales_cache.insert(key.clone(), sales);
        }

        Ok(&self.sales_cache[&key])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{direct_cost_inputs, fleet};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1000.0, 0.0, -0.2, 100.0, 100.0, 1000.0)] // no learning has occurred yet
    #[case(1000.0, 0.1, -0.2, 100.0, 100.0, 1000.0)] // seed volume cancels at year 1
    #[case(1000.0, 0.1, -0.2, 1000.0, 100.0, 641.821501621456)] // tenfold cumulative volume
    #[case(1000.0, 0.0, 0.0, 5000.0, 100.0, 1000.0)] // zero learning rate
    fn test_learned_cost(
        #[case] pkg_cost: f64,
        #[case] seed_volume_factor: f64,
        #[case] learning_rate: f64,
        #[case] cumulative_sales: f64,
        #[case] sales_year1: f64,
        #[case] expected: f64,
    ) {
        let result = learned_cost(
            pkg_cost,
            seed_volume_factor,
            learning_rate,
            cumulative_sales,
            sales_year1,
        );
        assert_approx_eq!(f64, result, expected, epsilon = 1e-9);
    }

    /// Every model year's action-option cost equals the no-action cost plus the action option's
    /// own learned step contributions, with two overlapping cost steps in effect.
    #[test]
    fn test_cost_step_layering() {
        let fleet = fleet();
        let inputs = direct_cost_inputs();
        let mut model = DirectCostModel::new(&inputs, -0.2, "no-action".into());

        let engine = EngineKey {
            reg_class: "HHD8".into(),
            fuel_type: crate::vehicle::FuelType::Diesel,
        };
        let proposal: OptionID = "proposal".into();
        let no_action: OptionID = "no-action".into();

        let baseline_cost = model
            .per_vehicle_cost(&fleet, &no_action, &engine, ModelYear(2028))
            .unwrap();
        let step1 = model
            .learned_step_cost(&fleet, &proposal, &engine, ModelYear(2027), ModelYear(2028))
            .unwrap();
        let step2 = model
            .learned_step_cost(&fleet, &proposal, &engine, ModelYear(2028), ModelYear(2028))
            .unwrap();
        let total = model
            .per_vehicle_cost(&fleet, &proposal, &engine, ModelYear(2028))
            .unwrap();

        assert!(step1 > 0.0 && step2 > 0.0);
        assert_approx_eq!(f64, total, baseline_cost + step1 + step2, epsilon = 1e-9);
    }

    /// The 2028 step contributes nothing in 2027, before it takes effect
    #[test]
    fn test_later_step_not_layered_early() {
        let fleet = fleet();
        let inputs = direct_cost_inputs();
        let mut model = DirectCostModel::new(&inputs, -0.2, "no-action".into());

        let engine = EngineKey {
            reg_class: "HHD8".into(),
            fuel_type: crate::vehicle::FuelType::Diesel,
        };
        let proposal: OptionID = "proposal".into();
        let no_action: OptionID = "no-action".into();

        let baseline_cost = model
            .per_vehicle_cost(&fleet, &no_action, &engine, ModelYear(2027))
            .unwrap();
        let step1 = model
            .learned_step_cost(&fleet, &proposal, &engine, ModelYear(2027), ModelYear(2027))
            .unwrap();
        let total = model
            .per_vehicle_cost(&fleet, &proposal, &engine, ModelYear(2027))
            .unwrap();
        assert_approx_eq!(f64, total, baseline_cost + step1, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_engine_is_error() {
        let fleet = fleet();
        let inputs = direct_cost_inputs();
        let mut model = DirectCostModel::new(&inputs, -0.2, "no-action".into());

        let engine = EngineKey {
            reg_class: "Urban Bus".into(),
            fuel_type: crate::vehicle::FuelType::Diesel,
        };
        let result = model.per_vehicle_cost(&fleet, &"proposal".into(), &engine, ModelYear(2027));
        assert!(result.is_err());
    }
}
