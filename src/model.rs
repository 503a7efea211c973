//! Code for analysis models.
//!
//! A model directory holds a `bca.toml` run-parameter file plus the CSV input tables. This
//! module defines the parameter file's structure and validation and the [`Model`] struct
//! bundling everything an analysis run needs.
use crate::damages::DamageCostInputs;
use crate::def_cost::DefInputs;
use crate::direct_cost::DirectCostInputs;
use crate::finance::{CostAccrual, DiscountRate};
use crate::fleet::Fleet;
use crate::fuel_cost::FuelPrices;
use crate::input::read_toml;
use crate::markup::MarkupInputs;
use crate::provision::ProvisionSchedule;
use crate::repair::RepairParams;
use crate::vehicle::{OptionID, OptionMap};
use crate::year::{Age, CalendarYear, ModelYear};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// The file name of the run-parameter file within a model directory
pub const PARAMETERS_FILE_NAME: &str = "bca.toml";

/// Discounting parameters
#[derive(Debug, Deserialize, PartialEq)]
pub struct DiscountingParameters {
    /// The low social discount rate
    pub low_rate: DiscountRate,
    /// The high social discount rate
    pub high_rate: DiscountRate,
    /// The year costs are discounted to
    pub discount_to_year: CalendarYear,
    /// Whether costs accrue at the start or the end of each year
    pub cost_accrual: CostAccrual,
}

/// Learning-curve parameters
#[derive(Debug, Deserialize, PartialEq)]
pub struct LearningParameters {
    /// The global learning exponent (negative or zero; negative means cost declines with volume)
    pub rate: f64,
}

/// Markup scaling parameters
#[derive(Debug, Deserialize, PartialEq)]
pub struct MarkupParameters {
    /// The base year for absolute markup scaling
    pub base_year: ModelYear,
}

/// Repair model parameters held in the parameter file
#[derive(Debug, Deserialize, PartialEq)]
pub struct RepairParameters {
    /// The age through which typical annual VMT is averaged
    pub typical_vmt_age_threshold: Age,
}

/// DEF model parameters held in the parameter file
#[derive(Debug, Deserialize, PartialEq)]
pub struct DefParameters {
    /// DEF gallons consumed per US ton of NOx reduced relative to the no-action option
    pub gallons_per_ton_nox_reduction: f64,
}

/// Fuel model parameters held in the parameter file
#[derive(Debug, Deserialize, PartialEq)]
pub struct FuelParameters {
    /// Millilitres of fuel captured by ORVR per gram of hydrocarbon reduced
    pub orvr_ml_per_gram: f64,
}

/// The contents of the run-parameter file
#[derive(Debug, Deserialize, PartialEq)]
pub struct Parameters {
    /// Discounting parameters
    pub discounting: DiscountingParameters,
    /// Learning-curve parameters
    pub learning: LearningParameters,
    /// Markup scaling parameters
    pub markups: MarkupParameters,
    /// Repair model parameters
    pub repair: RepairParameters,
    /// DEF model parameters
    pub def: DefParameters,
    /// Fuel model parameters
    pub fuel: FuelParameters,
}

impl Parameters {
    /// Read and validate the parameter file in the given model directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Parameters> {
        let file_path = model_dir.as_ref().join(PARAMETERS_FILE_NAME);
        let parameters: Parameters = read_toml(&file_path)?;
        parameters
            .check()
            .with_context(|| format!("Invalid parameters in {}", file_path.display()))?;

        Ok(parameters)
    }

    /// Validate parameter values
    fn check(&self) -> Result<()> {
        ensure!(
            self.learning.rate <= 0.0,
            "The learning rate must be negative or zero"
        );
        for rate in [self.discounting.low_rate, self.discounting.high_rate] {
            ensure!(
                rate.value() > 0.0,
                "Social discount rates must be positive (rate 0 denotes the nominal record)"
            );
        }
        ensure!(
            self.discounting.low_rate != self.discounting.high_rate,
            "The low and high social discount rates must differ"
        );
        ensure!(
            self.def.gallons_per_ton_nox_reduction >= 0.0,
            "DEF gallons per ton of NOx must not be negative"
        );
        ensure!(
            self.fuel.orvr_ml_per_gram >= 0.0,
            "The ORVR capture adjustment must not be negative"
        );

        Ok(())
    }
}

/// A loaded, validated analysis model
pub struct Model {
    /// The run parameters
    pub parameters: Parameters,
    /// The declared regulatory options
    pub options: OptionMap,
    /// The ID of the no-action option
    pub baseline: OptionID,
    /// The fleet projection
    pub fleet: Fleet,
    /// Technology package costs by option, engine and cost step
    pub direct_cost_inputs: DirectCostInputs,
    /// Markup inputs by fuel type and factor
    pub markup_inputs: MarkupInputs,
    /// The warranty/useful-life provision schedule
    pub provision_schedule: ProvisionSchedule,
    /// Repair cost parameters
    pub repair_params: RepairParams,
    /// DEF dose-rate and price tables
    pub def_inputs: DefInputs,
    /// Fuel prices by calendar year and fuel type
    pub fuel_prices: FuelPrices,
    /// Emission damage valuations
    pub damage_inputs: DamageCostInputs,
}

impl Model {
    /// The configured non-zero social discount rates
    pub fn social_rates(&self) -> [DiscountRate; 2] {
        [
            self.parameters.discounting.low_rate,
            self.parameters.discounting.high_rate,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, parameters};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_check_valid() {
        assert!(parameters().check().is_ok());
    }

    #[test]
    fn test_check_positive_learning_rate() {
        let mut parameters = parameters();
        parameters.learning.rate = 0.1;
        assert_error!(
            parameters.check(),
            "The learning rate must be negative or zero"
        );
    }

    #[test]
    fn test_check_zero_social_rate() {
        let mut parameters = parameters();
        parameters.discounting.low_rate = DiscountRate::ZERO;
        assert!(parameters.check().is_err());
    }

    #[test]
    fn test_check_equal_social_rates() {
        let mut parameters = parameters();
        parameters.discounting.high_rate = parameters.discounting.low_rate;
        assert_error!(
            parameters.check(),
            "The low and high social discount rates must differ"
        );
    }

    #[test]
    fn test_parameters_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PARAMETERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "[discounting]
low_rate = 0.03
high_rate = 0.07
discount_to_year = 2027
cost_accrual = \"start-of-year\"

[learning]
rate = -0.2

[markups]
base_year = 2024

[repair]
typical_vmt_age_threshold = 6

[def]
gallons_per_ton_nox_reduction = 47.0

[fuel]
orvr_ml_per_gram = 0.166"
            )
            .unwrap();
        }

        let parameters = Parameters::from_path(dir.path()).unwrap();
        assert_eq!(parameters.discounting.low_rate, DiscountRate(0.03));
        assert_eq!(parameters.discounting.cost_accrual, CostAccrual::StartOfYear);
        assert_eq!(parameters.repair.typical_vmt_age_threshold, Age(6));
    }
}
