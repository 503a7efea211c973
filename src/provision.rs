//! Warranty and useful-life provisions.
//!
//! Regulatory standards set both an emission warranty and a useful-life period for each
//! regulatory class/engine, each expressed as an age (years) and a mileage. The schedule of
//! provisions by model year drives two components: the markup scalers of the indirect cost model
//! and the estimated-age calculation of the emission-repair cost model.
use crate::utils::try_insert;
use crate::vehicle::EngineKey;
use crate::year::ModelYear;
use anyhow::{Context, Result};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;
use std::fmt::Display;

/// A regulatory coverage provision
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
pub enum Provision {
    /// The emission warranty period
    #[string = "Warranty"]
    Warranty,
    /// The regulatory useful-life period
    #[string = "UsefulLife"]
    UsefulLife,
}

/// The measure in which a provision is expressed
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum ProvisionMeasure {
    /// Coverage expressed as an age in years
    #[string = "Age"]
    Age,
    /// Coverage expressed as a mileage
    #[string = "Miles"]
    Miles,
}

/// Used for looking up provision values in a [`ProvisionSchedule`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ProvisionKey {
    engine: EngineKey,
    provision: Provision,
    measure: ProvisionMeasure,
    model_year: ModelYear,
}

impl Display for ProvisionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}) for {}",
            self.provision, self.measure, self.model_year, self.engine
        )
    }
}

/// The schedule of warranty/useful-life provisions by engine and model year.
///
/// Provision values are regulatory inputs; a missing entry is a hard error, never a default.
#[derive(Debug, Default, PartialEq)]
pub struct ProvisionSchedule(HashMap<ProvisionKey, f64>);

impl ProvisionSchedule {
    /// Create a new, empty schedule
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provision value to the schedule, failing on duplicates
    pub fn insert(
        &mut self,
        engine: EngineKey,
        provision: Provision,
        measure: ProvisionMeasure,
        model_year: ModelYear,
        value: f64,
    ) -> Result<()> {
        let key = ProvisionKey {
            engine,
            provision,
            measure,
            model_year,
        };
        try_insert(&mut self.0, key, value)
    }

    /// Look up a provision value, failing if it is absent
    pub fn get(
        &self,
        engine: &EngineKey,
        provision: Provision,
        measure: ProvisionMeasure,
        model_year: ModelYear,
    ) -> Result<f64> {
        let key = ProvisionKey {
            engine: engine.clone(),
            provision,
            measure,
            model_year,
        };
        self.0
            .get(&key)
            .copied()
            .with_context(|| format!("No provision input for {key}"))
    }

    /// Whether the schedule contains no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::vehicle::FuelType;

    fn engine() -> EngineKey {
        EngineKey {
            reg_class: "HHD8".into(),
            fuel_type: FuelType::Diesel,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut schedule = ProvisionSchedule::new();
        schedule
            .insert(
                engine(),
                Provision::Warranty,
                ProvisionMeasure::Miles,
                ModelYear(2027),
                500_000.0,
            )
            .unwrap();
        assert_eq!(
            schedule
                .get(
                    &engine(),
                    Provision::Warranty,
                    ProvisionMeasure::Miles,
                    ModelYear(2027)
                )
                .unwrap(),
            500_000.0
        );
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut schedule = ProvisionSchedule::new();
        for (value, expect_ok) in [(5.0, true), (6.0, false)] {
            let result = schedule.insert(
                engine(),
                Provision::Warranty,
                ProvisionMeasure::Age,
                ModelYear(2027),
                value,
            );
            assert_eq!(result.is_ok(), expect_ok);
        }
    }

    #[test]
    fn test_missing_entry_is_error() {
        let schedule = ProvisionSchedule::new();
        assert_error!(
            schedule.get(
                &engine(),
                Provision::UsefulLife,
                ProvisionMeasure::Age,
                ModelYear(2027)
            ),
            "No provision input for UsefulLife Age (2027) for HHD8 (diesel)"
        );
    }
}
