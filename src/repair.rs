//! The estimated-age and emission-repair cost model.
//!
//! Repair cost per mile follows a piecewise curve in vehicle age: flat while the fleet is under
//! warranty, ramping linearly to the useful-life level, and stepping to a maximum beyond useful
//! life. The warranty and useful-life ages are *estimated* ages: the lesser of the regulatory
//! required age and the age at which a typical vehicle accumulates the required mileage.
use crate::fleet::Fleet;
use crate::provision::{Provision, ProvisionMeasure, ProvisionSchedule};
use crate::vehicle::{FuelType, RegClassID, VehicleKey};
use crate::year::{Age, ModelYear};
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;

/// Repair cost parameters, applied fleet-wide
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RepairParams {
    /// Cost per mile while under warranty, before scaling
    pub in_warranty_cpm: f64,
    /// Cost per mile at the useful-life age, before scaling
    pub at_usefullife_cpm: f64,
    /// Maximum cost per mile beyond useful life, before scaling
    pub max_cpm: f64,
    /// The share of repair costs attributable to the emission-control system
    #[serde(deserialize_with = "crate::input::deserialise_proportion")]
    pub emission_repair_share: f64,
    /// The regulatory class of the reference vehicle for direct-cost scaling
    pub reference_reg_class: RegClassID,
    /// The fuel type of the reference vehicle for direct-cost scaling
    pub reference_fuel_type: FuelType,
}

/// A derived warranty or useful-life age estimate for one vehicle and model year
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatedAge {
    /// The regulatory required age in years
    pub required: f64,
    /// The age at which a typical vehicle accumulates the required mileage
    pub calculated: f64,
    /// The estimated age: the lesser of required and calculated
    pub estimated: f64,
}

/// Key for the estimated-age records derived during a run
pub type EstimatedAgeKey = (VehicleKey, ModelYear, Provision);

/// The piecewise repair cost-per-mile curve, evaluated one year ahead of the given age.
///
/// Between the warranty and useful-life ages the cost ramps linearly; if the two ages coincide
/// the ramp degenerates and cost steps straight from the in-warranty to the maximum level.
pub fn piecewise_cpm(
    age: Age,
    warranty_age: f64,
    usefullife_age: f64,
    in_warranty_cpm: f64,
    at_usefullife_cpm: f64,
    max_cpm: f64,
) -> f64 {
    let slope = if usefullife_age > warranty_age {
        (at_usefullife_cpm - in_warranty_cpm) / (usefullife_age - warranty_age)
    } else {
        0.0
    };

    let next_age = (age.0 + 1) as f64;
    if next_age < warranty_age {
        in_warranty_cpm
    } else if next_age < usefullife_age {
        slope * (next_age - warranty_age) + in_warranty_cpm
    } else if next_age == usefullife_age {
        at_usefullife_cpm
    } else {
        max_cpm
    }
}

/// Computes estimated ages and emission-repair costs per mile.
///
/// The estimated-age and typical-VMT maps are pure caches keyed by vehicle and model year,
/// rebuilt for every run; they also serve as the derived estimated-age records written to
/// output.
pub struct RepairCostModel<'a> {
    params: &'a RepairParams,
    schedule: &'a ProvisionSchedule,
    vmt_age_threshold: Age,
    estimated_ages: HashMap<EstimatedAgeKey, EstimatedAge>,
    typical_vmt: HashMap<(VehicleKey, ModelYear), f64>,
}

impl<'a> RepairCostModel<'a> {
    /// Create a model over the given parameters and provision schedule.
    ///
    /// # Arguments
    ///
    /// * `params` - Repair cost parameters
    /// * `schedule` - The warranty/useful-life provision schedule
    /// * `vmt_age_threshold` - The age through which typical annual VMT is averaged
    pub fn new(
        params: &'a RepairParams,
        schedule: &'a ProvisionSchedule,
        vmt_age_threshold: Age,
    ) -> Self {
        Self {
            params,
            schedule,
            vmt_age_threshold,
            estimated_ages: HashMap::new(),
            typical_vmt: HashMap::new(),
        }
    }

    /// Typical annual per-vehicle VMT for a vehicle and model year: the cumulative average
    /// per-vehicle VMT through the age threshold, divided by (threshold + 1)
    pub fn typical_annual_vmt(
        &mut self,
        fleet: &Fleet,
        vehicle: &VehicleKey,
        model_year: ModelYear,
    ) -> f64 {
        let key = (vehicle.clone(), model_year);
        if let Some(&vmt) = self.typical_vmt.get(&key) {
            return vmt;
        }

        let threshold = self.vmt_age_threshold.0;
        let cumulative: f64 = (0..=threshold)
            .map(|age| fleet.vmt_per_vehicle(vehicle, model_year, Age(age)))
            .sum();
        let vmt = cumulative / (threshold + 1) as f64;
        self.typical_vmt.insert(key, vmt);
        vmt
    }

    /// The estimated warranty or useful-life age for a vehicle and model year
    pub fn estimated_age(
        &mut self,
        fleet: &Fleet,
        vehicle: &VehicleKey,
        model_year: ModelYear,
        provision: Provision,
    ) -> Result<EstimatedAge> {
        let key = (vehicle.clone(), model_year, provision);
        if let Some(&estimate) = self.estimated_ages.get(&key) {
            return Ok(estimate);
        }

        let engine = vehicle.engine();
        let required =
            self.schedule
                .get(&engine, provision, ProvisionMeasure::Age, model_year)?;
        let required_miles =
            self.schedule
                .get(&engine, provision, ProvisionMeasure::Miles, model_year)?;
        let typical_vmt = self.typical_annual_vmt(fleet, vehicle, model_year);

        // A zero typical VMT sends the calculated age to infinity, leaving the required age
        let calculated = required_miles / typical_vmt;
        let estimate = EstimatedAge {
            required,
            calculated,
            estimated: required.min(calculated),
        };
        self.estimated_ages.insert(key, estimate);
        Ok(estimate)
    }

    /// Emission-repair cost per mile for a vehicle at an age.
    ///
    /// `direct_cost_scaler` is the vehicle's per-vehicle direct cost relative to the reference
    /// vehicle's, scaling the generic repair curve to this vehicle's technology cost level.
    pub fn cost_per_mile(
        &mut self,
        fleet: &Fleet,
        vehicle: &VehicleKey,
        model_year: ModelYear,
        age: Age,
        direct_cost_scaler: f64,
    ) -> Result<f64> {
        let warranty = self.estimated_age(fleet, vehicle, model_year, Provision::Warranty)?;
        let usefullife = self.estimated_age(fleet, vehicle, model_year, Provision::UsefulLife)?;

        let scale = self.params.emission_repair_share * direct_cost_scaler;
        Ok(piecewise_cpm(
            age,
            warranty.estimated,
            usefullife.estimated,
            self.params.in_warranty_cpm * scale,
            self.params.at_usefullife_cpm * scale,
            self.params.max_cpm * scale,
        ))
    }

    /// The estimated-age records derived so far, for output
    pub fn estimated_ages(&self) -> &HashMap<EstimatedAgeKey, EstimatedAge> {
        &self.estimated_ages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{fleet, provision_schedule, repair_params};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.01)] // next age 1, under warranty
    #[case(3, 0.01)] // next age 4, still under warranty
    #[case(4, 0.01)] // next age 5 hits the warranty age: ramp begins at the in-warranty level
    #[case(6, 0.014)] // next age 7, two years into the ramp
    #[case(9, 0.03)] // next age 10 is the useful-life age
    #[case(10, 0.05)] // next age 11, beyond useful life
    fn test_piecewise_cpm(#[case] age: u32, #[case] expected: f64) {
        let result = piecewise_cpm(Age(age), 5.0, 10.0, 0.01, 0.03, 0.05);
        assert_approx_eq!(f64, result, expected, epsilon = 1e-12);
    }

    /// Cost per mile never decreases with age while the ramp is in effect
    #[test]
    fn test_cpm_monotonic_in_age() {
        let mut previous = 0.0;
        for age in 0..15 {
            let cpm = piecewise_cpm(Age(age), 5.0, 10.0, 0.01, 0.03, 0.05);
            assert!(cpm >= previous, "cpm decreased at age {age}");
            previous = cpm;
        }
    }

    /// With warranty and useful-life ages equal there is no ramp: cost steps straight from the
    /// in-warranty level to the maximum
    #[test]
    fn test_cpm_step_when_ages_equal() {
        assert_eq!(piecewise_cpm(Age(3), 5.0, 5.0, 0.01, 0.03, 0.05), 0.01);
        assert_eq!(piecewise_cpm(Age(4), 5.0, 5.0, 0.01, 0.03, 0.05), 0.03);
        assert_eq!(piecewise_cpm(Age(5), 5.0, 5.0, 0.01, 0.03, 0.05), 0.05);
    }

    #[test]
    fn test_estimated_age_minimum_of_required_and_calculated() {
        let fleet = fleet();
        let params = repair_params();
        let schedule = provision_schedule();
        let mut model = RepairCostModel::new(&params, &schedule, Age(1));

        let vehicle = fleet.vehicles().next().unwrap().clone();
        let estimate = model
            .estimated_age(&fleet, &vehicle, ModelYear(2027), Provision::Warranty)
            .unwrap();
        assert_eq!(estimate.required, 5.0);
        // Fixture vehicles travel 100,000 miles per year against a 1,000,000-mile warranty
        assert_approx_eq!(f64, estimate.calculated, 10.0, epsilon = 1e-9);
        assert_eq!(estimate.estimated, 5.0);
    }

    #[test]
    fn test_typical_annual_vmt_cached_per_run() {
        let fleet = fleet();
        let params = repair_params();
        let schedule = provision_schedule();
        let mut model = RepairCostModel::new(&params, &schedule, Age(1));

        let vehicle = fleet.vehicles().next().unwrap().clone();
        let first = model.typical_annual_vmt(&fleet, &vehicle, ModelYear(2027));
        let second = model.typical_annual_vmt(&fleet, &vehicle, ModelYear(2027));
        assert_eq!(first, second);
        assert_approx_eq!(f64, first, 100_000.0, epsilon = 1e-6);
    }
}
