//! Fixtures for tests
use crate::damages::DamageCostInputs;
use crate::def_cost::{DefInputs, DoseRateInput};
use crate::direct_cost::{CostPackage, DirectCostInputs};
use crate::finance::{CostAccrual, DiscountRate};
use crate::fleet::{Fleet, FleetRecord, Pollutant};
use crate::fuel_cost::{FuelPrice, FuelPrices};
use crate::markup::{MarkupFactor, MarkupInput, MarkupInputs, Scaler};
use crate::model::{
    DefParameters, DiscountingParameters, FuelParameters, LearningParameters, MarkupParameters,
    Model, Parameters, RepairParameters,
};
use crate::provision::{Provision, ProvisionMeasure, ProvisionSchedule};
use crate::repair::RepairParams;
use crate::vehicle::{EngineKey, FuelType, OptionKind, OptionMap, RegulatoryOption};
use crate::year::{Age, CalendarYear, ModelYear};
use map_macro::hash_map;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn options() -> OptionMap {
    [
        ("no-action", OptionKind::NoAction, "Baseline standards"),
        ("proposal", OptionKind::Action, "Proposed standards"),
    ]
    .into_iter()
    .map(|(id, kind, description)| {
        (
            id.into(),
            RegulatoryOption {
                id: id.into(),
                description: description.to_string(),
                kind,
            },
        )
    })
    .collect()
}

#[fixture]
pub fn fleet_records() -> Vec<FleetRecord> {
    let mut records = Vec::new();
    for option in ["no-action", "proposal"] {
        for (source_type, reg_class, fuel_type) in [
            ("long-haul", "HHD8", FuelType::Diesel),
            ("vocational", "LHD45", FuelType::Gasoline),
        ] {
            for model_year in [2027, 2028] {
                for age in [0, 1] {
                    let diesel = fuel_type == FuelType::Diesel;
                    let action = option == "proposal";
                    let nox = match (diesel, action) {
                        (true, false) => 10.0,
                        (true, true) => 5.0,
                        (false, false) => 1.0,
                        (false, true) => 0.8,
                    };
                    let thc = match (diesel, action) {
                        (true, _) => 0.5,
                        (false, false) => 4.0,
                        (false, true) => 3.0,
                    };
                    records.push(FleetRecord {
                        option_id: option.into(),
                        source_type_id: source_type.into(),
                        reg_class_id: reg_class.into(),
                        fuel_type,
                        model_year: ModelYear(model_year),
                        age: Age(age),
                        calendar_year: CalendarYear(model_year + age),
                        vpop: 1000.0,
                        vmt: 100_000_000.0,
                        gallons: if diesel { 16_000_000.0 } else { 12_000_000.0 },
                        nox_ustons: nox,
                        thc_ustons: thc,
                        pm25_ustons: if action { 0.4 } else { 0.5 },
                    });
                }
            }
        }
    }

    records
}

#[fixture]
pub fn fleet() -> Fleet {
    Fleet::from_records(fleet_records(), &options(), &"no-action".into()).unwrap()
}

#[fixture]
pub fn provision_schedule() -> ProvisionSchedule {
    let mut schedule = ProvisionSchedule::new();
    for (reg_class, fuel_type) in [("HHD8", FuelType::Diesel), ("LHD45", FuelType::Gasoline)] {
        for year in 2024..=2028 {
            let engine = || EngineKey {
                reg_class: reg_class.into(),
                fuel_type,
            };
            let warranty_miles = if year < 2027 { 500_000.0 } else { 1_000_000.0 };
            let usefullife_age = if year < 2025 { 8.0 } else { 10.0 };
            let usefullife_miles = if year < 2025 { 1_000_000.0 } else { 1_200_000.0 };
            let values = [
                (Provision::Warranty, ProvisionMeasure::Age, 5.0),
                (Provision::Warranty, ProvisionMeasure::Miles, warranty_miles),
                (Provision::UsefulLife, ProvisionMeasure::Age, usefullife_age),
                (
                    Provision::UsefulLife,
                    ProvisionMeasure::Miles,
                    usefullife_miles,
                ),
            ];
            for (provision, measure, value) in values {
                schedule
                    .insert(engine(), provision, measure, ModelYear(year), value)
                    .unwrap();
            }
        }
    }

    schedule
}

#[fixture]
pub fn markup_inputs() -> MarkupInputs {
    let mut inputs = MarkupInputs::new();
    for fuel_type in [FuelType::Diesel, FuelType::Gasoline] {
        inputs.insert(
            (fuel_type, MarkupFactor::Warranty),
            MarkupInput {
                value: 0.03,
                scaler: Scaler::Absolute,
                scaled_by: Some(Provision::Warranty),
                scaled_measure: Some(ProvisionMeasure::Miles),
                num_years: None,
            },
        );
        inputs.insert(
            (fuel_type, MarkupFactor::RnD),
            MarkupInput {
                value: 0.05,
                scaler: Scaler::None,
                scaled_by: None,
                scaled_measure: None,
                num_years: None,
            },
        );
        inputs.insert(
            (fuel_type, MarkupFactor::Other),
            MarkupInput {
                value: 0.04,
                scaler: Scaler::None,
                scaled_by: None,
                scaled_measure: None,
                num_years: None,
            },
        );
        inputs.insert(
            (fuel_type, MarkupFactor::Profit),
            MarkupInput {
                value: 0.06,
                scaler: Scaler::Relative,
                scaled_by: Some(Provision::UsefulLife),
                scaled_measure: Some(ProvisionMeasure::Age),
                num_years: Some(3),
            },
        );
    }

    inputs
}

#[fixture]
pub fn direct_cost_inputs() -> DirectCostInputs {
    let package = |cost, seed_volume_factor| CostPackage {
        pkg_cost: cost,
        seed_volume_factor,
    };
    let engine = |reg_class: &str, fuel_type| EngineKey {
        reg_class: reg_class.into(),
        fuel_type,
    };

    DirectCostInputs::from([
        (
            (
                "no-action".into(),
                engine("HHD8", FuelType::Diesel),
                ModelYear(2027),
            ),
            package(200.0, 0.0),
        ),
        (
            (
                "proposal".into(),
                engine("HHD8", FuelType::Diesel),
                ModelYear(2027),
            ),
            package(1500.0, 0.1),
        ),
        (
            (
                "proposal".into(),
                engine("HHD8", FuelType::Diesel),
                ModelYear(2028),
            ),
            package(500.0, 0.1),
        ),
        (
            (
                "no-action".into(),
                engine("LHD45", FuelType::Gasoline),
                ModelYear(2027),
            ),
            package(100.0, 0.0),
        ),
        (
            (
                "proposal".into(),
                engine("LHD45", FuelType::Gasoline),
                ModelYear(2027),
            ),
            package(800.0, 0.1),
        ),
    ])
}

#[fixture]
pub fn def_inputs() -> DefInputs {
    let mut inputs = DefInputs::default();
    for year in [2027, 2028] {
        inputs.doserates.insert(
            ("HHD8".into(), ModelYear(year)),
            DoseRateInput {
                nox_standard: 0.2,
                nox_engine_out: 4.0,
                slope: -100.0,
                intercept: 0.0,
            },
        );
    }
    inputs.prices = hash_map! {
        CalendarYear(2027) => 2.80,
        CalendarYear(2028) => 2.85,
        CalendarYear(2029) => 2.90,
    };

    inputs
}

#[fixture]
pub fn fuel_prices() -> FuelPrices {
    let mut prices = FuelPrices::default();
    for year in 2027..=2029 {
        prices.0.insert(
            (CalendarYear(year), FuelType::Diesel),
            FuelPrice {
                retail: 4.0,
                pretax: 3.4,
            },
        );
        prices.0.insert(
            (CalendarYear(year), FuelType::Gasoline),
            FuelPrice {
                retail: 3.5,
                pretax: 3.0,
            },
        );
    }

    prices
}

#[fixture]
pub fn repair_params() -> RepairParams {
    RepairParams {
        in_warranty_cpm: 0.01,
        at_usefullife_cpm: 0.03,
        max_cpm: 0.05,
        emission_repair_share: 0.85,
        reference_reg_class: "HHD8".into(),
        reference_fuel_type: FuelType::Diesel,
    }
}

#[fixture]
pub fn damage_inputs() -> DamageCostInputs {
    let mut inputs = DamageCostInputs::default();
    for year in 2027..=2029 {
        inputs
            .0
            .insert((Pollutant::Nox, DiscountRate(0.03), CalendarYear(year)), 8000.0);
        inputs.0.insert(
            (Pollutant::Pm25, DiscountRate(0.03), CalendarYear(year)),
            150_000.0,
        );
        inputs.0.insert(
            (Pollutant::Pm25, DiscountRate(0.07), CalendarYear(year)),
            135_000.0,
        );
    }

    inputs
}

#[fixture]
pub fn parameters() -> Parameters {
    Parameters {
        discounting: DiscountingParameters {
            low_rate: DiscountRate(0.03),
            high_rate: DiscountRate(0.07),
            discount_to_year: CalendarYear(2027),
            cost_accrual: CostAccrual::StartOfYear,
        },
        learning: LearningParameters { rate: -0.2 },
        markups: MarkupParameters {
            base_year: ModelYear(2024),
        },
        repair: RepairParameters {
            typical_vmt_age_threshold: Age(1),
        },
        def: DefParameters {
            gallons_per_ton_nox_reduction: 47.0,
        },
        fuel: FuelParameters {
            orvr_ml_per_gram: 0.166,
        },
    }
}

#[fixture]
pub fn model() -> Model {
    Model {
        parameters: parameters(),
        options: options(),
        baseline: "no-action".into(),
        fleet: fleet(),
        direct_cost_inputs: direct_cost_inputs(),
        markup_inputs: markup_inputs(),
        provision_schedule: provision_schedule(),
        repair_params: repair_params(),
        def_inputs: def_inputs(),
        fuel_prices: fuel_prices(),
        damage_inputs: damage_inputs(),
    }
}
