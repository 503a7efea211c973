//! The fleet projection: population, activity and pollutant inventories by vehicle and year.
//!
//! The fleet table is the base data the entire pipeline is keyed on. It is validated on load:
//! calendar years must be consistent with model year plus age, and every action-option record
//! must have a no-action counterpart, since option comparisons and emission-reduction credits
//! are computed against the no-action option.
use crate::vehicle::{EngineKey, FuelType, OptionID, OptionMap, RegClassID, SourceTypeID, VehicleKey};
use crate::year::{Age, CalendarYear, ModelYear};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;

/// A pollutant tracked in the fleet inventory
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
pub enum Pollutant {
    /// Oxides of nitrogen
    #[string = "NOx"]
    #[strum(serialize = "NOx")]
    Nox,
    /// Total hydrocarbons
    #[string = "THC"]
    #[strum(serialize = "THC")]
    Thc,
    /// Fine particulate matter
    #[string = "PM25"]
    #[strum(serialize = "PM25")]
    Pm25,
}

/// One row of the fleet projection
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FleetRecord {
    /// The regulatory option
    pub option_id: OptionID,
    /// The source type
    pub source_type_id: SourceTypeID,
    /// The regulatory class
    pub reg_class_id: RegClassID,
    /// The fuel type
    pub fuel_type: FuelType,
    /// The vehicle model year
    pub model_year: ModelYear,
    /// The vehicle age
    pub age: Age,
    /// The calendar year (must equal model year plus age)
    pub calendar_year: CalendarYear,
    /// Vehicle population
    pub vpop: f64,
    /// Vehicle miles travelled (fleet total)
    pub vmt: f64,
    /// Fuel gallons consumed (fleet total)
    pub gallons: f64,
    /// NOx inventory in US tons
    pub nox_ustons: f64,
    /// THC inventory in US tons
    pub thc_ustons: f64,
    /// PM2.5 inventory in US tons
    pub pm25_ustons: f64,
}

impl FleetRecord {
    /// The vehicle this record describes
    pub fn vehicle(&self) -> VehicleKey {
        VehicleKey {
            option: self.option_id.clone(),
            source_type: self.source_type_id.clone(),
            reg_class: self.reg_class_id.clone(),
            fuel_type: self.fuel_type,
        }
    }

    /// The inventory tons for a pollutant
    pub fn tons(&self, pollutant: Pollutant) -> f64 {
        match pollutant {
            Pollutant::Nox => self.nox_ustons,
            Pollutant::Thc => self.thc_ustons,
            Pollutant::Pm25 => self.pm25_ustons,
        }
    }
}

/// The validated fleet projection
#[derive(Debug, Default, PartialEq)]
pub struct Fleet {
    records: Vec<FleetRecord>,
    index: HashMap<(VehicleKey, ModelYear, Age), usize>,
    sales: HashMap<(OptionID, EngineKey, ModelYear), f64>,
    vehicles: IndexSet<VehicleKey>,
    model_years: Vec<ModelYear>,
}

impl Fleet {
    /// Build a fleet from projection rows, validating consistency.
    ///
    /// # Arguments
    ///
    /// * `records` - Fleet projection rows
    /// * `options` - The declared regulatory options
    /// * `baseline` - The ID of the no-action option
    pub fn from_records(
        records: Vec<FleetRecord>,
        options: &OptionMap,
        baseline: &OptionID,
    ) -> Result<Fleet> {
        let mut index = HashMap::new();
        let mut sales: HashMap<(OptionID, EngineKey, ModelYear), f64> = HashMap::new();
        let mut vehicles = IndexSet::new();
        let mut model_years = Vec::new();

        for (position, record) in records.iter().enumerate() {
            let vehicle = record.vehicle();
            ensure!(
                options.contains_key(&record.option_id),
                "Unknown option ID {} in fleet projection",
                record.option_id
            );
            ensure!(
                record.calendar_year == record.model_year + record.age,
                "Calendar year {} does not equal model year {} plus age {} for {vehicle}",
                record.calendar_year,
                record.model_year,
                record.age
            );

            let key = (vehicle.clone(), record.model_year, record.age);
            ensure!(
                index.insert(key, position).is_none(),
                "Duplicate fleet record for {vehicle}, MY {}, age {}",
                record.model_year,
                record.age
            );

            if record.age == Age(0) {
                *sales
                    .entry((record.option_id.clone(), vehicle.engine(), record.model_year))
                    .or_default() += record.vpop;
                if !model_years.contains(&record.model_year) {
                    model_years.push(record.model_year);
                }
            }
            vehicles.insert(vehicle);
        }
        model_years.sort();

        let fleet = Fleet {
            records,
            index,
            sales,
            vehicles,
            model_years,
        };

        // Option comparisons require a no-action counterpart for every action record
        for record in &fleet.records {
            if &record.option_id != baseline {
                fleet.no_action_counterpart(record, baseline)?;
            }
        }

        Ok(fleet)
    }

    /// Iterate over all fleet records
    pub fn iter(&self) -> impl Iterator<Item = &FleetRecord> {
        self.records.iter()
    }

    /// The unique vehicles in the fleet, in input order
    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleKey> {
        self.vehicles.iter()
    }

    /// The model years with age-0 sales, sorted
    pub fn model_years(&self) -> &[ModelYear] {
        &self.model_years
    }

    /// Get the record for a vehicle, model year and age, if present
    pub fn get(&self, vehicle: &VehicleKey, model_year: ModelYear, age: Age) -> Option<&FleetRecord> {
        let key = (vehicle.clone(), model_year, age);
        self.index.get(&key).map(|&position| &self.records[position])
    }

    /// The no-action record corresponding to an action-option record.
    ///
    /// Failure indicates a fleet data inconsistency that would corrupt benefit calculations, so
    /// it is a hard error.
    pub fn no_action_counterpart(
        &self,
        record: &FleetRecord,
        baseline: &OptionID,
    ) -> Result<&FleetRecord> {
        let vehicle = record.vehicle().with_option(baseline);
        self.get(&vehicle, record.model_year, record.age)
            .with_context(|| {
                format!(
                    "No no-action record for {}, MY {}, age {}",
                    record.vehicle(),
                    record.model_year,
                    record.age
                )
            })
    }

    /// Age-0 sales for an option and engine in a model year, summed across source types.
    ///
    /// Returns 0 for model years in which the engine has no sales.
    pub fn sales(&self, option: &OptionID, engine: &EngineKey, model_year: ModelYear) -> f64 {
        let key = (option.clone(), engine.clone(), model_year);
        self.sales.get(&key).copied().unwrap_or(0.0)
    }

    /// Average per-vehicle VMT for a record, or 0 where the population is 0
    pub fn vmt_per_vehicle(&self, vehicle: &VehicleKey, model_year: ModelYear, age: Age) -> f64 {
        match self.get(vehicle, model_year, age) {
            Some(record) if record.vpop > 0.0 => record.vmt / record.vpop,
            _ => 0.0,
        }
    }

    /// The latest model year in the projection
    pub fn last_model_year(&self) -> Result<ModelYear> {
        match self.model_years.last() {
            Some(year) => Ok(*year),
            None => bail!("Fleet projection contains no age-0 records"),
        }
    }
}
