//! The central table of per-record cost data.
//!
//! Every computation stage attaches metrics to a record identified by a [`RecordKey`]: a vehicle,
//! a model year, an age and a discount rate. The rate 0 key denotes the undiscounted ("nominal")
//! record; discounted projections of the same facts are produced by the discounting engine, never
//! read from input.
use crate::finance::DiscountRate;
use crate::id::define_id_type;
use crate::vehicle::VehicleKey;
use crate::year::{Age, CalendarYear, ModelYear};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::fmt::Display;

define_id_type! {MetricID}

/// The metrics attached to one record
pub type ValueMap = IndexMap<MetricID, f64>;

/// The primary lookup key for all per-year data
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// The vehicle the record describes
    pub vehicle: VehicleKey,
    /// The vehicle's model year
    pub model_year: ModelYear,
    /// The vehicle's age in this record
    pub age: Age,
    /// The discount rate (0 for the nominal record)
    pub rate: DiscountRate,
}

impl RecordKey {
    /// A nominal (undiscounted) key for the given vehicle, model year and age
    pub fn nominal(vehicle: VehicleKey, model_year: ModelYear, age: Age) -> Self {
        Self {
            vehicle,
            model_year,
            age,
            rate: DiscountRate::ZERO,
        }
    }

    /// The calendar year this record falls in
    pub fn calendar_year(&self) -> CalendarYear {
        self.model_year + self.age
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, MY {}, age {}, rate {}",
            self.vehicle, self.model_year, self.age, self.rate
        )
    }
}

/// The table of cost records, keyed by [`RecordKey`].
///
/// Lookups of absent records or metrics are hard errors: a missing key indicates inconsistent
/// fleet data or a stage run out of order, either of which would corrupt the analysis.
#[derive(Debug, Default, PartialEq)]
pub struct CostRecords(IndexMap<RecordKey, ValueMap>);

impl CostRecords {
    /// Create a new, empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of records in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table contains no records
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert a complete record, failing if the key already exists
    pub fn insert_bag(&mut self, key: RecordKey, bag: ValueMap) -> Result<()> {
        ensure!(
            !self.0.contains_key(&key),
            "Duplicate cost record for {key}"
        );
        self.0.insert(key, bag);
        Ok(())
    }

    /// Get the record for `key`, creating an empty one if absent
    pub fn bag_mut(&mut self, key: &RecordKey) -> &mut ValueMap {
        self.0.entry(key.clone()).or_default()
    }

    /// Set a metric on the record for `key`, creating the record if absent
    pub fn set(&mut self, key: &RecordKey, name: MetricID, value: f64) {
        self.bag_mut(key).insert(name, value);
    }

    /// Get the record for `key`, failing if it is absent
    pub fn bag(&self, key: &RecordKey) -> Result<&ValueMap> {
        self.0
            .get(key)
            .with_context(|| format!("No cost record for {key}"))
    }

    /// Get a metric value, failing if the record or the metric is absent
    pub fn value(&self, key: &RecordKey, name: &str) -> Result<f64> {
        self.bag(key)?
            .get(name)
            .copied()
            .with_context(|| format!("No {name} metric on record for {key}"))
    }

    /// Get a metric value if the record and metric both exist
    pub fn try_value(&self, key: &RecordKey, name: &str) -> Option<f64> {
        self.0.get(key)?.get(name).copied()
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &ValueMap)> {
        self.0.iter()
    }

    /// Iterate over all records mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&RecordKey, &mut ValueMap)> {
        self.0.iter_mut()
    }

    /// Iterate over all record keys
    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.0.keys()
    }
}

/// Metric names and naming conventions.
///
/// Metrics accumulate on records as computation stages run; there is no fixed schema. The naming
/// conventions encoded here are relied on by the discounting engine (which metrics are monetized,
/// which carry a criteria discount rate) and the aggregation layer (which metrics are averages).
pub mod metric {
    use super::MetricID;
    use crate::finance::DiscountRate;
    use crate::fleet::Pollutant;

    /// Vehicle population
    pub const VPOP: &str = "VPOP";
    /// Vehicle miles travelled
    pub const VMT: &str = "VMT";
    /// Fuel gallons consumed
    pub const GALLONS: &str = "Gallons";
    /// Fuel gallons paid for (consumption net of ORVR-captured gallons)
    pub const GALLONS_PAID_FOR: &str = "GallonsPaidFor";
    /// DEF gallons consumed
    pub const DEF_GALLONS: &str = "DEF_Gallons";
    /// Direct manufacturing cost
    pub const DIRECT_COST: &str = "DirectCost";
    /// Indirect (marked-up) cost
    pub const INDIRECT_COST: &str = "IndirectCost";
    /// Tech cost (direct plus indirect)
    pub const TECH_COST: &str = "TechCost";
    /// DEF cost
    pub const DEF_COST: &str = "DEFCost";
    /// Fuel cost at retail prices (owner-facing)
    pub const FUEL_COST_RETAIL: &str = "FuelCost_Retail";
    /// Fuel cost at pre-tax prices (used for program totals)
    pub const FUEL_COST_PRETAX: &str = "FuelCost_Pretax";
    /// Emission repair cost
    pub const REPAIR_COST: &str = "EmissionRepairCost";
    /// Operating cost (DEF + pre-tax fuel + emission repair)
    pub const OPERATING_COST: &str = "OperatingCost";
    /// Total cost (tech + operating)
    pub const TOTAL_COST: &str = "TotalCost";

    /// Suffix marking a per-vehicle average metric
    const AVG_PER_VEH_SUFFIX: &str = "_AvgPerVeh";
    /// Suffix marking a per-mile average metric
    const AVG_PER_MILE_SUFFIX: &str = "_AvgPerMile";

    /// The per-vehicle average form of a metric
    pub fn avg_per_veh(base: &str) -> MetricID {
        format!("{base}{AVG_PER_VEH_SUFFIX}").into()
    }

    /// The per-mile average form of a metric
    pub fn avg_per_mile(base: &str) -> MetricID {
        format!("{base}{AVG_PER_MILE_SUFFIX}").into()
    }

    /// The inventory-tons metric for a pollutant
    pub fn tons(pollutant: Pollutant) -> MetricID {
        format!("{pollutant}_UStons").into()
    }

    /// The damage-cost metric for a pollutant valued at the given criteria discount rate
    pub fn damage_cost(pollutant: Pollutant, criteria_rate: DiscountRate) -> MetricID {
        format!("{pollutant}Cost_{}", criteria_rate.label()).into()
    }

    /// Whether a metric is an average rather than a fleet total
    pub fn is_average(name: &str) -> bool {
        name.ends_with(AVG_PER_VEH_SUFFIX) || name.ends_with(AVG_PER_MILE_SUFFIX)
    }

    /// The total metric a per-vehicle average was derived from, if `name` is one
    pub fn avg_per_veh_base(name: &str) -> Option<&str> {
        name.strip_suffix(AVG_PER_VEH_SUFFIX)
    }

    /// The total metric a per-mile average was derived from, if `name` is one
    pub fn avg_per_mile_base(name: &str) -> Option<&str> {
        name.strip_suffix(AVG_PER_MILE_SUFFIX)
    }

    /// Whether a metric carries a dollar value (and is therefore subject to discounting)
    pub fn is_monetized(name: &str) -> bool {
        name.contains("Cost")
    }

    /// The criteria discount rate a metric is tagged with, if any
    pub fn criteria_rate(name: &str) -> Option<DiscountRate> {
        let (_, label) = name.rsplit_once('_')?;
        DiscountRate::from_label(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::fleet::Pollutant;
    use crate::vehicle::FuelType;

    fn key() -> RecordKey {
        RecordKey::nominal(
            VehicleKey {
                option: "proposal".into(),
                source_type: "long-haul".into(),
                reg_class: "HHD8".into(),
                fuel_type: FuelType::Diesel,
            },
            ModelYear(2027),
            Age(2),
        )
    }

    #[test]
    fn test_set_and_value() {
        let mut records = CostRecords::new();
        records.set(&key(), metric::VPOP.into(), 1000.0);
        assert_eq!(records.value(&key(), metric::VPOP).unwrap(), 1000.0);
        assert_eq!(records.try_value(&key(), metric::VMT), None);
    }

    #[test]
    fn test_missing_record_is_error() {
        let records = CostRecords::new();
        assert_error!(
            records.value(&key(), metric::VPOP),
            "No cost record for proposal/long-haul/HHD8/diesel, MY 2027, age 2, rate 0%"
        );
    }

    #[test]
    fn test_duplicate_insert_is_error() {
        let mut records = CostRecords::new();
        records.insert_bag(key(), ValueMap::new()).unwrap();
        assert!(records.insert_bag(key(), ValueMap::new()).is_err());
    }

    #[test]
    fn test_calendar_year() {
        assert_eq!(key().calendar_year(), CalendarYear(2029));
    }

    #[test]
    fn test_damage_cost_metric_round_trip() {
        let name = metric::damage_cost(Pollutant::Nox, DiscountRate(0.03));
        assert_eq!(&*name.0, "NOxCost_3pct");
        assert_eq!(metric::criteria_rate(&name.0), Some(DiscountRate(0.03)));
        assert!(metric::is_monetized(&name.0));
    }

    #[test]
    fn test_criteria_rate_does_not_misfire() {
        assert_eq!(metric::criteria_rate(metric::FUEL_COST_PRETAX), None);
        assert_eq!(metric::criteria_rate(metric::DEF_COST), None);
        assert_eq!(metric::criteria_rate("NOx_UStons"), None);
    }

    #[test]
    fn test_average_suffixes() {
        let per_veh = metric::avg_per_veh(metric::DEF_COST);
        assert!(metric::is_average(&per_veh.0));
        assert_eq!(metric::avg_per_veh_base(&per_veh.0), Some("DEFCost"));
        assert!(!metric::is_average(metric::DEF_COST));
    }
}
