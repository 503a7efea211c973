//! Option comparisons and grouped summaries.
//!
//! Results are reported both as absolute values per option and as deltas of each action option
//! against the no-action baseline. The two kinds are kept apart with a tagged [`Comparison`]
//! variant rather than being encoded into the option ID space.
use crate::finance::{self, CostAccrual, DiscountRate};
use crate::records::{CostRecords, RecordKey, ValueMap, metric};
use crate::utils::safe_div;
use crate::vehicle::OptionID;
use crate::year::CalendarYear;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Distinguishes absolute results for an option from deltas against the no-action baseline
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Absolute results for an option
    Absolute(OptionID),
    /// Results for an action option minus the no-action baseline
    DeltaVsBaseline(OptionID),
}

impl Comparison {
    /// The option the results belong to
    pub fn option(&self) -> &OptionID {
        match self {
            Self::Absolute(option) | Self::DeltaVsBaseline(option) => option,
        }
    }

    /// The label written to the summary table's analysis column
    pub fn label(&self) -> &'static str {
        match self {
            Self::Absolute(_) => "absolute",
            Self::DeltaVsBaseline(_) => "delta-vs-no-action",
        }
    }
}

/// Compute per-record deltas of every action option against the no-action baseline.
///
/// Total metrics are differenced directly; average metrics are recomputed from the delta totals
/// over the action option's population and activity, recovering to 0 where those are 0. A
/// missing baseline record or metric is a hard error: it indicates inconsistent data that would
/// corrupt the comparison.
pub fn compute_option_deltas(records: &CostRecords, baseline: &OptionID) -> Result<CostRecords> {
    let mut deltas = CostRecords::new();
    for (key, bag) in records.iter() {
        if &key.vehicle.option == baseline {
            continue;
        }

        let baseline_key = RecordKey {
            vehicle: key.vehicle.with_option(baseline),
            ..key.clone()
        };
        let baseline_bag = records.bag(&baseline_key)?;

        let mut delta = ValueMap::with_capacity(bag.len());
        for (name, &value) in bag {
            if metric::is_average(&name.0) {
                continue;
            }
            let base = baseline_bag.get(name).copied().with_context(|| {
                format!("Metric {name} missing from no-action record for {baseline_key}")
            })?;
            delta.insert(name.clone(), value - base);
        }

        let vpop = bag.get(metric::VPOP).copied().unwrap_or(0.0);
        let vmt = bag.get(metric::VMT).copied().unwrap_or(0.0);
        for name in bag.keys() {
            if let Some(base) = metric::avg_per_veh_base(&name.0) {
                let total = delta.get(base).copied().unwrap_or(0.0);
                delta.insert(name.clone(), safe_div(total, vpop));
            } else if let Some(base) = metric::avg_per_mile_base(&name.0) {
                let total = delta.get(base).copied().unwrap_or(0.0);
                delta.insert(name.clone(), safe_div(total, vmt));
            }
        }

        deltas.insert_bag(key.clone(), delta)?;
    }

    Ok(deltas)
}

/// One row of the annual summary table
#[derive(Debug, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Whether the row holds absolute values or a delta against the no-action option
    pub analysis: String,
    /// The regulatory option
    pub option_id: OptionID,
    /// The discount rate of the underlying records
    pub discount_rate: DiscountRate,
    /// The calendar year
    pub calendar_year: CalendarYear,
    /// The metric summed across the fleet
    pub metric: crate::records::MetricID,
    /// The annual value
    pub annual: f64,
    /// The cumulative (present) value through this year; NaN for non-monetized metrics
    pub present_value: f64,
    /// The annualized value through this year; NaN for non-monetized metrics
    pub annualized: f64,
}

/// Build the annual summary table from absolute and delta records.
///
/// Total metrics are summed across vehicles per (comparison, rate, calendar year). For monetized
/// metrics a running cumulative value gives the present value through each year (record values
/// are already discounted), and the capital-recovery formula converts it to an annualized value.
/// Metrics tagged with a criteria rate annualize at that rate.
pub fn summarise(
    absolute: &CostRecords,
    deltas: &CostRecords,
    baseline: &OptionID,
    accrual: CostAccrual,
    discount_to: CalendarYear,
) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for (records, is_delta) in [(absolute, false), (deltas, true)] {
        type YearTotals = BTreeMap<CalendarYear, f64>;
        let mut groups: IndexMap<(Comparison, DiscountRate, crate::records::MetricID), YearTotals> =
            IndexMap::new();
        for (key, bag) in records.iter() {
            let comparison = if is_delta {
                Comparison::DeltaVsBaseline(key.vehicle.option.clone())
            } else {
                Comparison::Absolute(key.vehicle.option.clone())
            };
            debug_assert!(!is_delta || &key.vehicle.option != baseline);

            for (name, &value) in bag {
                if metric::is_average(&name.0) {
                    continue;
                }
                *groups
                    .entry((comparison.clone(), key.rate, name.clone()))
                    .or_default()
                    .entry(key.calendar_year())
                    .or_insert(0.0) += value;
            }
        }

        for ((comparison, rate, name), by_year) in groups {
            let monetized = metric::is_monetized(&name.0);
            let annualize_rate = metric::criteria_rate(&name.0).unwrap_or(rate);
            let mut running = 0.0;
            for (year, annual) in by_year {
                running += annual;
                let (present_value, annualized) = if monetized {
                    let annualized = finance::annualized_value(
                        running,
                        annualize_rate,
                        accrual,
                        discount_to,
                        year,
                    );
                    (running, annualized)
                } else {
                    (f64::NAN, f64::NAN)
                };
                rows.push(SummaryRow {
                    analysis: comparison.label().to_string(),
                    option_id: comparison.option().clone(),
                    discount_rate: rate,
                    calendar_year: year,
                    metric: name.clone(),
                    annual,
                    present_value,
                    annualized,
                });
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::vehicle::{FuelType, VehicleKey};
    use crate::year::{Age, ModelYear};
    use float_cmp::assert_approx_eq;

    fn vehicle(option: &str) -> VehicleKey {
        VehicleKey {
            option: option.into(),
            source_type: "long-haul".into(),
            reg_class: "HHD8".into(),
            fuel_type: FuelType::Diesel,
        }
    }

    fn records() -> CostRecords {
        let mut records = CostRecords::new();
        for (option, vpop, cost) in [("no-action", 1000.0, 400.0), ("proposal", 1000.0, 700.0)] {
            let key = RecordKey::nominal(vehicle(option), ModelYear(2027), Age(0));
            records.set(&key, metric::VPOP.into(), vpop);
            records.set(&key, metric::VMT.into(), vpop * 100_000.0);
            records.set(&key, metric::TECH_COST.into(), cost);
            records.set(
                &key,
                metric::avg_per_veh(metric::TECH_COST),
                cost / vpop,
            );
        }
        records
    }

    #[test]
    fn test_deltas_are_differences() {
        let records = records();
        let deltas = compute_option_deltas(&records, &"no-action".into()).unwrap();
        assert_eq!(deltas.len(), 1);

        let key = RecordKey::nominal(vehicle("proposal"), ModelYear(2027), Age(0));
        assert_approx_eq!(
            f64,
            deltas.value(&key, metric::TECH_COST).unwrap(),
            300.0,
            epsilon = 1e-12
        );
        // The per-vehicle average is recomputed over the action option's population
        assert_approx_eq!(
            f64,
            deltas
                .value(&key, "TechCost_AvgPerVeh")
                .unwrap(),
            0.3,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_delta_average_with_zero_population() {
        let mut records = CostRecords::new();
        for option in ["no-action", "proposal"] {
            let key = RecordKey::nominal(vehicle(option), ModelYear(2027), Age(0));
            records.set(&key, metric::VPOP.into(), 0.0);
            records.set(&key, metric::TECH_COST.into(), 100.0);
            records.set(&key, metric::avg_per_veh(metric::TECH_COST), 0.0);
        }
        let deltas = compute_option_deltas(&records, &"no-action".into()).unwrap();
        let key = RecordKey::nominal(vehicle("proposal"), ModelYear(2027), Age(0));
        assert_eq!(deltas.value(&key, "TechCost_AvgPerVeh").unwrap(), 0.0);
    }

    #[test]
    fn test_missing_baseline_record_is_error() {
        let mut records = CostRecords::new();
        let key = RecordKey::nominal(vehicle("proposal"), ModelYear(2027), Age(0));
        records.set(&key, metric::TECH_COST.into(), 100.0);
        assert_error!(
            compute_option_deltas(&records, &"no-action".into()),
            "No cost record for no-action/long-haul/HHD8/diesel, MY 2027, age 0, rate 0%"
        );
    }

    #[test]
    fn test_summary_sums_and_accumulates() {
        let mut records = CostRecords::new();
        // Two source types, two years; total cost 100 + 50 each year
        for source_type in ["long-haul", "vocational"] {
            for (year, value) in [(2027, 100.0), (2028, 100.0)] {
                let key = RecordKey::nominal(
                    VehicleKey {
                        option: "no-action".into(),
                        source_type: source_type.into(),
                        reg_class: "HHD8".into(),
                        fuel_type: FuelType::Diesel,
                    },
                    ModelYear(year),
                    Age(0),
                );
                records.set(&key, metric::TECH_COST.into(), value / 2.0);
                records.set(&key, metric::VPOP.into(), 10.0);
            }
        }

        let rows = summarise(
            &records,
            &CostRecords::new(),
            &"no-action".into(),
            CostAccrual::StartOfYear,
            CalendarYear(2027),
        );

        let cost_rows: Vec<_> = rows
            .iter()
            .filter(|row| &*row.metric.0 == metric::TECH_COST)
            .collect();
        assert_eq!(cost_rows.len(), 2);
        assert_approx_eq!(f64, cost_rows[0].annual, 100.0, epsilon = 1e-12);
        assert_approx_eq!(f64, cost_rows[1].present_value, 200.0, epsilon = 1e-12);

        // Non-monetized metrics get the not-applicable sentinel for derived columns
        let vpop_row = rows.iter().find(|row| &*row.metric.0 == metric::VPOP).unwrap();
        assert!(vpop_row.present_value.is_nan());
        assert!(vpop_row.annualized.is_nan());
    }
}
