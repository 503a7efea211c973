//! General functions related to discounting and annualization.
//!
//! Annual dollar streams are converted to present values at a configured set of social discount
//! rates, and present values to annualized values with the standard capital-recovery-factor
//! formula. A single global accounting convention controls whether costs are modelled as incurred
//! at the start or the end of each year.
use crate::records::{CostRecords, RecordKey, ValueMap, metric};
use crate::year::CalendarYear;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::borrow::Borrow;
use std::fmt::Display;

/// A social discount rate, stored as a fraction (0.03 = 3%).
///
/// Rates originate from the run parameters and metric labels, so bitwise equality is sufficient
/// for use as a map key.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountRate(pub f64);

impl DiscountRate {
    /// The zero rate, denoting an undiscounted record
    pub const ZERO: DiscountRate = DiscountRate(0.0);

    /// The rate as a fraction
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether this is the zero (undiscounted) rate
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// The label used to tag metric names with this rate (e.g. "3pct")
    pub fn label(self) -> String {
        format!("{}pct", format_percent(self.0 * 100.0))
    }

    /// Parse a rate from a metric-name label (e.g. "3pct" => 0.03)
    pub fn from_label(label: &str) -> Option<DiscountRate> {
        let percent: f64 = label.strip_suffix("pct")?.parse().ok()?;
        Some(DiscountRate(percent / 100.0))
    }
}

impl PartialEq for DiscountRate {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for DiscountRate {}

impl std::hash::Hash for DiscountRate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Display for DiscountRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", format_percent(self.0 * 100.0))
    }
}

/// Format a percentage without a trailing ".0" for whole numbers
fn format_percent(percent: f64) -> String {
    if (percent - percent.round()).abs() < 1e-9 {
        format!("{}", percent.round() as i64)
    } else {
        format!("{percent}")
    }
}

/// Whether annual costs are modelled as incurred at the start or the end of each year
#[derive(Clone, Copy, Debug, PartialEq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum CostAccrual {
    /// Costs are incurred at the start of the year
    #[string = "start-of-year"]
    StartOfYear,
    /// Costs are incurred at the end of the year
    #[string = "end-of-year"]
    EndOfYear,
}

impl CostAccrual {
    /// The exponent offset applied when discounting a single year's value
    fn offset(self) -> i32 {
        match self {
            Self::StartOfYear => 0,
            Self::EndOfYear => 1,
        }
    }

    /// The additional period count used by the annualization formula
    fn annualized_offset(self) -> i32 {
        1 - self.offset()
    }
}

/// The factor by which a value in `year` is multiplied to discount it to `discount_to`
pub fn discount_factor(
    rate: DiscountRate,
    accrual: CostAccrual,
    year: CalendarYear,
    discount_to: CalendarYear,
) -> f64 {
    let exponent = year.years_since(discount_to) + accrual.offset();
    (1.0 + rate.value()).powi(exponent).recip()
}

/// The cumulative present value of an annual-value series through `through`
pub fn present_value<I>(
    rate: DiscountRate,
    accrual: CostAccrual,
    discount_to: CalendarYear,
    series: I,
    through: CalendarYear,
) -> f64
where
    I: IntoIterator<Item = (CalendarYear, f64)>,
{
    series
        .into_iter()
        .filter(|(year, _)| *year <= through)
        .map(|(year, value)| value * discount_factor(rate, accrual, year, discount_to))
        .sum()
}

/// The factor that converts a present value at `through` into an annualized value.
///
/// This is the standard capital-recovery-factor formula, with the period count adjusted for the
/// cost accrual convention.
pub fn annualization_factor(
    rate: DiscountRate,
    accrual: CostAccrual,
    discount_to: CalendarYear,
    through: CalendarYear,
) -> f64 {
    let periods = through.years_since(discount_to) + accrual.offset();
    let total_periods = periods + accrual.annualized_offset();
    if rate.is_zero() {
        if total_periods <= 0 {
            return 0.0;
        }
        return 1.0 / total_periods as f64;
    }
    let r = rate.value();
    r * (1.0 + r).powi(periods) / ((1.0 + r).powi(total_periods) - 1.0)
}

/// Annualize a present value at `through`
pub fn annualized_value(
    present_value: f64,
    rate: DiscountRate,
    accrual: CostAccrual,
    discount_to: CalendarYear,
    through: CalendarYear,
) -> f64 {
    present_value * annualization_factor(rate, accrual, discount_to, through)
}

/// Materialize discounted records at each of the given social rates.
///
/// For every nominal record (rate 0) a discounted record is created per rate. Monetized metrics
/// are multiplied by the discount factor for the record's calendar year; non-monetized metrics
/// (population, activity, inventory) are carried over unchanged. A metric tagged with a criteria
/// discount rate is discounted only at that rate; at any other rate its value is NaN, which marks
/// the combination as not applicable.
///
/// The nominal record itself serves as the 0% member of the configured rate set, so `rates` must
/// not contain the zero rate.
pub fn discount_records(
    records: &mut CostRecords,
    rates: &[DiscountRate],
    accrual: CostAccrual,
    discount_to: CalendarYear,
) -> Result<()> {
    let nominal_keys: Vec<RecordKey> = records
        .keys()
        .filter(|key| key.rate.is_zero())
        .cloned()
        .collect();

    for &rate in rates {
        ensure!(
            !rate.is_zero(),
            "The zero rate denotes the nominal record and cannot be discounted to"
        );

        for key in &nominal_keys {
            let year = key.calendar_year();
            let bag = records.bag(key)?;
            let mut discounted = ValueMap::with_capacity(bag.len());
            for (name, &value) in bag {
                let value = if !metric::is_monetized(name.borrow()) {
                    value
                } else {
                    match metric::criteria_rate(name.borrow()) {
                        Some(criteria) if criteria != rate => f64::NAN,
                        Some(criteria) => {
                            value * discount_factor(criteria, accrual, year, discount_to)
                        }
                        None => value * discount_factor(rate, accrual, year, discount_to),
                    }
                };
                discounted.insert(name.clone(), value);
            }

            let key = RecordKey {
                rate,
                ..key.clone()
            };
            records.insert_bag(key, discounted)?;
        }
    }

    Ok(())
}
