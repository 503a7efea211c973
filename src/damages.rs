//! Monetized emission damages.
//!
//! Pollutant inventories are valued with benefit-per-ton estimates. Each valuation is tied to a
//! criteria discount rate (the rate used in deriving the underlying mortality-risk values), and
//! the resulting metric is tagged with that rate: the discounting engine will only discount it at
//! the same rate, yielding NaN at any other.
use crate::finance::DiscountRate;
use crate::fleet::Pollutant;
use crate::year::CalendarYear;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Damage valuations in dollars per US ton, keyed by pollutant, criteria rate and calendar year
#[derive(Debug, Default, PartialEq)]
pub struct DamageCostInputs(pub HashMap<(Pollutant, DiscountRate, CalendarYear), f64>);

impl DamageCostInputs {
    /// The distinct (pollutant, criteria rate) valuations in the table, in a deterministic order
    pub fn valuations(&self) -> Vec<(Pollutant, DiscountRate)> {
        let mut valuations: Vec<_> = self
            .0
            .keys()
            .map(|(pollutant, rate, _)| (*pollutant, *rate))
            .collect();
        valuations.sort_by_key(|(pollutant, rate)| (pollutant.to_string(), rate.0.to_bits()));
        valuations.dedup();
        valuations
    }

    /// The dollars-per-ton valuation for a pollutant and criteria rate in a calendar year.
    ///
    /// A valuation that exists for some years but not the requested one is a missing required
    /// input.
    pub fn cost_per_ton(
        &self,
        pollutant: Pollutant,
        criteria_rate: DiscountRate,
        year: CalendarYear,
    ) -> Result<f64> {
        self.0
            .get(&(pollutant, criteria_rate, year))
            .copied()
            .with_context(|| {
                format!("No {pollutant} damage valuation at {criteria_rate} for {year}")
            })
    }
}
