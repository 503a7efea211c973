//! Newtypes for the year and age axes of the analysis.
//!
//! Fleet data is indexed by vehicle model year and vehicle age; costs and prices are indexed by
//! calendar year. Keeping the three axes as distinct types prevents them from being mixed up in
//! lookup keys.
use derive_more::{Add, Display};
use serde::{Deserialize, Serialize};

/// A vehicle model year
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ModelYear(pub u32);

/// A vehicle age in whole years. Age 0 is the sales year.
#[derive(
    Add, Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Age(pub u32);

/// A calendar year
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CalendarYear(pub u32);

impl std::ops::Add<Age> for ModelYear {
    type Output = CalendarYear;

    fn add(self, rhs: Age) -> CalendarYear {
        CalendarYear(self.0 + rhs.0)
    }
}

impl ModelYear {
    /// The model year `years` before this one
    pub fn years_before(self, years: u32) -> ModelYear {
        ModelYear(self.0.saturating_sub(years))
    }
}

impl CalendarYear {
    /// The (signed) number of years from `other` to this year
    pub fn years_since(self, other: CalendarYear) -> i32 {
        self.0 as i32 - other.0 as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_year_plus_age() {
        assert_eq!(ModelYear(2027) + Age(3), CalendarYear(2030));
    }

    #[test]
    fn test_years_since() {
        assert_eq!(CalendarYear(2030).years_since(CalendarYear(2027)), 3);
        assert_eq!(CalendarYear(2027).years_since(CalendarYear(2030)), -3);
    }

    #[test]
    fn test_years_before() {
        assert_eq!(ModelYear(2027).years_before(3), ModelYear(2024));
    }
}
