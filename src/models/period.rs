//! Calendar month periods.
//!
//! Premiums are calculated per calendar month. This module contains the
//! [`Period`] type and the month arithmetic that the leave, bonus-cap and
//! rate-table rules are built on.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A calendar month for which premiums are calculated.
///
/// Periods order chronologically (year first, then month).
///
/// # Example
///
/// ```
/// use premium_engine::models::Period;
///
/// let period = Period::new(2025, 4).unwrap();
/// assert_eq!(period.to_string(), "2025-04");
/// assert_eq!(period.next(), Period::new(2025, 5).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// The calendar year.
    pub year: i32,
    /// The calendar month (1-12).
    pub month: u32,
}

impl Period {
    /// Creates a period, validating the month.
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// Returns the period containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Returns the last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Returns the following month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns the first month of the April-March fiscal year containing this period.
    ///
    /// ```
    /// use premium_engine::models::Period;
    ///
    /// let feb = Period::new(2026, 2).unwrap();
    /// assert_eq!(feb.fiscal_year_start(), Period::new(2025, 4).unwrap());
    /// ```
    pub fn fiscal_year_start(&self) -> Self {
        if self.month >= 4 {
            Self {
                year: self.year,
                month: 4,
            }
        } else {
            Self {
                year: self.year - 1,
                month: 4,
            }
        }
    }

    /// Returns the first month of the July-June bonus determination period
    /// containing this period.
    pub fn determination_period_start(&self) -> Self {
        if self.month >= 7 {
            Self {
                year: self.year,
                month: 7,
            }
        } else {
            Self {
                year: self.year - 1,
                month: 7,
            }
        }
    }

    /// Iterates the months from `self` up to, but excluding, `end`.
    pub fn until(self, end: Period) -> impl Iterator<Item = Period> {
        std::iter::successors(Some(self), |p| Some(p.next())).take_while(move |p| *p < end)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
