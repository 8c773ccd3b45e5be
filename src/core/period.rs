//! Billing period value type.
//!
//! A billing period is a calendar year-month used to group ledger entries
//! into one bill. It parses from `"YYYY-MM"`, renders back the same way for
//! storage, and renders as `YYYYMM` for bill numbers.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

/// A calendar year-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Creates a period, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidPeriod {
                value: format!("{year}-{month}"),
            });
        }
        Ok(Self { year, month })
    }

    /// The period containing today's date.
    #[must_use]
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    /// The period containing the given date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Year component.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the period.
    ///
    /// # Panics
    /// Never panics: the month is validated on construction.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| unreachable!("month validated on construction"))
    }

    /// Last day of the period.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap_or_else(|| unreachable!("month validated on construction"))
            .pred_opt()
            .unwrap_or_else(|| unreachable!("first of month always has a predecessor"))
    }

    /// Whether the given date falls inside this period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The `YYYYMM` segment used in bill numbers.
    #[must_use]
    pub fn number_segment(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPeriod {
            value: s.to_string(),
        };

        let (year_str, month_str) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year_str.parse().map_err(|_| invalid())?;
        let month: u32 = month_str.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}
