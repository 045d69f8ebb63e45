use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// A calendar month, the key of every monthly snapshot.
///
/// Ordering is chronological, which matches the lexicographic ordering of
/// the `YYYY-MM` string form used on disk and in backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Earliest representable month.
    pub const MIN: YearMonth = YearMonth { year: 0, month: 1 };

    /// Latest representable month.
    pub const MAX: YearMonth = YearMonth {
        year: 9999,
        month: 12,
    };

    /// Build from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(CoreError::InvalidYearMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`, clamped to [`YearMonth::MIN`]..=[`YearMonth::MAX`].
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        match date.year() {
            y if y < Self::MIN.year => Self::MIN,
            y if y > Self::MAX.year => Self::MAX,
            year => Self {
                year,
                month: date.month(),
            },
        }
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The preceding calendar month, or `None` at [`YearMonth::MIN`].
    #[must_use]
    pub fn checked_pred(&self) -> Option<Self> {
        match (self.year, self.month) {
            (0, 1) => None,
            (year, 1) => Some(Self { year: year - 1, month: 12 }),
            (year, month) => Some(Self { year, month: month - 1 }),
        }
    }

    /// The following calendar month, or `None` at [`YearMonth::MAX`].
    #[must_use]
    pub fn checked_succ(&self) -> Option<Self> {
        match (self.year, self.month) {
            (9999, 12) => None,
            (year, 12) => Some(Self { year: year + 1, month: 1 }),
            (year, month) => Some(Self { year, month: month + 1 }),
        }
    }

    /// The preceding calendar month; saturates at [`YearMonth::MIN`].
    #[must_use]
    pub fn pred(&self) -> Self {
        self.checked_pred().unwrap_or(*self)
    }

    /// The following calendar month; saturates at [`YearMonth::MAX`].
    #[must_use]
    pub fn succ(&self) -> Self {
        self.checked_succ().unwrap_or(*self)
    }

    /// Step `n` months back, saturating at [`YearMonth::MIN`].
    #[must_use]
    pub fn months_back(&self, n: u32) -> Self {
        (0..n).fold(*self, |ym, _| ym.pred())
    }

    /// A date within this month; `day` is clamped to the month's length.
    #[must_use]
    pub fn day(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, 31);
        (1..=day)
            .rev()
            .find_map(|d| NaiveDate::from_ymd_opt(self.year, self.month, d))
            .unwrap_or(NaiveDate::MIN)
    }

    /// `YYYY.MM`, the compact form used in date-range labels.
    #[must_use]
    pub fn dotted(&self) -> String {
        format!("{:04}.{:02}", self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CoreError;

    /// Parses strictly `YYYY-MM` (four-digit year, two-digit month).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidYearMonth(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4
            || month.len() != 2
            || !year.chars().all(|c| c.is_ascii_digit())
            || !month.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
