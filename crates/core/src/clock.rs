use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};

use crate::models::year_month::YearMonth;

/// Source of "now" for the ledger.
///
/// Every rule that depends on the real-world month (the future-month guard,
/// the carry-forward split between the current month and past months, the
/// trailing-year window) reads it from here, so tests can pin the date.
pub trait Clock: Send + Sync {
    /// Current instant, used for `createdAt`/`updatedAt` and `exportDate`.
    fn now(&self) -> DateTime<Utc>;

    /// Today's calendar date as the user sees it.
    fn today(&self) -> NaiveDate;

    /// The real-world month containing [`Clock::today`].
    fn current_month(&self) -> YearMonth {
        YearMonth::from_date(self.today())
    }
}

/// Wall-clock time; "today" follows the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Midday UTC on the given date, so the local/UTC date never disagrees.
    pub fn at_date(date: NaiveDate) -> Self {
        let midday = date.and_time(NaiveTime::MIN) + Duration::hours(12);
        Self {
            now: midday.and_utc(),
        }
    }

    /// Midday on the 15th of the given month.
    pub fn in_month(month: YearMonth) -> Self {
        Self::at_date(month.day(15))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}
