// Reporting windows. All boundaries are UTC.

use chrono::{DateTime, Datelike, Days, NaiveTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Since 00:00 today.
    Today,
    /// Since Monday 00:00 of the current ISO week.
    Week,
    /// Since 00:00 on the 1st of the current month.
    Month,
    /// The 24 hours before now. Used for any unrecognized token.
    Last24Hours,
}

impl Period {
    /// Exact, case-sensitive match on `today`, `week`, `month`; anything else is the 24h lookback.
    pub fn parse(token: &str) -> Self {
        match token {
            "today" => Period::Today,
            "week" => Period::Week,
            "month" => Period::Month,
            _ => Period::Last24Hours,
        }
    }

    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let midnight = |date: chrono::NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
        match self {
            Period::Today => midnight(today),
            Period::Week => midnight(
                today - Days::new(u64::from(today.weekday().num_days_from_monday())),
            ),
            Period::Month => midnight(today - Days::new(u64::from(today.day0()))),
            Period::Last24Hours => now - TimeDelta::hours(24),
        }
    }
}
