// Domain models

mod health;
mod rates;
mod usage;

pub use health::{CollectorHealth, CollectorState};
pub use rates::{ALL_INTERFACES, LiveRate, RateKey, RateSnapshot, Rates};
pub use usage::{AppMinute, AppUsage, Application, Interface, MinuteBucket, Totals, UsageRow};
