//! Time-based identifiers.

use chrono::{DateTime, Local, TimeZone};

/// Millisecond-precision identifier such as `2024-05-01_13-45-09-123`.
pub fn time_id<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m-%d_%H-%M-%S-%3f").to_string()
}

/// [`time_id`] for the current local time.
pub fn time_id_now() -> String {
    time_id(&Local::now())
}
