use chrono::{NaiveDateTime, Utc};

/// The current time in UTC without an attached offset. Every stored
/// timestamp comes from here, so comparisons never mix naive and aware
/// values.
pub fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}
