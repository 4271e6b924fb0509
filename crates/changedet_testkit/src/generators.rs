//! Property-based test generators using proptest.

use chrono::{NaiveDate, NaiveTime};
use proptest::prelude::*;

/// Strategy for calendar dates from 1970 through 2096.
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    // Day numbers from the common era.
    (719_163i32..766_000).prop_filter_map("date in range", NaiveDate::from_num_days_from_ce_opt)
}

/// Strategy for a time of day at second precision.
pub fn time_strategy() -> impl Strategy<Value = NaiveTime> {
    (0u32..86_400).prop_filter_map("time in range", |secs| {
        NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
    })
}

/// Strategy for day offsets applied in place, zero included.
pub fn day_offset_strategy() -> impl Strategy<Value = i64> {
    -400i64..=400
}

/// Strategy for a short script of in-place day shifts.
pub fn day_offsets_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(day_offset_strategy(), 1..6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    proptest! {
        #[test]
        fn dates_stay_in_range(date in date_strategy()) {
            prop_assert!((1970..2100).contains(&date.year()));
        }
    }
}
