// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Holiday-key derivation for baseline bucket selection.
//!
//! Traffic around major US holidays does not look like the surrounding
//! weekdays, so baselines carry dedicated holiday buckets keyed by a
//! holiday name plus a day offset, e.g. `christmas_0` for December 25
//! and `christmas_-1` for Christmas Eve. Windows never overlap, so a
//! date maps to at most one key.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// The holiday bucket key for a local calendar date, if any.
///
/// Windows: Christmas ±1 day, New Year's Day +0..+2, Thanksgiving
/// ±1 day (4th Thursday of November), Independence Day ±1 day.
#[must_use]
pub fn holiday_key(date: NaiveDate) -> Option<String> {
    let year = date.year();

    if let Some(key) = windowed_key(date, NaiveDate::from_ymd_opt(year, 12, 25)?, -1, 1, "christmas") {
        return Some(key);
    }
    if let Some(key) = windowed_key(date, NaiveDate::from_ymd_opt(year, 1, 1)?, 0, 2, "new_years") {
        return Some(key);
    }
    if let Some(key) = windowed_key(date, thanksgiving(year)?, -1, 1, "thanksgiving") {
        return Some(key);
    }
    windowed_key(date, NaiveDate::from_ymd_opt(year, 7, 4)?, -1, 1, "independence")
}

/// Key for `date` if it falls within `[anchor + lo, anchor + hi]` days.
fn windowed_key(
    date: NaiveDate,
    anchor: NaiveDate,
    lo: i64,
    hi: i64,
    name: &str,
) -> Option<String> {
    let offset = (date - anchor).num_days();
    (lo..=hi).contains(&offset).then(|| format!("{name}_{offset}"))
}

/// Thanksgiving: the 4th Thursday of November.
fn thanksgiving(year: i32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, 11, 1)?;
    let days_to_thursday =
        (Weekday::Thu.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    Some(first + Duration::days(i64::from(days_to_thursday) + 21))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_thanksgiving_is_fourth_thursday() {
        for year in 2020..=2030 {
            let t = thanksgiving(year).expect("valid date");
            assert_eq!(t.weekday(), Weekday::Thu, "year {year}");
            assert_eq!(t.month(), 11);
            // 4th Thursday falls on the 22nd..=28th.
            assert!((22..=28).contains(&t.day()), "year {year}: {t}");
        }
        assert_eq!(thanksgiving(2024), Some(date(2024, 11, 28)));
    }

    #[test]
    fn test_christmas_window() {
        assert_eq!(holiday_key(date(2024, 12, 24)).as_deref(), Some("christmas_-1"));
        assert_eq!(holiday_key(date(2024, 12, 25)).as_deref(), Some("christmas_0"));
        assert_eq!(holiday_key(date(2024, 12, 26)).as_deref(), Some("christmas_1"));
        assert_eq!(holiday_key(date(2024, 12, 23)), None);
    }

    #[test]
    fn test_new_years_window_is_forward_only() {
        assert_eq!(holiday_key(date(2025, 1, 1)).as_deref(), Some("new_years_0"));
        assert_eq!(holiday_key(date(2025, 1, 2)).as_deref(), Some("new_years_1"));
        assert_eq!(holiday_key(date(2025, 1, 3)).as_deref(), Some("new_years_2"));
        assert_eq!(holiday_key(date(2025, 1, 4)), None);
        // New Year's Eve belongs to no window.
        assert_eq!(holiday_key(date(2024, 12, 31)), None);
    }

    #[test]
    fn test_thanksgiving_window_keys() {
        assert_eq!(
            holiday_key(date(2024, 11, 27)).as_deref(),
            Some("thanksgiving_-1")
        );
        assert_eq!(
            holiday_key(date(2024, 11, 28)).as_deref(),
            Some("thanksgiving_0")
        );
        assert_eq!(
            holiday_key(date(2024, 11, 29)).as_deref(),
            Some("thanksgiving_1")
        );
        assert_eq!(holiday_key(date(2024, 11, 26)), None);
    }

    #[test]
    fn test_independence_window() {
        assert_eq!(holiday_key(date(2024, 7, 3)).as_deref(), Some("independence_-1"));
        assert_eq!(holiday_key(date(2024, 7, 4)).as_deref(), Some("independence_0"));
        assert_eq!(holiday_key(date(2024, 7, 5)).as_deref(), Some("independence_1"));
    }

    #[test]
    fn test_ordinary_dates_have_no_key() {
        assert_eq!(holiday_key(date(2024, 6, 2)), None);
        assert_eq!(holiday_key(date(2024, 9, 15)), None);
    }
}
