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

//! Temporal model: UTC to airport-local civil time, seasons, and slots.
//!
//! All functions here are pure. Local civil time is expressed as a
//! [`NaiveDateTime`] whose calendar fields equal the airport's wall
//! clock, so downstream code reads fields directly without re-deriving
//! an offset. Season resolution uses the airport's per-year DST
//! interval table with the half-open convention `[start, end)` =
//! summer; a year missing from the table resolves as winter.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};

use crate::airports::DstCalendar;

/// Baseline season, resolved from the airport's DST calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Summer,
    Winter,
}

impl Season {
    /// The opposite season, used for cross-season holiday fallback.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Season::Summer => Season::Winter,
            Season::Winter => Season::Summer,
        }
    }
}

/// Season for a local calendar date.
#[must_use]
pub fn season_for_date(date: NaiveDate, cal: &DstCalendar) -> Season {
    match cal.intervals.get(&date.year()) {
        Some(interval) if interval.contains(date) => Season::Summer,
        _ => Season::Winter,
    }
}

/// Convert a UTC instant to the airport's local wall-clock time.
///
/// The winter offset is applied first to resolve the local calendar
/// date, which then decides whether the summer offset applies. A
/// malformed or empty DST table therefore degrades to the fixed winter
/// offset rather than failing.
#[must_use]
pub fn to_local(utc: DateTime<Utc>, cal: &DstCalendar) -> NaiveDateTime {
    let winter = utc.naive_utc() + Duration::minutes(i64::from(cal.winter_offset_minutes));
    match season_for_date(winter.date(), cal) {
        Season::Winter => winter,
        Season::Summer => {
            utc.naive_utc() + Duration::minutes(i64::from(cal.summer_offset_minutes))
        }
    }
}

/// Season in effect at a UTC instant for this airport.
#[must_use]
pub fn season(utc: DateTime<Utc>, cal: &DstCalendar) -> Season {
    season_for_date(to_local(utc, cal).date(), cal)
}

/// The airport-local calendar date of a UTC instant.
#[must_use]
pub fn local_date(utc: DateTime<Utc>, cal: &DstCalendar) -> NaiveDate {
    to_local(utc, cal).date()
}

/// `YYYY-MM-DD` form of [`local_date`].
#[must_use]
pub fn local_date_string(utc: DateTime<Utc>, cal: &DstCalendar) -> String {
    local_date(utc, cal).format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` string as a local calendar date. Parsed as a
/// plain date, never through UTC, so midnight boundaries cannot shift
/// the day.
#[must_use]
pub fn parse_local_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Day of week of a local calendar date.
#[must_use]
pub fn day_of_week(date: NaiveDate) -> Weekday {
    date.weekday()
}

/// Lowercase weekday key used by the baseline day-of-week series.
#[must_use]
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Slot key for a local wall-clock time: minutes floored to the lower
/// multiple of 15, formatted `HH:MM`.
#[must_use]
pub fn slot_key_local(local: NaiveDateTime) -> String {
    format!("{:02}:{:02}", local.hour(), (local.minute() / 15) * 15)
}

/// Slot key for a UTC instant at this airport.
#[must_use]
pub fn time_slot_key(utc: DateTime<Utc>, cal: &DstCalendar) -> String {
    slot_key_local(to_local(utc, cal))
}
