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

//! Baseline/forecast resolution for the arrivals chart.
//!
//! For a given instant and airport this module picks the correct
//! historical bucket (holiday override, then day-of-week), pairs it
//! with the seasonal average as a comparison line, filters the live
//! forecast to the selected local date, and aligns all three series on
//! one slot axis. A missing baseline for the day or season makes the
//! whole chart unavailable rather than zero-filled; a missing forecast
//! just means baseline-only display.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};
use std::collections::BTreeMap;

use crate::airports::DstCalendar;
use crate::align::align;
use crate::holidays::holiday_key;
use crate::resources::{ArrivalForecast, BaselinePayload, SlotStat};
use crate::temporal::{
    day_of_week, season_for_date, slot_key_local, to_local, weekday_key, Season,
};

/// Which historical bucket the resolver chose for the "day" series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketChoice {
    /// A holiday bucket, possibly borrowed from the other season when
    /// the current season has no data for that holiday.
    Holiday { key: String, season: Season },
    /// The plain day-of-week bucket for the selected date.
    DayOfWeek(Weekday),
}

/// One slot of the resolved display series.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPoint {
    pub slot: String,
    pub day_value: Option<f64>,
    pub day_sample_days: Option<u32>,
    pub seasonal_value: Option<f64>,
    pub seasonal_sample_days: Option<u32>,
    pub forecast_value: Option<f64>,
    pub actual_value: Option<f64>,
}

impl ResolvedPoint {
    /// The value a chart should plot for this slot: forecast when
    /// present, otherwise the historical day bucket.
    #[must_use]
    pub fn display_value(&self) -> Option<f64> {
        self.forecast_value.or(self.day_value)
    }
}

/// The fully resolved, slot-aligned display series for one local date.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSeries {
    pub date: NaiveDate,
    pub season: Season,
    pub bucket: BucketChoice,
    pub points: Vec<ResolvedPoint>,
}

/// Pick the historical "day" bucket for a date: holiday override first
/// (current season, then cross-season fallback), else day-of-week.
fn select_day_bucket<'a>(
    baseline: &'a BaselinePayload,
    date: NaiveDate,
    season: Season,
) -> Option<(BucketChoice, &'a BTreeMap<String, SlotStat>)> {
    if let Some(key) = holiday_key(date) {
        for candidate in [season, season.other()] {
            if let Some(series) = baseline
                .season(candidate)
                .and_then(|s| s.holidays.get(&key))
                .filter(|s| !s.is_empty())
            {
                return Some((
                    BucketChoice::Holiday {
                        key,
                        season: candidate,
                    },
                    series,
                ));
            }
        }
    }

    let weekday = day_of_week(date);
    let series = baseline
        .season(season)?
        .day_of_week
        .get(weekday_key(weekday))
        .filter(|s| !s.is_empty())?;
    Some((BucketChoice::DayOfWeek(weekday), series))
}

fn counts_of(stats: &BTreeMap<String, SlotStat>) -> BTreeMap<String, f64> {
    stats.iter().map(|(k, s)| (k.clone(), s.count)).collect()
}

/// Filter a forecast's flat slot list down to the selected local date.
///
/// With explicit `slot_dates` this is an exact match per slot. Without
/// them, the legacy heuristic inherited from upstream payloads applies:
/// for today, slots from four hours before `now_local` onward (all of
/// today when that lands on the previous date); for any other date,
/// only the 00:00-09:45 range (a forecast window spans at most one
/// midnight). Returns slot->count and slot->actual maps.
#[must_use]
pub fn filter_forecast(
    forecast: &ArrivalForecast,
    selected: NaiveDate,
    now_local: NaiveDateTime,
) -> (BTreeMap<String, f64>, BTreeMap<String, f64>) {
    let mut counts = BTreeMap::new();
    let mut actuals = BTreeMap::new();

    for (i, slot) in forecast.time_slots.iter().enumerate() {
        let keep = match &forecast.slot_dates {
            Some(dates) => dates.get(i) == Some(&selected),
            None if selected == now_local.date() => {
                let cutoff = now_local - Duration::hours(4);
                // Before 04:00 local the cutoff lands on the previous
                // date, so every one of today's slots is after it.
                cutoff.date() < selected
                    || slot.as_str() >= slot_key_local(cutoff).as_str()
            }
            None => slot.as_str() <= "09:45",
        };
        if !keep {
            continue;
        }
        if let Some(count) = forecast.arrival_counts.get(i) {
            counts.insert(slot.clone(), *count);
        }
        if let Some(actual) = forecast
            .actual_counts
            .as_ref()
            .and_then(|a| a.get(i).copied().flatten())
        {
            actuals.insert(slot.clone(), f64::from(actual));
        }
    }

    (counts, actuals)
}

/// Resolve the slot-aligned display series for the instant's local date.
///
/// Returns `None` when the baseline has no usable bucket for the date's
/// day and season; zero traffic is never implied by missing history.
#[must_use]
pub fn resolve_display(
    utc: DateTime<Utc>,
    cal: &DstCalendar,
    baseline: &BaselinePayload,
    forecast: Option<&ArrivalForecast>,
) -> Option<ResolvedSeries> {
    let now_local = to_local(utc, cal);
    let date = now_local.date();
    let season = season_for_date(date, cal);

    let (bucket, day_stats) = select_day_bucket(baseline, date, season)?;
    let seasonal_stats = baseline
        .season(season)
        .map(|s| &s.seasonal)
        .cloned()
        .unwrap_or_default();

    let (forecast_counts, forecast_actuals) = forecast
        .map(|f| filter_forecast(f, date, now_local))
        .unwrap_or_default();

    let day_counts = counts_of(day_stats);
    let seasonal_counts = counts_of(&seasonal_stats);
    let aligned = align(&[&day_counts, &seasonal_counts, &forecast_counts]);

    let points = aligned
        .keys
        .iter()
        .enumerate()
        .map(|(i, slot)| ResolvedPoint {
            slot: slot.clone(),
            day_value: aligned.values[0][i],
            day_sample_days: day_stats.get(slot).map(|s| s.sample_size_days),
            seasonal_value: aligned.values[1][i],
            seasonal_sample_days: seasonal_stats.get(slot).map(|s| s.sample_size_days),
            forecast_value: aligned.values[2][i],
            actual_value: forecast_actuals.get(slot).copied(),
        })
        .collect();

    Some(ResolvedSeries {
        date,
        season,
        bucket,
        points,
    })
}

/// Expected arrivals over the next clock hour.
///
/// Prefers forecast values per 15-minute slot and falls back to the
/// historical day bucket for slots the forecast does not cover. `None`
/// when neither source knows anything about that hour.
#[must_use]
pub fn next_hour_estimate(
    utc: DateTime<Utc>,
    cal: &DstCalendar,
    baseline: &BaselinePayload,
    forecast: Option<&ArrivalForecast>,
) -> Option<f64> {
    let local = to_local(utc, cal);
    let hour_start = local
        .date()
        .and_hms_opt(local.hour(), 0, 0)?
        + Duration::hours(1);
    let date = hour_start.date();
    let season = season_for_date(date, cal);
    let day_stats = select_day_bucket(baseline, date, season).map(|(_, s)| s);

    let mut total = 0.0;
    let mut any = false;
    for quarter in 0..4 {
        let slot = slot_key_local(hour_start + Duration::minutes(quarter * 15));

        let forecast_value = forecast.and_then(|f| {
            f.time_slots.iter().enumerate().find_map(|(i, s)| {
                if s != &slot {
                    return None;
                }
                if let Some(dates) = &f.slot_dates {
                    if dates.get(i) != Some(&date) {
                        return None;
                    }
                }
                f.arrival_counts.get(i).copied()
            })
        });

        let value = forecast_value.or_else(|| day_stats.and_then(|s| s.get(&slot).map(|s| s.count)));
        if let Some(v) = value {
            total += v;
            any = true;
        }
    }

    any.then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::DstInterval;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn denver() -> DstCalendar {
        let mut intervals = HashMap::new();
        for year in [2024, 2025] {
            intervals.insert(
                year,
                DstInterval {
                    start: NaiveDate::from_ymd_opt(year, 3, 10).expect("valid date"),
                    end: NaiveDate::from_ymd_opt(year, 11, 3).expect("valid date"),
                },
            );
        }
        DstCalendar {
            summer_offset_minutes: -6 * 60,
            winter_offset_minutes: -7 * 60,
            intervals,
        }
    }

    fn stats(entries: &[(&str, f64, u32)]) -> BTreeMap<String, SlotStat> {
        entries
            .iter()
            .map(|(k, count, days)| {
                (
                    (*k).to_string(),
                    SlotStat {
                        count: *count,
                        sample_size_days: *days,
                    },
                )
            })
            .collect()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().expect("valid instant")
    }

    #[test]
    fn test_holiday_cross_season_fallback() {
        // KDEN at 2024-12-25T15:00Z: local winter Christmas. Winter has
        // no christmas_0 bucket but summer does; the summer bucket wins
        // over the Wednesday day-of-week bucket.
        let mut summer = crate::resources::SeasonBaseline::default();
        summer
            .holidays
            .insert("christmas_0".to_string(), stats(&[("08:00", 9.0, 3)]));
        let mut winter = crate::resources::SeasonBaseline::default();
        winter
            .day_of_week
            .insert("wednesday".to_string(), stats(&[("08:00", 5.0, 10)]));
        let baseline = BaselinePayload {
            summer: Some(summer),
            winter: Some(winter),
        };

        let resolved =
            resolve_display(utc(2024, 12, 25, 15, 0), &denver(), &baseline, None).expect("resolves");

        assert_eq!(
            resolved.bucket,
            BucketChoice::Holiday {
                key: "christmas_0".to_string(),
                season: Season::Summer,
            }
        );
        assert_eq!(resolved.season, Season::Winter);
        assert_eq!(resolved.points[0].day_value, Some(9.0));
        assert_eq!(resolved.points[0].day_sample_days, Some(3));
    }

    #[test]
    fn test_holiday_falls_back_to_day_of_week_when_no_season_has_it() {
        let mut winter = crate::resources::SeasonBaseline::default();
        winter
            .day_of_week
            .insert("wednesday".to_string(), stats(&[("08:00", 5.0, 10)]));
        let baseline = BaselinePayload {
            summer: None,
            winter: Some(winter),
        };

        let resolved =
            resolve_display(utc(2024, 12, 25, 15, 0), &denver(), &baseline, None).expect("resolves");
        assert_eq!(resolved.bucket, BucketChoice::DayOfWeek(Weekday::Wed));
    }

    #[test]
    fn test_missing_day_baseline_is_unavailable_not_zero() {
        let baseline = BaselinePayload {
            summer: None,
            winter: Some(crate::resources::SeasonBaseline::default()),
        };
        assert!(resolve_display(utc(2024, 12, 18, 15, 0), &denver(), &baseline, None).is_none());

        let empty = BaselinePayload::default();
        assert!(resolve_display(utc(2024, 12, 18, 15, 0), &denver(), &empty, None).is_none());
    }

    #[test]
    fn test_forecast_filter_with_explicit_slot_dates() {
        // Spec example: window spans midnight, selected date keeps only
        // the two slots dated 2024-06-02.
        let forecast = ArrivalForecast {
            generated_at: Utc::now(),
            time_slots: vec!["23:45".to_string(), "00:00".to_string(), "00:15".to_string()],
            arrival_counts: vec![4.0, 5.0, 6.0],
            slot_dates: Some(vec![
                NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"),
                NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date"),
                NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date"),
            ]),
            actual_counts: None,
        };
        let selected = NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date");
        let now_local = selected.and_hms_opt(0, 30, 0).expect("valid time");

        let (counts, _) = filter_forecast(&forecast, selected, now_local);
        assert_eq!(
            counts.keys().collect::<Vec<_>>(),
            vec!["00:00", "00:15"]
        );
    }

    #[test]
    fn test_legacy_filter_today_keeps_recent_slots() {
        let forecast = ArrivalForecast {
            generated_at: Utc::now(),
            time_slots: vec!["09:00".to_string(), "13:00".to_string(), "18:00".to_string()],
            arrival_counts: vec![1.0, 2.0, 3.0],
            slot_dates: None,
            actual_counts: None,
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date");
        let now_local = today.and_hms_opt(14, 0, 0).expect("valid time");

        // now - 4h = 10:00, so 09:00 drops out.
        let (counts, _) = filter_forecast(&forecast, today, now_local);
        assert_eq!(counts.keys().collect::<Vec<_>>(), vec!["13:00", "18:00"]);
    }

    #[test]
    fn test_legacy_filter_today_before_0400_keeps_all_slots() {
        // now - 4h crosses midnight into yesterday; none of today's
        // slots can be older than that, so all of them stay.
        let forecast = ArrivalForecast {
            generated_at: Utc::now(),
            time_slots: vec!["00:00".to_string(), "02:15".to_string(), "05:00".to_string()],
            arrival_counts: vec![1.0, 2.0, 3.0],
            slot_dates: None,
            actual_counts: None,
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date");
        let now_local = today.and_hms_opt(2, 0, 0).expect("valid time");

        let (counts, _) = filter_forecast(&forecast, today, now_local);
        assert_eq!(
            counts.keys().collect::<Vec<_>>(),
            vec!["00:00", "02:15", "05:00"]
        );
    }

    #[test]
    fn test_legacy_filter_other_date_keeps_early_morning_window() {
        let forecast = ArrivalForecast {
            generated_at: Utc::now(),
            time_slots: vec!["00:00".to_string(), "09:45".to_string(), "10:00".to_string()],
            arrival_counts: vec![1.0, 2.0, 3.0],
            slot_dates: None,
            actual_counts: None,
        };
        let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date");
        let now_local = NaiveDate::from_ymd_opt(2024, 6, 2)
            .expect("valid date")
            .and_hms_opt(22, 0, 0)
            .expect("valid time");

        let (counts, _) = filter_forecast(&forecast, tomorrow, now_local);
        assert_eq!(counts.keys().collect::<Vec<_>>(), vec!["00:00", "09:45"]);
    }

    #[test]
    fn test_forecast_takes_precedence_over_baseline_per_slot() {
        let mut winter = crate::resources::SeasonBaseline::default();
        winter.day_of_week.insert(
            "wednesday".to_string(),
            stats(&[("08:00", 5.0, 10), ("08:15", 6.0, 10)]),
        );
        winter.seasonal = stats(&[("08:00", 4.0, 60)]);
        let baseline = BaselinePayload {
            summer: None,
            winter: Some(winter),
        };
        let forecast = ArrivalForecast {
            generated_at: Utc::now(),
            time_slots: vec!["08:00".to_string()],
            arrival_counts: vec![11.0],
            slot_dates: Some(vec![NaiveDate::from_ymd_opt(2024, 12, 18).expect("valid date")]),
            actual_counts: None,
        };

        let resolved = resolve_display(
            utc(2024, 12, 18, 15, 0),
            &denver(),
            &baseline,
            Some(&forecast),
        )
        .expect("resolves");

        let p0 = &resolved.points[0];
        assert_eq!(p0.slot, "08:00");
        assert_eq!(p0.display_value(), Some(11.0));
        assert_eq!(p0.seasonal_value, Some(4.0));
        assert_eq!(p0.seasonal_sample_days, Some(60));
        // Slot without forecast coverage falls back to the day bucket.
        let p1 = &resolved.points[1];
        assert_eq!(p1.display_value(), Some(6.0));
    }

    #[test]
    fn test_next_hour_estimate_sums_baseline_quarters() {
        let mut winter = crate::resources::SeasonBaseline::default();
        winter.day_of_week.insert(
            "wednesday".to_string(),
            stats(&[
                ("09:00", 1.0, 10),
                ("09:15", 2.0, 10),
                ("09:30", 3.0, 10),
                ("09:45", 4.0, 10),
            ]),
        );
        let baseline = BaselinePayload {
            summer: None,
            winter: Some(winter),
        };

        // 15:10Z -> 08:10 local; next clock hour is 09:00-09:45.
        let estimate = next_hour_estimate(utc(2024, 12, 18, 15, 10), &denver(), &baseline, None);
        assert_eq!(estimate, Some(10.0));
    }

    #[test]
    fn test_next_hour_estimate_prefers_forecast_slots() {
        let mut winter = crate::resources::SeasonBaseline::default();
        winter.day_of_week.insert(
            "wednesday".to_string(),
            stats(&[("09:00", 1.0, 10), ("09:15", 2.0, 10)]),
        );
        let baseline = BaselinePayload {
            summer: None,
            winter: Some(winter),
        };
        let forecast = ArrivalForecast {
            generated_at: Utc::now(),
            time_slots: vec!["09:00".to_string()],
            arrival_counts: vec![8.0],
            slot_dates: None,
            actual_counts: None,
        };

        let estimate = next_hour_estimate(
            utc(2024, 12, 18, 15, 10),
            &denver(),
            &baseline,
            Some(&forecast),
        );
        // 8.0 from forecast for 09:00, 2.0 baseline for 09:15.
        assert_eq!(estimate, Some(10.0));
    }

    #[test]
    fn test_next_hour_estimate_none_without_data() {
        let estimate = next_hour_estimate(
            utc(2024, 12, 18, 15, 10),
            &denver(),
            &BaselinePayload::default(),
            None,
        );
        assert_eq!(estimate, None);
    }
}
