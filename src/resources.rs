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

//! Wire shapes for the fetched resources.
//!
//! Every resource call returns its payload wrapped in a [`Fetched`]
//! envelope carrying a freshness tag and the server timestamp. The
//! payload shapes here are the contract with the backend; the core does
//! not interpret fields it does not need.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Freshness of a fetched payload as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    /// Fresh data from the upstream source.
    Live,
    /// Served from the backend's cache, within its TTL.
    Cache,
    /// Served from cache past its TTL because the upstream was unreachable.
    StaleCache,
}

/// A successfully fetched payload with freshness metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Fetched<T> {
    pub data: T,
    pub source: SourceTag,
    pub timestamp: DateTime<Utc>,
}

impl<T> Fetched<T> {
    /// Wrap a payload as live data observed now. Mostly useful in tests
    /// and in client implementations for sources without envelopes.
    pub fn live(data: T) -> Self {
        Self {
            data,
            source: SourceTag::Live,
            timestamp: Utc::now(),
        }
    }
}

/// Current weather overview for an airport (METAR-derived).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherOverview {
    pub station: String,
    pub observed_at: DateTime<Utc>,
    pub flight_category: Option<String>,
    pub wind_direction_deg: Option<u16>,
    pub wind_speed_kt: Option<u16>,
    pub gust_kt: Option<u16>,
    pub visibility_sm: Option<f64>,
    pub ceiling_ft: Option<u32>,
    pub temperature_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub altimeter_in_hg: Option<f64>,
    pub raw_metar: Option<String>,
}

/// A single pilot report near the airport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pirep {
    pub id: String,
    pub observed_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: Option<i32>,
    pub aircraft_type: Option<String>,
    /// Urgent (UUA) vs routine (UA) report.
    #[serde(default)]
    pub urgent: bool,
    pub report: String,
}

/// One point of a ground track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

/// A recent ground track for one flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTrack {
    pub track_id: String,
    pub callsign: Option<String>,
    pub points: Vec<TrackPoint>,
}

/// Observed arrival counts per 15-minute slot for one local date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalCounts {
    pub date: NaiveDate,
    pub time_slots: Vec<String>,
    pub counts: Vec<u32>,
}

/// One historical-average data point: mean count and how many days of
/// history produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotStat {
    pub count: f64,
    pub sample_size_days: u32,
}

/// Historical baselines for one season.
///
/// All inner maps are keyed by the local "HH:MM" slot string; the
/// day-of-week map is keyed by lowercase weekday name and the holiday
/// map by holiday key (see [`crate::holidays`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonBaseline {
    #[serde(default)]
    pub seasonal: BTreeMap<String, SlotStat>,
    #[serde(default)]
    pub day_of_week: HashMap<String, BTreeMap<String, SlotStat>>,
    #[serde(default)]
    pub holidays: HashMap<String, BTreeMap<String, SlotStat>>,
}

/// Precomputed historical baselines for both seasons of an airport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselinePayload {
    pub summer: Option<SeasonBaseline>,
    pub winter: Option<SeasonBaseline>,
}

impl BaselinePayload {
    /// Baselines for the given season, if the backend has any.
    #[must_use]
    pub fn season(&self, season: crate::temporal::Season) -> Option<&SeasonBaseline> {
        match season {
            crate::temporal::Season::Summer => self.summer.as_ref(),
            crate::temporal::Season::Winter => self.winter.as_ref(),
        }
    }
}

/// Short-horizon arrival forecast.
///
/// `time_slots` and `arrival_counts` are parallel arrays. A forecast
/// window may span midnight, in which case `slot_dates` disambiguates
/// which local date each slot belongs to. `actual_counts` is merged in
/// after the fact for slots that have already elapsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalForecast {
    pub generated_at: DateTime<Utc>,
    pub time_slots: Vec<String>,
    pub arrival_counts: Vec<f64>,
    #[serde(default)]
    pub slot_dates: Option<Vec<NaiveDate>>,
    #[serde(default)]
    pub actual_counts: Option<Vec<Option<u32>>>,
}

impl ArrivalForecast {
    /// Merge observed arrival counts into this forecast by slot-key
    /// lookup. Only slots whose date matches (when `slot_dates` is
    /// present) receive an actual.
    pub fn merge_actuals(&mut self, arrivals: &ArrivalCounts) {
        let mut actuals = self
            .actual_counts
            .take()
            .unwrap_or_else(|| vec![None; self.time_slots.len()]);
        actuals.resize(self.time_slots.len(), None);

        for (slot, count) in arrivals.time_slots.iter().zip(arrivals.counts.iter()) {
            for (i, fc_slot) in self.time_slots.iter().enumerate() {
                if fc_slot != slot {
                    continue;
                }
                if let Some(dates) = &self.slot_dates {
                    if dates.get(i) != Some(&arrivals.date) {
                        continue;
                    }
                }
                actuals[i] = Some(*count);
            }
        }

        self.actual_counts = Some(actuals);
    }
}

/// Narrative summary of the current situation at the airport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationSummary {
    pub headline: String,
    pub detail: Option<String>,
    pub risk: Option<String>,
}

/// A historical day matched against a planning query's conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedDay {
    pub date: NaiveDate,
    /// Similarity score in `[0, 1]`.
    pub similarity: f64,
}

/// Response to a planning query: what arrivals looked like on days with
/// similar conditions around the candidate time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalSituation {
    pub summary: String,
    pub expected_arrivals: Option<f64>,
    #[serde(default)]
    pub matched_days: Vec<MatchedDay>,
}

/// Weather-condition fingerprint for planning queries. Two queries with
/// equal fingerprints ask about equivalent conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionFingerprint {
    pub flight_category: String,
    /// Wind speed bucketed in 5 kt steps.
    pub wind_bucket: u8,
    pub precipitation: bool,
}
