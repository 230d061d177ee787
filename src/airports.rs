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

//! Airport reference data and lookup.
//!
//! Airports are immutable reference data loaded once from the airports
//! resource and looked up by identifier. Each airport carries its own
//! per-year DST calendar (used by the temporal model) and the traffic
//! thresholds used to classify a 15-minute slot as heavy or light.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One DST interval: summer time applies in `[start, end)` local dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DstInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DstInterval {
    /// Half-open containment check: `start` is summer, `end` is winter.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Per-airport civil-time calendar: fixed UTC offsets for each season
/// plus the per-year DST intervals that switch between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DstCalendar {
    pub summer_offset_minutes: i32,
    pub winter_offset_minutes: i32,
    /// Year -> DST interval. Years without an entry resolve as winter.
    #[serde(default)]
    pub intervals: HashMap<i32, DstInterval>,
}

/// Arrival counts per 15-minute slot above/below which traffic is
/// considered heavy/light for this airport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrafficThresholds {
    pub heavy: u32,
    pub light: u32,
}

impl Default for TrafficThresholds {
    fn default() -> Self {
        Self { heavy: 12, light: 4 }
    }
}

/// Traffic classification for one 15-minute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLevel {
    Light,
    Normal,
    Heavy,
}

/// Airport reference record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    /// Stable identifier used for all resource lookups.
    pub ident: String,

    /// Display code (e.g. "DEN").
    pub code: String,

    pub name: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Inactive airports are listed but not selectable for live data.
    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub dst: DstCalendar,

    #[serde(default)]
    pub thresholds: TrafficThresholds,
}

fn default_active() -> bool {
    true
}

impl Airport {
    /// Classify a per-slot arrival count against this airport's thresholds.
    #[must_use]
    pub fn traffic_level(&self, count: u32) -> TrafficLevel {
        if count >= self.thresholds.heavy {
            TrafficLevel::Heavy
        } else if count <= self.thresholds.light {
            TrafficLevel::Light
        } else {
            TrafficLevel::Normal
        }
    }
}

/// Immutable directory of airports, indexed by identifier.
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: Vec<Airport>,
    index: HashMap<String, usize>,
}

impl AirportDirectory {
    #[must_use]
    pub fn new(airports: Vec<Airport>) -> Self {
        let index = airports
            .iter()
            .enumerate()
            .map(|(i, a)| (a.ident.clone(), i))
            .collect();
        Self { airports, index }
    }

    #[must_use]
    pub fn get(&self, ident: &str) -> Option<&Airport> {
        self.index.get(ident).map(|&i| &self.airports[i])
    }

    #[must_use]
    pub fn all(&self) -> &[Airport] {
        &self.airports
    }

    /// Airports currently selectable for live data.
    #[must_use]
    pub fn active(&self) -> Vec<&Airport> {
        self.airports.iter().filter(|a| a.active).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport() -> Airport {
        Airport {
            ident: "KDEN".to_string(),
            code: "DEN".to_string(),
            name: "Denver International".to_string(),
            latitude: 39.8617,
            longitude: -104.6732,
            active: true,
            dst: DstCalendar::default(),
            thresholds: TrafficThresholds { heavy: 12, light: 4 },
        }
    }

    #[test]
    fn test_traffic_level_thresholds() {
        let a = airport();
        assert_eq!(a.traffic_level(2), TrafficLevel::Light);
        assert_eq!(a.traffic_level(4), TrafficLevel::Light);
        assert_eq!(a.traffic_level(5), TrafficLevel::Normal);
        assert_eq!(a.traffic_level(12), TrafficLevel::Heavy);
    }

    #[test]
    fn test_directory_lookup() {
        let dir = AirportDirectory::new(vec![airport()]);
        assert_eq!(dir.len(), 1);
        assert!(dir.get("KDEN").is_some());
        assert!(dir.get("KLAX").is_none());
    }

    #[test]
    fn test_dst_interval_half_open() {
        let interval = DstInterval {
            start: NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2024, 11, 3).expect("valid date"),
        };
        assert!(interval.contains(interval.start));
        assert!(!interval.contains(interval.end));
    }
}
