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

//! Application state snapshot types.
//!
//! [`AppState`] is the single source of truth read by the presentation
//! layer. It is owned exclusively by the orchestrator and published
//! through a watch channel; readers always see a consistent snapshot
//! and never mutate it. Every fetched resource lives in a uniform
//! [`ResourceSnapshot`] that keeps its last good value when a refresh
//! fails.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::airports::AirportDirectory;
use crate::error::FetchError;
use crate::resources::{
    ArrivalCounts, ArrivalForecast, BaselinePayload, Fetched, GroundTrack, Pirep,
    SituationSummary, SourceTag, WeatherOverview,
};

const MAX_DIAGNOSTICS: usize = 50;

/// Freshness metadata attached to every resource snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    /// Whether the last fetch for this resource succeeded.
    pub active: bool,
    /// Failure or staleness message for display, if any.
    pub message: Option<String>,
    pub source: SourceTag,
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl Default for ResourceMeta {
    fn default() -> Self {
        Self {
            active: false,
            message: None,
            source: SourceTag::Live,
            server_timestamp: None,
        }
    }
}

/// The uniform wrapper around every fetched resource.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot<T> {
    pub value: Option<T>,
    pub meta: ResourceMeta,
}

impl<T> Default for ResourceSnapshot<T> {
    fn default() -> Self {
        Self {
            value: None,
            meta: ResourceMeta::default(),
        }
    }
}

impl<T> ResourceSnapshot<T> {
    /// Replace the value atomically with a fresh fetch result.
    pub fn apply(&mut self, fetched: Fetched<T>) {
        self.value = Some(fetched.data);
        self.meta = ResourceMeta {
            active: true,
            message: match fetched.source {
                SourceTag::StaleCache => Some("serving stale cached data".to_string()),
                SourceTag::Live | SourceTag::Cache => None,
            },
            source: fetched.source,
            server_timestamp: Some(fetched.timestamp),
        };
    }

    /// Record a failed refresh. The last good value is kept; only the
    /// metadata reflects the failure.
    pub fn fail(&mut self, err: &FetchError) {
        self.meta.active = false;
        self.meta.message = Some(err.to_string());
    }

    /// Drop the value entirely (airport switch).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Connectivity as seen by the periodic probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub last_update: DateTime<Utc>,
    pub latency_ms: Option<u64>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            connected: false,
            last_update: Utc::now(),
            latency_ms: None,
        }
    }
}

/// Accumulated-offline-time accounting.
///
/// The clock only runs while the app is in active use (an airport has
/// been loaded at least once); connectivity lost before first use is
/// not counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineClock {
    engaged: bool,
    offline_since: Option<DateTime<Utc>>,
    accumulated: Duration,
}

impl Default for OfflineClock {
    fn default() -> Self {
        Self {
            engaged: false,
            offline_since: None,
            accumulated: Duration::zero(),
        }
    }
}

impl OfflineClock {
    /// Mark the app as in active use; enables offline accounting.
    pub fn engage(&mut self) {
        self.engaged = true;
    }

    /// Record a probe result transition.
    pub fn record_probe(&mut self, connected: bool, now: DateTime<Utc>) {
        if !self.engaged {
            return;
        }
        match (connected, self.offline_since) {
            (false, None) => self.offline_since = Some(now),
            (true, Some(since)) => {
                self.accumulated += now - since;
                self.offline_since = None;
            }
            _ => {}
        }
    }

    /// Total offline time while in active use, including an ongoing
    /// outage.
    #[must_use]
    pub fn total(&self, now: DateTime<Utc>) -> Duration {
        match self.offline_since {
            Some(since) => self.accumulated + (now - since),
            None => self.accumulated,
        }
    }
}

/// Diagnostic severity for the bounded message ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Timestamped diagnostic message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

/// The aggregate application data snapshot.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Airport reference directory, loaded once.
    pub airports: Option<Arc<AirportDirectory>>,

    /// Currently selected airport identifier.
    pub selected: Option<String>,

    pub overview: ResourceSnapshot<WeatherOverview>,
    pub pireps: ResourceSnapshot<Vec<Pirep>>,
    pub tracks: ResourceSnapshot<Vec<GroundTrack>>,
    pub arrivals: ResourceSnapshot<ArrivalCounts>,
    pub baseline: ResourceSnapshot<BaselinePayload>,
    pub forecast: ResourceSnapshot<ArrivalForecast>,
    pub summary: ResourceSnapshot<SituationSummary>,

    pub connection: ConnectionStatus,
    pub offline: OfflineClock,

    /// Critical load (overview + tracks) in flight.
    pub loading: bool,
    /// Background load (everything else) in flight.
    pub background_loading: bool,

    /// Single user-visible error when an entire load cycle failed.
    pub load_error: Option<String>,
    /// Soft partial-failure notice ("N of M data sources failed").
    pub degraded: Option<String>,

    pub diagnostics: VecDeque<Diagnostic>,
}

impl AppState {
    /// Combined loading flag for the presentation layer.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading || self.background_loading
    }

    /// Clear per-airport resources for a (re)selection.
    ///
    /// Baseline and forecast are kept on a same-airport reselect; they
    /// are only replaced atomically when new data arrives or the
    /// airport actually changes.
    pub fn clear_airport_data(&mut self, keep_baseline: bool) {
        self.overview.clear();
        self.pireps.clear();
        self.tracks.clear();
        self.arrivals.clear();
        self.summary.clear();
        if !keep_baseline {
            self.baseline.clear();
            self.forecast.clear();
        }
        self.load_error = None;
        self.degraded = None;
    }

    /// Append to the bounded diagnostics ring.
    pub fn push_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        self.diagnostics.push_back(Diagnostic {
            timestamp: Utc::now(),
            level,
            message,
        });
        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }
}
