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

//! Data synchronization and temporal alignment core for airport
//! situational-awareness dashboards.
//!
//! This library keeps a frontend's view of an airport coherently in
//! sync with a backend that aggregates weather, traffic, and
//! historical-arrival data. It is deliberately UI-free: a shell
//! (desktop, terminal, or web) subscribes to state snapshots and
//! renders them however it likes. The layers can be used independently
//! or composed together:
//!
//! - **Client layer**: One async call per backend resource
//!   ([`ResourceClient`]), with an HTTP implementation and error
//!   classification into offline, server, and decode failures
//! - **Orchestration layer**: The [`Orchestrator`] owns the canonical
//!   [`AppState`], schedules loads and refreshes at several cadences,
//!   tracks connectivity and offline time, and discards results from
//!   superseded airport selections
//! - **Temporal layer**: Airport-local time from per-airport DST
//!   calendars, season and holiday classification, and 15-minute slot
//!   keys ([`temporal`], [`holidays`])
//! - **Analysis layer**: Slot-key alignment of baseline, forecast, and
//!   observed series, and baseline bucket selection ([`align`],
//!   [`baseline`])
//! - **Query layer**: Debounced planning queries with cancellation and
//!   near-now short-circuit ([`QueryCoordinator`])
//!
//! # Quick Start
//!
//! ```no_run
//! use airsitu::{
//!     HttpResourceClient, Orchestrator, OrchestratorConfig, Preferences,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(HttpResourceClient::new("https://airsitu.example.com/api"));
//!     let orchestrator = Orchestrator::spawn(
//!         client,
//!         OrchestratorConfig::default(),
//!         Preferences::load(),
//!     );
//!
//!     let mut state = orchestrator.subscribe();
//!     orchestrator.select_airport("KDEN");
//!
//!     while state.changed().await.is_ok() {
//!         let snapshot = state.borrow().clone();
//!         if let Some(overview) = &snapshot.overview.value {
//!             println!("{}: {:?}", overview.station, overview.flight_category);
//!         }
//!     }
//! }
//! ```

pub mod airports;
pub mod align;
pub mod baseline;
pub mod client;
pub mod config;
pub mod error;
pub mod holidays;
pub mod orchestrator;
pub mod query;
pub mod resources;
pub mod snapshot;
pub mod temporal;

pub use airports::{Airport, AirportDirectory, DstCalendar, TrafficLevel, TrafficThresholds};
pub use align::Alignment;
pub use baseline::{resolve_display, next_hour_estimate, ResolvedPoint, ResolvedSeries};
pub use client::{HttpResourceClient, ResourceClient};
pub use config::Preferences;
pub use error::FetchError;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use query::{QueryCoordinator, QueryState};
pub use resources::{
    ArrivalCounts, ArrivalForecast, ArrivalSituation, BaselinePayload, ConditionFingerprint,
    Fetched, GroundTrack, Pirep, SituationSummary, SourceTag, WeatherOverview,
};
pub use snapshot::{AppState, ConnectionStatus, Diagnostic, DiagnosticLevel, ResourceSnapshot};
pub use temporal::Season;
