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

//! Multi-source fetch orchestration.
//!
//! The orchestrator owns the canonical [`AppState`] and is the only
//! writer. It schedules the initial load, periodic refresh at several
//! cadences, and manual refresh; tracks connectivity, staleness, and
//! offline time; and guarantees at most one in-flight load per airport.
//! Every state update is an independent partial patch applied through
//! the watch channel; the whole state is only rebuilt on airport
//! switch. Results from a superseded airport selection are stamped with
//! a generation counter and discarded on merge.
//!
//! Critical resources (overview, tracks) are requested first and each
//! is published as soon as it settles, so a map can render before the
//! slower background resources (pireps, arrivals, summary, baseline,
//! forecast) finish.

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::airports::AirportDirectory;
use crate::client::ResourceClient;
use crate::config::Preferences;
use crate::error::FetchError;
use crate::snapshot::{AppState, DiagnosticLevel};

/// Refresh cadences. The forecast interval matches the upstream cache
/// TTL so a forced refresh lands just as the backend's copy expires.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Connectivity probe cadence.
    pub probe_interval: Duration,
    /// Full auto-refresh cadence while connected and an airport is
    /// selected.
    pub refresh_interval: Duration,
    /// Weather-only refresh cadence.
    pub weather_interval: Duration,
    /// Forced forecast refresh cadence.
    pub forecast_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            weather_interval: Duration::from_secs(180),
            forecast_interval: Duration::from_secs(300),
        }
    }
}

struct Inner {
    client: Arc<dyn ResourceClient>,
    state: watch::Sender<AppState>,
    /// Airports with a load currently in flight.
    inflight: Mutex<HashSet<String>>,
    /// Bumped whenever the selected airport changes; merges stamped
    /// with an older generation are discarded.
    generation: AtomicU64,
    /// Bumped on every airport selection. Identifies one load trigger,
    /// so the selection effect and the startup refresh dedupe to a
    /// single dispatch whichever runs first.
    epoch: AtomicU64,
    /// Ident and epoch of the most recently deduped dispatch.
    last_dispatch: Mutex<Option<(String, u64)>>,
    prefs: Mutex<Preferences>,
}

/// Handle to the fetch orchestrator.
///
/// Spawns its timer tasks on creation and cancels them on
/// [`Orchestrator::shutdown`] or drop.
pub struct Orchestrator {
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Spawn the orchestrator and its timer tasks.
    ///
    /// Must be called within a tokio runtime. The last-selected airport
    /// from `prefs` is rehydrated and loaded once connectivity is
    /// confirmed.
    #[must_use]
    pub fn spawn(
        client: Arc<dyn ResourceClient>,
        config: OrchestratorConfig,
        prefs: Preferences,
    ) -> Self {
        let initial = AppState {
            selected: prefs.last_airport.clone(),
            ..AppState::default()
        };
        let (state_tx, _) = watch::channel(initial);

        let inner = Arc::new(Inner {
            client,
            state: state_tx,
            inflight: Mutex::new(HashSet::new()),
            generation: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            last_dispatch: Mutex::new(None),
            prefs: Mutex::new(prefs),
        });
        let cancel = CancellationToken::new();

        spawn_timers(&inner, &cancel, &config);

        // Initial probe + airport list + rehydrated airport load. Not
        // forced, so it cannot double-dispatch a load already triggered
        // by an early airport selection.
        tokio::spawn(refresh_cycle(Arc::clone(&inner), false));

        Self { inner, cancel }
    }

    /// Subscribe to state snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.inner.state.subscribe()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AppState {
        self.inner.state.borrow().clone()
    }

    /// Current persisted preferences.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.inner.prefs.lock().unwrap().clone()
    }

    /// Update and persist preferences.
    pub fn update_preferences(&self, f: impl FnOnce(&mut Preferences)) {
        let mut prefs = self.inner.prefs.lock().unwrap();
        f(&mut prefs);
        prefs.save();
    }

    /// Select an airport and trigger a critical load.
    ///
    /// The choice is persisted. Reselecting the current airport keeps
    /// the cached baseline and forecast; switching airports clears
    /// everything.
    pub fn select_airport(&self, ident: &str) {
        let inner = Arc::clone(&self.inner);
        let ident = ident.to_string();

        {
            let mut prefs = inner.prefs.lock().unwrap();
            prefs.last_airport = Some(ident.clone());
            prefs.save();
        }

        let same_airport = inner.state.borrow().selected.as_deref() == Some(ident.as_str());
        let generation = if same_airport {
            inner.generation.load(Ordering::SeqCst)
        } else {
            inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        inner.state.send_modify(|s| {
            s.selected = Some(ident.clone());
            s.clear_airport_data(same_airport);
            s.loading = true;
            s.push_diagnostic(DiagnosticLevel::Info, format!("Selected airport {ident}"));
        });

        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::spawn(load_cycle(inner, ident, generation, Some(epoch)));
    }

    /// Manual refresh: re-probe connectivity, then load the airport
    /// list (first time) or reload the current airport's data.
    pub fn refresh(&self) {
        tokio::spawn(refresh_cycle(Arc::clone(&self.inner), true));
    }

    /// Cancel all timer tasks.
    pub fn shutdown(&self) {
        info!("Shutting down orchestrator");
        self.cancel.cancel();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_timers(inner: &Arc<Inner>, cancel: &CancellationToken, config: &OrchestratorConfig) {
    // Connectivity probe; first tick fires immediately.
    {
        let inner = Arc::clone(inner);
        let cancel = cancel.clone();
        let period = config.probe_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => { probe_once(&inner).await; }
                    () = cancel.cancelled() => break,
                }
            }
        });
    }

    // Full auto-refresh while connected and an airport is selected.
    {
        let inner = Arc::clone(inner);
        let cancel = cancel.clone();
        let period = config.refresh_interval;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Some(ident) = connected_selection(&inner) {
                            let generation = inner.generation.load(Ordering::SeqCst);
                            load_cycle(Arc::clone(&inner), ident, generation, None).await;
                        }
                    }
                    () = cancel.cancelled() => break,
                }
            }
        });
    }

    // Weather-only refresh.
    {
        let inner = Arc::clone(inner);
        let cancel = cancel.clone();
        let period = config.weather_interval;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => { weather_refresh(&inner).await; }
                    () = cancel.cancelled() => break,
                }
            }
        });
    }

    // Forced forecast refresh, matching the upstream cache TTL.
    {
        let inner = Arc::clone(inner);
        let cancel = cancel.clone();
        let period = config.forecast_interval;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => { forecast_refresh(&inner).await; }
                    () = cancel.cancelled() => break,
                }
            }
        });
    }
}

/// The selected airport ident, but only while connected.
fn connected_selection(inner: &Inner) -> Option<String> {
    let state = inner.state.borrow();
    if state.connection.connected {
        state.selected.clone()
    } else {
        None
    }
}

/// Run the connectivity probe once and fold the result into state.
/// Returns whether the probe succeeded.
async fn probe_once(inner: &Inner) -> bool {
    let started = Instant::now();
    let result = inner.client.probe().await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let connected = result.is_ok();
    let error = result.err();
    let now = Utc::now();

    inner.state.send_modify(|s| {
        let was_connected = s.connection.connected;
        s.connection.connected = connected;
        s.connection.last_update = now;
        s.connection.latency_ms = connected.then_some(latency_ms);
        s.offline.record_probe(connected, now);
        if was_connected && !connected {
            let reason = error.map_or_else(String::new, |e| format!(": {e}"));
            s.push_diagnostic(
                DiagnosticLevel::Warning,
                format!("Connectivity lost{reason}"),
            );
        } else if !was_connected && connected {
            s.push_diagnostic(DiagnosticLevel::Info, "Connectivity restored".to_string());
        }
    });

    connected
}

/// Probe, then load the airports list (first time) or reload the
/// current selection.
///
/// A non-forced cycle (startup) dispatches under the current selection
/// epoch, so it dedupes against a load the selection effect already
/// triggered; a manual refresh always reloads.
async fn refresh_cycle(inner: Arc<Inner>, force: bool) {
    if !probe_once(&inner).await {
        debug!("Refresh skipped: offline");
        return;
    }

    let have_airports = inner.state.borrow().airports.is_some();
    if !have_airports {
        load_airports(&inner).await;
    }

    let selected = inner.state.borrow().selected.clone();
    if let Some(ident) = selected {
        let generation = inner.generation.load(Ordering::SeqCst);
        let epoch = if force {
            None
        } else {
            Some(inner.epoch.load(Ordering::SeqCst))
        };
        load_cycle(Arc::clone(&inner), ident, generation, epoch).await;
    }
}

async fn load_airports(inner: &Inner) {
    match inner.client.airports().await {
        Ok(fetched) => {
            let directory = Arc::new(AirportDirectory::new(fetched.data));
            info!("Loaded {} airports", directory.len());
            inner.state.send_modify(|s| {
                s.push_diagnostic(
                    DiagnosticLevel::Info,
                    format!("Airport list loaded: {} airports", directory.len()),
                );
                s.airports = Some(Arc::clone(&directory));
            });
        }
        Err(e) => {
            warn!("Failed to load airport list: {}", e);
        }
    }
}

/// Apply a partial state patch, unless the selection generation has
/// moved on (a result from a superseded airport is discarded
/// unconditionally).
fn merge(inner: &Inner, generation: u64, patch: impl FnOnce(&mut AppState)) {
    if inner.generation.load(Ordering::SeqCst) != generation {
        debug!("Discarding update from superseded airport selection");
        return;
    }
    inner.state.send_modify(patch);
}

/// One full load cycle for an airport, guarded so the same airport is
/// never double-dispatched.
///
/// An overlapping load for the same airport is always dropped. A
/// dispatch carrying a selection epoch is also dropped when that
/// ident/epoch pair was already dispatched, which collapses the
/// selection effect and the startup refresh into one load; periodic
/// and manual refresh pass no epoch and always reload.
async fn load_cycle(inner: Arc<Inner>, ident: String, generation: u64, epoch: Option<u64>) {
    {
        let mut inflight = inner.inflight.lock().unwrap();
        if !inflight.insert(ident.clone()) {
            debug!("Load already in flight for {}, skipping", ident);
            return;
        }
        if let Some(epoch) = epoch {
            let mut last = inner.last_dispatch.lock().unwrap();
            if *last == Some((ident.clone(), epoch)) {
                debug!("Load for {} already dispatched, skipping", ident);
                inflight.remove(&ident);
                return;
            }
            *last = Some((ident.clone(), epoch));
        }
    }

    run_load_cycle(&inner, &ident, generation).await;

    inner.inflight.lock().unwrap().remove(&ident);
}

async fn run_load_cycle(inner: &Arc<Inner>, ident: &str, generation: u64) {
    info!("Loading data for {}", ident);

    // Critical resources: overview and tracks, each published the
    // moment it settles so the map renders before slower resources.
    let (overview_err, tracks_err) = tokio::join!(
        async {
            match inner.client.overview(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.overview.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.overview.fail(&e));
                    Some(e)
                }
            }
        },
        async {
            match inner.client.tracks(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.tracks.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.tracks.fail(&e));
                    Some(e)
                }
            }
        },
    );

    let critical_failed = overview_err.is_some() && tracks_err.is_some();
    if critical_failed {
        let all_offline = [&overview_err, &tracks_err]
            .iter()
            .all(|e| e.as_ref().is_some_and(FetchError::is_offline));
        let message = if all_offline {
            "You appear to be offline; live airport data is unavailable.".to_string()
        } else {
            "The data server reported an error; live airport data is unavailable.".to_string()
        };
        warn!("Critical load failed for {}: {}", ident, message);
        merge(inner, generation, |s| {
            s.push_diagnostic(DiagnosticLevel::Error, message.clone());
            s.load_error = Some(message);
        });
    } else {
        // An airport has been loaded: offline accounting is live.
        merge(inner, generation, |s| s.offline.engage());
    }

    merge(inner, generation, |s| {
        s.loading = false;
        s.background_loading = true;
    });

    // Background resources. Baseline and forecast are only fetched
    // when not already cached for this airport, so a background
    // refresh never clears them (they are replaced atomically when new
    // data arrives or the airport changes).
    let (baseline_cached, forecast_cached) = {
        let state = inner.state.borrow();
        (state.baseline.value.is_some(), state.forecast.value.is_some())
    };
    let need_baseline = !baseline_cached;
    let need_forecast = !forecast_cached;

    let (pireps_err, arrivals_err, summary_err, baseline_err, forecast_err) = tokio::join!(
        async {
            match inner.client.pireps(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.pireps.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.pireps.fail(&e));
                    Some(e)
                }
            }
        },
        async {
            match inner.client.arrivals(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.arrivals.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.arrivals.fail(&e));
                    Some(e)
                }
            }
        },
        async {
            match inner.client.summary(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.summary.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.summary.fail(&e));
                    Some(e)
                }
            }
        },
        async {
            if !need_baseline {
                debug!("Baseline cached for {}, skipping fetch", ident);
                return None;
            }
            match inner.client.baseline(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.baseline.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.baseline.fail(&e));
                    Some(e)
                }
            }
        },
        async {
            if !need_forecast {
                debug!("Forecast cached for {}, skipping fetch", ident);
                return None;
            }
            match inner.client.forecast(ident).await {
                Ok(f) => {
                    merge(inner, generation, |s| s.forecast.apply(f));
                    None
                }
                Err(e) => {
                    merge(inner, generation, |s| s.forecast.fail(&e));
                    Some(e)
                }
            }
        },
    );

    // Fold observed arrivals into the forecast by slot-key lookup.
    merge(inner, generation, |s| {
        if let Some(arrivals) = s.arrivals.value.clone() {
            if let Some(forecast) = s.forecast.value.as_mut() {
                forecast.merge_actuals(&arrivals);
            }
        }
    });

    // Cycle-level failure accounting: an all-failed cycle surfaces one
    // user-visible error; partial failure is a soft notice.
    let mut attempted = 5usize;
    if need_baseline {
        attempted += 1;
    }
    if need_forecast {
        attempted += 1;
    }
    let failures: Vec<&FetchError> = [
        &overview_err,
        &tracks_err,
        &pireps_err,
        &arrivals_err,
        &summary_err,
        &baseline_err,
        &forecast_err,
    ]
    .into_iter()
    .filter_map(Option::as_ref)
    .collect();

    let failed = failures.len();
    let all_offline = !failures.is_empty() && failures.iter().all(|e| e.is_offline());
    merge(inner, generation, |s| {
        s.background_loading = false;
        if failed == 0 {
            s.load_error = None;
            s.degraded = None;
        } else if failed == attempted {
            s.degraded = None;
            s.load_error = Some(if all_offline {
                "You appear to be offline; live airport data is unavailable.".to_string()
            } else {
                "The data server reported an error; live airport data is unavailable.".to_string()
            });
        } else {
            s.load_error = None;
            s.degraded = Some(format!("{failed} of {attempted} data sources failed"));
        }
    });

    info!(
        "Load cycle for {} settled ({} of {} sources failed)",
        ident, failed, attempted
    );
}

/// Weather-only background refresh.
async fn weather_refresh(inner: &Arc<Inner>) {
    let Some(ident) = connected_selection(inner) else {
        return;
    };
    let generation = inner.generation.load(Ordering::SeqCst);
    match inner.client.overview(&ident).await {
        Ok(f) => merge(inner, generation, |s| s.overview.apply(f)),
        Err(e) => {
            debug!("Weather refresh failed for {}: {}", ident, e);
            merge(inner, generation, |s| s.overview.fail(&e));
        }
    }
}

/// Forced forecast refresh; replaces the cached forecast atomically and
/// re-applies any known actuals.
async fn forecast_refresh(inner: &Arc<Inner>) {
    let Some(ident) = connected_selection(inner) else {
        return;
    };
    let generation = inner.generation.load(Ordering::SeqCst);
    match inner.client.forecast(&ident).await {
        Ok(f) => merge(inner, generation, |s| {
            let mut forecast = f.data.clone();
            if let Some(arrivals) = &s.arrivals.value {
                forecast.merge_actuals(arrivals);
            }
            s.forecast.apply(crate::resources::Fetched {
                data: forecast,
                source: f.source,
                timestamp: f.timestamp,
            });
        }),
        Err(e) => {
            debug!("Forecast refresh failed for {}: {}", ident, e);
            merge(inner, generation, |s| s.forecast.fail(&e));
        }
    }
}
