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

//! Debounced planning-query coordination.
//!
//! A planning query asks "what will arrivals look like at this future
//! time under these conditions". Users drive the target time with a
//! slider, so raw queries arrive in bursts; the coordinator debounces
//! them, cancels superseded requests, and skips queries equivalent to
//! the last completed one. Targets within a minute of now short-circuit
//! to the live view without any network call.

use chrono::{DateTime, Utc};
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::ResourceClient;
use crate::resources::{ArrivalSituation, ConditionFingerprint};

/// Debounce window before a query is dispatched.
const DEBOUNCE: Duration = Duration::from_millis(400);

/// Targets within this window of now use the live view instead of a
/// network query.
const NOW_WINDOW_SECS: i64 = 60;

/// Two targets this close together, with matching airport and
/// conditions, are considered the same query.
const TOLERANCE_MINS: i64 = 5;

/// Published state of the planning query surface.
#[derive(Debug, Clone)]
pub enum QueryState {
    /// No query has been made.
    Idle,
    /// The target is (near) now; show live data.
    Live,
    /// A debounced query is in flight.
    Loading,
    /// The last query completed.
    Ready {
        airport: String,
        target: DateTime<Utc>,
        situation: ArrivalSituation,
        fetched_at: DateTime<Utc>,
    },
    /// The last query failed.
    Failed(String),
}

struct LastQuery {
    airport: String,
    target: DateTime<Utc>,
    conditions: ConditionFingerprint,
}

#[derive(Default)]
struct Pending {
    /// Token for the in-flight (or still debouncing) query, if any.
    current: Option<CancellationToken>,
    last_completed: Option<LastQuery>,
}

struct Shared {
    client: Arc<dyn ResourceClient>,
    state: watch::Sender<QueryState>,
    pending: Mutex<Pending>,
}

/// Debounced coordinator for planning queries.
pub struct QueryCoordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for QueryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCoordinator").finish_non_exhaustive()
    }
}

impl QueryCoordinator {
    #[must_use]
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        let (state_tx, _) = watch::channel(QueryState::Idle);
        Self {
            shared: Arc::new(Shared {
                client,
                state: state_tx,
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    /// Subscribe to query state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.shared.state.subscribe()
    }

    /// Current query state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> QueryState {
        self.shared.state.borrow().clone()
    }

    /// Submit a planning query for `target` time at `airport` under
    /// the given conditions.
    ///
    /// The query is debounced; a newer query cancels an older one at
    /// any stage, and a cancelled query never publishes a result or an
    /// error. A query equivalent to the last completed one (same
    /// airport and conditions, target within tolerance) is skipped.
    pub fn query(
        &self,
        airport: &str,
        target: DateTime<Utc>,
        conditions: ConditionFingerprint,
    ) {
        let shared = Arc::clone(&self.shared);
        let now = Utc::now();

        // Near-now targets mean the user slid back to the present.
        if (target - now).abs() < chrono::Duration::seconds(NOW_WINDOW_SECS) {
            let mut pending = shared.pending.lock().unwrap();
            if let Some(token) = pending.current.take() {
                token.cancel();
            }
            drop(pending);
            shared.state.send_replace(QueryState::Live);
            return;
        }

        let token = {
            let mut pending = shared.pending.lock().unwrap();
            if let Some(last) = &pending.last_completed {
                if last.airport == airport
                    && (target - last.target).abs() < chrono::Duration::minutes(TOLERANCE_MINS)
                    && last.conditions == conditions
                {
                    debug!("Skipping query equivalent to the last completed one");
                    return;
                }
            }
            if let Some(previous) = pending.current.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            pending.current = Some(token.clone());
            token
        };

        let airport = airport.to_string();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(DEBOUNCE) => {}
                () = token.cancelled() => return,
            }

            shared.state.send_replace(QueryState::Loading);
            debug!("Dispatching planning query for {} at {}", airport, target);

            let result = tokio::select! {
                res = shared.client.situation(&airport, target, &conditions) => res,
                () = token.cancelled() => return,
            };

            // A cancellation that raced the response wins.
            if token.is_cancelled() {
                return;
            }

            match result {
                Ok(fetched) => {
                    {
                        let mut pending = shared.pending.lock().unwrap();
                        pending.last_completed = Some(LastQuery {
                            airport: airport.clone(),
                            target,
                            conditions,
                        });
                        pending.current = None;
                    }
                    shared.state.send_replace(QueryState::Ready {
                        airport,
                        target,
                        situation: fetched.data,
                        fetched_at: fetched.timestamp,
                    });
                }
                Err(e) => {
                    shared.pending.lock().unwrap().current = None;
                    shared.state.send_replace(QueryState::Failed(e.to_string()));
                }
            }
        });
    }

    /// Drop any in-flight query and return to the idle state.
    pub fn reset(&self) {
        let mut pending = self.shared.pending.lock().unwrap();
        if let Some(token) = pending.current.take() {
            token.cancel();
        }
        pending.last_completed = None;
        drop(pending);
        self.shared.state.send_replace(QueryState::Idle);
    }
}
