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

//! Typed resource client: one async call per backend resource.
//!
//! The orchestrator and query coordinator only ever talk to the
//! [`ResourceClient`] trait, so tests substitute a scripted client and
//! shells can wrap any transport. [`HttpResourceClient`] is the
//! provided reqwest-backed implementation; it maps connect/timeout
//! failures to [`FetchError::Offline`] so callers can distinguish lost
//! connectivity from server-side errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::airports::Airport;
use crate::error::FetchError;
use crate::resources::{
    ArrivalCounts, ArrivalForecast, ArrivalSituation, BaselinePayload, ConditionFingerprint,
    Fetched, GroundTrack, Pirep, SituationSummary, WeatherOverview,
};

/// One async call per backend resource.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Airport reference list with DST calendars and thresholds.
    async fn airports(&self) -> Result<Fetched<Vec<Airport>>, FetchError>;

    async fn overview(&self, airport: &str) -> Result<Fetched<WeatherOverview>, FetchError>;

    async fn pireps(&self, airport: &str) -> Result<Fetched<Vec<Pirep>>, FetchError>;

    async fn tracks(&self, airport: &str) -> Result<Fetched<Vec<GroundTrack>>, FetchError>;

    async fn arrivals(&self, airport: &str) -> Result<Fetched<ArrivalCounts>, FetchError>;

    async fn baseline(&self, airport: &str) -> Result<Fetched<BaselinePayload>, FetchError>;

    async fn forecast(&self, airport: &str) -> Result<Fetched<ArrivalForecast>, FetchError>;

    async fn summary(&self, airport: &str) -> Result<Fetched<SituationSummary>, FetchError>;

    /// Planning query: arrival situation for a candidate future time
    /// under the given weather conditions.
    async fn situation(
        &self,
        airport: &str,
        target: DateTime<Utc>,
        conditions: &ConditionFingerprint,
    ) -> Result<Fetched<ArrivalSituation>, FetchError>;

    /// Lightweight connectivity probe.
    async fn probe(&self) -> Result<(), FetchError>;
}

/// Reqwest-backed [`ResourceClient`].
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpResourceClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_resource<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Fetched<T>, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.http.get(&url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Fetched<T>>().await.map_err(classify)
    }
}

/// Map a transport error onto the fetch taxonomy. Connect and timeout
/// failures are connectivity-attributable.
fn classify(err: reqwest::Error) -> FetchError {
    if err.is_connect() || err.is_timeout() {
        FetchError::Offline(err.to_string())
    } else if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Server {
            status: err.status().map_or(0, |s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn airports(&self) -> Result<Fetched<Vec<Airport>>, FetchError> {
        self.get_resource("airports").await
    }

    async fn overview(&self, airport: &str) -> Result<Fetched<WeatherOverview>, FetchError> {
        self.get_resource(&format!("airports/{airport}/overview")).await
    }

    async fn pireps(&self, airport: &str) -> Result<Fetched<Vec<Pirep>>, FetchError> {
        self.get_resource(&format!("airports/{airport}/pireps")).await
    }

    async fn tracks(&self, airport: &str) -> Result<Fetched<Vec<GroundTrack>>, FetchError> {
        self.get_resource(&format!("airports/{airport}/tracks")).await
    }

    async fn arrivals(&self, airport: &str) -> Result<Fetched<ArrivalCounts>, FetchError> {
        self.get_resource(&format!("airports/{airport}/arrivals")).await
    }

    async fn baseline(&self, airport: &str) -> Result<Fetched<BaselinePayload>, FetchError> {
        self.get_resource(&format!("airports/{airport}/baseline")).await
    }

    async fn forecast(&self, airport: &str) -> Result<Fetched<ArrivalForecast>, FetchError> {
        self.get_resource(&format!("airports/{airport}/forecast")).await
    }

    async fn summary(&self, airport: &str) -> Result<Fetched<SituationSummary>, FetchError> {
        self.get_resource(&format!("airports/{airport}/summary")).await
    }

    async fn situation(
        &self,
        airport: &str,
        target: DateTime<Utc>,
        conditions: &ConditionFingerprint,
    ) -> Result<Fetched<ArrivalSituation>, FetchError> {
        let url = format!(
            "{}/airports/{airport}/situation",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .query(&[
                ("target", target.to_rfc3339()),
                ("category", conditions.flight_category.clone()),
                ("wind_bucket", conditions.wind_bucket.to_string()),
                ("precipitation", conditions.precipitation.to_string()),
            ])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Fetched<ArrivalSituation>>().await.map_err(classify)
    }

    async fn probe(&self) -> Result<(), FetchError> {
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        let response = self.http.get(&url).send().await.map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Server {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            })
        }
    }
}
