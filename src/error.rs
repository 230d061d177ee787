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

//! Error taxonomy for resource fetches.
//!
//! Connectivity-attributable failures carry the [`FetchError::Offline`]
//! variant so the orchestrator can word user-visible errors differently
//! for "offline" vs "server error". Stale cached data is not an error;
//! it is reported through snapshot metadata. A missing baseline bucket
//! is not an error either; lookups return `None`.

use thiserror::Error;

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The failure is attributable to lost connectivity.
    #[error("offline: {0}")]
    Offline(String),

    /// The server responded, but with a failure.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The response arrived but could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether this failure is attributable to lost connectivity.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self, FetchError::Offline(_))
    }
}
