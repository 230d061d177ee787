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

//! Persisted user preferences.
//!
//! Stored as TOML via confy. The last-selected airport and display
//! flags are rehydrated at startup; corrupt or missing entries fall
//! back to defaults silently. Unknown keys from older or newer schema
//! versions are ignored through serde defaults.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "airsitu";
const CONFIG_NAME: &str = "preferences";

/// Persisted preferences for the UI shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Schema version for future migrations.
    #[serde(default = "default_version")]
    pub config_version: u32,

    /// Last-selected airport identifier.
    #[serde(default)]
    pub last_airport: Option<String>,

    /// Show ground tracks on the map.
    #[serde(default = "default_true")]
    pub show_tracks: bool,

    /// Show pilot reports on the map.
    #[serde(default = "default_true")]
    pub show_pireps: bool,

    /// Show the weather overlay layer.
    #[serde(default)]
    pub show_weather_overlay: bool,

    /// Overlay historical baselines on the arrivals chart.
    #[serde(default = "default_true")]
    pub show_baseline_overlay: bool,
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            config_version: default_version(),
            last_airport: None,
            show_tracks: true,
            show_pireps: true,
            show_weather_overlay: false,
            show_baseline_overlay: true,
        }
    }
}

impl Preferences {
    /// Load preferences from disk, silently falling back to defaults
    /// when the file is missing or unreadable.
    #[must_use]
    pub fn load() -> Self {
        match confy::load(APP_NAME, CONFIG_NAME) {
            Ok(prefs) => prefs,
            Err(e) => {
                debug!("Preferences unreadable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Save preferences to disk. Failures are logged, never fatal.
    pub fn save(&self) {
        if let Err(e) = confy::store(APP_NAME, CONFIG_NAME, self) {
            warn!("Failed to persist preferences: {}", e);
        }
    }
}
