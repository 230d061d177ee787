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

//! Slot alignment across time series with differing key sets.
//!
//! Series are keyed by zero-padded `HH:MM` slot strings, so the
//! lexicographic sort order is also chronological within a day. The
//! aligner computes the sorted union of all keys and re-expresses each
//! series as a value vector positional to that union, with `None`
//! filling the gaps. Used identically whether aligning two baseline
//! series or baselines plus a live forecast.

use std::collections::{BTreeMap, BTreeSet};

/// Result of aligning one or more slot-keyed series.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Sorted union of all slot keys, no duplicates.
    pub keys: Vec<String>,
    /// One value row per input series, each the same length as `keys`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl Alignment {
    /// Value of series `series` at slot key `key`, if both exist.
    #[must_use]
    pub fn value_at(&self, series: usize, key: &str) -> Option<f64> {
        let pos = self.keys.iter().position(|k| k == key)?;
        self.values.get(series)?.get(pos).copied().flatten()
    }
}

/// Align any number of slot-keyed series to their common key union.
///
/// Total on all inputs: no series yields an empty alignment, and every
/// output row has exactly `keys.len()` entries.
#[must_use]
pub fn align(series: &[&BTreeMap<String, f64>]) -> Alignment {
    let union: BTreeSet<&String> = series.iter().flat_map(|s| s.keys()).collect();
    let keys: Vec<String> = union.into_iter().cloned().collect();

    let values = series
        .iter()
        .map(|s| keys.iter().map(|k| s.get(k).copied()).collect())
        .collect();

    Alignment { keys, values }
}
