// Copyright 2025 Google LLC
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

use crate::constants::{DRIVER_RECHECK_INTERVAL, MAX_IDLE_DRIVERS};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Construction input for a [`Dispatcher`](crate::dispatcher::Dispatcher).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Region name to the maximum number of bookings it may run at once.
    pub regions: BTreeMap<String, usize>,
    /// Whether dispatch events reach the event sink.
    pub log_events: bool,
    /// Most drivers the pool will register, whether idle or on a trip.
    pub max_idle_drivers: usize,
    /// Longest a waiting booking sleeps before re-checking the idle pool.
    pub driver_recheck_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            regions: BTreeMap::new(),
            log_events: false,
            max_idle_drivers: MAX_IDLE_DRIVERS,
            driver_recheck_interval: DRIVER_RECHECK_INTERVAL,
        }
    }
}

impl DispatchConfig {
    pub fn new(log_events: bool) -> Self {
        Self {
            log_events,
            ..Self::default()
        }
    }

    pub fn from_regions<I, S>(regions: I, log_events: bool) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            regions: regions.into_iter().map(|(n, k)| (n.into(), k)).collect(),
            ..Self::new(log_events)
        }
    }

    pub fn with_region(mut self, name: impl Into<String>, max_simultaneous_jobs: usize) -> Self {
        self.regions.insert(name.into(), max_simultaneous_jobs);
        self
    }

    pub fn with_max_idle_drivers(mut self, max_idle_drivers: usize) -> Self {
        self.max_idle_drivers = max_idle_drivers;
        self
    }

    pub fn with_driver_recheck_interval(mut self, interval: Duration) -> Self {
        self.driver_recheck_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_idle_drivers == 0 {
            return Err(ConfigError::ZeroPoolCapacity);
        }
        if self.driver_recheck_interval.is_zero() {
            return Err(ConfigError::ZeroRecheckInterval);
        }
        for (name, &max) in &self.regions {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyRegionName);
            }
            if max == 0 {
                return Err(ConfigError::ZeroCapacity(name.clone()));
            }
        }
        Ok(())
    }
}
