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

use serde::Serialize;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RegionMetrics {
    pub region: String,
    pub max_simultaneous_jobs: usize,
    pub active_jobs: usize,
    pub in_progress: usize,
    pub awaiting_driver: usize,
    pub completed: usize,
    /// Bookings resolved without a driver because the region shut down.
    pub forced: usize,
    pub shutting_down: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DispatchMetrics {
    pub idle_drivers: usize,
    pub registered_drivers: usize,
    pub max_idle_drivers: usize,
    pub awaiting_driver: usize,
    pub regions: Vec<RegionMetrics>,
}
