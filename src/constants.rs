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

use std::time::Duration;

/// Ceiling on the number of drivers the shared pool will register.
pub const MAX_IDLE_DRIVERS: usize = 999;

/// Upper bound on how long a booking sleeps between driver availability checks
/// when no wake-up arrives.
pub const DRIVER_RECHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Default upper bound for driver preparation and passenger travel delays.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(100);
