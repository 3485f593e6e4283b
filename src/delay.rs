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

//! Pluggable delay sources for driver preparation and passenger travel.

use rand::Rng;
use std::fmt::Debug;
use std::time::Duration;

/// Produces a simulated duration bounded by `max`.
pub trait DelayGenerator: Debug + Send + Sync {
    /// Returns a duration in `[0, max)`, or zero when `max` is zero.
    fn delay(&self, max: Duration) -> Duration;
}

/// Uniform millisecond delays drawn from the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomDelay;

impl DelayGenerator for RandomDelay {
    fn delay(&self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

/// Always yields the same duration, capped at the requested maximum.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl DelayGenerator for FixedDelay {
    fn delay(&self, max: Duration) -> Duration {
        self.0.min(max)
    }
}
