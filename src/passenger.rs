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

use crate::constants::DEFAULT_MAX_DELAY;
use crate::delay::{DelayGenerator, RandomDelay};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A rider waiting to be taken somewhere. Immutable once created.
#[derive(Debug)]
pub struct Passenger {
    name: String,
    max_travel_time: Duration,
    delays: Arc<dyn DelayGenerator>,
}

impl Passenger {
    /// Passenger whose trips take a random time below `max_travel_time`.
    pub fn new(name: impl Into<String>, max_travel_time: Duration) -> Self {
        Self::with_delays(name, max_travel_time, Arc::new(RandomDelay))
    }

    pub fn with_delays(
        name: impl Into<String>,
        max_travel_time: Duration,
        delays: Arc<dyn DelayGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            max_travel_time,
            delays,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_travel_time(&self) -> Duration {
        self.max_travel_time
    }

    /// Length of a trip for this passenger. Drawn fresh on every call.
    pub fn travel_time(&self) -> Duration {
        self.delays.delay(self.max_travel_time)
    }
}

impl Default for Passenger {
    fn default() -> Self {
        Self::new("passenger", DEFAULT_MAX_DELAY)
    }
}

impl fmt::Display for Passenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::FixedDelay;

    #[test]
    fn travel_time_respects_bound() {
        let passenger = Passenger::new("alex", Duration::from_millis(30));
        for _ in 0..200 {
            assert!(passenger.travel_time() < Duration::from_millis(30));
        }
    }

    #[test]
    fn travel_time_uses_injected_generator() {
        let passenger = Passenger::with_delays(
            "sam",
            Duration::from_millis(500),
            Arc::new(FixedDelay::from_millis(12)),
        );
        assert_eq!(passenger.travel_time(), Duration::from_millis(12));
        assert_eq!(passenger.to_string(), "sam");
    }
}
