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
use crate::passenger::Passenger;
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A driver recycled between the idle pool and the booking currently holding it.
///
/// Trip methods must only be called by the booking that removed the driver from
/// the pool; the passenger slot is locked only for the instant it is read or
/// written, never across the simulated delays.
#[derive(Debug)]
pub struct Driver {
    name: String,
    max_pickup_delay: Duration,
    delays: Arc<dyn DelayGenerator>,
    current_passenger: Mutex<Option<Arc<Passenger>>>,
}

impl Driver {
    pub fn new(name: impl Into<String>, max_pickup_delay: Duration) -> Self {
        Self::with_delays(name, max_pickup_delay, Arc::new(RandomDelay))
    }

    pub fn with_delays(
        name: impl Into<String>,
        max_pickup_delay: Duration,
        delays: Arc<dyn DelayGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            max_pickup_delay,
            delays,
            current_passenger: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_pickup_delay(&self) -> Duration {
        self.max_pickup_delay
    }

    pub fn current_passenger(&self) -> Option<Arc<Passenger>> {
        self.passenger_slot().clone()
    }

    pub fn is_idle(&self) -> bool {
        self.passenger_slot().is_none()
    }

    /// Takes on `passenger` and travels to them, which takes up to the
    /// configured pick-up delay.
    pub async fn pick_up_passenger(&self, passenger: Arc<Passenger>) {
        let wait = self.delays.delay(self.max_pickup_delay);
        *self.passenger_slot() = Some(Arc::clone(&passenger));
        tokio::time::sleep(wait).await;
        debug!("{} picked up {} after {:?}", self.name, passenger, wait);
    }

    /// Drives the current passenger for their travel time, then frees the seat.
    /// Does nothing if no passenger was picked up.
    pub async fn drive_to_destination(&self) {
        let Some(passenger) = self.current_passenger() else {
            return;
        };
        let travel = passenger.travel_time();
        tokio::time::sleep(travel).await;
        debug!(
            "{} drove {} to destination in {:?}",
            self.name, passenger, travel
        );
        self.passenger_slot().take();
    }

    fn passenger_slot(&self) -> MutexGuard<'_, Option<Arc<Passenger>>> {
        self.current_passenger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new("driver", DEFAULT_MAX_DELAY)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
