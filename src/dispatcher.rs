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

use crate::booking::{Booking, BookingHandle};
use crate::config::DispatchConfig;
use crate::driver::Driver;
use crate::driver_pool::DriverPool;
use crate::error::ConfigError;
use crate::events::{ConsoleEventSink, EventSink};
use crate::metrics::DispatchMetrics;
use crate::passenger::Passenger;
use crate::region::Region;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Central registry of regions and owner of the idle driver pool.
///
/// Admission control lives in [`Region`]; the dispatcher only routes bookings
/// and lends out drivers.
pub struct Dispatcher {
    regions: HashMap<String, Arc<Region>>,
    pool: DriverPool,
    events: Arc<dyn EventSink>,
    log_events: bool,
}

impl Dispatcher {
    /// Builds a dispatcher that reports events through the `log` facade.
    pub fn new(config: DispatchConfig) -> Result<Arc<Self>, ConfigError> {
        Self::with_event_sink(config, Arc::new(ConsoleEventSink))
    }

    pub fn with_event_sink(
        config: DispatchConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let dispatcher = Arc::new_cyclic(|weak| Self {
            regions: config
                .regions
                .iter()
                .map(|(name, &max)| (name.clone(), Arc::new(Region::new(name, max, weak.clone()))))
                .collect(),
            pool: DriverPool::new(config.max_idle_drivers, config.driver_recheck_interval),
            events,
            log_events: config.log_events,
        });

        dispatcher.log_event(None, "Creating dispatch");
        for (name, max) in &config.regions {
            dispatcher.log_event(None, &format!("Creating region {name} (max {max} jobs)"));
        }
        dispatcher.log_event(
            None,
            &format!("Done creating {} regions", dispatcher.regions.len()),
        );
        Ok(dispatcher)
    }

    /// Registers an idle driver. Returns `false` when the pool is full.
    pub fn add_driver(&self, driver: impl Into<Arc<Driver>>) -> bool {
        self.pool.add_driver(driver.into())
    }

    /// Takes an idle driver without waiting.
    pub fn get_driver(&self) -> Option<Arc<Driver>> {
        self.pool.get_driver()
    }

    pub(crate) async fn acquire_driver(&self, cancel: &CancellationToken) -> Option<Arc<Driver>> {
        self.pool.acquire(cancel).await
    }

    /// Returns a driver to the idle pool once its trip is over.
    pub fn release_driver(&self, driver: Arc<Driver>) {
        debug!("driver {driver} is idle again");
        self.pool.release(driver);
    }

    pub fn idle_drivers(&self) -> usize {
        self.pool.idle_count()
    }

    /// Books `passenger` into `region`. Returns `None` if the region does not
    /// exist or is shutting down.
    pub fn book_passenger(
        &self,
        passenger: impl Into<Arc<Passenger>>,
        region: &str,
    ) -> Option<BookingHandle> {
        let passenger = passenger.into();
        let Some(selected) = self.regions.get(region) else {
            self.log_event(
                None,
                &format!("Booking rejected for {passenger}: region '{region}' does not exist"),
            );
            return None;
        };
        selected.book_passenger(passenger)
    }

    /// Unresolved bookings across all regions. Each region is counted
    /// separately, so the total is only a snapshot.
    pub fn bookings_awaiting_driver(&self) -> usize {
        self.regions
            .values()
            .map(|region| region.bookings_awaiting_driver())
            .sum()
    }

    /// Tells every region to stop accepting bookings and to resolve those
    /// still waiting for a driver.
    pub fn shutdown(&self) {
        self.log_event(None, "Shutting down dispatch");
        for region in self.regions.values() {
            region.shutdown();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.regions.values().all(|region| region.is_shutting_down())
    }

    pub fn region(&self, name: &str) -> Option<&Arc<Region>> {
        self.regions.get(name)
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn metrics(&self) -> DispatchMetrics {
        let mut regions: Vec<_> = self.regions.values().map(|r| r.metrics()).collect();
        regions.sort_by(|a, b| a.region.cmp(&b.region));
        DispatchMetrics {
            idle_drivers: self.pool.idle_count(),
            registered_drivers: self.pool.registered_count(),
            max_idle_drivers: self.pool.capacity(),
            awaiting_driver: regions.iter().map(|r| r.awaiting_driver).sum(),
            regions,
        }
    }

    /// Sends an event to the sink if event logging was enabled.
    pub fn log_event(&self, booking: Option<&Booking>, message: &str) {
        if self.log_events {
            self.events.log_event(booking, message);
        }
    }
}
