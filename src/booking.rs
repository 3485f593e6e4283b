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

use crate::dispatcher::Dispatcher;
use crate::driver::Driver;
use crate::error::BookingError;
use crate::passenger::Passenger;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub type BookingId = u64;

static NEXT_BOOKING_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BookingState {
    /// Accepted, no driver yet.
    Pending,
    /// Driver allocated, trip under way.
    InProgress,
    /// Result delivered.
    Resolved,
}

impl BookingState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::InProgress,
            _ => Self::Resolved,
        }
    }
}

/// Terminal outcome of a booking. `driver` is `None` when the booking was
/// resolved by shutdown before a driver could be allocated.
#[derive(Clone, Debug)]
pub struct BookingResult {
    pub booking_id: BookingId,
    pub passenger: Arc<Passenger>,
    pub driver: Option<Arc<Driver>>,
    /// Time from booking creation to completion.
    pub trip_duration: Duration,
}

impl BookingResult {
    pub fn was_served(&self) -> bool {
        self.driver.is_some()
    }
}

/// One passenger's trip, from acceptance by a region to arrival.
pub struct Booking {
    id: BookingId,
    dispatcher: Arc<Dispatcher>,
    passenger: Arc<Passenger>,
    created_at: Instant,
    driver: OnceLock<Arc<Driver>>,
    state: AtomicU8,
    result_tx: watch::Sender<Option<BookingResult>>,
    /// Shared count of trips under way, bumped while this booking holds a driver.
    trips: Option<Arc<AtomicUsize>>,
}

impl Booking {
    pub fn new(dispatcher: Arc<Dispatcher>, passenger: Arc<Passenger>) -> Self {
        let (result_tx, _) = watch::channel(None);
        let booking = Self {
            id: NEXT_BOOKING_ID.fetch_add(1, Ordering::Relaxed),
            dispatcher,
            passenger,
            created_at: Instant::now(),
            driver: OnceLock::new(),
            state: AtomicU8::new(BookingState::Pending as u8),
            result_tx,
            trips: None,
        };
        booking.dispatcher.log_event(Some(&booking), "Creating booking");
        booking
    }

    /// Counts this booking in `trips` from driver assignment until drop-off.
    pub(crate) fn with_trip_counter(mut self, trips: Arc<AtomicUsize>) -> Self {
        self.trips = Some(trips);
        self
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn passenger(&self) -> &Arc<Passenger> {
        &self.passenger
    }

    pub fn driver(&self) -> Option<&Arc<Driver>> {
        self.driver.get()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn state(&self) -> BookingState {
        BookingState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// A new observer of this booking's result.
    pub fn handle(&self) -> BookingHandle {
        BookingHandle {
            booking_id: self.id,
            rx: self.result_tx.subscribe(),
        }
    }

    /// Runs the trip: waits for a driver, picks up, drives, returns the driver
    /// to the pool.
    ///
    /// If `cancel` fires before a driver is obtained, or shutdown resolved the
    /// booking while it was waiting, the result carries no driver.
    pub async fn execute(&self, cancel: &CancellationToken) -> BookingResult {
        self.dispatcher
            .log_event(Some(self), "Starting booking, getting driver");

        let Some(driver) = self.dispatcher.acquire_driver(cancel).await else {
            self.dispatcher
                .log_event(Some(self), "No driver allocated before shutdown");
            return self.unserved_result();
        };
        if !self.assign_driver(&driver) {
            self.dispatcher.release_driver(driver);
            return self.unserved_result();
        }
        if let Some(trips) = &self.trips {
            trips.fetch_add(1, Ordering::SeqCst);
        }

        self.dispatcher
            .log_event(Some(self), "Starting, on way to passenger");
        driver.pick_up_passenger(Arc::clone(&self.passenger)).await;
        self.dispatcher
            .log_event(Some(self), "Collected passenger, on way to destination");
        driver.drive_to_destination().await;
        self.dispatcher
            .log_event(Some(self), "At destination, driver is now free");

        let trip_duration = self.created_at.elapsed();
        if let Some(trips) = &self.trips {
            trips.fetch_sub(1, Ordering::SeqCst);
        }
        self.dispatcher.release_driver(Arc::clone(&driver));

        BookingResult {
            booking_id: self.id,
            passenger: Arc::clone(&self.passenger),
            driver: Some(driver),
            trip_duration,
        }
    }

    /// Delivers `result` unless one was already delivered. Returns whether this
    /// call was the one that resolved the booking.
    pub(crate) fn resolve(&self, result: BookingResult) -> bool {
        self.state
            .store(BookingState::Resolved as u8, Ordering::Release);
        self.result_tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(result);
            true
        })
    }

    /// Resolves a booking that has no driver yet with an unserved result.
    /// Returns `false` if it already holds a driver or is resolved.
    pub(crate) fn force_resolve(&self) -> bool {
        if self.transition(BookingState::Pending, BookingState::Resolved) {
            self.resolve(self.unserved_result())
        } else {
            false
        }
    }

    fn assign_driver(&self, driver: &Arc<Driver>) -> bool {
        if !self.transition(BookingState::Pending, BookingState::InProgress) {
            return false;
        }
        self.driver.set(Arc::clone(driver)).is_ok()
    }

    fn transition(&self, from: BookingState, to: BookingState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn unserved_result(&self) -> BookingResult {
        BookingResult {
            booking_id: self.id,
            passenger: Arc::clone(&self.passenger),
            driver: None,
            trip_duration: self.created_at.elapsed(),
        }
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = self.driver.get().map_or("null", |d| d.name());
        write!(f, "{}: {}: {}", self.id, driver, self.passenger.name())
    }
}

impl fmt::Debug for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Booking")
            .field("id", &self.id)
            .field("passenger", &self.passenger.name())
            .field("driver", &self.driver.get().map(|d| d.name()))
            .field("state", &self.state())
            .finish()
    }
}

/// The caller's view of a booking's eventual result. Clones observe the same
/// value.
#[derive(Clone, Debug)]
pub struct BookingHandle {
    booking_id: BookingId,
    rx: watch::Receiver<Option<BookingResult>>,
}

impl BookingHandle {
    pub fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn try_result(&self) -> Option<BookingResult> {
        self.rx.borrow().clone()
    }

    /// Waits until the booking resolves.
    pub async fn wait(&self) -> Result<BookingResult, BookingError> {
        let mut rx = self.rx.clone();
        let resolved = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| BookingError::Abandoned(self.booking_id))?;
        resolved
            .clone()
            .ok_or(BookingError::Abandoned(self.booking_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::delay::FixedDelay;
    use std::collections::HashSet;

    fn dispatcher() -> Arc<Dispatcher> {
        Dispatcher::new(
            DispatchConfig::new(false).with_driver_recheck_interval(Duration::from_millis(10)),
        )
        .unwrap()
    }

    fn passenger(name: &str, travel_ms: u64) -> Arc<Passenger> {
        Arc::new(Passenger::with_delays(
            name,
            Duration::from_secs(1),
            Arc::new(FixedDelay::from_millis(travel_ms)),
        ))
    }

    fn driver(name: &str) -> Arc<Driver> {
        Arc::new(Driver::with_delays(
            name,
            Duration::from_secs(1),
            Arc::new(FixedDelay::from_millis(5)),
        ))
    }

    #[test]
    fn display_renders_null_without_driver() {
        let booking = Booking::new(dispatcher(), passenger("pat", 0));
        assert_eq!(booking.to_string(), format!("{}: null: pat", booking.id()));
        assert_eq!(booking.state(), BookingState::Pending);
    }

    #[test]
    fn ids_increase_within_a_thread() {
        let dispatcher = dispatcher();
        let ids: Vec<_> = (0..10)
            .map(|i| Booking::new(Arc::clone(&dispatcher), passenger(&format!("p{i}"), 0)).id())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let dispatcher = dispatcher();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| Booking::new(Arc::clone(&dispatcher), passenger("p", 0)).id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let ids = handle.join().expect("booking thread panicked");
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[tokio::test]
    async fn execute_serves_and_returns_driver() {
        let dispatcher = dispatcher();
        dispatcher.add_driver(driver("dana"));
        let booking = Booking::new(Arc::clone(&dispatcher), passenger("pat", 10));

        let result = booking.execute(&CancellationToken::new()).await;

        assert_eq!(result.booking_id, booking.id());
        assert_eq!(result.driver.as_ref().map(|d| d.name()), Some("dana"));
        assert!(result.trip_duration >= Duration::from_millis(15));
        assert_eq!(booking.state(), BookingState::InProgress);
        assert_eq!(booking.to_string(), format!("{}: dana: pat", booking.id()));
        assert_eq!(dispatcher.idle_drivers(), 1);
    }

    #[tokio::test]
    async fn trip_counter_covers_only_the_trip() {
        let dispatcher = dispatcher();
        let trips = Arc::new(AtomicUsize::new(0));
        let booking = Booking::new(Arc::clone(&dispatcher), passenger("pat", 60))
            .with_trip_counter(Arc::clone(&trips));
        let cancel = CancellationToken::new();

        let run = booking.execute(&cancel);
        tokio::pin!(run);
        let early = tokio::time::timeout(Duration::from_millis(10), run.as_mut()).await;
        assert!(early.is_err());
        assert_eq!(trips.load(Ordering::SeqCst), 0);

        dispatcher.add_driver(driver("dana"));
        let observed = tokio::time::timeout(Duration::from_millis(20), run.as_mut()).await;
        assert!(observed.is_err());
        assert_eq!(trips.load(Ordering::SeqCst), 1);

        assert!(run.await.was_served());
        assert_eq!(trips.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn execute_without_drivers_ends_on_cancel() {
        let dispatcher = dispatcher();
        let booking = Booking::new(dispatcher, passenger("pat", 0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = booking.execute(&cancel).await;
        assert!(!result.was_served());
        assert_eq!(booking.state(), BookingState::Pending);
    }

    #[tokio::test]
    async fn resolution_happens_once() {
        let booking = Booking::new(dispatcher(), passenger("pat", 0));
        let handle = booking.handle();
        let other = handle.clone();

        assert!(booking.force_resolve());
        assert!(!booking.force_resolve());
        assert!(!booking.resolve(booking.unserved_result()));

        let first = handle.wait().await.unwrap();
        let second = other.wait().await.unwrap();
        assert_eq!(first.booking_id, second.booking_id);
        assert!(!first.was_served());
        assert_eq!(booking.state(), BookingState::Resolved);
    }

    #[tokio::test]
    async fn force_resolve_loses_to_assigned_driver() {
        let dispatcher = dispatcher();
        let booking = Booking::new(Arc::clone(&dispatcher), passenger("pat", 0));
        assert!(booking.assign_driver(&driver("dana")));
        assert!(!booking.force_resolve());
        assert!(!booking.handle().is_resolved());
    }

    #[tokio::test]
    async fn shutdown_resolution_returns_late_driver() {
        let dispatcher = dispatcher();
        let booking = Booking::new(Arc::clone(&dispatcher), passenger("pat", 0));
        assert!(booking.force_resolve());

        dispatcher.add_driver(driver("late"));
        let result = booking.execute(&CancellationToken::new()).await;
        assert!(!result.was_served());
        assert!(booking.driver().is_none());
        assert_eq!(dispatcher.idle_drivers(), 1);
    }
}
