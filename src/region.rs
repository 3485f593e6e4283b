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

use crate::booking::{Booking, BookingHandle, BookingId, BookingResult, BookingState};
use crate::dispatcher::Dispatcher;
use crate::metrics::RegionMetrics;
use crate::passenger::Passenger;
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// An independently capacity-limited partition of the dispatch service.
///
/// Every accepted booking runs as its own task. The task first takes one of
/// `max_simultaneous_jobs` semaphore permits, then waits for a driver; both
/// waits end early when the region shuts down. Bookings are not served in
/// arrival order.
pub struct Region {
    name: String,
    max_simultaneous_jobs: usize,
    dispatcher: Weak<Dispatcher>,
    slots: Arc<Semaphore>,
    active_jobs: AtomicUsize,
    trips: Arc<AtomicUsize>,
    bookings: DashMap<BookingId, Arc<Booking>>,
    accepting: RwLock<bool>,
    shutdown: CancellationToken,
    completed: AtomicUsize,
    forced: AtomicUsize,
}

impl Region {
    pub(crate) fn new(
        name: impl Into<String>,
        max_simultaneous_jobs: usize,
        dispatcher: Weak<Dispatcher>,
    ) -> Self {
        Self {
            name: name.into(),
            max_simultaneous_jobs,
            dispatcher,
            slots: Arc::new(Semaphore::new(max_simultaneous_jobs)),
            active_jobs: AtomicUsize::new(0),
            trips: Arc::new(AtomicUsize::new(0)),
            bookings: DashMap::new(),
            accepting: RwLock::new(true),
            shutdown: CancellationToken::new(),
            completed: AtomicUsize::new(0),
            forced: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_simultaneous_jobs(&self) -> usize {
        self.max_simultaneous_jobs
    }

    /// Bookings holding a slot, whether or not a driver has been found yet.
    pub fn active_jobs(&self) -> usize {
        self.active_jobs.load(Ordering::SeqCst)
    }

    /// Trips under way. Only bookings holding a slot are counted, so this
    /// never exceeds `max_simultaneous_jobs`.
    pub fn in_progress(&self) -> usize {
        self.trips.load(Ordering::SeqCst)
    }

    /// Accepted bookings whose result has not been delivered yet.
    pub fn bookings_awaiting_driver(&self) -> usize {
        self.count_in_state(|state| state != BookingState::Resolved)
    }

    pub fn is_shutting_down(&self) -> bool {
        !*self.accepting.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accepts `passenger` and starts working on the booking in the background.
    ///
    /// Returns `None` once the region is shutting down, or when called outside
    /// a tokio runtime. Bookings beyond the job ceiling are still accepted and
    /// wait for a free slot.
    pub fn book_passenger(self: &Arc<Self>, passenger: Arc<Passenger>) -> Option<BookingHandle> {
        // Held across registration and spawn so shutdown cannot slip in
        // between the check and the insert.
        let accepting = self.accepting.read().unwrap_or_else(PoisonError::into_inner);
        let dispatcher = self.dispatcher.upgrade()?;
        if !*accepting {
            dispatcher.log_event(
                None,
                &format!(
                    "Booking rejected for {}: region {} is shutting down",
                    passenger, self.name
                ),
            );
            return None;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "booking for {} in region {} rejected: no tokio runtime",
                passenger, self.name
            );
            dispatcher.log_event(
                None,
                &format!(
                    "Booking rejected for {}: region {} has no runtime to run it",
                    passenger, self.name
                ),
            );
            return None;
        };

        let booking = Arc::new(
            Booking::new(Arc::clone(&dispatcher), passenger)
                .with_trip_counter(Arc::clone(&self.trips)),
        );
        let handle = booking.handle();
        self.bookings.insert(booking.id(), Arc::clone(&booking));
        let queued = self.slots.available_permits() == 0;
        dispatcher.log_event(
            Some(&booking),
            &format!(
                "Booked into region {} ({} active of {}{})",
                self.name,
                self.active_jobs(),
                self.max_simultaneous_jobs,
                if queued { ", waiting for a slot" } else { "" }
            ),
        );

        runtime.spawn(Arc::clone(self).run(booking));
        drop(accepting);
        Some(handle)
    }

    /// Stops accepting bookings and resolves every booking that has no
    /// driver yet. Bookings already on a trip finish normally. Idempotent.
    pub fn shutdown(&self) {
        let was_accepting = {
            let mut accepting = self.accepting.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *accepting, false)
        };
        if was_accepting {
            self.log(None, &format!("Shutting down region {}", self.name));
        }
        self.shutdown.cancel();

        // Collect first: removing while iterating would deadlock the shard.
        let waiting: Vec<Arc<Booking>> = self
            .bookings
            .iter()
            .filter(|entry| entry.value().state() == BookingState::Pending)
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for booking in waiting {
            if booking.force_resolve() {
                self.forced.fetch_add(1, Ordering::SeqCst);
                self.bookings.remove(&booking.id());
                self.log(Some(&booking), "Resolved without a driver at shutdown");
            }
        }
    }

    pub fn metrics(&self) -> RegionMetrics {
        RegionMetrics {
            region: self.name.clone(),
            max_simultaneous_jobs: self.max_simultaneous_jobs,
            active_jobs: self.active_jobs(),
            in_progress: self.in_progress(),
            awaiting_driver: self.bookings_awaiting_driver(),
            completed: self.completed.load(Ordering::SeqCst),
            forced: self.forced.load(Ordering::SeqCst),
            shutting_down: self.is_shutting_down(),
        }
    }

    async fn run(self: Arc<Self>, booking: Arc<Booking>) {
        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            permit = Arc::clone(&self.slots).acquire_owned() => permit.ok(),
        };

        let result = match permit {
            Some(permit) => {
                let active = self.active_jobs.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(
                    "region {} started booking {} ({}/{} active)",
                    self.name,
                    booking.id(),
                    active,
                    self.max_simultaneous_jobs
                );
                let result = booking.execute(&self.shutdown).await;
                self.active_jobs.fetch_sub(1, Ordering::SeqCst);
                drop(permit);
                result
            }
            None => booking.unserved_result(),
        };

        self.finish(&booking, result);
    }

    fn finish(&self, booking: &Booking, result: BookingResult) {
        let served = result.was_served();
        if booking.resolve(result) {
            if served {
                self.completed.fetch_add(1, Ordering::SeqCst);
            } else {
                self.forced.fetch_add(1, Ordering::SeqCst);
                self.log(Some(booking), "Resolved without a driver at shutdown");
            }
        }
        self.bookings.remove(&booking.id());
    }

    fn count_in_state(&self, matches: impl Fn(BookingState) -> bool) -> usize {
        self.bookings
            .iter()
            .filter(|entry| matches(entry.value().state()))
            .count()
    }

    fn log(&self, booking: Option<&Booking>, message: &str) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.log_event(booking, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DispatchConfig;
    use crate::delay::FixedDelay;
    use crate::dispatcher::Dispatcher;
    use crate::driver::Driver;
    use crate::passenger::Passenger;
    use std::sync::Arc;
    use std::time::Duration;

    fn dispatcher(max_jobs: usize) -> Arc<Dispatcher> {
        Dispatcher::new(
            DispatchConfig::new(false)
                .with_region("rural", max_jobs)
                .with_driver_recheck_interval(Duration::from_millis(10)),
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

    fn driver(name: &str, pickup_ms: u64) -> Driver {
        Driver::with_delays(
            name,
            Duration::from_secs(1),
            Arc::new(FixedDelay::from_millis(pickup_ms)),
        )
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(tokio::time::Instant::now() < deadline, "condition not reached");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn over_capacity_booking_waits_then_runs() {
        let dispatcher = dispatcher(1);
        dispatcher.add_driver(driver("dana", 20));
        dispatcher.add_driver(driver("eli", 20));
        let region = Arc::clone(dispatcher.region("rural").unwrap());

        let first = region.book_passenger(passenger("p1", 40)).unwrap();
        let second = region.book_passenger(passenger("p2", 40)).unwrap();
        assert_eq!(region.bookings_awaiting_driver(), 2);

        eventually(|| region.in_progress() == 1).await;
        assert_eq!(region.active_jobs(), 1);
        assert_eq!(region.bookings_awaiting_driver(), 2);

        let (a, b) = tokio::join!(first.wait(), second.wait());
        assert!(a.unwrap().was_served());
        assert!(b.unwrap().was_served());
        eventually(|| region.bookings_awaiting_driver() == 0).await;
        assert_eq!(region.metrics().completed, 2);
    }

    #[test]
    fn booking_outside_a_runtime_is_rejected() {
        let dispatcher = dispatcher(1);
        let region = Arc::clone(dispatcher.region("rural").unwrap());
        assert!(region.book_passenger(passenger("p1", 0)).is_none());
        assert_eq!(region.bookings_awaiting_driver(), 0);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_bookings() {
        let dispatcher = dispatcher(2);
        let region = Arc::clone(dispatcher.region("rural").unwrap());
        region.shutdown();
        assert!(region.is_shutting_down());
        assert!(region.book_passenger(passenger("late", 0)).is_none());
        region.shutdown();
        assert!(region.is_shutting_down());
    }

    #[tokio::test]
    async fn shutdown_resolves_waiting_bookings_without_driver() {
        let dispatcher = dispatcher(1);
        let region = Arc::clone(dispatcher.region("rural").unwrap());
        let handles: Vec<_> = (0..3)
            .map(|i| region.book_passenger(passenger(&format!("p{i}"), 0)).unwrap())
            .collect();

        eventually(|| region.active_jobs() == 1).await;
        region.shutdown();

        for handle in &handles {
            assert!(handle.is_resolved());
            let result = tokio::time::timeout(Duration::from_secs(1), handle.wait())
                .await
                .expect("pending booking never resolved")
                .unwrap();
            assert!(result.driver.is_none());
        }
        eventually(|| region.metrics().forced == 3).await;
        assert_eq!(region.bookings_awaiting_driver(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn trip_in_progress_finishes_after_shutdown() {
        let dispatcher = dispatcher(1);
        dispatcher.add_driver(driver("dana", 30));
        let region = Arc::clone(dispatcher.region("rural").unwrap());

        let on_trip = region.book_passenger(passenger("p1", 30)).unwrap();
        let queued = region.book_passenger(passenger("p2", 30)).unwrap();
        eventually(|| region.in_progress() == 1).await;

        region.shutdown();

        let queued = queued.wait().await.unwrap();
        assert!(!queued.was_served());
        let on_trip = on_trip.wait().await.unwrap();
        assert_eq!(on_trip.driver.as_ref().map(|d| d.name()), Some("dana"));
        assert_eq!(dispatcher.idle_drivers(), 1);
    }
}
