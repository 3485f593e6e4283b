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

use crate::driver::Driver;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Bounded FIFO of idle drivers shared by every region.
///
/// The bound applies to registered drivers, idle or on a trip, so a driver
/// coming back from a trip always finds room. The queue lock is held only for a single push or pop. Waiters park on a
/// [`Notify`] and additionally re-check after `recheck_interval`, so a wake-up
/// consumed by a waiter that was cancelled at the same moment costs at most
/// one interval.
#[derive(Debug)]
pub struct DriverPool {
    state: Mutex<PoolState>,
    capacity: usize,
    available: Notify,
    recheck_interval: Duration,
}

#[derive(Debug, Default)]
struct PoolState {
    idle: VecDeque<Arc<Driver>>,
    registered: usize,
}

impl DriverPool {
    pub fn new(capacity: usize, recheck_interval: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            capacity,
            available: Notify::new(),
            recheck_interval,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_count(&self) -> usize {
        self.lock().idle.len()
    }

    /// Drivers ever registered with [`add_driver`](Self::add_driver).
    pub fn registered_count(&self) -> usize {
        self.lock().registered
    }

    /// Registers a new idle driver. Returns `false` without inserting when
    /// `capacity` drivers are already registered.
    pub fn add_driver(&self, driver: Arc<Driver>) -> bool {
        {
            let mut state = self.lock();
            if state.registered >= self.capacity {
                warn!(
                    "driver pool full ({} registered), refusing {}",
                    self.capacity, driver
                );
                return false;
            }
            state.registered += 1;
            state.idle.push_back(driver);
        }
        self.available.notify_one();
        true
    }

    /// Puts a driver taken with [`get_driver`](Self::get_driver) or
    /// [`acquire`](Self::acquire) back in the idle queue.
    pub fn release(&self, driver: Arc<Driver>) {
        self.lock().idle.push_back(driver);
        self.available.notify_one();
    }

    /// Removes the longest-idle driver, if any. Never blocks on availability.
    pub fn get_driver(&self) -> Option<Arc<Driver>> {
        self.lock().idle.pop_front()
    }

    /// Waits for an idle driver. Returns `None` once `cancel` fires and no
    /// driver was taken.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<Arc<Driver>> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so an add between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            if let Some(driver) = self.get_driver() {
                return Some(driver);
            }
            if cancel.is_cancelled() {
                return None;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("driver wait cancelled");
                    return None;
                }
                _ = &mut notified => {}
                _ = tokio::time::sleep(self.recheck_interval) => {}
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
