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

//! # Ride Dispatch
//!
//! A concurrent **passenger dispatch engine** built on top of [`tokio`].
//!
//! Passengers are booked into named regions. Each region caps how many trips it
//! runs at once, and all regions draw drivers from a single shared idle pool:
//!
//! - **Per-region admission ceiling** enforced with a semaphore
//! - **Over-capacity bookings are queued**, never dropped
//! - **Exactly-once results** observable by any number of waiters
//! - **Orderly shutdown** that resolves every booking still waiting for a driver
//!
//! ## Core Concepts
//!
//! - A [`Dispatcher`] owns the regions and the [`DriverPool`], and routes bookings by region name.
//! - A [`Region`] admits bookings and runs each one as its own task.
//! - A [`Booking`] walks a [`Driver`] through pick-up and drop-off of a [`Passenger`].
//! - A [`BookingHandle`] resolves to the final [`BookingResult`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use ride_dispatch::{DispatchConfig, Dispatcher, Driver, Passenger};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DispatchConfig::new(true)
//!         .with_region("city", 4)
//!         .with_region("rural", 1);
//!     let dispatcher = Dispatcher::new(config)?;
//!
//!     dispatcher.add_driver(Driver::new("dana", Duration::from_millis(50)));
//!
//!     let passenger = Passenger::new("pat", Duration::from_millis(200));
//!     if let Some(handle) = dispatcher.book_passenger(passenger, "rural") {
//!         let result = handle.wait().await?;
//!         println!("booking {} took {:?}", result.booking_id, result.trip_duration);
//!     }
//!
//!     dispatcher.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Results Without A Driver
//!
//! A booking still waiting for a driver when its region shuts down resolves with
//! `driver: None`. That is a normal terminal outcome, not an error.
//!
//! ## License
//!
//! Licensed under [Apache 2.0](https://www.apache.org/licenses/LICENSE-2.0).
mod constants;

pub mod booking;
pub mod config;
pub mod delay;
pub mod dispatcher;
pub mod driver;
pub mod driver_pool;
pub mod error;
pub mod events;
pub mod metrics;
pub mod passenger;
pub mod region;

pub use booking::{Booking, BookingHandle, BookingId, BookingResult, BookingState};
pub use config::DispatchConfig;
pub use delay::{DelayGenerator, FixedDelay, RandomDelay};
pub use dispatcher::Dispatcher;
pub use driver::Driver;
pub use driver_pool::DriverPool;
pub use error::{BookingError, ConfigError};
pub use events::{ConsoleEventSink, EventSink, MemoryEventSink};
pub use metrics::{DispatchMetrics, RegionMetrics};
pub use passenger::Passenger;
pub use region::Region;
