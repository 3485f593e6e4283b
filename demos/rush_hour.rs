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

use env_logger::Env;
use log::info;
use ride_dispatch::{DispatchConfig, Dispatcher, Driver, Passenger};
use std::time::{Duration, Instant};

const DRIVERS: usize = 8;
const PASSENGERS_PER_REGION: usize = 12;
const MAX_DELAY: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = DispatchConfig::new(true)
        .with_region("north", 3)
        .with_region("south", 2)
        .with_region("rural", 1);
    let dispatcher = Dispatcher::new(config)?;

    for i in 0..DRIVERS {
        dispatcher.add_driver(Driver::new(format!("D-{i}"), MAX_DELAY));
    }

    let start = Instant::now();
    let mut handles = Vec::new();
    let regions: Vec<String> = dispatcher.region_names().map(str::to_string).collect();
    for region in &regions {
        for i in 0..PASSENGERS_PER_REGION {
            let passenger = Passenger::new(format!("{region}-P{i}"), MAX_DELAY);
            if let Some(handle) = dispatcher.book_passenger(passenger, region) {
                handles.push(handle);
            }
        }
    }
    info!(
        "booked {} passengers, {} awaiting a driver",
        handles.len(),
        dispatcher.bookings_awaiting_driver()
    );

    // Nobody serves this region; the booking is rejected.
    let _ = dispatcher.book_passenger(Passenger::new("lost", MAX_DELAY), "moon");

    let half = handles.len() / 2;
    for handle in &handles[..half] {
        let result = handle.wait().await?;
        info!(
            "booking {} done by {} in {:?}",
            result.booking_id,
            result.driver.as_ref().map_or("nobody", |d| d.name()),
            result.trip_duration
        );
    }

    dispatcher.shutdown();
    let mut unserved = 0;
    for handle in &handles[half..] {
        if !handle.wait().await?.was_served() {
            unserved += 1;
        }
    }

    info!(
        "finished in {:?}, {} bookings resolved at shutdown",
        start.elapsed(),
        unserved
    );
    info!("metrics: {}", serde_json::to_string_pretty(&dispatcher.metrics())?);
    Ok(())
}
