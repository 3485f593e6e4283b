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

//! Human-readable dispatch events.
//!
//! Every line is rendered as `"<booking>: <message>"`, where the booking part is
//! its display form (`"<id>: <driver>: <passenger>"`) or `null` for events not
//! tied to a booking.

use crate::booking::Booking;
use log::info;
use std::sync::{Mutex, PoisonError};

/// Receives dispatch events. Implementations must return promptly; they are
/// called inline from booking tasks.
pub trait EventSink: Send + Sync {
    fn log_event(&self, booking: Option<&Booking>, message: &str);
}

pub(crate) fn render(booking: Option<&Booking>, message: &str) -> String {
    match booking {
        Some(booking) => format!("{booking}: {message}"),
        None => format!("null: {message}"),
    }
}

/// Forwards events to the `log` facade at `info` level under the
/// `ride_dispatch::events` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleEventSink;

impl EventSink for ConsoleEventSink {
    fn log_event(&self, booking: Option<&Booking>, message: &str) {
        info!(target: "ride_dispatch::events", "{}", render(booking, message));
    }
}

/// Keeps rendered events in memory, mostly for assertions in tests.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }
}

impl EventSink for MemoryEventSink {
    fn log_event(&self, booking: Option<&Booking>, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(render(booking, message));
    }
}
