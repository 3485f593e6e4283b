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

use crate::booking::BookingId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("region names must not be empty")]
    EmptyRegionName,
    #[error("region {0} must allow at least one simultaneous job")]
    ZeroCapacity(String),
    #[error("the idle driver pool must hold at least one driver")]
    ZeroPoolCapacity,
    #[error("driver recheck interval must be non-zero")]
    ZeroRecheckInterval,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("booking {0} was dropped before it resolved")]
    Abandoned(BookingId),
}
