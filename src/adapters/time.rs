//! Wall-clock adapter.
//!
//! Provides [`TimePort`] from `std::time::SystemTime`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::TimePort;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl TimePort for SystemClock {
    /// Seconds since the Unix epoch.  A clock set before 1970 reads as 0.
    fn unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
