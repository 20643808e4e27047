//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing relay events through the `log`
//! facade, one line per event.

use log::{info, warn};

use crate::app::events::RelayEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`RelayEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &RelayEvent) {
        match event {
            RelayEvent::Switched {
                relay,
                pin,
                state,
                timestamp_secs,
            } => {
                info!(
                    "RELAY | relay={} pin={} state={} at={}",
                    relay, pin, state, timestamp_secs
                );
            }
            RelayEvent::Faulted {
                relay,
                pin,
                message,
            } => {
                warn!("FAULT | relay={} pin={} | {}", relay, pin, message);
            }
            RelayEvent::Busy { relay, pin } => {
                info!("BUSY  | relay={} pin={} action in progress", relay, pin);
            }
            RelayEvent::Renamed { relay, name } => {
                info!("NAME  | relay={} name={:?}", relay, name);
            }
            RelayEvent::Seeded { count } => {
                info!("SEED  | created {} relay records", count);
            }
            RelayEvent::StartupApplied { driven, failed } => {
                info!("START | driven={} failed={}", driven, failed);
            }
        }
    }
}
