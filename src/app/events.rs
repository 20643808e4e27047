//! Outbound relay events.
//!
//! The [`RelayController`](super::controller::RelayController) and the
//! startup path emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them.

use super::state::RelayState;

/// Structured events emitted by the relay core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A transition was confirmed by the driver and persisted.
    Switched {
        relay: u8,
        pin: u8,
        state: RelayState,
        timestamp_secs: u64,
    },

    /// A transition failed after the pin was acquired.
    Faulted { relay: u8, pin: u8, message: String },

    /// A request hit a pin that was still mid-transition.
    Busy { relay: u8, pin: u8 },

    /// A relay record was renamed.
    Renamed { relay: u8, name: String },

    /// First-run seeding created `count` records.
    Seeded { count: usize },

    /// Startup policy finished; `failed` relays could not be driven.
    StartupApplied { driven: usize, failed: usize },
}
