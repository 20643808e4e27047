//! Relay controller: the edge-confirmed state-transition protocol.
//!
//! ```text
//!  set_relay(relay, desired)
//!    │
//!    ├─ PinoutTable::resolve ─────────────── UnknownRelay
//!    ├─ RelayStore::get_one ──────────────── UnknownRelay
//!    ├─ PinoutTable::is_controllable ─────── NotControllable
//!    ├─ PendingActions::guard ────────────── ActionInProgress
//!    ├─ open_output → watch_once → write ─── HardwareFault
//!    ├─ await confirmation  (or timeout) ─── HardwareFault
//!    └─ RelayStore::set_state ────────────── Store
//!         │
//!         ▼
//!    Confirmation { relay, state, timestamp_secs }
//! ```
//!
//! A confirmation is only ever produced by the driver's callback; nothing
//! here synthesizes one.  The pending guard is held until the store write
//! returns, so a second transition on the same pin cannot persist ahead of
//! the first.  There are no retries.

use std::sync::Arc;
use std::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::PinState;
use futures_lite::future;
use log::{debug, error, info, warn};
use serde::Serialize;

use super::events::RelayEvent;
use super::pending::PendingActions;
use super::ports::{Bias, EventSink, PinDriver, StoragePort, TimePort};
use super::state::{Contact, RelayState};
use super::store::{RelayRecord, RelayStore};
use crate::config::StartupPolicy;
use crate::error::RelayError;
use crate::pins::PinoutTable;

/// Default bound on the wait for a confirmation callback.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_millis(2000);

/// Proof that a transition happened and was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub relay: u8,
    pub state: RelayState,
    pub timestamp_secs: u64,
}

/// Outcome of [`RelayController::apply_startup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartupReport {
    pub driven: usize,
    pub failed: usize,
}

type ConfirmSignal = Signal<CriticalSectionRawMutex, PinState>;

pub struct RelayController<D: PinDriver, S: StoragePort> {
    table: PinoutTable,
    contact: Contact,
    confirm_timeout: Duration,
    driver: Arc<D>,
    store: Arc<RelayStore<S>>,
    pending: PendingActions,
    clock: Arc<dyn TimePort>,
    events: Arc<dyn EventSink>,
}

impl<D: PinDriver, S: StoragePort> RelayController<D, S> {
    pub fn new(
        table: PinoutTable,
        driver: Arc<D>,
        store: Arc<RelayStore<S>>,
        clock: Arc<dyn TimePort>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            table,
            contact: Contact::default(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            driver,
            store,
            pending: PendingActions::new(),
            clock,
            events,
        }
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contact = contact;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn table(&self) -> &PinoutTable {
        &self.table
    }

    pub fn store(&self) -> &RelayStore<S> {
        &self.store
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    /// Drive `relay` to `desired` and wait for the hardware to confirm it.
    pub async fn set_relay(
        &self,
        relay: i64,
        desired: RelayState,
    ) -> Result<Confirmation, RelayError> {
        let pin = self.table.resolve(relay)?;
        let relay = u8::try_from(relay).map_err(|_| RelayError::UnknownRelay(relay))?;

        // A relay wired after first-run seeding has no record to persist into.
        if let Err(e) = self.store.get_one(i64::from(relay)) {
            warn!("relay {}: no stored record, pin {} left untouched: {}", relay, pin, e);
            return Err(e);
        }

        let bcm = match self.table.descriptor(pin).and_then(|d| d.bcm) {
            Some(bcm) if self.table.is_controllable(pin) => bcm,
            _ => {
                error!(
                    "relay {}: pin {} is not a usable GPIO, pinout table is inconsistent",
                    relay, pin
                );
                return Err(RelayError::NotControllable { relay, pin });
            }
        };

        let Some(_guard) = self.pending.guard(pin) else {
            debug!("relay {}: pin {} busy", relay, pin);
            self.events.emit(&RelayEvent::Busy { relay, pin });
            return Err(RelayError::ActionInProgress { relay, pin });
        };

        let level = self.contact.level_for(desired);
        debug!("relay {}: driving pin {} (BCM {}) {:?}", relay, pin, bcm, level);

        if let Err(e) = self.drive(bcm, pin, level).await {
            warn!("relay {}: {}", relay, e);
            if let RelayError::HardwareFault { message, .. } = &e {
                self.events.emit(&RelayEvent::Faulted {
                    relay,
                    pin,
                    message: message.clone(),
                });
            }
            return Err(e);
        }

        let record = self.store.set_state(relay, desired).map_err(|e| {
            error!("relay {}: pin moved to {} but was not persisted: {}", relay, desired, e);
            e
        })?;

        let confirmation = Confirmation {
            relay,
            state: record.state,
            timestamp_secs: self.clock.unix_secs(),
        };
        self.events.emit(&RelayEvent::Switched {
            relay,
            pin,
            state: confirmation.state,
            timestamp_secs: confirmation.timestamp_secs,
        });
        Ok(confirmation)
    }

    /// Open, watch, write, then wait for the observed level.
    async fn drive(&self, bcm: u8, pin: u8, level: PinState) -> Result<(), RelayError> {
        let fault = |e: super::ports::DriverError| RelayError::hardware(pin, e.to_string());

        self.driver.open_output(bcm, Bias::PullDown).map_err(fault)?;

        let confirmed = Arc::new(ConfirmSignal::new());
        let tx = Arc::clone(&confirmed);
        self.driver
            .watch_once(bcm, level, Box::new(move |observed| tx.signal(observed)))
            .map_err(fault)?;

        if let Err(e) = self.driver.write(bcm, level) {
            self.driver.unwatch(bcm);
            return Err(fault(e));
        }

        let observed = future::or(async { Some(confirmed.wait().await) }, async {
            Timer::after(self.confirm_timeout).await;
            None
        })
        .await;
        self.driver.unwatch(bcm);

        match observed {
            Some(seen) if seen == level => Ok(()),
            Some(seen) => Err(RelayError::hardware(
                pin,
                format!("observed {:?}, expected {:?}", seen, level),
            )),
            None => Err(RelayError::hardware(pin, "confirmation timed out")),
        }
    }

    pub fn rename(&self, relay: u8, name: &str) -> Result<RelayRecord, RelayError> {
        let record = self.store.rename(relay, name)?;
        info!("relay {}: renamed to {:?}", relay, record.name);
        self.events.emit(&RelayEvent::Renamed {
            relay,
            name: record.name.clone(),
        });
        Ok(record)
    }

    /// Open every relay pin for output, without writing, to find lines
    /// that cannot be driven before any request needs them.
    pub fn check_pins(&self) -> Vec<(u8, Result<(), RelayError>)> {
        self.table
            .relay_pins()
            .iter()
            .filter_map(|d| d.relay.map(|relay| (relay, d)))
            .map(|(relay, d)| {
                let result = match d.bcm {
                    Some(bcm) if self.table.is_controllable(d.pin) => self
                        .driver
                        .open_output(bcm, Bias::PullDown)
                        .map_err(|e| RelayError::hardware(d.pin, e.to_string())),
                    _ => Err(RelayError::NotControllable { relay, pin: d.pin }),
                };
                match &result {
                    Ok(()) => debug!("check: relay {} pin {} available", relay, d.pin),
                    Err(e) => error!("check: relay {} unavailable: {}", relay, e),
                }
                (relay, result)
            })
            .collect()
    }

    /// Drive every configured relay according to `policy`.  Failures are
    /// logged per relay and never abort the pass.
    pub async fn apply_startup(&self, policy: StartupPolicy) -> StartupReport {
        let mut report = StartupReport::default();
        let relays: Vec<u8> = self
            .table
            .relay_pins()
            .iter()
            .filter_map(|d| d.relay)
            .collect();

        for relay in relays {
            let target = match policy {
                StartupPolicy::AllOff => RelayState::Off,
                StartupPolicy::Restore => match self.store.get_one(i64::from(relay)) {
                    Ok(record) => record.state,
                    Err(e) => {
                        error!("startup: relay {} not restored: {}", relay, e);
                        report.failed += 1;
                        continue;
                    }
                },
            };
            match self.set_relay(i64::from(relay), target).await {
                Ok(_) => report.driven += 1,
                Err(e) => {
                    error!("startup: relay {} -> {} failed: {}", relay, target, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "startup: policy {:?} applied, {} driven, {} failed",
            policy, report.driven, report.failed
        );
        self.events.emit(&RelayEvent::StartupApplied {
            driven: report.driven,
            failed: report.failed,
        });
        report
    }
}
