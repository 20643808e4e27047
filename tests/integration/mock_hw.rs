//! Mock adapters for integration tests.
//!
//! `MockPins` records every driver call and lets a test decide when (and
//! whether) a confirmation fires, so in-flight transitions can be observed
//! from another thread.  `MockStorage` can be told to fail writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::digital::PinState;
use relaybox::app::controller::RelayController;
use relaybox::app::events::RelayEvent;
use relaybox::app::ports::{
    Bias, ConfirmFn, DriverError, EventSink, PinDriver, StorageError, StoragePort, TimePort,
};
use relaybox::app::store::RelayStore;
use relaybox::config::ServiceConfig;

// ── Pin driver ────────────────────────────────────────────────

/// When a registered confirmation fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    /// From inside `write`, as soon as the level matches.
    Auto,
    /// Only when the test calls [`MockPins::confirm`].
    Manual,
    /// Never.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinCall {
    Open(u8, Bias),
    Watch(u8, PinState),
    Unwatch(u8),
    Write(u8, PinState),
}

pub struct MockPins {
    mode: ConfirmMode,
    levels: Mutex<HashMap<u8, PinState>>,
    watches: Mutex<HashMap<u8, (PinState, ConfirmFn)>>,
    calls: Mutex<Vec<PinCall>>,
    pub fail_open: AtomicBool,
    pub fail_watch: AtomicBool,
    pub fail_write: AtomicBool,
}

#[allow(dead_code)]
impl MockPins {
    pub fn new(mode: ConfirmMode) -> Self {
        Self {
            mode,
            levels: Mutex::new(HashMap::new()),
            watches: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_open: AtomicBool::new(false),
            fail_watch: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<PinCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(u8, PinState)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PinCall::Write(line, level) => Some((line, level)),
                _ => None,
            })
            .collect()
    }

    pub fn level(&self, line: u8) -> Option<PinState> {
        self.levels.lock().unwrap().get(&line).copied()
    }

    pub fn is_watched(&self, line: u8) -> bool {
        self.watches.lock().unwrap().contains_key(&line)
    }

    /// A watch is registered and the written level already matches it.
    pub fn armed(&self, line: u8) -> bool {
        let level = self.level(line);
        self.watches
            .lock()
            .unwrap()
            .get(&line)
            .is_some_and(|(expected, _)| Some(*expected) == level)
    }

    /// Fire the pending callback on `line` if the current level matches.
    pub fn confirm(&self, line: u8) -> bool {
        let level = self.level(line);
        let cb = {
            let mut watches = self.watches.lock().unwrap();
            match watches.remove(&line) {
                Some((expected, cb)) if Some(expected) == level => Some(cb),
                Some(other) => {
                    watches.insert(line, other);
                    None
                }
                None => None,
            }
        };
        match (cb, level) {
            (Some(cb), Some(level)) => {
                cb(level);
                true
            }
            _ => false,
        }
    }

    fn record(&self, call: PinCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PinDriver for MockPins {
    fn open_output(&self, line: u8, bias: Bias) -> Result<(), DriverError> {
        self.record(PinCall::Open(line, bias));
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(DriverError::PermissionDenied("/dev/gpiomem".into()));
        }
        self.levels
            .lock()
            .unwrap()
            .entry(line)
            .or_insert(PinState::Low);
        Ok(())
    }

    fn watch_once(
        &self,
        line: u8,
        expected: PinState,
        on_confirm: ConfirmFn,
    ) -> Result<(), DriverError> {
        self.record(PinCall::Watch(line, expected));
        if self.fail_watch.load(Ordering::SeqCst) {
            return Err(DriverError::Io("edge detection unavailable".into()));
        }
        self.watches
            .lock()
            .unwrap()
            .insert(line, (expected, on_confirm));
        Ok(())
    }

    fn unwatch(&self, line: u8) {
        self.record(PinCall::Unwatch(line));
        self.watches.lock().unwrap().remove(&line);
    }

    fn write(&self, line: u8, level: PinState) -> Result<(), DriverError> {
        self.record(PinCall::Write(line, level));
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(DriverError::Io("write failed".into()));
        }
        self.levels.lock().unwrap().insert(line, level);
        if self.mode == ConfirmMode::Auto {
            self.confirm(line);
        }
        Ok(())
    }

    fn read(&self, line: u8) -> Result<PinState, DriverError> {
        self.level(line).ok_or(DriverError::NotOpen(line))
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStorage {
    data: HashMap<String, Vec<u8>>,
    fail_writes: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that keeps working after the storage moves into a store.
    pub fn fail_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_writes)
    }
}

impl StoragePort for MockStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.data
            .get(&format!("{namespace}::{key}"))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::IoError("disk full".into()));
        }
        self.data.insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{namespace}::{key}"))
    }
}

// ── Event sink and clock ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RelayEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<RelayEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &RelayEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct FixedClock(pub u64);

impl TimePort for FixedClock {
    fn unix_secs(&self) -> u64 {
        self.0
    }
}

pub const NOW: u64 = 1_700_000_000;

// ── Rig ───────────────────────────────────────────────────────

pub type Controller = RelayController<MockPins, MockStorage>;

pub struct Rig {
    pub controller: Arc<Controller>,
    pub pins: Arc<MockPins>,
    pub events: Arc<RecordingSink>,
    pub fail_store: Arc<AtomicBool>,
}

/// Controller over the default four-relay config, seeded, with a short
/// confirmation timeout.
pub fn rig(mode: ConfirmMode) -> Rig {
    rig_with(mode, &ServiceConfig::default(), Duration::from_millis(150))
}

pub fn rig_with(mode: ConfirmMode, config: &ServiceConfig, timeout: Duration) -> Rig {
    rig_seeded(mode, config, config, timeout)
}

/// Pinout from `config`, records seeded from `seeded_from`: models a
/// config edited after the store was first created.
pub fn rig_seeded(
    mode: ConfirmMode,
    config: &ServiceConfig,
    seeded_from: &ServiceConfig,
    timeout: Duration,
) -> Rig {
    let pins = Arc::new(MockPins::new(mode));
    let storage = MockStorage::new();
    let fail_store = storage.fail_switch();
    let store = Arc::new(RelayStore::new(storage));
    store.seed(seeded_from.seed_records()).unwrap();
    let events = Arc::new(RecordingSink::default());
    let controller = RelayController::new(
        config.pinout().unwrap(),
        Arc::clone(&pins),
        store,
        Arc::new(FixedClock(NOW)),
        Arc::clone(&events) as Arc<dyn EventSink>,
    )
    .with_contact(config.contact)
    .with_confirm_timeout(timeout);
    Rig {
        controller: Arc::new(controller),
        pins,
        events,
        fail_store,
    }
}

/// Spin until `cond` holds or a second passes.
#[allow(dead_code)]
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}
