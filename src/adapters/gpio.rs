//! GPIO adapters.
//!
//! Implements [`PinDriver`] for:
//!
//! - **`SimulatedPins`**: in-memory levels; a write is observed
//!   immediately, so a watch on the written level fires from inside
//!   `write`.  Used on development hosts and with `--simulate`.
//! - **`RppalPins`** (feature `rpi`): the Raspberry Pi GPIO block via
//!   `rppal`.  Confirmation comes from a watcher thread polling the
//!   line's observed level.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::PinState;
use log::{debug, info};

use crate::app::ports::{Bias, ConfirmFn, DriverError, PinDriver};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

struct SimLine {
    level: PinState,
    watch: Option<(PinState, ConfirmFn)>,
}

/// In-memory pin driver.
#[derive(Default)]
pub struct SimulatedPins {
    lines: Mutex<HashMap<u8, SimLine>>,
}

impl SimulatedPins {
    pub fn new() -> Self {
        info!("SimulatedPins: simulation backend");
        Self::default()
    }

    /// Current level of `line`, `None` if it was never opened.
    pub fn level(&self, line: u8) -> Option<PinState> {
        lock(&self.lines).get(&line).map(|l| l.level)
    }
}

impl PinDriver for SimulatedPins {
    fn open_output(&self, line: u8, bias: Bias) -> Result<(), DriverError> {
        let initial = match bias {
            Bias::PullUp => PinState::High,
            Bias::PullDown | Bias::Off => PinState::Low,
        };
        lock(&self.lines).entry(line).or_insert_with(|| {
            debug!("SimulatedPins: open BCM {} ({:?})", line, bias);
            SimLine {
                level: initial,
                watch: None,
            }
        });
        Ok(())
    }

    fn watch_once(
        &self,
        line: u8,
        expected: PinState,
        on_confirm: ConfirmFn,
    ) -> Result<(), DriverError> {
        let mut lines = lock(&self.lines);
        let l = lines.get_mut(&line).ok_or(DriverError::NotOpen(line))?;
        l.watch = Some((expected, on_confirm));
        Ok(())
    }

    fn unwatch(&self, line: u8) {
        if let Some(l) = lock(&self.lines).get_mut(&line) {
            l.watch = None;
        }
    }

    fn write(&self, line: u8, level: PinState) -> Result<(), DriverError> {
        let fire = {
            let mut lines = lock(&self.lines);
            let l = lines.get_mut(&line).ok_or(DriverError::NotOpen(line))?;
            l.level = level;
            match l.watch.take() {
                Some((expected, cb)) if expected == level => Some(cb),
                other => {
                    l.watch = other;
                    None
                }
            }
        };
        // Outside the lock: the callback may call back into the driver.
        if let Some(cb) = fire {
            cb(level);
        }
        Ok(())
    }

    fn read(&self, line: u8) -> Result<PinState, DriverError> {
        self.level(line).ok_or(DriverError::NotOpen(line))
    }
}

// ---------------------------------------------------------------------------
// Raspberry Pi
// ---------------------------------------------------------------------------

#[cfg(feature = "rpi")]
pub use rpi::RppalPins;

#[cfg(feature = "rpi")]
mod rpi {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use embedded_hal::digital::PinState;
    use log::{debug, info};
    use rppal::gpio::{self, Gpio, IoPin, Level, Mode};

    use super::lock;
    use crate::app::ports::{Bias, ConfirmFn, DriverError, PinDriver};

    /// Interval between level samples while a watch is armed.
    const POLL_INTERVAL: Duration = Duration::from_millis(1);

    fn to_level(state: PinState) -> Level {
        match state {
            PinState::High => Level::High,
            PinState::Low => Level::Low,
        }
    }

    fn to_state(level: Level) -> PinState {
        match level {
            Level::High => PinState::High,
            Level::Low => PinState::Low,
        }
    }

    fn map_err(e: gpio::Error) -> DriverError {
        match e {
            gpio::Error::PermissionDenied(msg) => DriverError::PermissionDenied(msg),
            other => DriverError::Io(other.to_string()),
        }
    }

    /// Raspberry Pi GPIO through `/dev/gpiomem`.
    pub struct RppalPins {
        gpio: Gpio,
        lines: Mutex<HashMap<u8, Arc<Mutex<IoPin>>>>,
        watchers: Mutex<HashMap<u8, Arc<AtomicBool>>>,
    }

    impl RppalPins {
        /// Open the GPIO block.  Fails off-target or without permission.
        pub fn new() -> Result<Self, DriverError> {
            let gpio = Gpio::new().map_err(|e| DriverError::Unavailable(e.to_string()))?;
            info!("RppalPins: GPIO block opened");
            Ok(Self {
                gpio,
                lines: Mutex::new(HashMap::new()),
                watchers: Mutex::new(HashMap::new()),
            })
        }

        fn line(&self, line: u8) -> Result<Arc<Mutex<IoPin>>, DriverError> {
            lock(&self.lines)
                .get(&line)
                .cloned()
                .ok_or(DriverError::NotOpen(line))
        }
    }

    impl PinDriver for RppalPins {
        fn open_output(&self, line: u8, bias: Bias) -> Result<(), DriverError> {
            let mut lines = lock(&self.lines);
            if lines.contains_key(&line) {
                return Ok(());
            }
            let mut pin = self.gpio.get(line).map_err(map_err)?.into_io(Mode::Output);
            pin.set_bias(match bias {
                Bias::PullDown => gpio::Bias::PullDown,
                Bias::PullUp => gpio::Bias::PullUp,
                Bias::Off => gpio::Bias::Off,
            });
            debug!("RppalPins: BCM {} open for output ({:?})", line, bias);
            lines.insert(line, Arc::new(Mutex::new(pin)));
            Ok(())
        }

        fn watch_once(
            &self,
            line: u8,
            expected: PinState,
            on_confirm: ConfirmFn,
        ) -> Result<(), DriverError> {
            let pin = self.line(line)?;
            let cancelled = Arc::new(AtomicBool::new(false));
            if let Some(old) = lock(&self.watchers).insert(line, Arc::clone(&cancelled)) {
                old.store(true, Ordering::SeqCst);
            }
            let want = to_level(expected);
            thread::Builder::new()
                .name(format!("watch-bcm{}", line))
                .spawn(move || {
                    while !cancelled.load(Ordering::SeqCst) {
                        let seen = lock(&pin).read();
                        if seen == want {
                            on_confirm(to_state(seen));
                            return;
                        }
                        thread::sleep(POLL_INTERVAL);
                    }
                })
                .map(|_| ())
                .map_err(|e| DriverError::Io(format!("watcher thread: {}", e)))
        }

        fn unwatch(&self, line: u8) {
            if let Some(flag) = lock(&self.watchers).remove(&line) {
                flag.store(true, Ordering::SeqCst);
            }
        }

        fn write(&self, line: u8, level: PinState) -> Result<(), DriverError> {
            let pin = self.line(line)?;
            lock(&pin).write(to_level(level));
            Ok(())
        }

        fn read(&self, line: u8) -> Result<PinState, DriverError> {
            let pin = self.line(line)?;
            let level = lock(&pin).read();
            Ok(to_state(level))
        }
    }

    impl Drop for RppalPins {
        fn drop(&mut self) {
            for flag in lock(&self.watchers).values() {
                flag.store(true, Ordering::SeqCst);
            }
            debug!("RppalPins: releasing {} lines", lock(&self.lines).len());
        }
    }
}
