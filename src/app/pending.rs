//! Pins with a write-and-confirm cycle in flight.
//!
//! Membership is the only concurrency guard on a relay pin: a pin is in the
//! set for exactly one in-flight transition.  Insert-if-absent happens in a
//! single critical section, so two requests for the same pin can never both
//! win.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::FnvIndexSet;

/// Upper bound on simultaneously pending pins (one header's worth, rounded
/// up to a power of two as `FnvIndexSet` requires).
const MAX_PENDING: usize = 64;

/// The set of pins currently mid-transition.
pub struct PendingActions {
    pins: Mutex<CriticalSectionRawMutex, RefCell<FnvIndexSet<u8, MAX_PENDING>>>,
}

impl Default for PendingActions {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingActions {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(RefCell::new(FnvIndexSet::new())),
        }
    }

    /// Claim `pin`.  Returns `false` if it is already claimed.
    pub fn try_acquire(&self, pin: u8) -> bool {
        self.pins
            .lock(|set| set.borrow_mut().insert(pin).unwrap_or(false))
    }

    /// Give `pin` back.  Releasing an unclaimed pin is a no-op.
    pub fn release(&self, pin: u8) {
        self.pins.lock(|set| {
            set.borrow_mut().remove(&pin);
        });
    }

    pub fn contains(&self, pin: u8) -> bool {
        self.pins.lock(|set| set.borrow().contains(&pin))
    }

    pub fn len(&self) -> usize {
        self.pins.lock(|set| set.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim `pin` and hand back a guard that releases it on drop.
    pub fn guard(&self, pin: u8) -> Option<PendingGuard<'_>> {
        self.try_acquire(pin).then_some(PendingGuard { set: self, pin })
    }
}

/// Releases its pin when dropped, on every exit path.
#[must_use = "the pin is released as soon as the guard is dropped"]
pub struct PendingGuard<'a> {
    set: &'a PendingActions,
    pin: u8,
}

impl PendingGuard<'_> {
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.set.release(self.pin);
    }
}
