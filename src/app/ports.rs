//! Port traits: the hexagonal boundary between relay logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayController (domain)
//! ```
//!
//! Driven adapters (GPIO drivers, storage backends, event sinks, clocks)
//! implement these traits.  The [`RelayController`](super::controller::RelayController)
//! and [`RelayStore`](super::store::RelayStore) consume them, so the domain
//! core never touches `/dev/gpiomem` or the filesystem directly.
//!
//! Unlike a single-threaded control loop, the controller is shared between
//! request threads, so ports take `&self` and carry their own interior
//! locking where they need it.

use embedded_hal::digital::PinState;

// ───────────────────────────────────────────────────────────────
// Pin driver port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// One-shot confirmation callback.  Receives the observed level.
pub type ConfirmFn = Box<dyn FnOnce(PinState) + Send + 'static>;

/// Output bias applied when a pin is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    PullDown,
    PullUp,
    Off,
}

/// Write-side port for relay pins.  `line` is the BCM line number.
///
/// # Confirmation contract
///
/// [`watch_once`](PinDriver::watch_once) registers a callback that the
/// driver invokes **at most once**, the first time the observed level of
/// `line` equals `expected`.  [`unwatch`](PinDriver::unwatch) drops a
/// registered callback that has not fired yet.  A driver must never invoke
/// a callback for a level it has not actually observed.
pub trait PinDriver: Send + Sync {
    /// Whether the GPIO interface can be opened at all.
    fn accessible(&self) -> bool {
        true
    }

    /// Open `line` for output with the given bias.  Idempotent.
    fn open_output(&self, line: u8, bias: Bias) -> Result<(), DriverError>;

    /// Register the one-shot confirmation callback for `line`.
    fn watch_once(&self, line: u8, expected: PinState, on_confirm: ConfirmFn)
    -> Result<(), DriverError>;

    /// Drop any pending callback on `line`.
    fn unwatch(&self, line: u8);

    /// Drive `line` to `level`.
    fn write(&self, line: u8, level: PinState) -> Result<(), DriverError>;

    /// Read back the observed level of `line`.
    fn read(&self, line: u8) -> Result<PinState, DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ flat-file database)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for relay records.
///
/// Values are opaque byte blobs; the relay store writes JSON.
/// Write operations MUST be atomic; no partial writes on power loss.
pub trait StoragePort: Send {
    /// Read a value.  `Err(StorageError::NotFound)` if the key is absent.
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`RelayEvent`](super::events::RelayEvent)s
/// through this port.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::RelayEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for confirmation timestamps.
pub trait TimePort: Send + Sync {
    /// Seconds since the Unix epoch.
    fn unix_secs(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`PinDriver`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The GPIO interface or the line could not be opened.
    Unavailable(String),
    /// The process lacks permission to drive the line.
    PermissionDenied(String),
    /// The line was used before `open_output`.
    NotOpen(u8),
    /// Any other driver-level failure.
    Io(String),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Stored data failed to deserialize.
    Corrupted(String),
    /// Generic I/O error from the backing file.
    IoError(String),
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "GPIO unavailable: {}", msg),
            Self::PermissionDenied(msg) => write!(f, "permission denied: {}", msg),
            Self::NotOpen(line) => write!(f, "line {} not opened for output", line),
            Self::Io(msg) => write!(f, "GPIO I/O error: {}", msg),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Corrupted(msg) => write!(f, "stored data corrupted: {}", msg),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DriverError {}
impl std::error::Error for StorageError {}
