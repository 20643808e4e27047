//! Unified error types for the relay service.
//!
//! [`RelayError`] is what the relay controller returns; every variant maps
//! onto one [`ErrorClass`] so the request layer can tell "your request was
//! rejected" apart from "the system could not act" and "try again shortly".
//! Input problems caught before the controller is reached are
//! [`ValidationError`]s.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Relay controller errors
// ---------------------------------------------------------------------------

/// Every failure of a relay transition or relay lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No pin in the pinout table (or record in the store) carries this id.
    UnknownRelay(i64),
    /// The relay's pin is not a usable GPIO. Pinout table integrity defect.
    NotControllable { relay: u8, pin: u8 },
    /// A transition on this pin is still waiting for confirmation.
    ActionInProgress { relay: u8, pin: u8 },
    /// The driver failed to open, watch or write the pin, or the
    /// confirmation never arrived. Carries the driver message.
    HardwareFault { pin: u8, message: String },
    /// The pin moved but the relay record could not be written.
    Store(StorageError),
}

/// Coarse outcome class used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was wrong.
    Rejected,
    /// Transient; the caller may retry shortly.
    Retryable,
    /// The system could not act on a valid request.
    Fault,
}

impl RelayError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownRelay(_) => ErrorClass::Rejected,
            Self::ActionInProgress { .. } => ErrorClass::Retryable,
            // Pinout table defect.
            Self::NotControllable { .. } | Self::HardwareFault { .. } | Self::Store(_) => {
                ErrorClass::Fault
            }
        }
    }

    pub(crate) fn hardware(pin: u8, message: impl Into<String>) -> Self {
        Self::HardwareFault {
            pin,
            message: message.into(),
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRelay(id) => write!(f, "relay {id} not found"),
            Self::NotControllable { relay, pin } => {
                write!(f, "relay {relay}: pin {pin} is not a controllable GPIO")
            }
            Self::ActionInProgress { relay, pin } => {
                write!(f, "relay {relay}: action already in progress on pin {pin}")
            }
            Self::HardwareFault { pin, message } => write!(f, "pin {pin}: {message}"),
            Self::Store(e) => write!(f, "relay store: {e}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<StorageError> for RelayError {
    fn from(e: StorageError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Request validation errors
// ---------------------------------------------------------------------------

/// Malformed caller input, caught before the controller is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The relay identifier was absent.
    MissingRelay,
    /// The relay identifier is outside 1–4.
    RelayOutOfRange(i64),
    /// A rename carried an empty (or whitespace-only) name.
    EmptyName,
    /// A rename carried a name longer than the limit.
    NameTooLong(usize),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRelay => write!(f, "relay number not passed or malformed"),
            Self::RelayOutOfRange(id) => write!(f, "relay number {id} must be 1-4"),
            Self::EmptyName => write!(f, "relay name must not be empty"),
            Self::NameTooLong(len) => write!(f, "relay name too long ({len} chars)"),
        }
    }
}

impl std::error::Error for ValidationError {}
