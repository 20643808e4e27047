//! Pinout table for the Raspberry Pi 40-pin header.
//!
//! Single source of truth for which physical pins are usable GPIO and which
//! relay (if any) each one drives.  The header layout is static; the
//! relay → pin assignment comes from configuration, so a different board
//! wiring is a config change rather than a source fork.
//!
//! Pin numbers in this module are **physical** connector positions (1–40).
//! The BCM line number the kernel uses is carried alongside.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Header label, e.g. `GPIO17` or `GND`.
pub type PinName = heapless::String<16>;

// ---------------------------------------------------------------------------
// Standard 40-pin header
// ---------------------------------------------------------------------------

/// `(physical pin, label, BCM line, secondary function)`.
/// Power, ground and the HAT ID EEPROM pins carry no BCM line.
const HEADER_40: [(u8, &str, Option<u8>, Option<&str>); 40] = [
    (1, "3V3", None, None),
    (2, "5V", None, None),
    (3, "GPIO2", Some(2), Some("SDA I2C")),
    (4, "5V", None, None),
    (5, "GPIO3", Some(3), Some("SCL I2C")),
    (6, "GND", None, None),
    (7, "GPIO4", Some(4), None),
    (8, "GPIO14", Some(14), Some("UART0_TXD")),
    (9, "GND", None, None),
    (10, "GPIO15", Some(15), Some("UART0_RXD")),
    (11, "GPIO17", Some(17), None),
    (12, "GPIO18", Some(18), Some("PCM_CLK")),
    (13, "GPIO27", Some(27), None),
    (14, "GND", None, None),
    (15, "GPIO22", Some(22), None),
    (16, "GPIO23", Some(23), None),
    (17, "3V3", None, None),
    (18, "GPIO24", Some(24), None),
    (19, "GPIO10", Some(10), Some("MOSI")),
    (20, "GND", None, None),
    (21, "GPIO9", Some(9), Some("MISO")),
    (22, "GPIO25", Some(25), None),
    (23, "GPIO11", Some(11), Some("SCLK")),
    (24, "GPIO8", Some(8), Some("CE0_N")),
    (25, "GND", None, None),
    (26, "GPIO7", Some(7), Some("CE1_N")),
    (27, "ID_SD", None, Some("HAT EEPROM")),
    (28, "ID_SC", None, Some("HAT EEPROM")),
    (29, "GPIO5", Some(5), None),
    (30, "GND", None, None),
    (31, "GPIO6", Some(6), None),
    (32, "GPIO12", Some(12), None),
    (33, "GPIO13", Some(13), None),
    (34, "GND", None, None),
    (35, "GPIO19", Some(19), None),
    (36, "GPIO16", Some(16), None),
    (37, "GPIO26", Some(26), None),
    (38, "GPIO20", Some(20), None),
    (39, "GND", None, None),
    (40, "GPIO21", Some(21), None),
];

/// Highest relay id the hardware supports.
pub const MAX_RELAY_ID: u8 = 4;

/// Physical pins of GPIO19, GPIO16, GPIO26, GPIO20 and GPIO21.  Driving
/// these has hung boards in the field, so relays may not be wired to them.
/// They stay in the header as GPIO so lookups by name still work.
pub const UNSTABLE_PINS: [u8; 5] = [35, 36, 37, 38, 40];

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// One physical header position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDescriptor {
    pub pin: u8,
    pub name: PinName,
    #[serde(default)]
    pub secondary: Option<heapless::String<16>>,
    /// BCM line number; present only for GPIO pins.
    #[serde(default)]
    pub bcm: Option<u8>,
    pub is_gpio: bool,
    /// Relay wired to this pin, if any.
    #[serde(default)]
    pub relay: Option<u8>,
}

impl PinDescriptor {
    pub fn gpio(pin: u8, name: &str, bcm: u8) -> Self {
        Self {
            pin,
            name: label(name),
            secondary: None,
            bcm: Some(bcm),
            is_gpio: true,
            relay: None,
        }
    }

    pub fn power(pin: u8, name: &str) -> Self {
        Self {
            pin,
            name: label(name),
            secondary: None,
            bcm: None,
            is_gpio: false,
            relay: None,
        }
    }

    pub fn with_relay(mut self, relay: u8) -> Self {
        self.relay = Some(relay);
        self
    }
}

fn label(s: &str) -> PinName {
    let mut out = PinName::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// The standard header, no relays assigned.
pub fn standard_header() -> Vec<PinDescriptor> {
    HEADER_40
        .iter()
        .map(|&(pin, name, bcm, secondary)| PinDescriptor {
            pin,
            name: label(name),
            secondary: secondary.map(label),
            bcm,
            is_gpio: bcm.is_some(),
            relay: None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Errors building a [`PinoutTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinoutError {
    /// Two descriptors share a physical pin number.
    DuplicatePin(u8),
    /// Two descriptors claim the same relay id.
    DuplicateRelay(u8),
    /// A relay assignment names a pin that is not on the header.
    NoSuchPin(u8),
    /// Relay id outside 1..=[`MAX_RELAY_ID`].
    RelayOutOfRange(u8),
    /// A relay is wired to a power, ground or EEPROM pin.
    NotGpio { relay: u8, pin: u8 },
}

impl core::fmt::Display for PinoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DuplicatePin(p) => write!(f, "pin {} listed twice", p),
            Self::DuplicateRelay(r) => write!(f, "relay {} assigned to more than one pin", r),
            Self::NoSuchPin(p) => write!(f, "pin {} is not on the header", p),
            Self::RelayOutOfRange(r) => write!(f, "relay {} must be 1-{}", r, MAX_RELAY_ID),
            Self::NotGpio { relay, pin } => write!(f, "relay {}: pin {} is not a GPIO", relay, pin),
        }
    }
}

impl std::error::Error for PinoutError {}

/// Static lookup over at most one header's worth of pins.
#[derive(Debug, Clone)]
pub struct PinoutTable {
    pins: Vec<PinDescriptor>,
}

impl PinoutTable {
    /// Build a table.  Rejects duplicate pins, duplicate or out-of-range
    /// relay ids, and relays on non-GPIO pins.
    pub fn new(mut pins: Vec<PinDescriptor>) -> Result<Self, PinoutError> {
        pins.sort_by_key(|d| d.pin);
        for pair in pins.windows(2) {
            if pair[0].pin == pair[1].pin {
                return Err(PinoutError::DuplicatePin(pair[0].pin));
            }
        }
        let mut seen = [false; MAX_RELAY_ID as usize + 1];
        for d in &pins {
            let Some(relay) = d.relay else { continue };
            if !(1..=MAX_RELAY_ID).contains(&relay) {
                return Err(PinoutError::RelayOutOfRange(relay));
            }
            if !d.is_gpio {
                return Err(PinoutError::NotGpio { relay, pin: d.pin });
            }
            if core::mem::replace(&mut seen[usize::from(relay)], true) {
                return Err(PinoutError::DuplicateRelay(relay));
            }
        }
        Ok(Self { pins })
    }

    /// Take `header` and wire `(relay, pin)` assignments onto it.
    pub fn with_relays(
        header: Vec<PinDescriptor>,
        assignments: impl IntoIterator<Item = (u8, u8)>,
    ) -> Result<Self, PinoutError> {
        let mut pins = header;
        for (relay, pin) in assignments {
            let d = pins
                .iter_mut()
                .find(|d| d.pin == pin)
                .ok_or(PinoutError::NoSuchPin(pin))?;
            if d.relay.is_some_and(|r| r != relay) {
                return Err(PinoutError::DuplicateRelay(relay));
            }
            d.relay = Some(relay);
        }
        Self::new(pins)
    }

    /// Physical pin wired to `relay`.
    pub fn resolve(&self, relay: i64) -> Result<u8, RelayError> {
        self.pins
            .iter()
            .find(|d| d.relay.is_some_and(|r| i64::from(r) == relay))
            .map(|d| d.pin)
            .ok_or(RelayError::UnknownRelay(relay))
    }

    /// True only for pins that are real GPIO with a BCM line.
    pub fn is_controllable(&self, pin: u8) -> bool {
        self.descriptor(pin)
            .is_some_and(|d| d.is_gpio && d.bcm.is_some())
    }

    pub fn descriptor(&self, pin: u8) -> Option<&PinDescriptor> {
        self.pins.iter().find(|d| d.pin == pin)
    }

    /// Look a pin up by its header label (`GPIO17`).
    pub fn by_name(&self, name: &str) -> Option<&PinDescriptor> {
        self.pins.iter().find(|d| d.name.as_str() == name)
    }

    /// Every relay-bearing descriptor, ordered by relay id.
    pub fn relay_pins(&self) -> Vec<&PinDescriptor> {
        let mut v: Vec<_> = self.pins.iter().filter(|d| d.relay.is_some()).collect();
        v.sort_by_key(|d| d.relay);
        v
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
