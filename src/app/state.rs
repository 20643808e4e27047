//! Relay states, desired-state tokens, and the state → logic-level mapping.
//!
//! Callers may express a desired state loosely (`1`, `"1"`, `true`,
//! `"open"`, `"on"`).  Anything outside that set, including a missing
//! value, normalises to [`RelayState::Off`].  The system fails safe to
//! off, never to on.

use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

/// Persisted, confirmed relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl core::fmt::Display for RelayState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Desired-state tokens ──────────────────────────────────────

/// A desired-state value as it arrives from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateToken {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Objects, arrays and anything else: never on.
    Other(serde_json::Value),
}

/// Text tokens that mean "on".  Matched exactly.
const TRUTHY_TEXT: [&str; 3] = ["1", "open", "on"];

impl StateToken {
    /// Normalise to a relay state.
    pub fn normalise(&self) -> RelayState {
        let on = match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n == 1,
            Self::Float(x) => *x == 1.0,
            Self::Text(s) => TRUTHY_TEXT.contains(&s.as_str()),
            Self::Other(_) => false,
        };
        if on { RelayState::On } else { RelayState::Off }
    }
}

/// Normalise an optional token; absence is off.
pub fn normalise(token: Option<&StateToken>) -> RelayState {
    token.map_or(RelayState::Off, StateToken::normalise)
}

impl From<&StateToken> for RelayState {
    fn from(token: &StateToken) -> Self {
        token.normalise()
    }
}

impl From<&str> for RelayState {
    fn from(text: &str) -> Self {
        StateToken::Text(text.to_owned()).normalise()
    }
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

// ── Contact wiring ────────────────────────────────────────────

/// How the relay contacts are wired, which decides the "off" logic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Contact {
    /// Normally closed: off = low, on = high.
    #[default]
    #[serde(rename = "NC")]
    NormallyClosed,
    /// Normally open: off = high, on = low.
    #[serde(rename = "NO")]
    NormallyOpen,
}

impl Contact {
    /// Logic level that puts the relay into `state`.
    pub fn level_for(self, state: RelayState) -> PinState {
        match (self, state) {
            (Self::NormallyClosed, RelayState::On) | (Self::NormallyOpen, RelayState::Off) => {
                PinState::High
            }
            (Self::NormallyClosed, RelayState::Off) | (Self::NormallyOpen, RelayState::On) => {
                PinState::Low
            }
        }
    }
}
