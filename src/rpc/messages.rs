//! Request and response envelopes.
//!
//! ```text
//! → {"id": 7, "method": "setRelay", "relay": 3, "state": "on"}
//! ← {"id": 7, "ok": true, "result": {"relay": 3, "state": "on", "timestamp_secs": 1700000000}}
//! ← {"id": 7, "ok": false, "error": {"kind": "unknown_relay", "message": "relay 9 not found"}}
//! ```
//!
//! `relay` is kept as a raw JSON value so that a malformed id (a string, a
//! fraction) is reported as a validation error rather than a parse error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::state::StateToken;
use crate::error::{RelayError, ValidationError};

/// A decoded call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Call {
    SetRelay {
        #[serde(default)]
        relay: Option<Value>,
        #[serde(default)]
        state: Option<StateToken>,
    },
    GetRelays {
        #[serde(default)]
        relay: Option<Value>,
    },
    RenameRelay {
        #[serde(default)]
        relay: Option<Value>,
        #[serde(default)]
        name: Option<String>,
    },
    Health,
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Self::SetRelay { .. } => "setRelay",
            Self::GetRelays { .. } => "getRelays",
            Self::RenameRelay { .. } => "renameRelay",
            Self::Health => "health",
        }
    }
}

/// Request id plus call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u64,
    pub call: Call,
}

impl Request {
    /// Parse a frame payload.  On failure the error still carries whatever
    /// request id could be recovered, so the reply can be correlated.
    pub fn parse(payload: &[u8]) -> Result<Self, (u64, String)> {
        let value: Value = serde_json::from_slice(payload).map_err(|e| (0, e.to_string()))?;
        let id = value.get("id").and_then(Value::as_u64).unwrap_or(0);
        let call = serde_json::from_value(value).map_err(|e| (id, e.to_string()))?;
        Ok(Self { id, call })
    }
}

/// Error category on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    UnknownRelay,
    NotControllable,
    ActionInProgress,
    HardwareFault,
    Storage,
    RateLimited,
    Malformed,
}

impl From<&RelayError> for ErrorKind {
    fn from(e: &RelayError) -> Self {
        match e {
            RelayError::UnknownRelay(_) => Self::UnknownRelay,
            RelayError::NotControllable { .. } => Self::NotControllable,
            RelayError::ActionInProgress { .. } => Self::ActionInProgress,
            RelayError::HardwareFault { .. } => Self::HardwareFault,
            RelayError::Store(_) => Self::Storage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl Response {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(WireError {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn relay_error(id: u64, e: &RelayError) -> Self {
        Self::err(id, ErrorKind::from(e), e.to_string())
    }

    pub fn validation(id: u64, e: ValidationError) -> Self {
        Self::err(id, ErrorKind::Validation, e.to_string())
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
