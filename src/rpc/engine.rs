//! RPC engine: validates requests and dispatches them to the relay core.
//!
//! **Transport-decoupled**: the engine does not own a transport.  The
//! server feeds it complete frame payloads together with the client's
//! [`Session`] and writes back whatever it returns.
//!
//! Every request passes through the same pipeline:
//!
//! 1. **Rate limiting**: token bucket per session (via `burster`).
//! 2. **Parsing**: malformed JSON or an unknown method is `malformed`.
//! 3. **Validation**: relay id present, integral and within 1–4; rename
//!    names non-empty and bounded.  Bad input never reaches the controller.
//! 4. **Dispatch**: controller / store call, outcome mapped to a wire
//!    error kind.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::app::controller::RelayController;
use crate::app::ports::{PinDriver, StoragePort};
use crate::app::state::normalise;
use crate::app::store::MAX_NAME_LEN;
use crate::error::ValidationError;
use crate::pins::MAX_RELAY_ID;

use super::messages::{Call, ErrorKind, Request, Response};
use super::session::Session;

/// Relay id from a raw JSON value.  Absent, non-integral or out-of-range
/// ids are validation errors.
pub fn validate_relay(raw: Option<&Value>) -> Result<u8, ValidationError> {
    let id = raw
        .and_then(Value::as_i64)
        .ok_or(ValidationError::MissingRelay)?;
    if !(1..=i64::from(MAX_RELAY_ID)).contains(&id) {
        return Err(ValidationError::RelayOutOfRange(id));
    }
    Ok(id as u8)
}

/// `getRelays` selector: absent or 0 means every relay.
pub fn validate_selector(raw: Option<&Value>) -> Result<Option<u8>, ValidationError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) if v.as_i64() == Some(0) => Ok(None),
        Some(v) => validate_relay(Some(v)).map(Some),
    }
}

/// Trimmed rename target.
pub fn validate_name(raw: Option<&str>) -> Result<&str, ValidationError> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong(len));
    }
    Ok(name)
}

pub struct RpcEngine<D: PinDriver, S: StoragePort> {
    controller: Arc<RelayController<D, S>>,
}

impl<D: PinDriver, S: StoragePort> Clone for RpcEngine<D, S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<D: PinDriver, S: StoragePort> RpcEngine<D, S> {
    pub fn new(controller: Arc<RelayController<D, S>>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &RelayController<D, S> {
        &self.controller
    }

    /// Handle one frame payload from `session`; returns the response body.
    pub async fn dispatch_frame(&self, session: &mut Session, frame: &[u8]) -> Response {
        if !session.check_rate_limit() {
            let id = Request::parse(frame).map_or_else(|(id, _)| id, |r| r.id);
            return Response::err(id, ErrorKind::RateLimited, "rate limit exceeded");
        }

        let request = match Request::parse(frame) {
            Ok(r) => r,
            Err((id, msg)) => {
                warn!("rpc[{}]: malformed request: {}", session.peer(), msg);
                return Response::err(id, ErrorKind::Malformed, msg);
            }
        };

        debug!("rpc[{}]: {} (id={})", session.peer(), request.call.method(), request.id);
        let response = self.handle(request).await;
        session.record_served();
        response
    }

    /// Validate and execute one request.
    pub async fn handle(&self, request: Request) -> Response {
        let id = request.id;
        match request.call {
            Call::SetRelay { relay, state } => {
                let relay = match validate_relay(relay.as_ref()) {
                    Ok(r) => r,
                    Err(e) => return Response::validation(id, e),
                };
                let desired = normalise(state.as_ref());
                info!("rpc: setRelay relay={} state={}", relay, desired);
                match self.controller.set_relay(i64::from(relay), desired).await {
                    Ok(c) => Response::ok(id, json!(c)),
                    Err(e) => Response::relay_error(id, &e),
                }
            }

            Call::GetRelays { relay } => {
                let store = self.controller.store();
                match validate_selector(relay.as_ref()) {
                    Err(e) => Response::validation(id, e),
                    Ok(None) => match store.get_all() {
                        Ok(all) => Response::ok(id, json!(all)),
                        Err(e) => Response::err(id, ErrorKind::Storage, e.to_string()),
                    },
                    Ok(Some(r)) => match store.get_one(i64::from(r)) {
                        Ok(one) => Response::ok(id, json!([one])),
                        Err(e) => Response::relay_error(id, &e),
                    },
                }
            }

            Call::RenameRelay { relay, name } => {
                let relay = match validate_relay(relay.as_ref()) {
                    Ok(r) => r,
                    Err(e) => return Response::validation(id, e),
                };
                let name = match validate_name(name.as_deref()) {
                    Ok(n) => n,
                    Err(e) => return Response::validation(id, e),
                };
                match self.controller.rename(relay, name) {
                    Ok(record) => Response::ok(id, json!(record)),
                    Err(e) => Response::relay_error(id, &e),
                }
            }

            Call::Health => Response::ok(id, json!({ "status": "ok" })),
        }
    }
}
