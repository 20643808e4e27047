//! Fuzz target: request parsing and input validation
//!
//! Any payload must either parse into a call whose relay id and name
//! validate (or fail validation) without panicking, or be rejected as
//! malformed.  Accepted ids are always 1..=4.
//!
//! cargo fuzz run fuzz_request_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaybox::app::state::normalise;
use relaybox::rpc::engine::{validate_name, validate_relay, validate_selector};
use relaybox::rpc::messages::{Call, Request};

fuzz_target!(|data: &[u8]| {
    let Ok(request) = Request::parse(data) else {
        return;
    };
    match request.call {
        Call::SetRelay { relay, state } => {
            if let Ok(id) = validate_relay(relay.as_ref()) {
                assert!((1..=4).contains(&id));
            }
            let _ = normalise(state.as_ref());
        }
        Call::GetRelays { relay } => {
            if let Ok(Some(id)) = validate_selector(relay.as_ref()) {
                assert!((1..=4).contains(&id));
            }
        }
        Call::RenameRelay { relay, name } => {
            let _ = validate_relay(relay.as_ref());
            if let Ok(name) = validate_name(name.as_deref()) {
                assert!(!name.is_empty());
                assert_eq!(name, name.trim());
            }
        }
        Call::Health => {}
    }
});
