//! Integration tests for request validation and outcome mapping.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures_lite::future::block_on;
use relaybox::rpc::engine::RpcEngine;
use relaybox::rpc::messages::{ErrorKind, Request, Response};
use relaybox::rpc::session::Session;
use serde_json::{Value, json};

use crate::mock_hw::{ConfirmMode, MockPins, MockStorage, PinCall, rig};

fn engine(mode: ConfirmMode) -> (RpcEngine<MockPins, MockStorage>, Arc<MockPins>) {
    let r = rig(mode);
    (RpcEngine::new(r.controller), r.pins)
}

fn call(engine: &RpcEngine<MockPins, MockStorage>, body: Value) -> Response {
    let request = Request::parse(body.to_string().as_bytes()).unwrap();
    block_on(engine.handle(request))
}

#[test]
fn set_relay_returns_confirmation() {
    let (e, _) = engine(ConfirmMode::Auto);
    let resp = call(&e, json!({"id": 1, "method": "setRelay", "relay": 3, "state": "on"}));
    assert!(resp.ok);
    assert_eq!(resp.id, 1);
    let result = resp.result.unwrap();
    assert_eq!(result["relay"], 3);
    assert_eq!(result["state"], "on");
    assert_eq!(result["timestamp_secs"], crate::mock_hw::NOW);

    let resp = call(&e, json!({"id": 2, "method": "getRelays", "relay": 3}));
    assert_eq!(
        resp.result.unwrap(),
        json!([{"relay": 3, "name": "GPIO27", "pin": 13, "state": "on"}])
    );
}

#[test]
fn missing_or_unknown_state_fails_safe_to_off() {
    let (e, pins) = engine(ConfirmMode::Auto);
    call(&e, json!({"id": 1, "method": "setRelay", "relay": 1, "state": 1}));
    let resp = call(&e, json!({"id": 2, "method": "setRelay", "relay": 1}));
    assert_eq!(resp.result.unwrap()["state"], "off");
    let resp = call(&e, json!({"id": 3, "method": "setRelay", "relay": 1, "state": "ON"}));
    assert_eq!(resp.result.unwrap()["state"], "off");
    assert_eq!(pins.writes().len(), 3);
}

#[test]
fn structured_or_null_state_is_off_not_malformed() {
    let (e, pins) = engine(ConfirmMode::Auto);
    for state in [json!({}), json!([1]), json!(null), json!({"state": "on"})] {
        call(&e, json!({"id": 20, "method": "setRelay", "relay": 2, "state": "on"}));
        let resp = call(&e, json!({"id": 21, "method": "setRelay", "relay": 2, "state": state}));
        assert!(resp.ok, "state {state}: {resp:?}");
        assert_eq!(resp.result.unwrap()["state"], "off", "state {state}");
    }
    assert_eq!(pins.level(17), Some(embedded_hal::digital::PinState::Low));

    let mut session = Session::new("test");
    let resp = block_on(e.dispatch_frame(
        &mut session,
        br#"{"id":22,"method":"setRelay","relay":1,"state":{}}"#,
    ));
    assert_eq!((resp.id, resp.ok), (22, true));
}

#[test]
fn malformed_relay_ids_never_reach_the_controller() {
    let (e, pins) = engine(ConfirmMode::Auto);
    for relay in [json!(null), json!("1"), json!(2.5), json!(0), json!(5), json!(-1), json!(9)] {
        let resp = call(&e, json!({"id": 4, "method": "setRelay", "relay": relay, "state": "on"}));
        assert_eq!(resp.kind(), Some(ErrorKind::Validation), "relay {relay}");
    }
    let resp = call(&e, json!({"id": 5, "method": "setRelay", "state": "on"}));
    assert_eq!(resp.kind(), Some(ErrorKind::Validation));
    assert!(pins.calls().is_empty());
}

#[test]
fn hardware_fault_maps_to_wire_kind() {
    let (e, pins) = engine(ConfirmMode::Auto);
    pins.fail_write.store(true, Ordering::SeqCst);
    let resp = call(&e, json!({"id": 6, "method": "setRelay", "relay": 2, "state": true}));
    assert!(!resp.ok);
    assert_eq!(resp.kind(), Some(ErrorKind::HardwareFault));
    assert!(pins.calls().contains(&PinCall::Unwatch(17)));
}

#[test]
fn timeout_maps_to_hardware_fault() {
    let (e, _) = engine(ConfirmMode::Never);
    let resp = call(&e, json!({"id": 7, "method": "setRelay", "relay": 4, "state": "open"}));
    assert_eq!(resp.kind(), Some(ErrorKind::HardwareFault));
    assert!(resp.error.unwrap().message.contains("timed out"));
}

#[test]
fn get_relays_all_and_selector() {
    let (e, _) = engine(ConfirmMode::Auto);
    for selector in [json!({"id": 8, "method": "getRelays"}), json!({"id": 8, "method": "getRelays", "relay": 0})] {
        let all = call(&e, selector).result.unwrap();
        let ids: Vec<_> = all.as_array().unwrap().iter().map(|r| r["relay"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
    }
    let resp = call(&e, json!({"id": 9, "method": "getRelays", "relay": 6}));
    assert_eq!(resp.kind(), Some(ErrorKind::Validation));
}

#[test]
fn rename_validates_and_persists() {
    let (e, _) = engine(ConfirmMode::Auto);
    let resp = call(&e, json!({"id": 10, "method": "renameRelay", "relay": 2, "name": "  Porch  "}));
    assert_eq!(resp.result.unwrap()["name"], "Porch");

    let resp = call(&e, json!({"id": 11, "method": "renameRelay", "relay": 2, "name": " "}));
    assert_eq!(resp.kind(), Some(ErrorKind::Validation));
    let resp = call(&e, json!({"id": 12, "method": "renameRelay", "relay": 2, "name": "x".repeat(33)}));
    assert_eq!(resp.kind(), Some(ErrorKind::Validation));
    let resp = call(&e, json!({"id": 13, "method": "renameRelay", "relay": 7, "name": "Fan"}));
    assert_eq!(resp.kind(), Some(ErrorKind::Validation));

    let resp = call(&e, json!({"id": 14, "method": "getRelays", "relay": 2}));
    assert_eq!(resp.result.unwrap()[0]["name"], "Porch");
}

#[test]
fn health_is_ok() {
    let (e, _) = engine(ConfirmMode::Auto);
    let resp = call(&e, json!({"id": 15, "method": "health"}));
    assert_eq!(resp.result, Some(json!({"status": "ok"})));
}

#[test]
fn frames_pass_rate_limit_and_parse_gates() {
    let (e, _) = engine(ConfirmMode::Auto);
    let mut session = Session::new("test");

    let resp = block_on(e.dispatch_frame(&mut session, b"{not json"));
    assert_eq!(resp.kind(), Some(ErrorKind::Malformed));

    let resp = block_on(e.dispatch_frame(&mut session, br#"{"id":3,"method":"selfDestruct"}"#));
    assert_eq!((resp.id, resp.kind()), (3, Some(ErrorKind::Malformed)));

    let mut limited = 0;
    for _ in 0..30 {
        let resp = block_on(e.dispatch_frame(&mut session, br#"{"id":4,"method":"health"}"#));
        if resp.kind() == Some(ErrorKind::RateLimited) {
            assert_eq!(resp.id, 4);
            limited += 1;
        }
    }
    assert!(limited > 0, "burst of 32 requests should hit the limiter");
}
