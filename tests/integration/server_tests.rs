//! Session driver over an in-memory transport, plus one real TCP round trip.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use relaybox::rpc::codec::{FrameDecoder, encode_frame};
use relaybox::rpc::engine::RpcEngine;
use relaybox::rpc::messages::{ErrorKind, Response};
use relaybox::rpc::server::{run_session, serve};
use relaybox::rpc::transport::Transport;
use serde_json::json;

use crate::mock_hw::{ConfirmMode, rig};

/// Scripted input, captured output.
struct ScriptTransport {
    input: Vec<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl Transport for ScriptTransport {
    type Error = std::io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.input.is_empty() {
            return Ok(0);
        }
        let chunk = self.input.remove(0);
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.output.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn peer(&self) -> String {
        "script".into()
    }
}

fn responses(bytes: &[u8]) -> Vec<Response> {
    let mut d = FrameDecoder::new();
    d.push(bytes);
    let mut out = Vec::new();
    while let Some(frame) = d.next_frame().unwrap() {
        out.push(serde_json::from_slice(&frame).unwrap());
    }
    out
}

fn frame(v: serde_json::Value) -> Vec<u8> {
    encode_frame(v.to_string().as_bytes()).unwrap()
}

#[test]
fn split_and_concatenated_frames_each_get_one_response() {
    let engine = RpcEngine::new(rig(ConfirmMode::Auto).controller);
    let mut stream = frame(json!({"id": 1, "method": "setRelay", "relay": 1, "state": "on"}));
    stream.extend(frame(json!({"id": 2, "method": "getRelays", "relay": 1})));
    let third = frame(json!({"id": 3, "method": "health"}));
    stream.extend(&third[..3]);

    let output = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptTransport {
        input: vec![stream[..5].to_vec(), stream[5..].to_vec(), third[3..].to_vec()],
        output: Arc::clone(&output),
    };
    let served = run_session(transport, &engine).unwrap();
    assert_eq!(served, 3);

    let out = responses(&output.lock().unwrap());
    let ids: Vec<_> = out.iter().map(|r| r.id).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert!(out.iter().all(|r| r.ok));
    assert_eq!(out[1].result.as_ref().unwrap()[0]["state"], "on");
}

#[test]
fn oversized_frame_closes_session_with_malformed() {
    let engine = RpcEngine::new(rig(ConfirmMode::Auto).controller);
    let output = Arc::new(Mutex::new(Vec::new()));
    let mut bad = 9000u32.to_le_bytes().to_vec();
    bad.extend([0u8; 16]);
    let transport = ScriptTransport {
        input: vec![bad, frame(json!({"id": 1, "method": "health"}))],
        output: Arc::clone(&output),
    };
    assert_eq!(run_session(transport, &engine).unwrap(), 0);
    let out = responses(&output.lock().unwrap());
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind(), Some(ErrorKind::Malformed));
}

#[test]
fn tcp_round_trip() {
    let engine = RpcEngine::new(rig(ConfirmMode::Auto).controller);
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || serve(listener, engine));

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(&frame(json!({"id": 42, "method": "setRelay", "relay": 4, "state": 1})))
        .unwrap();

    let mut header = [0u8; 4];
    client.read_exact(&mut header).unwrap();
    let mut body = vec![0u8; u32::from_le_bytes(header) as usize];
    client.read_exact(&mut body).unwrap();
    let resp: Response = serde_json::from_slice(&body).unwrap();
    assert_eq!(resp.id, 42);
    assert!(resp.ok);
    assert_eq!(resp.result.unwrap()["state"], "on");
}
