//! Accept loop and per-connection session driver.
//!
//! One OS thread per client.  Each thread reads bytes, feeds the frame
//! decoder, and answers every complete frame with exactly one response
//! frame.  Relay transitions block their own client thread only; other
//! clients keep being served.

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use futures_lite::future::block_on;
use log::{debug, error, info, warn};

use crate::app::ports::{PinDriver, StoragePort};

use super::codec::{FrameError, encode_frame};
use super::engine::RpcEngine;
use super::messages::{ErrorKind, Response};
use super::session::Session;
use super::transport::{TcpTransport, Transport};

/// How long a silent client may keep its connection.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

const READ_CHUNK: usize = 1024;

fn send<T: Transport>(transport: &mut T, response: &Response) -> Result<(), T::Error> {
    let body = match serde_json::to_vec(response) {
        Ok(body) => body,
        Err(e) => {
            error!("rpc: cannot serialise response {}: {}", response.id, e);
            return Ok(());
        }
    };
    let frame = match encode_frame(&body) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("rpc: response {} not sent: {}", response.id, e);
            let fallback = Response::err(response.id, ErrorKind::Malformed, e.to_string());
            let body = serde_json::to_vec(&fallback).unwrap_or_default();
            match encode_frame(&body) {
                Ok(frame) => frame,
                Err(_) => return Ok(()),
            }
        }
    };
    transport.write_all(&frame)?;
    transport.flush()
}

/// Serve one client until it disconnects or breaks framing.
pub fn run_session<T, D, S>(mut transport: T, engine: &RpcEngine<D, S>) -> Result<u64, T::Error>
where
    T: Transport,
    D: PinDriver,
    S: StoragePort,
{
    let mut session = Session::new(transport.peer());
    let mut buf = [0u8; READ_CHUNK];
    info!("rpc[{}]: connected", session.peer());

    loop {
        let n = transport.read(&mut buf)?;
        if n == 0 {
            break;
        }
        session.decoder().push(&buf[..n]);

        loop {
            match session.decoder().next_frame() {
                Ok(Some(frame)) => {
                    let response = block_on(engine.dispatch_frame(&mut session, &frame));
                    send(&mut transport, &response)?;
                }
                Ok(None) => break,
                Err(e @ (FrameError::Empty | FrameError::TooLarge(_))) => {
                    warn!("rpc[{}]: {}, closing", session.peer(), e);
                    session.decoder().reset();
                    send(&mut transport, &Response::err(0, ErrorKind::Malformed, e.to_string()))?;
                    return Ok(session.served());
                }
            }
        }
    }

    info!("rpc[{}]: disconnected after {} requests", session.peer(), session.served());
    Ok(session.served())
}

/// Accept clients forever, one thread each.
pub fn serve<D, S>(listener: TcpListener, engine: RpcEngine<D, S>) -> std::io::Result<()>
where
    D: PinDriver + 'static,
    S: StoragePort + 'static,
{
    info!("rpc: listening on {}", listener.local_addr()?);
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("rpc: accept failed: {}", e);
                continue;
            }
        };
        let transport = match TcpTransport::new(stream, Some(IDLE_TIMEOUT)) {
            Ok(t) => t,
            Err(e) => {
                warn!("rpc: cannot configure client socket: {}", e);
                continue;
            }
        };
        let engine = engine.clone();
        let spawned = thread::Builder::new()
            .name(format!("rpc-{}", transport.peer()))
            .spawn(move || {
                let peer = transport.peer();
                if let Err(e) = run_session(transport, &engine) {
                    debug!("rpc[{}]: session ended: {}", peer, e);
                }
            });
        if let Err(e) = spawned {
            error!("rpc: cannot spawn client thread: {}", e);
        }
    }
    Ok(())
}
