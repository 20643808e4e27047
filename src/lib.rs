//! relaybox library.
//!
//! Remote control of up to four relays on the Raspberry Pi 40-pin header.
//! Exposes the relay core, adapters and RPC layer for integration testing;
//! the binary in `main.rs` only wires them together.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod rpc;
