//! Transport-agnostic RPC subsystem.
//!
//! Length-prefixed JSON frames over any byte channel.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        RPC Stack                          │
//! │                                                           │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────────────────┐  │
//! │  │ Transport │──▶│  Codec   │──▶│ Engine (validation)  │  │
//! │  │ (trait)   │   │ (framing)│   │  → RelayController   │  │
//! │  └───────────┘   └──────────┘   └──────────────────────┘  │
//! │        ▲                                   │              │
//! │        └────────── response frame ◀────────┘              │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod engine;
pub mod messages;
pub mod server;
pub mod session;
pub mod transport;
