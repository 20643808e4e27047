//! Relay core: pure domain logic behind port traits.
//!
//! The pieces that decide what happens to a relay live here: state
//! normalisation, the pending-action guard, the relay record store and
//! the controller that ties them together.  All interaction with hardware
//! and disk happens through the traits in [`ports`].

pub mod controller;
pub mod events;
pub mod pending;
pub mod ports;
pub mod state;
pub mod store;
