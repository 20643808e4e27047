//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements  | Connects to                      |
//! |--------------|-------------|----------------------------------|
//! | `gpio`       | PinDriver   | in-memory levels / rppal (`rpi`) |
//! | `file_store` | StoragePort | JSON document on disk / memory   |
//! | `log_sink`   | EventSink   | `log` facade                     |
//! | `time`       | TimePort    | system wall clock                |

pub mod file_store;
pub mod gpio;
pub mod log_sink;
pub mod time;
