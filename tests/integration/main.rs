//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one layer against mock
//! adapters.  All tests run on the host with no GPIO hardware.

mod engine_tests;
mod mock_hw;
mod server_tests;
