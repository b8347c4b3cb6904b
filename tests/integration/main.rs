//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock or simulation adapters.  All tests run on the host
//! (x86_64) with no radio required.

#![cfg(not(target_os = "espidf"))]

mod mock_link;
mod pipeline_tests;
mod server_lifecycle_tests;
