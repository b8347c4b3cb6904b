//! ESP32-NAV map link library.
//!
//! WebSocket server core for the handheld launcher's maps app: fragment
//! reassembly, message classification, frame decoding and the handoff of
//! decoded frames to the UI tick.  All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module, so the whole
//! pipeline runs on the host for tests.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bridge;
pub mod config;
pub mod decode;
pub mod error;
pub mod protocol;

pub use app::service::{MapsServer, ServerState};
pub use bridge::{FrameSlots, Presenter};
pub use config::LinkConfig;
pub use error::{Error, Result};
