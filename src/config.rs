//! Link configuration parameters
//!
//! All tunable parameters for the navigation link: SoftAP identity,
//! WebSocket endpoint, per-channel buffer ceilings and UI tick cadence.
//! Defaults match what the companion phone app expects.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hard upper bound for the binary (JPEG tile) channel.  A config may
/// lower the ceiling but never raise it past this.
pub const BINARY_CAPACITY_CEILING: usize = 256 * 1024;

/// Hard upper bound for the text (JSON) channel.
pub const TEXT_CAPACITY_CEILING: usize = 64 * 1024;

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    // --- SoftAP ---
    /// Network name advertised to the phone
    pub ap_ssid: heapless::String<32>,
    /// WPA2 passphrase (empty = open network)
    pub ap_password: heapless::String<64>,
    /// 2.4 GHz channel
    pub ap_channel: u8,
    /// Maximum associated stations
    pub ap_max_stations: u16,

    // --- WebSocket ---
    /// HTTP listener port
    pub ws_port: u16,
    /// WebSocket upgrade path
    pub ws_path: heapless::String<16>,

    // --- Buffers ---
    /// Reassembly ceiling for binary (JPEG) messages, bytes
    pub binary_capacity: usize,
    /// Reassembly ceiling for text (JSON) messages, bytes
    pub text_capacity: usize,

    // --- Timing ---
    /// UI presentation tick (milliseconds)
    pub tick_interval_ms: u32,
    /// How long `stop()` waits for in-flight handlers (milliseconds)
    pub quiesce_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // SoftAP
            ap_ssid: heapless_str("ESP32-NAV"),
            ap_password: heapless_str("esp32nav12"),
            ap_channel: 1,
            ap_max_stations: 4,

            // WebSocket
            ws_port: 8080,
            ws_path: heapless_str("/ws"),

            // Buffers
            binary_capacity: 120 * 1024,
            text_capacity: 14 * 1024,

            // Timing
            tick_interval_ms: 100,  // 10 Hz redraw
            quiesce_timeout_ms: 500,
        }
    }
}

impl LinkConfig {
    /// Reject values that would make the link unusable or unsafe.
    pub fn validate(&self) -> Result<(), Error> {
        if self.ap_ssid.is_empty() {
            return Err(Error::Config("ap_ssid must not be empty"));
        }
        if !self.ap_password.is_empty() && self.ap_password.len() < 8 {
            return Err(Error::Config("ap_password must be empty or at least 8 bytes"));
        }
        if !(1..=13).contains(&self.ap_channel) {
            return Err(Error::Config("ap_channel must be 1-13"));
        }
        if self.ap_max_stations == 0 {
            return Err(Error::Config("ap_max_stations must be non-zero"));
        }
        if !self.ws_path.starts_with('/') {
            return Err(Error::Config("ws_path must start with '/'"));
        }
        if self.binary_capacity == 0 || self.binary_capacity > BINARY_CAPACITY_CEILING {
            return Err(Error::Config("binary_capacity out of range"));
        }
        if self.text_capacity == 0 || self.text_capacity > TEXT_CAPACITY_CEILING {
            return Err(Error::Config("text_capacity out of range"));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be non-zero"));
        }
        Ok(())
    }

    /// Parse a JSON config blob; missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let cfg: Self =
            serde_json::from_slice(bytes).map_err(|_| Error::Config("config JSON malformed"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn heapless_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    // Defaults are compile-time literals well under N.
    let _ = out.push_str(s);
    out
}
