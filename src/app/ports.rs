//! Port traits: the hexagonal boundary between the link core and the
//! radio / socket stack.
//!
//! ```text
//!   AccessPointPort ◀── MapsServer ──▶ WsTransportPort
//!                                          │
//!                                          ▼ WsEvent
//!                                  WsEventHandler (LinkCore)
//! ```
//!
//! On `target_os = "espidf"` the adapters wrap `esp-idf-svc`; on the host
//! simulation adapters stand in so the lifecycle can be exercised in
//! tests.  The JPEG codec port lives next to the canvas in
//! [`decode::tile`](crate::decode::tile).

use std::sync::Arc;

use crate::config::LinkConfig;
use crate::error::TransportError;
use crate::protocol::Fragment;

use super::events::LinkEvent;

// ───────────────────────────────────────────────────────────────
// Access point (driven adapter: link → radio)
// ───────────────────────────────────────────────────────────────

pub trait AccessPointPort {
    /// Bring the SoftAP up with the configured SSID, password, channel
    /// and station limit.
    fn start(&mut self, config: &LinkConfig) -> Result<(), TransportError>;

    /// Take the SoftAP down.  Safe to call when already down.
    fn stop(&mut self);

    fn is_up(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// WebSocket transport (driven adapter: link ↔ socket)
// ───────────────────────────────────────────────────────────────

/// What the transport reports for the single phone connection.
#[derive(Debug, Clone, Copy)]
pub enum WsEvent<'a> {
    Connected,
    Disconnected,
    Data(Fragment<'a>),
}

/// Receives transport events.  Called from the transport's own task, so
/// implementations must be shareable across threads.
pub trait WsEventHandler: Send + Sync {
    fn handle(&self, event: WsEvent<'_>);
}

pub trait WsTransportPort {
    /// Start listening on `config.ws_port` / `config.ws_path` and deliver
    /// every event to `handler`.
    fn bind(
        &mut self,
        config: &LinkConfig,
        handler: Arc<dyn WsEventHandler>,
    ) -> Result<(), TransportError>;

    /// Stop listening.  After this returns no new events are delivered;
    /// a handler call already in progress may still be finishing.
    fn unbind(&mut self);

    /// Send one text frame to the connected peer.
    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: link → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The link emits structured [`LinkEvent`]s through this port.
pub trait EventSink: Send {
    fn emit(&mut self, event: &LinkEvent);
}
