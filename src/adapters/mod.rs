//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to                       |
//! |-------------|------------------|-----------------------------------|
//! | `log_sink`  | EventSink        | Serial log output                 |
//! | `softap`    | AccessPointPort  | ESP-IDF WiFi AP / simulation      |
//! | `ws_server` | WsTransportPort  | ESP-IDF httpd WebSocket / loopback|
//!
//! The JPEG codec adapter (`ImageJpegCodec`) lives in
//! [`decode::tile`](crate::decode::tile).

pub mod log_sink;
pub mod softap;
pub mod ws_server;
