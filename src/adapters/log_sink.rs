//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing link events to the ESP-IDF logger
//! (UART / USB-CDC on the device, stderr on the host).

use log::{debug, info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LinkEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Started { port } => info!("LINK  | started, port {}", port),
            LinkEvent::Stopped => info!("LINK  | stopped"),
            LinkEvent::PeerConnected => info!("PEER  | connected"),
            LinkEvent::PeerDisconnected => info!("PEER  | disconnected"),
            LinkEvent::FramePublished(kind) => debug!("FRAME | {:?}", kind),
            LinkEvent::Rejected { channel, error } => {
                warn!("DROP  | {} | {}", channel.tag(), error);
            }
            LinkEvent::Ignored => debug!("DROP  | unknown text message"),
            LinkEvent::NotificationDropped => warn!("DROP  | notification queue full"),
        }
    }
}
