//! Outbound link events.
//!
//! [`LinkCore`](super::link::LinkCore) and
//! [`MapsServer`](super::service::MapsServer) emit these through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::error::Error;
use crate::protocol::{Channel, MessageKind};

/// Kinds of frame handed to the presentation bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Tile,
    Vector,
    Nav,
    Gps,
    Gmaps,
    Media,
    Notification,
}

impl From<MessageKind> for FrameKind {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Vector => Self::Vector,
            MessageKind::Nav => Self::Nav,
            MessageKind::Gps => Self::Gps,
            MessageKind::Gmaps => Self::Gmaps,
            MessageKind::Media => Self::Media,
            MessageKind::Notif => Self::Notification,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// AP up and listener bound.
    Started { port: u16 },
    /// Listener unbound and AP down.
    Stopped,
    PeerConnected,
    PeerDisconnected,
    /// A decoded frame was published to the bridge.
    FramePublished(FrameKind),
    /// A message or fragment was dropped.
    Rejected { channel: Channel, error: Error },
    /// A text message with an unknown or missing tag was skipped.
    Ignored,
    /// The notification queue was full.
    NotificationDropped,
}
