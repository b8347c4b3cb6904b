//! Mock adapters and fixtures for integration tests.
//!
//! `MockAp` records every access-point call so tests can assert on the
//! bring-up / tear-down order.  The WebSocket side uses the crate's own
//! loopback `WsServer`, which lets tests inject frames as the httpd task
//! would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use navlink::adapters::ws_server::WsServer;
use navlink::app::events::LinkEvent;
use navlink::app::ports::{AccessPointPort, EventSink};
use navlink::config::LinkConfig;
use navlink::decode::{ImageJpegCodec, JpegCodec, PixelBlock};
use navlink::error::{DecodeError, TransportError};
use navlink::{FrameSlots, MapsServer};

// ── Access point call record ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApCall {
    Start,
    Stop,
}

pub struct MockAp {
    pub calls: Vec<ApCall>,
    up: bool,
    fail_start: bool,
}

#[allow(dead_code)]
impl MockAp {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            up: false,
            fail_start: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    pub fn starts(&self) -> usize {
        self.calls.iter().filter(|c| **c == ApCall::Start).count()
    }
}

impl AccessPointPort for MockAp {
    fn start(&mut self, _config: &LinkConfig) -> Result<(), TransportError> {
        self.calls.push(ApCall::Start);
        if self.fail_start {
            return Err(TransportError::ApStartFailed);
        }
        self.up = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(ApCall::Stop);
        self.up = false;
    }

    fn is_up(&self) -> bool {
        self.up
    }
}

// ── Event log ─────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct EventLog(pub Arc<Mutex<Vec<LinkEvent>>>);

#[allow(dead_code)]
impl EventLog {
    pub fn events(&self) -> Vec<LinkEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &LinkEvent) -> bool {
        self.0.lock().unwrap().contains(event)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &LinkEvent) {
        self.0.lock().unwrap().push(*event);
    }
}

// ── Slow codec (for quiesce tests) ────────────────────────────

/// Wraps the real codec and holds the handler for `delay` first.
/// `entered` is raised once a decode is under way.
pub struct SlowCodec {
    pub delay: Duration,
    pub entered: Arc<AtomicBool>,
}

impl JpegCodec for SlowCodec {
    fn decode(
        &self,
        jpeg: &[u8],
        sink: &mut dyn FnMut(PixelBlock<'_>),
    ) -> Result<(u32, u32), DecodeError> {
        self.entered.store(true, Ordering::SeqCst);
        thread::sleep(self.delay);
        ImageJpegCodec::default().decode(jpeg, sink)
    }
}

// ── Builders ──────────────────────────────────────────────────

pub type TestServer = MapsServer<MockAp, WsServer>;

#[allow(dead_code)]
pub fn server_with(
    ap: MockAp,
    ws: WsServer,
    codec: Box<dyn JpegCodec>,
) -> (TestServer, Arc<FrameSlots>, EventLog) {
    let slots = Arc::new(FrameSlots::try_new().unwrap());
    let server = MapsServer::new(LinkConfig::default(), ap, ws, codec, Arc::clone(&slots)).unwrap();
    let log = EventLog::default();
    server.set_event_sink(log.clone());
    (server, slots, log)
}

#[allow(dead_code)]
pub fn server() -> (TestServer, Arc<FrameSlots>, EventLog) {
    server_with(MockAp::new(), WsServer::new(), Box::new(ImageJpegCodec::default()))
}

/// A started server with a connected phone.
#[allow(dead_code)]
pub fn connected() -> (TestServer, Arc<FrameSlots>, EventLog) {
    let (mut server, slots, log) = server();
    server.start().unwrap();
    assert!(server.transport().inject(navlink::app::ports::WsEvent::Connected));
    (server, slots, log)
}

/// Single-colour baseline JPEG.
#[allow(dead_code)]
pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let raw: Vec<u8> = (0..width * height).flat_map(|_| rgb).collect();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 95)
        .encode(&raw, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}
