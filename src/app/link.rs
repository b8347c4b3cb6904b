//! Shared link state and the inbound data path.
//!
//! [`LinkCore`] is what the transport calls into.  It owns the two
//! reassemblers, the peer flag, the quiesce bookkeeping and the
//! counters, and publishes decoded frames to the [`FrameSlots`].
//!
//! ```text
//!  WsEvent::Data ─▶ Reassembler[bin]  ─▶ JpegCodec ─▶ canvas + tile flag
//!               └▶ Reassembler[text] ─▶ classify ─▶ decode ─▶ FrameSlot
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::bridge::FrameSlots;
use crate::config::LinkConfig;
use crate::decode::{self, JpegCodec, PhoneNotification};
use crate::error::{DecodeError, Error, ProtocolError};
use crate::protocol::{Channel, Fragment, MessageKind, Progress, Reassembler, classify};

use super::events::{FrameKind, LinkEvent};
use super::ports::{EventSink, WsEvent, WsEventHandler};

// ───────────────────────────────────────────────────────────────
// Counters
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct LinkStats {
    binary_messages: AtomicU32,
    text_messages: AtomicU32,
    frames_published: AtomicU32,
    ignored_messages: AtomicU32,
    protocol_errors: AtomicU32,
    alloc_errors: AtomicU32,
    decode_errors: AtomicU32,
    notifications_dropped: AtomicU32,
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub binary_messages: u32,
    pub text_messages: u32,
    pub frames_published: u32,
    pub ignored_messages: u32,
    pub protocol_errors: u32,
    pub alloc_errors: u32,
    pub decode_errors: u32,
    pub notifications_dropped: u32,
}

impl LinkStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU32| c.load(Ordering::Relaxed);
        StatsSnapshot {
            binary_messages: get(&self.binary_messages),
            text_messages: get(&self.text_messages),
            frames_published: get(&self.frames_published),
            ignored_messages: get(&self.ignored_messages),
            protocol_errors: get(&self.protocol_errors),
            alloc_errors: get(&self.alloc_errors),
            decode_errors: get(&self.decode_errors),
            notifications_dropped: get(&self.notifications_dropped),
        }
    }

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn count_error(&self, e: &Error) {
        match e {
            Error::Protocol(_) => Self::bump(&self.protocol_errors),
            Error::Alloc(_) => Self::bump(&self.alloc_errors),
            Error::Decode(_) => Self::bump(&self.decode_errors),
            Error::Transport(_) | Error::Config(_) => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// In-flight guard
// ───────────────────────────────────────────────────────────────

/// Registered handler call; decrements the in-flight count on drop.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ───────────────────────────────────────────────────────────────
// LinkCore
// ───────────────────────────────────────────────────────────────

pub struct LinkCore {
    config: LinkConfig,
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    has_peer: AtomicBool,
    binary: Mutex<Reassembler>,
    text: Mutex<Reassembler>,
    slots: Arc<FrameSlots>,
    codec: Box<dyn JpegCodec>,
    sink: Mutex<Box<dyn EventSink>>,
    stats: LinkStats,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LinkCore {
    pub fn new(
        config: LinkConfig,
        slots: Arc<FrameSlots>,
        codec: Box<dyn JpegCodec>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self {
            binary: Mutex::new(Reassembler::new(Channel::Binary, config.binary_capacity)),
            text: Mutex::new(Reassembler::new(Channel::Text, config.text_capacity)),
            config,
            accepting: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            has_peer: AtomicBool::new(false),
            slots,
            codec,
            sink: Mutex::new(sink),
            stats: LinkStats::default(),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn slots(&self) -> &Arc<FrameSlots> {
        &self.slots
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn has_peer(&self) -> bool {
        self.has_peer.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Whether either reassembly buffer is currently allocated.
    pub fn buffers_allocated(&self) -> bool {
        lock(&self.binary).is_allocated() || lock(&self.text).is_allocated()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn set_sink(&self, sink: Box<dyn EventSink>) {
        *lock(&self.sink) = sink;
    }

    pub(crate) fn emit(&self, event: LinkEvent) {
        lock(&self.sink).emit(&event);
    }

    // ── Lifecycle hooks (driven by MapsServer) ────────────────

    pub(crate) fn open(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }

    pub(crate) fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Wait for in-flight handler calls to finish.  Returns `false` if
    /// `timeout` elapsed first.
    pub(crate) fn quiesce(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let n = self.in_flight.load(Ordering::SeqCst);
            if n == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                warn!("Link: {n} handler(s) still running after {timeout:?}");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Free both working buffers and forget the peer.
    pub(crate) fn release(&self) {
        lock(&self.binary).release();
        lock(&self.text).release();
        self.has_peer.store(false, Ordering::SeqCst);
    }

    /// Register a handler call.  `None` once the link stopped accepting.
    fn enter(&self) -> Option<InFlight<'_>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if !self.accepting.load(Ordering::SeqCst) {
            return None;
        }
        Some(guard)
    }

    // ── Data path ─────────────────────────────────────────────

    fn on_fragment(&self, frag: &Fragment<'_>) {
        let reasm = match frag.channel {
            Channel::Binary => &self.binary,
            Channel::Text => &self.text,
        };
        let mut r = lock(reasm);
        match r.feed(frag) {
            Ok(Progress::Partial) => {}
            Ok(Progress::Complete(len)) => match frag.channel {
                Channel::Binary => {
                    LinkStats::bump(&self.stats.binary_messages);
                    if let Some(jpeg) = r.message() {
                        self.present_tile(jpeg);
                    }
                }
                Channel::Text => {
                    LinkStats::bump(&self.stats.text_messages);
                    match r.text() {
                        Ok(Some(text)) => self.present_text(text),
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Link: dropping {len}-byte text message: {e}");
                            self.reject(Channel::Text, e.into());
                        }
                    }
                }
            },
            Err(e) => self.reject(frag.channel, e),
        }
    }

    fn present_tile(&self, jpeg: &[u8]) {
        match self.slots.draw_tile(self.codec.as_ref(), jpeg) {
            Ok(_) => {
                self.slots.mark_tile();
                self.published(FrameKind::Tile);
            }
            Err(e) => {
                warn!("Maps: tile rejected: {e}");
                self.reject(Channel::Binary, e.into());
            }
        }
    }

    fn present_text(&self, text: &str) {
        let Some(kind) = classify(text) else {
            debug!("Maps: ignoring untagged/unknown text message");
            LinkStats::bump(&self.stats.ignored_messages);
            self.emit(LinkEvent::Ignored);
            return;
        };

        let delivered = match kind {
            MessageKind::Vector => decode::vector::decode(text).map(|f| self.slots.vector.publish(f)),
            MessageKind::Nav => decode::decode_nav(text).map(|n| self.slots.nav.publish(n)),
            MessageKind::Gps => decode::decode_gps(text).map(|g| self.slots.gps.publish(g)),
            MessageKind::Gmaps => decode::decode_gmaps(text).map(|g| self.slots.gmaps.publish(g)),
            MessageKind::Media => decode::decode_media(text).map(|m| self.slots.media.publish(m)),
            MessageKind::Notif => {
                return match decode::decode_notif(text) {
                    Ok(n) => self.deliver_notification(n),
                    Err(e) => self.reject_text(kind, e),
                };
            }
        };

        match delivered {
            Ok(()) => self.published(kind.into()),
            Err(e) => self.reject_text(kind, e),
        }
    }

    fn deliver_notification(&self, n: PhoneNotification) {
        if self.slots.push_notification(n) {
            self.published(FrameKind::Notification);
        } else {
            LinkStats::bump(&self.stats.notifications_dropped);
            self.emit(LinkEvent::NotificationDropped);
        }
    }

    fn reject_text(&self, kind: MessageKind, e: DecodeError) {
        warn!("Maps: {kind:?} message rejected: {e}");
        self.reject(Channel::Text, e.into());
    }

    fn published(&self, kind: FrameKind) {
        LinkStats::bump(&self.stats.frames_published);
        self.emit(LinkEvent::FramePublished(kind));
    }

    fn reject(&self, channel: Channel, error: Error) {
        // Stray continuation tails are routine after a rejection.
        if error != Error::Protocol(ProtocolError::NotAssembling) {
            self.stats.count_error(&error);
        }
        self.emit(LinkEvent::Rejected { channel, error });
    }
}

impl WsEventHandler for LinkCore {
    fn handle(&self, event: WsEvent<'_>) {
        let Some(_guard) = self.enter() else {
            debug!("Link: event after stop ignored");
            return;
        };
        match event {
            WsEvent::Connected => {
                self.has_peer.store(true, Ordering::SeqCst);
                info!("Link: phone connected");
                self.emit(LinkEvent::PeerConnected);
            }
            WsEvent::Disconnected => {
                self.has_peer.store(false, Ordering::SeqCst);
                info!("Link: phone disconnected");
                self.emit(LinkEvent::PeerDisconnected);
            }
            WsEvent::Data(frag) => self.on_fragment(&frag),
        }
    }
}
