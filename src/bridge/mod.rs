//! Presentation bridge: hands decoded frames from the network event
//! context to the UI tick.
//!
//! ```text
//!  server (httpd task)                     UI thread
//!  ───────────────────                     ─────────
//!  decode ─▶ FrameSlots::publish_* ──▶ Presenter::tick ─▶ observers
//!            (slot + dirty flag)          (take, store, notify)
//! ```
//!
//! State-like kinds (tile, vector, nav, GPS, gmaps, media) coalesce: only
//! the latest value survives until the next tick.  Notifications are
//! events and go through a small bounded queue instead.

mod slot;

pub use slot::FrameSlot;

use std::borrow::Borrow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};

use crate::decode::{
    self, GmapsStep, GpsFix, JpegCodec, MediaState, NavStep, PhoneNotification, TileCanvas,
    VecFrame,
};
use crate::error::{AllocError, DecodeError};

/// Notifications buffered between ticks.
pub const NOTIFICATION_DEPTH: usize = 4;

// ── Observers ─────────────────────────────────────────────────

/// Receives every newly published frame of one kind.
pub trait FrameObserver<F: ?Sized> {
    fn on_frame(&mut self, frame: &F);
}

impl<F: ?Sized, C: FnMut(&F)> FrameObserver<F> for C {
    fn on_frame(&mut self, frame: &F) {
        self(frame);
    }
}

type Observers<F> = Vec<Box<dyn FrameObserver<F> + Send>>;

// ── Shared slots ──────────────────────────────────────────────

/// Everything the event context writes and the UI tick reads.
pub struct FrameSlots {
    canvas: Mutex<TileCanvas>,
    tile_dirty: AtomicBool,
    /// Boxed: a full frame is too large to move across task stacks.
    pub vector: FrameSlot<Box<VecFrame>>,
    pub nav: FrameSlot<NavStep>,
    pub gps: FrameSlot<GpsFix>,
    pub gmaps: FrameSlot<GmapsStep>,
    pub media: FrameSlot<MediaState>,
    notifications: Channel<CriticalSectionRawMutex, PhoneNotification, NOTIFICATION_DEPTH>,
}

impl FrameSlots {
    /// Allocates the tile canvas up front.
    pub fn try_new() -> Result<Self, AllocError> {
        Ok(Self {
            canvas: Mutex::new(TileCanvas::try_new()?),
            tile_dirty: AtomicBool::new(false),
            vector: FrameSlot::default(),
            nav: FrameSlot::default(),
            gps: FrameSlot::default(),
            gmaps: FrameSlot::default(),
            media: FrameSlot::default(),
            notifications: Channel::new(),
        })
    }

    /// Exclusive access to the canvas, for decoding into or reading from.
    pub fn canvas(&self) -> MutexGuard<'_, TileCanvas> {
        self.canvas.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode a tile onto the canvas, locking it per block so a tick
    /// waiting on the canvas is never held up by the codec.
    pub fn draw_tile(&self, codec: &dyn JpegCodec, jpeg: &[u8]) -> Result<(u32, u32), DecodeError> {
        decode::decode_tile(codec, jpeg, &self.canvas)
    }

    /// Flag the canvas as holding a new tile.
    pub fn mark_tile(&self) {
        self.tile_dirty.store(true, Ordering::Release);
    }

    pub fn tile_dirty(&self) -> bool {
        self.tile_dirty.load(Ordering::Acquire)
    }

    fn take_tile(&self) -> bool {
        self.tile_dirty.swap(false, Ordering::AcqRel)
    }

    /// Queue a notification.  Returns `false` when the queue is full and
    /// `n` was dropped.
    pub fn push_notification(&self, n: PhoneNotification) -> bool {
        if self.notifications.try_send(n).is_err() {
            warn!("Bridge: notification queue full, dropping newest");
            return false;
        }
        true
    }

    fn pop_notification(&self) -> Option<PhoneNotification> {
        self.notifications.try_receive().ok()
    }
}

// ── UI side ───────────────────────────────────────────────────

/// Latest published copy of one kind plus its observers.  `T` is the
/// stored form, `F` what observers see (`Box<VecFrame>` vs `VecFrame`).
struct Published<T, F: ?Sized = T> {
    latest: Option<T>,
    observers: Observers<F>,
}

impl<T: Clone + Borrow<F>, F: ?Sized> Published<T, F> {
    fn new() -> Self {
        Self {
            latest: None,
            observers: Vec::new(),
        }
    }

    fn pull(&mut self, slot: &FrameSlot<T>) -> bool {
        let Some(frame) = slot.take() else {
            return false;
        };
        for obs in &mut self.observers {
            obs.on_frame(<T as Borrow<F>>::borrow(&frame));
        }
        self.latest = Some(frame);
        true
    }
}

/// What changed during one [`Presenter::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tile: bool,
    pub vector: bool,
    pub nav: bool,
    pub gps: bool,
    pub gmaps: bool,
    pub media: bool,
    pub notifications: usize,
}

impl TickReport {
    pub fn any(&self) -> bool {
        self.tile
            || self.vector
            || self.nav
            || self.gps
            || self.gmaps
            || self.media
            || self.notifications > 0
    }
}

/// UI-owned consumer of [`FrameSlots`].  Call [`tick`](Self::tick) from
/// the UI timer.
pub struct Presenter {
    slots: Arc<FrameSlots>,
    has_tile: bool,
    tile_observers: Observers<TileCanvas>,
    vector: Published<Box<VecFrame>, VecFrame>,
    nav: Published<NavStep>,
    gps: Published<GpsFix>,
    gmaps: Published<GmapsStep>,
    media: Published<MediaState>,
    notification_observers: Observers<PhoneNotification>,
}

impl Presenter {
    pub fn new(slots: Arc<FrameSlots>) -> Self {
        Self {
            slots,
            has_tile: false,
            tile_observers: Vec::new(),
            vector: Published::new(),
            nav: Published::new(),
            gps: Published::new(),
            gmaps: Published::new(),
            media: Published::new(),
            notification_observers: Vec::new(),
        }
    }

    pub fn on_tile(&mut self, obs: impl FrameObserver<TileCanvas> + Send + 'static) {
        self.tile_observers.push(Box::new(obs));
    }

    pub fn on_vector(&mut self, obs: impl FrameObserver<VecFrame> + Send + 'static) {
        self.vector.observers.push(Box::new(obs));
    }

    pub fn on_nav(&mut self, obs: impl FrameObserver<NavStep> + Send + 'static) {
        self.nav.observers.push(Box::new(obs));
    }

    pub fn on_gps(&mut self, obs: impl FrameObserver<GpsFix> + Send + 'static) {
        self.gps.observers.push(Box::new(obs));
    }

    pub fn on_gmaps(&mut self, obs: impl FrameObserver<GmapsStep> + Send + 'static) {
        self.gmaps.observers.push(Box::new(obs));
    }

    pub fn on_media(&mut self, obs: impl FrameObserver<MediaState> + Send + 'static) {
        self.media.observers.push(Box::new(obs));
    }

    pub fn on_notification(&mut self, obs: impl FrameObserver<PhoneNotification> + Send + 'static) {
        self.notification_observers.push(Box::new(obs));
    }

    /// Deliver everything published since the previous tick.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if self.slots.take_tile() {
            let canvas = self.slots.canvas();
            for obs in &mut self.tile_observers {
                obs.on_frame(&canvas);
            }
            self.has_tile = true;
            report.tile = true;
        }

        report.vector = self.vector.pull(&self.slots.vector);
        report.nav = self.nav.pull(&self.slots.nav);
        report.gps = self.gps.pull(&self.slots.gps);
        report.gmaps = self.gmaps.pull(&self.slots.gmaps);
        report.media = self.media.pull(&self.slots.media);

        while let Some(n) = self.slots.pop_notification() {
            for obs in &mut self.notification_observers {
                obs.on_frame(&n);
            }
            report.notifications += 1;
        }

        if report.any() {
            debug!("Bridge: tick {report:?}");
        }
        report
    }

    /// `false` until the first tile or vector frame has been presented;
    /// drives the "waiting for data" indicator.
    pub fn has_any_frame(&self) -> bool {
        self.has_tile || self.vector.latest.is_some()
    }

    pub fn vector(&self) -> Option<&VecFrame> {
        self.vector.latest.as_deref()
    }

    pub fn nav(&self) -> Option<&NavStep> {
        self.nav.latest.as_ref()
    }

    pub fn gps(&self) -> Option<&GpsFix> {
        self.gps.latest.as_ref()
    }

    pub fn gmaps(&self) -> Option<&GmapsStep> {
        self.gmaps.latest.as_ref()
    }

    pub fn media(&self) -> Option<&MediaState> {
        self.media.latest.as_ref()
    }

    pub fn slots(&self) -> &Arc<FrameSlots> {
        &self.slots
    }
}
