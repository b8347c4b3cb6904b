//! Maps server: AP and listener lifecycle around the shared
//! [`LinkCore`].
//!
//! ```text
//!  AccessPointPort ──▶ ┌────────────────────────┐
//!                      │       MapsServer        │ ──▶ LinkCore ──▶ FrameSlots
//! WsTransportPort ◀──▶ │ Stopped·Starting·Running│
//!                      └────────────────────────┘
//! ```
//!
//! Several servers can live in one process; each owns its own core and
//! slots.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::bridge::FrameSlots;
use crate::config::LinkConfig;
use crate::decode::JpegCodec;
use crate::error::{Error, Result, TransportError};
use crate::protocol::MediaCommand;

use super::events::LinkEvent;
use super::link::{LinkCore, StatsSnapshot};
use super::ports::{AccessPointPort, EventSink, WsEventHandler, WsTransportPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
}

pub struct MapsServer<A: AccessPointPort, T: WsTransportPort> {
    ap: A,
    transport: T,
    core: Arc<LinkCore>,
    state: ServerState,
}

impl<A: AccessPointPort, T: WsTransportPort> MapsServer<A, T> {
    /// Validate `config` and build a stopped server.  Events go to the
    /// log until [`set_event_sink`](Self::set_event_sink) is called.
    pub fn new(
        config: LinkConfig,
        ap: A,
        transport: T,
        codec: Box<dyn JpegCodec>,
        slots: Arc<FrameSlots>,
    ) -> Result<Self> {
        config.validate()?;
        let core = LinkCore::new(
            config,
            slots,
            codec,
            Box::new(crate::adapters::log_sink::LogEventSink::new()),
        );
        Ok(Self {
            ap,
            transport,
            core: Arc::new(core),
            state: ServerState::Stopped,
        })
    }

    pub fn set_event_sink(&self, sink: impl EventSink + 'static) {
        self.core.set_sink(Box::new(sink));
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the AP, then bind the listener.  A no-op when already
    /// running.  On failure everything brought up so far is torn down
    /// and the server is back in `Stopped`.
    pub fn start(&mut self) -> Result<()> {
        if self.state == ServerState::Running {
            return Ok(());
        }
        self.state = ServerState::Starting;
        let config = self.core.config().clone();

        if let Err(e) = self.ap.start(&config) {
            error!("Maps: AP '{}' failed to start: {e}", config.ap_ssid);
            self.state = ServerState::Stopped;
            return Err(e.into());
        }

        self.core.open();
        let handler: Arc<dyn WsEventHandler> = self.core.clone();
        if let Err(e) = self.transport.bind(&config, handler) {
            error!("Maps: bind on port {} failed: {e}", config.ws_port);
            self.core.close();
            self.core.release();
            self.ap.stop();
            self.state = ServerState::Stopped;
            return Err(e.into());
        }

        self.state = ServerState::Running;
        info!(
            "Maps: serving ws://<ap>:{}{} on '{}'",
            config.ws_port, config.ws_path, config.ap_ssid
        );
        self.core.emit(LinkEvent::Started {
            port: config.ws_port,
        });
        Ok(())
    }

    /// Quiesce and tear down.  A no-op when stopped.
    ///
    /// Order: stop accepting, unbind, wait for in-flight handlers, free
    /// buffers and peer flag, AP down.
    pub fn stop(&mut self) {
        if self.state == ServerState::Stopped {
            return;
        }
        self.core.close();
        self.transport.unbind();

        let timeout = Duration::from_millis(u64::from(self.core.config().quiesce_timeout_ms));
        if !self.core.quiesce(timeout) {
            warn!("Maps: quiesce timed out, releasing anyway");
        }
        self.core.release();
        self.ap.stop();

        self.state = ServerState::Stopped;
        info!("Maps: stopped");
        self.core.emit(LinkEvent::Stopped);
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Send a media control command to the phone.
    pub fn send_media_command(&mut self, cmd: MediaCommand) -> Result<()> {
        if self.state != ServerState::Running {
            return Err(TransportError::NotRunning.into());
        }
        if !self.core.has_peer() {
            return Err(TransportError::NoPeer.into());
        }
        self.transport
            .send_text(&cmd.to_json())
            .map_err(|e| {
                warn!("Maps: media command {cmd:?} not sent: {e}");
                Error::from(e)
            })
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ServerState::Running
    }

    pub fn has_peer(&self) -> bool {
        self.core.has_peer()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats()
    }

    pub fn core(&self) -> &Arc<LinkCore> {
        &self.core
    }

    pub fn access_point(&self) -> &A {
        &self.ap
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<A: AccessPointPort, T: WsTransportPort> Drop for MapsServer<A, T> {
    fn drop(&mut self) {
        self.stop();
    }
}
