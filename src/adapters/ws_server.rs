//! WebSocket listener adapter.
//!
//! Implements [`WsTransportPort`].  Each WebSocket frame becomes one
//! [`Fragment`]; continuation frames carry the running offset and a
//! total restated as "bytes so far", since the real length is only known
//! once the final frame arrives.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspHttpServer::ws_handler` on the httpd task.
//! - **all other targets**: in-process loopback; tests inject events and
//!   read back what was sent.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::app::ports::{WsEvent, WsEventHandler, WsTransportPort};
use crate::config::LinkConfig;
use crate::error::TransportError;
use crate::protocol::{Channel, Fragment};

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::ws::EspHttpWsDetachedSender;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;
#[cfg(target_os = "espidf")]
use esp_idf_svc::ws::FrameType;

/// httpd task stack.  The whole inbound path runs on it, including JSON
/// parsing; IDF's 6 KiB default is not enough.
pub const HTTPD_STACK_SIZE: usize = 24 * 1024;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// Frame → fragment mapping
// ───────────────────────────────────────────────────────────────

/// Position inside a fragmented WebSocket message.
#[derive(Debug, Default)]
pub struct FrameStream {
    open: Option<(Channel, usize)>,
}

impl FrameStream {
    /// First frame of a message.  `more` is the WebSocket "fragmented"
    /// bit: further continuation frames follow.
    pub fn start<'a>(&mut self, channel: Channel, data: &'a [u8], more: bool) -> Fragment<'a> {
        self.open = more.then_some((channel, data.len()));
        Fragment {
            channel,
            offset: 0,
            total: data.len(),
            is_final: !more,
            data,
        }
    }

    /// A continuation frame.  `None` when no fragmented message is open.
    pub fn next<'a>(&mut self, data: &'a [u8], last: bool) -> Option<Fragment<'a>> {
        let (channel, offset) = self.open?;
        let total = offset + data.len();
        self.open = if last { None } else { Some((channel, total)) };
        Some(Fragment {
            channel,
            offset,
            total,
            is_final: last,
            data,
        })
    }

    pub fn reset(&mut self) {
        self.open = None;
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF adapter
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WsServer {
    server: Option<EspHttpServer<'static>>,
    sender: Arc<Mutex<Option<EspHttpWsDetachedSender>>>,
}

#[cfg(target_os = "espidf")]
impl Default for WsServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl WsServer {
    pub fn new() -> Self {
        Self {
            server: None,
            sender: Arc::new(Mutex::new(None)),
        }
    }
}

#[cfg(target_os = "espidf")]
impl WsTransportPort for WsServer {
    fn bind(
        &mut self,
        config: &LinkConfig,
        handler: Arc<dyn WsEventHandler>,
    ) -> Result<(), TransportError> {
        if self.server.is_some() {
            return Ok(());
        }
        let http = Configuration {
            http_port: config.ws_port,
            stack_size: HTTPD_STACK_SIZE,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&http).map_err(|e| {
            warn!("WS: httpd start on port {} failed: {e}", config.ws_port);
            TransportError::BindFailed
        })?;

        // Largest frame worth reading; anything bigger is refused by the
        // reassembler on its declared length alone.
        let frame_limit = config.binary_capacity.max(config.text_capacity);
        let sender = Arc::clone(&self.sender);
        let stream = Mutex::new(FrameStream::default());

        server
            .ws_handler(config.ws_path.as_str(), move |ws| {
                if ws.is_new() {
                    lock(&stream).reset();
                    match ws.create_detached_sender() {
                        Ok(s) => *lock(&sender) = Some(s),
                        Err(e) => warn!("WS: no detached sender: {e}"),
                    }
                    handler.handle(WsEvent::Connected);
                    return Ok::<(), EspError>(());
                }
                if ws.is_closed() {
                    *lock(&sender) = None;
                    handler.handle(WsEvent::Disconnected);
                    return Ok(());
                }

                let (frame_type, len) = match ws.recv(&mut []) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("WS: frame header read failed: {e}");
                        return Ok(());
                    }
                };

                if len > frame_limit {
                    // Report the size so it is counted, then drop the
                    // session: the unread payload would desync the socket.
                    if let FrameType::Binary(_) | FrameType::Text(_) = frame_type {
                        let channel = if matches!(frame_type, FrameType::Binary(_)) {
                            Channel::Binary
                        } else {
                            Channel::Text
                        };
                        handler.handle(WsEvent::Data(Fragment {
                            channel,
                            offset: 0,
                            total: len,
                            is_final: true,
                            data: &[],
                        }));
                    }
                    warn!("WS: {len}-byte frame above {frame_limit}, closing session");
                    let _ = ws.send(FrameType::Close, &[]);
                    return Ok(());
                }

                let mut buf = Vec::new();
                if buf.try_reserve_exact(len).is_err() {
                    warn!("WS: no memory for {len}-byte frame");
                    return Ok(());
                }
                buf.resize(len, 0);
                if len > 0 {
                    if let Err(e) = ws.recv(&mut buf) {
                        warn!("WS: payload read failed: {e}");
                        return Ok(());
                    }
                }

                let mut stream = lock(&stream);
                let frag = match frame_type {
                    FrameType::Text(more) => Some(stream.start(Channel::Text, &buf, more)),
                    FrameType::Binary(more) => Some(stream.start(Channel::Binary, &buf, more)),
                    FrameType::Continue(last) => stream.next(&buf, last),
                    FrameType::Ping => {
                        let _ = ws.send(FrameType::Pong, &buf);
                        None
                    }
                    FrameType::Pong | FrameType::Close | FrameType::SocketClose => None,
                };
                drop(stream);
                if let Some(frag) = frag {
                    handler.handle(WsEvent::Data(frag));
                }
                Ok(())
            })
            .map_err(|e| {
                warn!("WS: handler registration at {} failed: {e}", config.ws_path);
                TransportError::BindFailed
            })?;

        self.server = Some(server);
        info!("WS: listening on :{}{}", config.ws_port, config.ws_path);
        Ok(())
    }

    fn unbind(&mut self) {
        // Dropping the server stops httpd and unregisters the handler.
        if self.server.take().is_some() {
            *lock(&self.sender) = None;
            info!("WS: listener closed");
        }
    }

    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        let mut guard = lock(&self.sender);
        let Some(sender) = guard.as_mut() else {
            return Err(TransportError::NoPeer);
        };
        sender
            .send(FrameType::Text(false), text.as_bytes())
            .map_err(|e| {
                warn!("WS: send failed: {e}");
                TransportError::SendFailed
            })
    }
}

// ───────────────────────────────────────────────────────────────
// Host loopback
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct WsServer {
    handler: Mutex<Option<Arc<dyn WsEventHandler>>>,
    sent: Mutex<Vec<String>>,
    sim_fail_bind: bool,
    sim_fail_send: std::sync::atomic::AtomicBool,
    binds: u32,
}

#[cfg(not(target_os = "espidf"))]
impl WsServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `bind()` fail.
    pub fn failing_bind(mut self) -> Self {
        self.sim_fail_bind = true;
        self
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.sim_fail_send
            .store(fail, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn is_bound(&self) -> bool {
        lock(&self.handler).is_some()
    }

    pub fn binds(&self) -> u32 {
        self.binds
    }

    /// Text frames sent to the peer so far.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Deliver one event as the httpd task would.  Returns `false` when
    /// not bound.
    pub fn inject(&self, event: WsEvent<'_>) -> bool {
        // Clone out so the handler runs without our lock held.
        let handler = lock(&self.handler).clone();
        match handler {
            Some(h) => {
                h.handle(event);
                true
            }
            None => false,
        }
    }

    /// Deliver `data` as one message split into WebSocket frames of at
    /// most `frame_len` bytes.
    pub fn inject_message(&self, channel: Channel, data: &[u8], frame_len: usize) -> bool {
        let frame_len = frame_len.max(1);
        let mut stream = FrameStream::default();
        let mut chunks = data.chunks(frame_len).peekable();
        let Some(first) = chunks.next() else {
            return self.inject(WsEvent::Data(stream.start(channel, data, false)));
        };
        let first = stream.start(channel, first, chunks.peek().is_some());
        if !self.inject(WsEvent::Data(first)) {
            return false;
        }
        while let Some(chunk) = chunks.next() {
            let last = chunks.peek().is_none();
            if let Some(frag) = stream.next(chunk, last) {
                self.inject(WsEvent::Data(frag));
            }
        }
        true
    }
}

#[cfg(not(target_os = "espidf"))]
impl WsTransportPort for WsServer {
    fn bind(
        &mut self,
        config: &LinkConfig,
        handler: Arc<dyn WsEventHandler>,
    ) -> Result<(), TransportError> {
        if self.sim_fail_bind {
            return Err(TransportError::BindFailed);
        }
        *lock(&self.handler) = Some(handler);
        self.binds += 1;
        info!("WS(sim): bound :{}{}", config.ws_port, config.ws_path);
        Ok(())
    }

    fn unbind(&mut self) {
        if lock(&self.handler).take().is_some() {
            info!("WS(sim): unbound");
        }
    }

    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if self.sim_fail_send.load(std::sync::atomic::Ordering::Relaxed) {
            warn!("WS(sim): send failed");
            return Err(TransportError::SendFailed);
        }
        lock(&self.sent).push(text.to_owned());
        Ok(())
    }
}
