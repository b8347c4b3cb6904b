//! Integration tests: `MapsServer` start / stop lifecycle, peer tracking
//! and outbound media commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use navlink::adapters::ws_server::WsServer;
use navlink::app::events::LinkEvent;
use navlink::app::ports::{AccessPointPort, WsEvent, WsEventHandler};
use navlink::decode::ImageJpegCodec;
use navlink::error::{Error, TransportError};
use navlink::protocol::{Channel, Fragment, MediaCommand};
use navlink::ServerState;

use super::mock_link::{self, ApCall, MockAp, SlowCodec};

// ── start() ───────────────────────────────────────────────────

#[test]
fn start_brings_up_ap_then_listener() {
    let (mut server, _, log) = mock_link::server();
    assert_eq!(server.state(), ServerState::Stopped);

    server.start().unwrap();

    assert!(server.is_running());
    assert!(server.access_point().is_up());
    assert!(server.transport().is_bound());
    assert!(log.contains(&LinkEvent::Started { port: 8080 }));
}

#[test]
fn start_while_running_is_noop() {
    let (mut server, _, _) = mock_link::server();
    server.start().unwrap();
    server.start().unwrap();

    assert_eq!(server.access_point().starts(), 1);
    assert_eq!(server.transport().binds(), 1);
    assert_eq!(server.state(), ServerState::Running);
}

#[test]
fn ap_failure_leaves_server_stopped() {
    let (mut server, _, _) = mock_link::server_with(
        MockAp::failing(),
        WsServer::new(),
        Box::new(ImageJpegCodec::default()),
    );

    let err = server.start().unwrap_err();

    assert_eq!(err, Error::Transport(TransportError::ApStartFailed));
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(!server.transport().is_bound());
    assert_eq!(server.transport().binds(), 0);
}

#[test]
fn bind_failure_tears_ap_down() {
    let (mut server, _, _) = mock_link::server_with(
        MockAp::new(),
        WsServer::new().failing_bind(),
        Box::new(ImageJpegCodec::default()),
    );

    let err = server.start().unwrap_err();

    assert_eq!(err, Error::Transport(TransportError::BindFailed));
    assert_eq!(server.state(), ServerState::Stopped);
    assert_eq!(server.access_point().calls, vec![ApCall::Start, ApCall::Stop]);
    assert!(!server.access_point().is_up());
    assert!(!server.core().is_accepting());
    assert!(!server.core().buffers_allocated());
}

// ── stop() ────────────────────────────────────────────────────

#[test]
fn stop_releases_everything() {
    let (mut server, _, log) = mock_link::connected();
    server
        .transport()
        .inject_message(Channel::Text, br#"{"t":"gps","spd":12}"#, 8);
    assert!(server.has_peer());
    assert!(server.core().buffers_allocated());

    server.stop();

    assert_eq!(server.state(), ServerState::Stopped);
    assert!(!server.transport().is_bound());
    assert!(!server.access_point().is_up());
    assert!(!server.has_peer());
    assert!(!server.core().buffers_allocated());
    assert_eq!(log.events().last(), Some(&LinkEvent::Stopped));
}

#[test]
fn stop_while_stopped_is_noop() {
    let (mut server, _, log) = mock_link::server();
    server.stop();
    assert!(server.access_point().calls.is_empty());
    assert!(log.events().is_empty());
}

#[test]
fn events_after_stop_are_ignored() {
    let (mut server, slots, _) = mock_link::connected();
    let core = Arc::clone(server.core());
    server.stop();

    // The transport is unbound; a late delivery straight into the core
    // must not touch any state either.
    assert!(!server.transport().inject(WsEvent::Connected));
    core.handle(WsEvent::Data(Fragment::whole(
        Channel::Text,
        br#"{"t":"nav","step":"late"}"#,
    )));

    assert!(!core.has_peer());
    assert!(slots.nav.take().is_none());
    assert!(!core.buffers_allocated());
}

#[test]
fn restart_after_stop() {
    let (mut server, slots, _) = mock_link::server();
    server.start().unwrap();
    server.stop();
    server.start().unwrap();

    assert_eq!(server.access_point().starts(), 2);
    assert_eq!(server.transport().binds(), 2);
    server
        .transport()
        .inject_message(Channel::Text, br#"{"t":"nav","step":"again"}"#, 64);
    assert_eq!(slots.nav.take().unwrap().step.as_str(), "again");
}

#[test]
fn stop_waits_for_in_flight_handler() {
    let entered = Arc::new(AtomicBool::new(false));
    let (mut server, slots, _) = mock_link::server_with(
        MockAp::new(),
        WsServer::new(),
        Box::new(SlowCodec {
            delay: Duration::from_millis(150),
            entered: Arc::clone(&entered),
        }),
    );
    server.start().unwrap();

    let jpeg = mock_link::solid_jpeg(16, 16, [0, 255, 0]);
    let core = Arc::clone(server.core());
    let worker = thread::spawn(move || {
        core.handle(WsEvent::Data(Fragment::whole(Channel::Binary, &jpeg)));
    });
    while !entered.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    assert_eq!(server.core().in_flight(), 1);

    server.stop();

    // stop() returned only after the handler drained.
    assert_eq!(server.core().in_flight(), 0);
    assert!(!server.core().buffers_allocated());
    worker.join().unwrap();
    assert!(slots.tile_dirty());
}

// ── Peer flag ─────────────────────────────────────────────────

#[test]
fn peer_flag_tracks_latest_transition() {
    let (mut server, _, log) = mock_link::server();
    server.start().unwrap();
    let ws = server.transport();

    ws.inject(WsEvent::Connected);
    assert!(server.has_peer());
    ws.inject(WsEvent::Disconnected);
    assert!(!server.has_peer());
    ws.inject(WsEvent::Connected);
    assert!(server.has_peer());

    let peers: Vec<_> = log
        .events()
        .into_iter()
        .filter(|e| matches!(e, LinkEvent::PeerConnected | LinkEvent::PeerDisconnected))
        .collect();
    assert_eq!(
        peers,
        vec![
            LinkEvent::PeerConnected,
            LinkEvent::PeerDisconnected,
            LinkEvent::PeerConnected
        ]
    );
}

// ── Media commands ────────────────────────────────────────────

#[test]
fn media_command_requires_running_server() {
    let (mut server, _, _) = mock_link::server();
    assert_eq!(
        server.send_media_command(MediaCommand::Play),
        Err(Error::Transport(TransportError::NotRunning))
    );
}

#[test]
fn media_command_requires_peer() {
    let (mut server, _, _) = mock_link::server();
    server.start().unwrap();
    assert_eq!(
        server.send_media_command(MediaCommand::Next),
        Err(Error::Transport(TransportError::NoPeer))
    );
    assert!(server.transport().sent().is_empty());
}

#[test]
fn media_command_wire_format() {
    let (mut server, _, _) = mock_link::connected();
    server.send_media_command(MediaCommand::Prev).unwrap();
    server.send_media_command(MediaCommand::VolUp).unwrap();
    server
        .send_media_command(MediaCommand::toggle(true))
        .unwrap();

    assert_eq!(
        server.transport().sent(),
        vec![
            r#"{"t":"media_cmd","cmd":"prev"}"#.to_string(),
            r#"{"t":"media_cmd","cmd":"vol_up"}"#.to_string(),
            r#"{"t":"media_cmd","cmd":"pause"}"#.to_string(),
        ]
    );
}

#[test]
fn media_command_send_failure_reported() {
    let (mut server, _, _) = mock_link::connected();
    server.transport().set_fail_send(true);
    assert_eq!(
        server.send_media_command(MediaCommand::Pause),
        Err(Error::Transport(TransportError::SendFailed))
    );
}

// ── Multiple instances ────────────────────────────────────────

#[test]
fn two_servers_are_independent() {
    let (mut a, slots_a, _) = mock_link::server();
    let (mut b, slots_b, _) = mock_link::server();
    a.start().unwrap();
    b.start().unwrap();

    a.transport()
        .inject_message(Channel::Text, br#"{"t":"nav","step":"only A"}"#, 5);
    a.transport().inject(WsEvent::Connected);

    assert_eq!(slots_a.nav.take().unwrap().step.as_str(), "only A");
    assert!(slots_b.nav.take().is_none());
    assert!(a.has_peer());
    assert!(!b.has_peer());

    a.stop();
    assert!(b.is_running());
}
