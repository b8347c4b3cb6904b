//! Integration tests: frames from the socket all the way to the UI tick.
//!
//! transport frames → reassembly → classify → decode → slots → Presenter

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use navlink::Presenter;
use navlink::adapters::ws_server::WsServer;
use navlink::app::events::{FrameKind, LinkEvent};
use navlink::decode::vector::HEADING_UNKNOWN;
use navlink::decode::{Maneuver, NavStep, PhoneNotification, Point, RoadClass, TileCanvas};
use navlink::app::ports::{WsEvent, WsEventHandler};
use navlink::protocol::{Channel, Fragment};

use super::mock_link::{self, MockAp, SlowCodec};

const MINIMAL_VEC: &[u8] = br#"{"t":"vec","roads":[{"w":2,"p":[[10,20],[30,40]]}],"route":[[5,5],[50,50]],"labels":[],"pos":[25,30],"hdg":90}"#;

// ── Vector frames ─────────────────────────────────────────────

#[test]
fn minimal_vector_frame_reaches_ui() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    assert!(!ui.has_any_frame());

    server
        .transport()
        .inject_message(Channel::Text, MINIMAL_VEC, MINIMAL_VEC.len());
    let report = ui.tick();

    assert!(report.vector);
    assert!(ui.has_any_frame());
    let f = ui.vector().unwrap();
    assert_eq!(f.roads.len(), 1);
    assert_eq!(f.roads[0].class, RoadClass::Medium);
    assert_eq!(f.roads[0].points.as_slice(), &[Point::new(10, 20), Point::new(30, 40)]);
    assert_eq!(f.route.len(), 2);
    assert!(f.labels.is_empty());
    assert_eq!(f.pos, Point::new(25, 30));
    assert_eq!(f.heading, 90);
}

#[test]
fn vector_frame_split_across_websocket_frames() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);

    server.transport().inject_message(Channel::Text, MINIMAL_VEC, 7);
    ui.tick();

    assert_eq!(ui.vector().unwrap().pos, Point::new(25, 30));
    assert_eq!(server.stats().text_messages, 1);
}

#[test]
fn missing_heading_reaches_ui_as_unknown() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);

    server
        .transport()
        .inject_message(Channel::Text, br#"{"t":"vec","pos":[1,1]}"#, 64);
    ui.tick();

    assert_eq!(ui.vector().unwrap().heading, HEADING_UNKNOWN);
}

#[test]
fn failed_decode_keeps_previous_frame() {
    let (server, slots, log) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let ws = server.transport();

    ws.inject_message(Channel::Text, MINIMAL_VEC, 64);
    ui.tick();
    let before = ui.vector().unwrap().clone();
    ws.inject_message(Channel::Text, br#"{"t":"vec","roads":[{"w":2,"p":[[1,2]"#, 64);
    let report = ui.tick();

    assert!(!report.vector);
    assert_eq!(ui.vector().unwrap(), &before);
    assert_eq!(server.stats().decode_errors, 1);
    assert!(log.events().iter().any(|e| matches!(
        e,
        LinkEvent::Rejected {
            channel: Channel::Text,
            ..
        }
    )));
}

// ── Classification ────────────────────────────────────────────

#[test]
fn classifier_routes_each_kind() {
    let (server, slots, log) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let ws = server.transport();

    let messages: [&[u8]; 4] = [
        br#"{"t":"vec","pos":[0,0]}"#,
        br#"{"t":"nav","step":"Gira a la derecha","dist":"200 m","eta":"3 min"}"#,
        br#"{"t":"gps","spd":88}"#,
        br#"{"t":"foo","step":"ignored"}"#,
    ];
    for msg in messages {
        ws.inject_message(Channel::Text, msg, 256);
    }
    let report = ui.tick();

    assert!(report.vector && report.nav && report.gps);
    assert!(!report.gmaps && !report.media);
    assert_eq!(ui.nav().unwrap().step.as_str(), "Gira a la derecha");
    assert_eq!(ui.gps().unwrap().speed_kmh, 88);
    assert_eq!(server.stats().ignored_messages, 1);
    assert!(log.contains(&LinkEvent::Ignored));
}

#[test]
fn label_named_like_a_tag_does_not_misroute() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);

    server.transport().inject_message(
        Channel::Text,
        br#"{"labels":[{"p":[1,1],"n":"\"t\":\"vec\""}],"t":"nav","step":"ok"}"#,
        256,
    );
    let report = ui.tick();

    assert!(report.nav);
    assert!(!report.vector);
}

#[test]
fn phone_companion_kinds() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let ws = server.transport();

    ws.inject_message(
        Channel::Text,
        br#"{"t":"gmaps","step":"Toma la salida","street":"M-30","dist":"1 km","eta":"9 min","maneuver":"roundabout-left"}"#,
        32,
    );
    ws.inject_message(
        Channel::Text,
        br#"{"t":"media","app":"Spotify","title":"Song","artist":"Band","playing":true,"vol":40}"#,
        32,
    );
    ui.tick();

    let g = ui.gmaps().unwrap();
    assert_eq!(g.street.as_str(), "M-30");
    assert_eq!(g.maneuver, Maneuver::Roundabout);
    let m = ui.media().unwrap();
    assert!(m.playing);
    assert_eq!(m.volume, 40);
}

// ── Coalescing and queues ─────────────────────────────────────

#[test]
fn latest_nav_wins_between_ticks() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    ui.on_nav(move |n: &NavStep| sink.lock().unwrap().push(n.step.to_string()));

    let ws = server.transport();
    ws.inject_message(Channel::Text, br#"{"t":"nav","step":"one"}"#, 64);
    ws.inject_message(Channel::Text, br#"{"t":"nav","step":"two"}"#, 64);
    ui.tick();
    ui.tick();

    assert_eq!(*seen.lock().unwrap(), vec!["two".to_string()]);
}

#[test]
fn notification_overflow_counted() {
    let (server, slots, log) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let got = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&got);
    ui.on_notification(move |n: &PhoneNotification| sink.lock().unwrap().push(n.title.to_string()));

    for i in 0..6 {
        let msg = format!(r#"{{"t":"notif","app":"Chat","title":"m{i}","text":"hola"}}"#);
        server
            .transport()
            .inject_message(Channel::Text, msg.as_bytes(), 64);
    }
    ui.tick();

    assert_eq!(*got.lock().unwrap(), vec!["m0", "m1", "m2", "m3"]);
    assert_eq!(server.stats().notifications_dropped, 2);
    assert_eq!(server.stats().frames_published, 4);
    assert!(log.contains(&LinkEvent::NotificationDropped));
}

// ── Binary tiles ──────────────────────────────────────────────

#[test]
fn fragmented_jpeg_tile_drawn_on_canvas() {
    let (server, slots, log) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let centre = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&centre);
    ui.on_tile(move |c: &TileCanvas| *sink.lock().unwrap() = c.pixel(32, 32));

    let jpeg = mock_link::solid_jpeg(64, 64, [255, 255, 255]);
    server.transport().inject_message(Channel::Binary, &jpeg, 100);
    let report = ui.tick();

    assert!(report.tile);
    assert!(ui.has_any_frame());
    let px = centre.lock().unwrap().unwrap();
    assert!(px >> 11 >= 30, "red bits of {px:#06x}");
    assert!(px & 0x1F >= 30, "blue bits of {px:#06x}");
    assert!(log.contains(&LinkEvent::FramePublished(FrameKind::Tile)));
}

#[test]
fn oversized_binary_rejected_in_small_fragments() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(Arc::clone(&slots));

    let blob = vec![0xAB; 300 * 1024];
    server.transport().inject_message(Channel::Binary, &blob, 1024);
    let report = ui.tick();

    assert!(!report.tile);
    let stats = server.stats();
    assert_eq!(stats.binary_messages, 0);
    assert_eq!(stats.protocol_errors, 1);

    // The channel recovers with the next message.
    let jpeg = mock_link::solid_jpeg(8, 8, [0, 0, 0]);
    server.transport().inject_message(Channel::Binary, &jpeg, 512);
    assert!(ui.tick().tile);
}

#[test]
fn text_and_binary_channels_are_independent() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);
    let ws = server.transport();

    let jpeg = mock_link::solid_jpeg(16, 16, [10, 200, 10]);
    let (head, tail) = jpeg.split_at(jpeg.len() / 2);

    // Binary message half-delivered, a full text message in between.
    use navlink::adapters::ws_server::FrameStream;
    use navlink::app::ports::WsEvent;
    let mut stream = FrameStream::default();
    ws.inject(WsEvent::Data(stream.start(Channel::Binary, head, true)));
    ws.inject_message(Channel::Text, br#"{"t":"gps","spd":5}"#, 4);
    ws.inject(WsEvent::Data(stream.next(tail, true).unwrap()));

    let report = ui.tick();
    assert!(report.tile);
    assert!(report.gps);
    assert_eq!(server.stats().protocol_errors, 0);
}

#[test]
fn corrupt_jpeg_publishes_nothing() {
    let (server, slots, _) = mock_link::connected();
    let mut ui = Presenter::new(slots);

    server
        .transport()
        .inject_message(Channel::Binary, b"\xFF\xD8\xFF\xE0 not really a jpeg", 8);

    assert!(!ui.tick().tile);
    assert!(!ui.has_any_frame());
    assert_eq!(server.stats().decode_errors, 1);
}

#[test]
fn tick_does_not_wait_for_tile_decode() {
    let entered = Arc::new(AtomicBool::new(false));
    let (mut server, slots, _) = mock_link::server_with(
        MockAp::new(),
        WsServer::new(),
        Box::new(SlowCodec {
            delay: Duration::from_millis(300),
            entered: Arc::clone(&entered),
        }),
    );
    server.start().unwrap();
    assert!(server.transport().inject(WsEvent::Connected));
    let mut ui = Presenter::new(Arc::clone(&slots));
    let seen = Arc::new(Mutex::new(0u32));
    let sink = Arc::clone(&seen);
    ui.on_tile(move |_: &TileCanvas| *sink.lock().unwrap() += 1);

    // A previously decoded tile is waiting to be shown.
    slots.mark_tile();

    let jpeg = mock_link::solid_jpeg(16, 16, [0, 0, 255]);
    let core = Arc::clone(server.core());
    let worker = thread::spawn(move || {
        core.handle(WsEvent::Data(Fragment::whole(Channel::Binary, &jpeg)));
    });
    while !entered.load(Ordering::SeqCst) {
        thread::yield_now();
    }

    let started = Instant::now();
    let report = ui.tick();
    let waited = started.elapsed();

    assert!(report.tile);
    assert!(waited < Duration::from_millis(50), "tick blocked for {waited:?}");

    worker.join().unwrap();
    assert!(ui.tick().tile);
    assert_eq!(*seen.lock().unwrap(), 2);
}
