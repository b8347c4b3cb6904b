//! ESP32-NAV map link: device entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                    │
//! │   SoftAp (AccessPointPort)   WsServer (WsTransportPort)   │
//! │   ImageJpegCodec (JpegCodec) LogEventSink (EventSink)     │
//! │  ─────────────── Port Trait Boundary ────────────────     │
//! │   MapsServer ─▶ LinkCore ─▶ FrameSlots ─▶ Presenter       │
//! └───────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use navlink::adapters::softap::SoftAp;
use navlink::adapters::ws_server::WsServer;
use navlink::decode::{GmapsStep, GpsFix, ImageJpegCodec, MediaState, NavStep, PhoneNotification, TileCanvas, VecFrame};
use navlink::{FrameSlots, LinkConfig, MapsServer, Presenter};

/// Log link counters every this many UI ticks.
const STATS_EVERY_TICKS: u32 = 600;

/// Build-time override: `NAVLINK_CONFIG_JSON='{"ap_ssid":"..."}'`.
fn load_config() -> LinkConfig {
    let Some(json) = option_env!("NAVLINK_CONFIG_JSON") else {
        return LinkConfig::default();
    };
    match LinkConfig::from_json(json.as_bytes()) {
        Ok(cfg) => {
            info!("Config: using build-time overrides");
            cfg
        }
        Err(e) => {
            warn!("Config: build-time overrides rejected ({e}), using defaults");
            LinkConfig::default()
        }
    }
}

fn register_ui(presenter: &mut Presenter) {
    presenter.on_tile(|_: &TileCanvas| info!("UI: tile redraw"));
    presenter.on_vector(|f: &VecFrame| {
        info!(
            "UI: map {} roads, {} route pts, heading {}",
            f.roads.len(),
            f.route.len(),
            f.heading
        );
    });
    presenter.on_nav(|n: &NavStep| info!("UI: {} · {} · {}", n.step, n.dist, n.eta));
    presenter.on_gps(|g: &GpsFix| info!("UI: {} km/h", g.speed_kmh));
    presenter.on_gmaps(|g: &GmapsStep| info!("UI: {:?} {} ({})", g.maneuver, g.street, g.dist));
    presenter.on_media(|m: &MediaState| {
        info!("UI: {} - {} [{}%]", m.title, m.artist, m.volume);
    });
    presenter.on_notification(|n: &PhoneNotification| info!("UI: [{}] {}: {}", n.app, n.title, n.text));
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ESP32-NAV link v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

    // ── 2. Radio ──────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;

    // ── 3. Link + presentation bridge ─────────────────────────
    let slots = Arc::new(FrameSlots::try_new()?);
    let mut server = MapsServer::new(
        config,
        SoftAp::new(wifi),
        WsServer::new(),
        Box::new(ImageJpegCodec::default()),
        Arc::clone(&slots),
    )?;
    let mut presenter = Presenter::new(slots);
    register_ui(&mut presenter);

    server.start()?;

    // ── 4. UI tick ────────────────────────────────────────────
    let mut ticks: u32 = 0;
    let mut waiting_logged = false;
    loop {
        presenter.tick();

        if !presenter.has_any_frame() && !waiting_logged {
            info!("UI: waiting for map data...");
            waiting_logged = true;
        }

        ticks = ticks.wrapping_add(1);
        if ticks % STATS_EVERY_TICKS == 0 {
            info!(
                "Link: peer={} stats={:?}",
                server.has_peer(),
                server.stats()
            );
        }
        thread::sleep(tick);
    }
}
