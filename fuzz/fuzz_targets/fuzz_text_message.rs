//! Fuzz target: text message classification and decoding
//!
//! Runs the classifier over arbitrary UTF-8 and, whatever it says, every
//! JSON decoder as well.
//!
//! Invariants checked:
//! - No panics under any input
//! - Fixed-capacity fields never exceed their bounds
//! - Media volume stays within 0..=100
//!
//! cargo fuzz run fuzz_text_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use navlink::decode::{self, vector};
use navlink::protocol::classify;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let _ = classify(text);

    if let Ok(f) = vector::decode(text) {
        assert!(f.roads.len() <= vector::MAX_ROADS);
        assert!(f.roads.iter().all(|r| !r.points.is_empty()));
        assert!(f.route.len() <= vector::MAX_ROUTE_POINTS);
        assert!(f.labels.len() <= vector::MAX_LABELS);
    }
    if let Ok(n) = decode::decode_nav(text) {
        assert!(n.step.len() <= decode::nav::NAV_STEP_LEN);
    }
    if let Ok(g) = decode::decode_gmaps(text) {
        assert!(g.street.len() <= decode::nav::GMAPS_STREET_LEN);
    }
    if let Ok(m) = decode::decode_media(text) {
        assert!(m.volume <= 100, "volume {} out of range", m.volume);
    }
    let _ = decode::decode_gps(text);
    let _ = decode::decode_notif(text);
});
