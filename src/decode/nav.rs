//! Navigation step decoders.
//!
//! Two sources feed turn-by-turn guidance:
//!
//! - `{"t":"nav","step":"..","dist":"..","eta":".."}` from the app's own
//!   router;
//! - `{"t":"gmaps","step":"..","street":"..","dist":"..","eta":"..","maneuver":".."}`
//!   relayed from Google Maps notifications.
//!
//! Every field is copied into a fixed-length buffer, truncated if longer
//! and empty if absent.

use log::debug;

use super::fields;
use crate::error::DecodeError;

pub const NAV_STEP_LEN: usize = 64;
pub const NAV_DIST_LEN: usize = 16;
pub const NAV_ETA_LEN: usize = 16;

pub const GMAPS_STEP_LEN: usize = 60;
pub const GMAPS_STREET_LEN: usize = 48;
pub const GMAPS_MANEUVER_LEN: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavStep {
    pub step: heapless::String<NAV_STEP_LEN>,
    pub dist: heapless::String<NAV_DIST_LEN>,
    pub eta: heapless::String<NAV_ETA_LEN>,
}

pub fn decode_nav(text: &str) -> Result<NavStep, DecodeError> {
    let obj = fields::parse_object(text)?;
    let step = NavStep {
        step: fields::str_field(&obj, "step"),
        dist: fields::str_field(&obj, "dist"),
        eta: fields::str_field(&obj, "eta"),
    };
    debug!("Maps: nav '{}' {} ETA {}", step.step, step.dist, step.eta);
    Ok(step)
}

/// Turn glyph to show next to a Google Maps step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Maneuver {
    #[default]
    Straight,
    Left,
    Right,
    UTurn,
    Roundabout,
    Arrive,
}

impl Maneuver {
    /// Classify a free-form maneuver id (`"turn-slight-left"`,
    /// `"roundabout-right"`, ...).  Order matters: a roundabout exit to
    /// the right is still a roundabout.
    pub fn classify(m: &str) -> Self {
        if m.contains("uturn") {
            Self::UTurn
        } else if m.contains("roundabout") {
            Self::Roundabout
        } else if m.contains("left") {
            Self::Left
        } else if m.contains("right") {
            Self::Right
        } else if m.contains("arrive") {
            Self::Arrive
        } else {
            Self::Straight
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GmapsStep {
    pub step: heapless::String<GMAPS_STEP_LEN>,
    pub street: heapless::String<GMAPS_STREET_LEN>,
    pub dist: heapless::String<NAV_DIST_LEN>,
    pub eta: heapless::String<NAV_ETA_LEN>,
    pub maneuver_raw: heapless::String<GMAPS_MANEUVER_LEN>,
    pub maneuver: Maneuver,
}

pub fn decode_gmaps(text: &str) -> Result<GmapsStep, DecodeError> {
    let obj = fields::parse_object(text)?;
    let maneuver_raw: heapless::String<GMAPS_MANEUVER_LEN> = fields::str_field(&obj, "maneuver");
    Ok(GmapsStep {
        step: fields::str_field(&obj, "step"),
        street: fields::str_field(&obj, "street"),
        dist: fields::str_field(&obj, "dist"),
        eta: fields::str_field(&obj, "eta"),
        maneuver: Maneuver::classify(&maneuver_raw),
        maneuver_raw,
    })
}
