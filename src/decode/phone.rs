//! Phone companion messages: GPS fix, now-playing media state and
//! notifications.

use log::debug;

use super::fields;
use crate::error::DecodeError;

pub const MEDIA_APP_LEN: usize = 24;
pub const MEDIA_TITLE_LEN: usize = 48;
pub const MEDIA_ARTIST_LEN: usize = 32;

pub const NOTIF_APP_LEN: usize = 24;
pub const NOTIF_TITLE_LEN: usize = 32;
pub const NOTIF_TEXT_LEN: usize = 60;

/// `{"t":"gps","spd":42,"lat":40.41,"lon":-3.70}`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpsFix {
    /// Ground speed, km/h.
    pub speed_kmh: i32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub fn decode_gps(text: &str) -> Result<GpsFix, DecodeError> {
    let obj = fields::parse_object(text)?;
    let speed = fields::int_field(&obj, "spd").unwrap_or(0);
    Ok(GpsFix {
        speed_kmh: speed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        lat: obj.get("lat").and_then(serde_json::Value::as_f64),
        lon: obj.get("lon").and_then(serde_json::Value::as_f64),
    })
}

/// `{"t":"media","app":"..","title":"..","artist":"..","playing":true,"vol":75}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaState {
    pub app: heapless::String<MEDIA_APP_LEN>,
    pub title: heapless::String<MEDIA_TITLE_LEN>,
    pub artist: heapless::String<MEDIA_ARTIST_LEN>,
    pub playing: bool,
    /// Volume percent, 0-100.
    pub volume: u8,
}

pub fn decode_media(text: &str) -> Result<MediaState, DecodeError> {
    let obj = fields::parse_object(text)?;
    let media = MediaState {
        app: fields::str_field(&obj, "app"),
        title: fields::str_field(&obj, "title"),
        artist: fields::str_field(&obj, "artist"),
        playing: fields::bool_field(&obj, "playing").unwrap_or(false),
        volume: fields::int_field(&obj, "vol").unwrap_or(0).clamp(0, 100) as u8,
    };
    debug!(
        "Maps: media '{}' - '{}' playing={}",
        media.title, media.artist, media.playing
    );
    Ok(media)
}

/// `{"t":"notif","app":"..","title":"..","text":".."}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneNotification {
    pub app: heapless::String<NOTIF_APP_LEN>,
    pub title: heapless::String<NOTIF_TITLE_LEN>,
    pub text: heapless::String<NOTIF_TEXT_LEN>,
}

pub fn decode_notif(text: &str) -> Result<PhoneNotification, DecodeError> {
    let obj = fields::parse_object(text)?;
    Ok(PhoneNotification {
        app: fields::str_field(&obj, "app"),
        title: fields::str_field(&obj, "title"),
        text: fields::str_field(&obj, "text"),
    })
}
