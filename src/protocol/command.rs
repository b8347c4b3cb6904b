//! Outbound commands sent to the connected phone.
//!
//! Wire form: `{"t":"media_cmd","cmd":"<prev|play|pause|next|vol_up|vol_down>"}`

extern crate alloc;
use alloc::string::String;

use serde::Serialize;

/// Media transport commands the phone app understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCommand {
    Prev,
    Play,
    Pause,
    Next,
    VolUp,
    VolDown,
}

#[derive(Serialize)]
struct Envelope {
    t: &'static str,
    cmd: MediaCommand,
}

impl MediaCommand {
    /// Play or pause depending on the last known playback state.
    pub fn toggle(playing: bool) -> Self {
        if playing { Self::Pause } else { Self::Play }
    }

    /// JSON text frame for this command.
    pub fn to_json(self) -> String {
        // Serialising a unit enum and a static str cannot fail.
        serde_json::to_string(&Envelope {
            t: "media_cmd",
            cmd: self,
        })
        .unwrap_or_default()
    }
}
