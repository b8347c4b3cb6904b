//! Frame decoders: one per message kind.
//!
//! Decoders are pure: they take a complete message and return a fresh
//! value or an error.  Publishing is the server's job.

pub mod fields;
pub mod nav;
pub mod phone;
pub mod tile;
pub mod vector;

pub use nav::{GmapsStep, Maneuver, NavStep, decode_gmaps, decode_nav};
pub use phone::{GpsFix, MediaState, PhoneNotification, decode_gps, decode_media, decode_notif};
pub use tile::{ImageJpegCodec, JpegCodec, PixelBlock, TileCanvas, decode_tile};
pub use vector::{Label, Point, Road, RoadClass, VecFrame};
