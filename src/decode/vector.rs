//! Vectorial map frame decoder.
//!
//! ```text
//! {"t":"vec",
//!  "roads":[{"w":2,"p":[[10,20],[30,40]]}, ...],
//!  "route":[[5,5],[50,50]],
//!  "labels":[{"p":[12,80],"n":"Calle Mayor"}],
//!  "pos":[160,240],
//!  "hdg":90}
//! ```
//!
//! Every list has a fixed capacity.  Elements past capacity are dropped
//! silently, keeping the first ones in document order.  The frame is
//! built from scratch each time and returned only when the JSON parses,
//! so a bad message can never half-overwrite the last good frame.
//!
//! A full frame is around 10 KB, so it is filled in place on the heap
//! rather than on the caller's (httpd task) stack.

use heapless::Vec;
use log::debug;
use serde_json::Value;

use super::fields::{self, Object};
use crate::error::DecodeError;

pub const MAX_ROADS: usize = 64;
pub const MAX_POINTS_PER_ROAD: usize = 32;
pub const MAX_ROUTE_POINTS: usize = 128;
pub const MAX_LABELS: usize = 16;
pub const LABEL_NAME_LEN: usize = 24;

/// Heading value meaning "no bearing available".
pub const HEADING_UNKNOWN: i16 = -1;

/// Screen-space point (portrait pixels, may lie off-screen).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Drawing weight of a road polyline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoadClass {
    #[default]
    Minor = 1,
    Medium = 2,
    Major = 3,
}

impl RoadClass {
    /// Unknown classes fall back to minor.
    pub fn from_wire(w: Option<i64>) -> Self {
        match w {
            Some(2) => Self::Medium,
            Some(3) => Self::Major,
            _ => Self::Minor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Road {
    pub class: RoadClass,
    pub points: Vec<Point, MAX_POINTS_PER_ROAD>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    pub pos: Point,
    pub name: heapless::String<LABEL_NAME_LEN>,
}

/// One complete map viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecFrame {
    pub roads: Vec<Road, MAX_ROADS>,
    pub route: Vec<Point, MAX_ROUTE_POINTS>,
    pub labels: Vec<Label, MAX_LABELS>,
    pub pos: Point,
    pub heading: i16,
}

impl Default for VecFrame {
    fn default() -> Self {
        Self {
            roads: Vec::new(),
            route: Vec::new(),
            labels: Vec::new(),
            pos: Point::default(),
            heading: HEADING_UNKNOWN,
        }
    }
}

impl VecFrame {
    pub fn has_heading(&self) -> bool {
        self.heading != HEADING_UNKNOWN
    }
}

/// Decode a complete `"t":"vec"` message.
pub fn decode(text: &str) -> Result<Box<VecFrame>, DecodeError> {
    let obj = fields::parse_object(text)?;
    let mut frame = Box::<VecFrame>::default();
    fill_frame(&mut frame, &obj);
    debug!(
        "Maps: vec roads={} route={} labels={} pos=({},{})",
        frame.roads.len(),
        frame.route.len(),
        frame.labels.len(),
        frame.pos.x,
        frame.pos.y
    );
    Ok(frame)
}

fn fill_frame(frame: &mut VecFrame, obj: &Object) {
    for road in array(obj.get("roads")) {
        if frame.roads.is_full() {
            break;
        }
        let Some(road) = road.as_object() else {
            continue;
        };
        let mut r = Road {
            class: RoadClass::from_wire(fields::int_field(road, "w")),
            points: Vec::new(),
        };
        fill_points(&mut r.points, road.get("p"));
        if !r.points.is_empty() {
            let _ = frame.roads.push(r);
        }
    }

    fill_points(&mut frame.route, obj.get("route"));

    for label in array(obj.get("labels")) {
        if frame.labels.is_full() {
            break;
        }
        let Some(label) = label.as_object() else {
            continue;
        };
        // A label without a usable position is skipped, not defaulted.
        let Some(pos) = point(label.get("p")) else {
            continue;
        };
        let _ = frame.labels.push(Label {
            pos,
            name: fields::str_field(label, "n"),
        });
    }

    if let Some(pos) = point(obj.get("pos")) {
        frame.pos = pos;
    }
    frame.heading = fields::int_field(obj, "hdg")
        .and_then(|h| i16::try_from(h).ok())
        .unwrap_or(HEADING_UNKNOWN);
}

fn array(v: Option<&Value>) -> &[Value] {
    v.and_then(Value::as_array).map(|a| a.as_slice()).unwrap_or(&[])
}

/// Append `[x,y]` pairs until `out` is full.  Entries that are not
/// two-element arrays are skipped.
fn fill_points<const N: usize>(out: &mut Vec<Point, N>, v: Option<&Value>) {
    for p in array(v) {
        if out.is_full() {
            break;
        }
        if let Some(pt) = point(Some(p)) {
            let _ = out.push(pt);
        }
    }
}

/// A `[x, y]` array.  Needs at least two elements; non-numeric
/// coordinates read as 0.
fn point(v: Option<&Value>) -> Option<Point> {
    let a = v?.as_array()?;
    if a.len() < 2 {
        return None;
    }
    let coord = |v: &Value| fields::saturate_i16(fields::as_int(v).unwrap_or(0));
    Some(Point::new(coord(&a[0]), coord(&a[1])))
}
