//! Coordinates, colors and decoding of the service's drawing geometry.
//!
//! Geometry inside `visualization_data` is `[lon, lat]` (GeoJSON order) and is
//! flipped here. Route coordinates are `[lat, lon]` and go through
//! [`LatLon::from_lat_lon`] untouched. The service makes no promise either
//! way, so both orders are kept exactly as received.

use crate::model::number_pair;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn from_lat_lon(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }

    #[cfg(test)]
    pub fn as_pair(self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// Axis-aligned lat/lon envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn enclosing(points: &[LatLon]) -> Option<Self> {
        let first = points.first()?;
        let init = Bounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(points.iter().fold(init, |b, p| Bounds {
            south: b.south.min(p.lat),
            west: b.west.min(p.lon),
            north: b.north.max(p.lat),
            east: b.east.max(p.lon),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const ROAD: Rgb = Rgb(0xcc, 0xcc, 0xcc);
    pub const START: Rgb = Rgb(0x2e, 0xcc, 0x71);
    pub const END: Rgb = Rgb(0xe7, 0x4c, 0x3c);
    pub const WAYPOINT: Rgb = Rgb(0xf3, 0x9c, 0x12);
    pub const ROUTE: Rgb = Rgb(0x34, 0x98, 0xdb);

    /// Parse `#rrggbb` or `#rgb`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        let channel = |i: usize, width: usize| {
            let v = u8::from_str_radix(hex.get(i * width..(i + 1) * width)?, 16).ok()?;
            Some(if width == 1 { v * 17 } else { v })
        };
        match hex.len() {
            6 => Some(Rgb(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            3 => Some(Rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            _ => None,
        }
    }
}

/// One road segment, already flipped to lat/lon.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub points: Vec<LatLon>,
    pub color: Option<Rgb>,
}

/// One point of interest, already flipped to lat/lon.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGeometry {
    pub at: LatLon,
    pub color: Option<Rgb>,
    pub label: Option<String>,
}

/// Accepts a feature (`geometry.coordinates`), a bare geometry
/// (`coordinates`) or the coordinate array itself.
fn coordinates(v: &Value) -> Option<&Value> {
    if v.is_array() {
        return Some(v);
    }
    v.pointer("/geometry/coordinates")
        .or_else(|| v.get("coordinates"))
}

fn property<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get("properties").and_then(|p| p.get(key))
}

fn color_of(v: &Value) -> Option<Rgb> {
    property(v, "color")
        .and_then(Value::as_str)
        .and_then(Rgb::parse_hex)
}

pub fn decode_edge(v: &Value) -> Option<EdgeGeometry> {
    let points: Vec<LatLon> = coordinates(v)?
        .as_array()?
        .iter()
        .map(|c| number_pair(c).map(LatLon::from_lon_lat))
        .collect::<Option<_>>()?;
    if points.len() < 2 {
        return None;
    }
    Some(EdgeGeometry {
        points,
        color: color_of(v),
    })
}

pub fn decode_point(v: &Value) -> Option<PointGeometry> {
    let at = number_pair(coordinates(v)?).map(LatLon::from_lon_lat)?;
    let label = ["popup", "label", "name"]
        .iter()
        .find_map(|k| property(v, k).and_then(Value::as_str))
        .map(str::to_string);
    Some(PointGeometry {
        at,
        color: color_of(v),
        label,
    })
}
