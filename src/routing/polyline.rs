//! Encoded polyline format (precision 5), as consumed by map SDKs.

use crate::domain::Coordinate;

const PRECISION: f64 = 1e5;

fn push_value(out: &mut String, delta: i64) {
    let mut value = delta << 1;
    if delta < 0 {
        value = !value;
    }
    while value >= 0x20 {
        let chunk = u8::try_from((value & 0x1f) | 0x20).unwrap_or(0) + 63;
        out.push(char::from(chunk));
        value >>= 5;
    }
    let last = u8::try_from(value).unwrap_or(0) + 63;
    out.push(char::from(last));
}

/// Encodes `points` into a polyline string.
#[must_use]
pub fn encode(points: &[Coordinate]) -> String {
    let mut out = String::new();
    let (mut prev_lat, mut prev_lng) = (0_i64, 0_i64);
    for point in points {
        let lat = (point.latitude * PRECISION).round() as i64;
        let lng = (point.longitude * PRECISION).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }
    out
}
