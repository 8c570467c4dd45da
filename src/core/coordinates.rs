//! Coordinate recovery and validation for the map-based tools.

use crate::domain::model::{CanonicalField, Record};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Raw columns that sometimes hold both coordinates at once.
const COMBINED_COLUMNS: &[&str] = &[
    "location",
    "coordinates",
    "geometry",
    "geo_location",
    "geolocation",
    "point",
    "the_geom",
    "latlng",
    "lat_lng",
];

static WKT_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^POINT\s*\(\s*(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)\s*\)$")
        .expect("WKT point pattern is valid")
});

static LAT_LNG_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(?\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*\)?$")
        .expect("lat/lng pair pattern is valid")
});

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a combined location value into `(lat, lng)`.
///
/// Accepts `"lat, lng"`, `"(lat, lng)"`, WKT `POINT (lng lat)`, a `GeoJSON`
/// point object, or an object with `latitude`/`longitude` keys.
pub fn parse_combined(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Some(caps) = WKT_POINT.captures(s) {
                let lng = caps[1].parse().ok()?;
                let lat = caps[2].parse().ok()?;
                return Some((lat, lng));
            }
            let caps = LAT_LNG_PAIR.captures(s)?;
            Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
        }
        Value::Object(obj) => {
            // GeoJSON: {"type":"Point","coordinates":[lng, lat]}
            if let Some(coords) = obj.get("coordinates").and_then(Value::as_array) {
                let lng = number_of(coords.first()?)?;
                let lat = number_of(coords.get(1)?)?;
                return Some((lat, lng));
            }
            let lat = obj.get("latitude").or_else(|| obj.get("lat"))?;
            let lng = obj
                .get("longitude")
                .or_else(|| obj.get("lng"))
                .or_else(|| obj.get("lon"))?;
            Some((number_of(lat)?, number_of(lng)?))
        }
        _ => None,
    }
}

/// Fills missing latitude/longitude from a combined location column of the
/// raw record. Returns true when coordinates were recovered.
pub fn recover_coordinates(record: &mut Record, raw: &Record) -> bool {
    let lat_key = CanonicalField::Latitude.as_str();
    let lng_key = CanonicalField::Longitude.as_str();
    if record.contains_key(lat_key) && record.contains_key(lng_key) {
        return false;
    }

    let mut keys: Vec<&str> = raw.columns().collect();
    keys.sort_unstable();

    for column in COMBINED_COLUMNS {
        let Some(key) = keys.iter().find(|k| k.eq_ignore_ascii_case(column)) else {
            continue;
        };
        let Some((lat, lng)) = raw.get(key).and_then(parse_combined) else {
            continue;
        };
        let (Some(lat), Some(lng)) = (
            serde_json::Number::from_f64(lat),
            serde_json::Number::from_f64(lng),
        ) else {
            continue;
        };
        tracing::trace!("Recovered coordinates from column '{}'", key);
        record.insert(lat_key, Value::Number(lat));
        record.insert(lng_key, Value::Number(lng));
        return true;
    }

    false
}

/// Returns `(lat, lng)` when both are numeric, in range and non-zero.
pub fn valid_coordinates(record: &Record) -> Option<(f64, f64)> {
    let lat = record.get(CanonicalField::Latitude.as_str())?.as_f64()?;
    let lng = record.get(CanonicalField::Longitude.as_str())?.as_f64()?;
    if lat == 0.0 || lng == 0.0 {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some((lat, lng))
}

/// Drops the coordinate pair unless both values are usable.
pub fn discard_invalid_coordinates(record: &mut Record) {
    let lat_key = CanonicalField::Latitude.as_str();
    let lng_key = CanonicalField::Longitude.as_str();
    let present = record.contains_key(lat_key) || record.contains_key(lng_key);
    if present && valid_coordinates(record).is_none() {
        tracing::debug!(
            "Discarding unusable coordinates {:?}/{:?}",
            record.get(lat_key),
            record.get(lng_key)
        );
        record.data.remove(lat_key);
        record.data.remove(lng_key);
    }
}
