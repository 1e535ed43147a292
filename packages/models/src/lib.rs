#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the spot coordinate correction job.
//!
//! This crate contains only data types and simple conversions. It has no
//! network or filesystem dependencies, so both the geocoder and the
//! correction pipeline can depend on it.

pub mod progress;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePair {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl CoordinatePair {
    /// Creates a new pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether this pair is the `(0, 0)` placeholder used for records that
    /// were never geocoded.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// Whether both components are within the valid WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for CoordinatePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Rectangular latitude/longitude range used to reject implausible
/// coordinate matches. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingWindow {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingWindow {
    /// Peninsular and East Malaysia, with some margin.
    pub const MALAYSIA: Self = Self {
        min_lat: 0.0,
        max_lat: 10.0,
        min_lng: 99.0,
        max_lng: 120.0,
    };

    /// The whole globe. Accepts any valid coordinate.
    pub const WORLD: Self = Self {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lng: -180.0,
        max_lng: 180.0,
    };

    /// Returns `true` if `pair` lies inside the window (edges included).
    #[must_use]
    pub fn contains(&self, pair: CoordinatePair) -> bool {
        (self.min_lat..=self.max_lat).contains(&pair.latitude)
            && (self.min_lng..=self.max_lng).contains(&pair.longitude)
    }

    /// Returns `true` if the bounds are ordered and within WGS84 ranges.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lng <= self.max_lng
            && CoordinatePair::new(self.min_lat, self.min_lng).is_valid()
            && CoordinatePair::new(self.max_lat, self.max_lng).is_valid()
    }
}

impl Default for BoundingWindow {
    fn default() -> Self {
        Self::MALAYSIA
    }
}

/// A record in the source collection could not be interpreted.
#[derive(Debug, thiserror::Error)]
#[error("record {index} is not a JSON object")]
pub struct InvalidRecordError {
    /// Position of the offending element in the collection.
    pub index: usize,
}

/// One named point from the spots collection.
///
/// The full original JSON object is kept in `payload` so that fields this
/// job does not understand survive the round trip unchanged. Only
/// `latitude` and `longitude` are ever written back.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    /// Position in the source collection.
    pub id: usize,
    /// Display name (`google_maps_data.place_name`, else `name`).
    pub name: String,
    /// Free-text address (`google_maps_data.address`, else `address`).
    pub address: String,
    /// Currently stored coordinates. Missing fields read as `0`.
    pub coordinates: CoordinatePair,
    payload: Map<String, Value>,
}

impl LocationRecord {
    /// Interprets one element of the source collection.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRecordError`] if `value` is not a JSON object.
    pub fn from_value(id: usize, value: Value) -> Result<Self, InvalidRecordError> {
        let Value::Object(payload) = value else {
            return Err(InvalidRecordError { index: id });
        };

        let nested = payload.get("google_maps_data");
        let text = |nested_key: &str, top_key: &str| {
            nested
                .and_then(|n| n.get(nested_key))
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| payload.get(top_key).and_then(Value::as_str))
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        let name = text("place_name", "name");
        let address = text("address", "address");

        let number = |key: &str| payload.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let coordinates = CoordinatePair::new(number("latitude"), number("longitude"));

        Ok(Self {
            id,
            name,
            address,
            coordinates,
            payload,
        })
    }

    /// The text used to look this record up: the display name. Records
    /// without one have nothing to search for.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|s| !s.is_empty())
    }

    /// Overwrites the stored coordinates, in both the typed view and the
    /// underlying payload.
    pub fn set_coordinates(&mut self, pair: CoordinatePair) {
        self.coordinates = pair;
        self.payload
            .insert("latitude".to_string(), Value::from(pair.latitude));
        self.payload
            .insert("longitude".to_string(), Value::from(pair.longitude));
    }

    /// Converts back to the JSON object, with every original field intact.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}

/// A coordinate change applied during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    /// Record position in the collection.
    pub index: usize,
    /// Display name of the record.
    pub name: String,
    /// Coordinates before the run.
    pub old_coords: CoordinatePair,
    /// Coordinates written by the run.
    pub new_coords: CoordinatePair,
    /// Great-circle distance between the two, in kilometres.
    pub distance_km: f64,
}

/// Outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records in the loaded collection.
    pub total: usize,
    /// Records whose coordinates were overwritten.
    pub corrected: usize,
    /// Records resolved within the threshold and left alone.
    pub unchanged: usize,
    /// Records whose lookup failed or found nothing.
    pub failed: usize,
    /// Records excluded before lookup (no name or unset coordinates).
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_place_name_and_address() {
        let value = serde_json::json!({
            "id": 7,
            "google_maps_data": {
                "place_name": " Bukit Tinggi ",
                "address": "Bentong, Pahang"
            },
            "latitude": 3.35,
            "longitude": 101.82
        });
        let record = LocationRecord::from_value(7, value).unwrap();
        assert_eq!(record.name, "Bukit Tinggi");
        assert_eq!(record.address, "Bentong, Pahang");
        assert_eq!(record.coordinates, CoordinatePair::new(3.35, 101.82));
        assert_eq!(record.query(), Some("Bukit Tinggi"));
    }

    #[test]
    fn falls_back_to_top_level_fields() {
        let value = serde_json::json!({
            "name": "Pantai Cenang",
            "address": "Langkawi",
            "latitude": 6.29,
            "longitude": 99.72
        });
        let record = LocationRecord::from_value(0, value).unwrap();
        assert_eq!(record.name, "Pantai Cenang");
        assert_eq!(record.address, "Langkawi");
    }

    #[test]
    fn address_alone_is_not_a_query() {
        let value = serde_json::json!({
            "google_maps_data": { "place_name": "", "address": "Jalan Alor, Kuala Lumpur" }
        });
        let record = LocationRecord::from_value(0, value).unwrap();
        assert_eq!(record.address, "Jalan Alor, Kuala Lumpur");
        assert_eq!(record.query(), None);
        assert!(record.coordinates.is_unset());
    }

    #[test]
    fn rejects_non_object_elements() {
        let err = LocationRecord::from_value(3, serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.index, 3);
    }

    #[test]
    fn set_coordinates_preserves_other_fields_and_order() {
        let value = serde_json::json!({
            "id": 1,
            "latitude": 1.0,
            "description": "keep me",
            "longitude": 100.0,
            "tags": ["a", "b"]
        });
        let mut record = LocationRecord::from_value(0, value).unwrap();
        record.set_coordinates(CoordinatePair::new(5.5, 100.5));

        let out = record.to_value();
        assert_eq!(out["description"], "keep me");
        assert_eq!(out["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(out["latitude"], 5.5);
        assert_eq!(out["longitude"], 100.5);

        let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "latitude", "description", "longitude", "tags"]);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let window = BoundingWindow::MALAYSIA;
        assert!(window.contains(CoordinatePair::new(0.0, 99.0)));
        assert!(window.contains(CoordinatePair::new(10.0, 120.0)));
        assert!(!window.contains(CoordinatePair::new(-0.1, 100.0)));
        assert!(!window.contains(CoordinatePair::new(3.0, 120.5)));
    }

    #[test]
    fn detects_malformed_windows() {
        let inverted = BoundingWindow {
            min_lat: 10.0,
            max_lat: 0.0,
            ..BoundingWindow::MALAYSIA
        };
        assert!(!inverted.is_well_formed());
        assert!(BoundingWindow::WORLD.is_well_formed());
    }
}
