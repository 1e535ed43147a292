//! Great-circle distance between coordinate pairs.

use spot_coords_models::CoordinatePair;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between `a` and `b` in kilometres.
///
/// Always non-negative; `distance_km(p, p)` is exactly `0.0`.
#[must_use]
pub fn distance_km(a: CoordinatePair, b: CoordinatePair) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = ((d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Whether `new` is far enough from `old` to overwrite it.
#[must_use]
pub fn should_correct(old: CoordinatePair, new: CoordinatePair, threshold_km: f64) -> bool {
    distance_km(old, new) > threshold_km
}
