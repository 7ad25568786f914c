//! Geographic coordinates and great-circle distance

use serde::Serialize;

/// Earth radius used for all distance calculations (spherical model), in meters
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Replace each zero-valued axis with the corresponding axis of `fallback`
    ///
    /// A zero latitude or longitude in a descriptor means "where the device was
    /// when the session started".
    pub fn or_axes_of(&self, fallback: &GeoCoordinate) -> GeoCoordinate {
        GeoCoordinate {
            latitude: if self.latitude == 0.0 {
                fallback.latitude
            } else {
                self.latitude
            },
            longitude: if self.longitude == 0.0 {
                fallback.longitude
            } else {
                self.longitude
            },
        }
    }

    /// Great-circle distance to another coordinate, in meters
    pub fn distance_to(&self, other: &GeoCoordinate) -> f64 {
        distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine distance in meters between two lat/lon pairs given in degrees
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}
