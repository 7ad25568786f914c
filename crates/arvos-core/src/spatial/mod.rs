//! Spatial primitives
//!
//! Geographic coordinates are f64 degrees; scene space is f32 meters with
//! X = east, Y = up, Z = north, centered on the device.

mod geodesic;
mod vector3;

pub use geodesic::{distance, GeoCoordinate, EARTH_RADIUS_M};
pub use vector3::Vector3;
