//! Scene-space vector

use serde::Serialize;

/// A vector in scene space, in meters
///
/// Scene axes follow the renderer: X points east, Y up, Z north.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euler angles with only a rotation about the vertical axis
    pub fn yaw(degrees: f32) -> Self {
        Self::new(0.0, degrees, 0.0)
    }

    /// Linear interpolation toward `other`; `t` is clamped to [0, 1]
    pub fn lerp(&self, other: &Vector3, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaw() {
        assert_eq!(Vector3::yaw(90.0), Vector3::new(0.0, 90.0, 0.0));
    }

    #[test]
    fn test_lerp() {
        let a = Vector3::ZERO;
        let b = Vector3::new(10.0, 2.0, -4.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid, Vector3::new(5.0, 1.0, -2.0));

        // Out-of-range factors clamp to the endpoints
        assert_eq!(a.lerp(&b, 3.0), b);
        assert_eq!(a.lerp(&b, -1.0), a);
    }

    #[test]
    fn test_serializes_as_object() {
        let json = serde_json::to_string(&Vector3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.0,"z":3.0}"#);
    }
}
