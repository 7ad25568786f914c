//! Per-tick target positions for geo-anchored objects

use crate::registry::{ObjectRegistry, Placement};
use crate::spatial::{distance, GeoCoordinate, Vector3};

/// Scene-space position of a geographic point as seen from `current`
///
/// Each axis is measured on its own (longitude held fixed for north/south,
/// latitude held fixed for east/west). Haversine distances are never negative,
/// so the sign comes from comparing the coordinates.
pub fn absolute_target(geo: &GeoCoordinate, altitude: f32, current: &GeoCoordinate) -> Vector3 {
    let mut north = distance(
        geo.latitude,
        current.longitude,
        current.latitude,
        current.longitude,
    );
    if geo.latitude < current.latitude {
        north = -north;
    }

    let mut east = distance(
        current.latitude,
        geo.longitude,
        current.latitude,
        current.longitude,
    );
    if geo.longitude < current.longitude {
        east = -east;
    }

    Vector3::new(east as f32, altitude, north as f32)
}

/// Recompute the target of every absolute object; relative ones never move
pub fn update_targets(registry: &mut ObjectRegistry, current: &GeoCoordinate) {
    for object in registry.iter_mut() {
        if let Placement::Absolute { geo } = object.placement {
            object.target_position = absolute_target(&geo, object.altitude, current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::SceneHandle;
    use crate::registry::PlacedObject;

    const METERS_PER_DEGREE: f32 = 111_319.49;

    #[test]
    fn test_signs_follow_direction() {
        let current = GeoCoordinate::new(10.0, 20.0);

        let north_east = absolute_target(&GeoCoordinate::new(10.001, 20.001), 2.0, &current);
        assert!(north_east.z > 0.0);
        assert!(north_east.x > 0.0);
        assert_eq!(north_east.y, 2.0);

        let south_west = absolute_target(&GeoCoordinate::new(9.999, 19.999), 0.0, &current);
        assert!(south_west.z < 0.0);
        assert!(south_west.x < 0.0);
    }

    #[test]
    fn test_axis_magnitudes() {
        let current = GeoCoordinate::new(0.0, 0.0);
        let target = absolute_target(&GeoCoordinate::new(0.001, 0.0), 0.0, &current);
        assert!((target.z - METERS_PER_DEGREE * 0.001).abs() < 0.01);
        assert!(target.x.abs() < 1e-6);
    }

    #[test]
    fn test_same_point_is_origin() {
        let here = GeoCoordinate::new(48.0, 11.0);
        assert_eq!(absolute_target(&here, 1.5, &here), Vector3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn test_relative_objects_untouched() {
        let mut registry = ObjectRegistry::new();
        registry.insert(PlacedObject::new(
            "Cube",
            "a",
            SceneHandle(1),
            SceneHandle(2),
            Placement::Relative {
                x_offset: 1.0,
                z_offset: 2.0,
            },
            3.0,
            "REL,Cube,a,1,2,3",
        ));
        registry.insert(PlacedObject::new(
            "Cube",
            "b",
            SceneHandle(3),
            SceneHandle(4),
            Placement::Absolute {
                geo: GeoCoordinate::new(10.001, 20.0),
            },
            0.0,
            "ABS,Cube,b,10.001,20,0",
        ));

        update_targets(&mut registry, &GeoCoordinate::new(10.0, 20.0));

        let objects: Vec<_> = registry.iter().collect();
        assert_eq!(objects[0].target_position, Vector3::new(1.0, 3.0, 2.0));
        assert!(objects[1].target_position.z > 100.0);
    }
}
