//! Interfaces to the outside world
//!
//! The engine never renders, reads hardware, or talks to the network itself.
//! It drives these traits, which the host application implements.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::spatial::{GeoCoordinate, Vector3};

/// Opaque reference to a node owned by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SceneHandle(pub u64);

impl fmt::Display for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location service status as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    Initializing,
    Running,
    Failed,
}

/// Device GPS and compass
pub trait LocationSensor: Send {
    /// Whether the user granted location access
    fn is_location_enabled(&self) -> bool;

    /// Begin location updates with the desired accuracy and update distance (meters)
    fn start_location_updates(&mut self, desired_accuracy: f64, update_distance: f64);

    fn location_status(&self) -> LocationStatus;

    fn last_coordinate(&self) -> GeoCoordinate;

    fn enable_compass(&mut self);

    /// Heading relative to true north, in degrees [0, 360)
    fn true_heading(&self) -> f32;

    /// Release the location service
    fn stop_location_updates(&mut self);
}

/// The scene graph the engine places objects into
pub trait SceneRenderer: Send {
    /// Find a scene node (usually an inactive template) by tag
    fn find_template_by_tag(&self, tag: &str) -> Option<SceneHandle>;

    /// Clone a node; None if the renderer could not create it
    fn instantiate(&mut self, template: SceneHandle) -> Option<SceneHandle>;

    fn set_parent(&mut self, child: SceneHandle, parent: SceneHandle);

    fn set_name(&mut self, handle: SceneHandle, name: &str);

    /// Destroy a node once `after` has elapsed
    fn destroy(&mut self, handle: SceneHandle, after: Duration);

    fn set_position(&mut self, handle: SceneHandle, position: Vector3);

    fn set_euler_angles(&mut self, handle: SceneHandle, angles: Vector3);

    fn position(&self, handle: SceneHandle) -> Vector3;

    /// Current yaw of the main camera in degrees
    fn camera_yaw(&self) -> f32 {
        0.0
    }
}

/// Fetches the placement descriptor
#[async_trait]
pub trait DescriptorFetcher: Send + Sync {
    /// Return the response body; transport and HTTP errors are reported as `Err`
    async fn fetch(&self, url: &Url) -> anyhow::Result<String>;
}

/// Receives the one-line status text shown to the user
pub trait StatusSink: Send {
    fn set_status_text(&mut self, text: &str);
}
