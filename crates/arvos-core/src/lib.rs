//! arvos-core: location-based augmented reality positioning engine
//!
//! This crate places virtual objects in a camera-relative 3D scene so they
//! appear anchored to real-world coordinates:
//! - Great-circle distance and geo to scene-space conversion
//! - Descriptor parsing (`ShowInfo`, `DEL`, `ABS`, `REL` lines)
//! - Object registry with wrapper/object scene pairs
//! - Acquisition state machine (sensor, fetch, placement, tracking)
//! - Compass smoothing and per-frame interpolation
//!
//! Rendering, sensors, networking and status display are collaborator traits
//! implemented by the host.

pub mod acquisition;
pub mod collaborators;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod frame;
pub mod orientation;
pub mod placement;
pub mod registry;
pub mod session;
pub mod spatial;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use acquisition::{AcquisitionState, Step};
pub use collaborators::{
    DescriptorFetcher, LocationSensor, LocationStatus, SceneHandle, SceneRenderer, StatusSink,
};
pub use descriptor::{Descriptor, DescriptorEntry, DescriptorError, DescriptorLine, PlacementCommand};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use registry::{ObjectRegistry, PlacedObject, Placement, SpinAxis};
pub use session::SessionState;
pub use spatial::{distance, GeoCoordinate, Vector3};
