//! arvos: location-based augmented reality positioning
//!
//! Facade over the workspace crates. Hosts embed [`Engine`] and implement the
//! collaborator traits for their renderer, location service and network stack.

pub use arvos_config as config;
pub use arvos_core as positioning;

pub use arvos_config::{AppConfig, ConfigError, HeadingFilter};
pub use arvos_core::{
    AcquisitionState, DescriptorFetcher, Engine, EngineError, GeoCoordinate, LocationSensor,
    LocationStatus, SceneHandle, SceneRenderer, StatusSink, Step, Vector3,
};
