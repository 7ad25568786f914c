//! arvos-config: configuration for the arvos positioning engine
//!
//! Settings are read from a TOML file, then environment overrides are applied.
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working configuration.

pub mod config;

pub use config::{
    AppConfig, ConfigError, DescriptorConfig, HeadingFilter, LoggingConfig, Result, SensorConfig,
    TrackingConfig,
};
