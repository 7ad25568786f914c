//! Application configuration types and loading

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_DESCRIPTOR_URL: &str = "https://www.mission-base.com/arvos/descriptor.txt";
const DEFAULT_CHANNEL: &str = "arvos";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Highest frame rate accepted for `tracking.assumed_fps`
pub const MAX_ASSUMED_FPS: f32 = 1000.0;

pub const ENV_DESCRIPTOR_URL: &str = "ARVOS_DESCRIPTOR_URL";
pub const ENV_CHANNEL: &str = "ARVOS_CHANNEL";
pub const ENV_DEVICE_ID: &str = "ARVOS_DEVICE_ID";

/// Errors from loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub descriptor: DescriptorConfig,
    pub sensor: SensorConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
}

/// Where the placement descriptor comes from and which objects are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorConfig {
    /// Base URL the descriptor is fetched from
    pub base_url: String,
    /// Fixed channel identifier sent with every fetch
    pub channel: String,
    /// Device identifier sent with every fetch (None = derive from host)
    pub device_id: Option<String>,
    /// Absolute objects farther than this from the start coordinate are skipped
    pub inclusion_radius_m: f64,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DESCRIPTOR_URL.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            device_id: None,
            inclusion_radius_m: 250.0,
        }
    }
}

impl DescriptorConfig {
    /// Resolve the device identifier: configured value, host name, or a random id
    pub fn resolve_device_id(&self) -> String {
        if let Some(id) = self.device_id.as_ref().filter(|id| !id.trim().is_empty()) {
            return id.trim().to_string();
        }
        match hostname::get() {
            Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
            _ => uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Location sensor startup parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub desired_accuracy_m: f64,
    pub update_distance_m: f64,
    pub poll_interval_ms: u64,
    /// Status polls allowed while the sensor is still initializing
    pub max_init_attempts: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            desired_accuracy_m: 1.0,
            update_distance_m: 0.1,
            poll_interval_ms: 1000,
            max_init_attempts: 30,
        }
    }
}

impl SensorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// How the compass heading divisor is chosen each frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HeadingFilter {
    /// Divisor is this fraction of the measured frame rate
    FpsFraction(f32),
    /// Constant divisor
    Fixed(f32),
}

impl HeadingFilter {
    /// Smoothing divisor for the given frame rate, never below 1
    pub fn divisor(&self, fps: f32) -> f32 {
        let k = match *self {
            HeadingFilter::FpsFraction(fraction) => fps * fraction,
            HeadingFilter::Fixed(k) => k,
        };
        k.max(1.0)
    }
}

impl Default for HeadingFilter {
    fn default() -> Self {
        HeadingFilter::FpsFraction(0.25)
    }
}

/// Per-frame smoothing and interpolation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Length of the camera-initialization window before heading lock-in
    pub camera_init_secs: f32,
    pub heading_filter: HeadingFilter,
    /// Position interpolation factor per second (divided by fps each frame)
    pub interpolation_rate: f32,
    /// Frame rate assumed until the first measurement window completes
    pub assumed_fps: f32,
    pub spin_degrees_per_sec: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            camera_init_secs: 3.0,
            heading_filter: HeadingFilter::default(),
            interpolation_rate: 0.5,
            assumed_fps: 30.0,
            spin_degrees_per_sec: 60.0,
        }
    }
}

impl TrackingConfig {
    pub fn camera_init_window(&self) -> Duration {
        Duration::from_secs_f32(self.camera_init_secs.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit path, or the per-user default location
    ///
    /// An explicit path must exist. The default location is optional; when it is
    /// absent the built-in defaults are used. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default_path) => Self::from_file(&default_path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `<config dir>/arvos/config.toml` for the current user
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "arvos", "arvos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (environment in production)
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DESCRIPTOR_URL) {
            self.descriptor.base_url = url;
        }
        if let Some(channel) = lookup(ENV_CHANNEL) {
            self.descriptor.channel = channel;
        }
        if let Some(device) = lookup(ENV_DEVICE_ID) {
            self.descriptor.device_id = Some(device);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.descriptor.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("descriptor.base_url is empty".into()));
        }
        if !(self.descriptor.inclusion_radius_m > 0.0) {
            return Err(ConfigError::Invalid(
                "descriptor.inclusion_radius_m must be positive".into(),
            ));
        }
        if self.sensor.max_init_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sensor.max_init_attempts must be at least 1".into(),
            ));
        }
        let rate = self.tracking.interpolation_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::Invalid(
                "tracking.interpolation_rate must be positive".into(),
            ));
        }
        let fps = self.tracking.assumed_fps;
        if !(1.0..=MAX_ASSUMED_FPS).contains(&fps) {
            return Err(ConfigError::Invalid(format!(
                "tracking.assumed_fps must be between 1 and {MAX_ASSUMED_FPS}, got {fps}"
            )));
        }
        let filter_value = match self.tracking.heading_filter {
            HeadingFilter::FpsFraction(v) | HeadingFilter::Fixed(v) => v,
        };
        if !(filter_value > 0.0) {
            return Err(ConfigError::Invalid(
                "tracking.heading_filter value must be positive".into(),
            ));
        }
        Ok(())
    }
}
