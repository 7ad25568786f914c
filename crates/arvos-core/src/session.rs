//! Per-session mutable state shared by acquisition and the frame driver

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::spatial::GeoCoordinate;

/// Everything the engine knows about the device during one session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Device coordinate captured once the sensor came up
    pub original_coordinate: GeoCoordinate,
    /// Device coordinate, refreshed every tick
    pub current_coordinate: GeoCoordinate,
    /// Compass heading as read this tick, [0, 360)
    pub raw_heading: f32,
    /// Low-pass filtered heading
    pub smoothed_heading: f32,
    /// Heading frozen at lock-in; tracks the smoothed heading until then
    pub initial_heading: f32,
    /// Camera yaw frozen at lock-in
    pub initial_camera_angle: f32,
    pub session_start: Option<Instant>,
    /// Wall-clock time tracking began, for reports
    pub started_at: Option<DateTime<Utc>>,
    pub camera_initializing: bool,
    pub show_info: bool,
    fatal_error: Option<EngineError>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter steady-state tracking, seeding the heading filter
    pub fn begin_tracking(&mut self, now: Instant, heading: f32) {
        self.session_start = Some(now);
        self.started_at = Some(Utc::now());
        self.raw_heading = heading;
        self.smoothed_heading = heading;
        self.initial_heading = heading;
        self.camera_initializing = true;
    }

    pub fn is_tracking(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.session_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    /// Freeze the heading and camera angle; later calls are ignored
    pub fn lock_in(&mut self, camera_angle: f32) -> bool {
        if !self.camera_initializing {
            return false;
        }
        self.camera_initializing = false;
        self.initial_heading = self.smoothed_heading;
        self.initial_camera_angle = camera_angle;
        true
    }

    /// Record a fatal error; the first one wins
    pub fn fail(&mut self, error: EngineError) {
        if self.fatal_error.is_none() {
            self.fatal_error = Some(error);
        }
    }

    pub fn fatal_error(&self) -> Option<&EngineError> {
        self.fatal_error.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.fatal_error.is_some()
    }
}
