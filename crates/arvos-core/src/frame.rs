//! Per-frame smoothing, interpolation, and status reporting

use std::time::{Duration, Instant};

use arvos_config::TrackingConfig;
use tracing::trace;

use crate::collaborators::{SceneHandle, SceneRenderer, StatusSink};
use crate::orientation::OrientationSmoother;
use crate::registry::ObjectRegistry;
use crate::session::SessionState;
use crate::spatial::Vector3;

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Frame-rate estimate over one-second windows
#[derive(Debug, Clone)]
pub struct FrameClock {
    window_start: Option<Instant>,
    frames: u32,
    fps: f32,
}

impl FrameClock {
    pub fn new(assumed_fps: f32) -> Self {
        Self {
            window_start: None,
            frames: 0,
            fps: assumed_fps.max(1.0),
        }
    }

    /// Count one frame and return the current estimate
    pub fn tick(&mut self, now: Instant) -> f32 {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= FPS_WINDOW {
            self.fps = (self.frames as f32 / elapsed.as_secs_f32()).max(1.0);
            self.frames = 0;
            self.window_start = Some(now);
        }
        self.fps
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Everything one frame reads or writes
pub struct FrameTargets<'a> {
    pub session: &'a mut SessionState,
    pub registry: &'a mut ObjectRegistry,
    pub scene: &'a mut dyn SceneRenderer,
    pub status: &'a mut dyn StatusSink,
    pub anchor: Option<SceneHandle>,
}

/// Runs once per rendered frame
#[derive(Debug, Clone)]
pub struct FrameDriver {
    clock: FrameClock,
    smoother: OrientationSmoother,
    interpolation_rate: f32,
    spin_degrees_per_sec: f32,
}

impl FrameDriver {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            clock: FrameClock::new(config.assumed_fps),
            smoother: OrientationSmoother::new(config.heading_filter),
            interpolation_rate: config.interpolation_rate,
            spin_degrees_per_sec: config.spin_degrees_per_sec,
        }
    }

    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    pub fn tick(&mut self, now: Instant, frame: FrameTargets<'_>) {
        let fps = self.clock.tick(now);
        let FrameTargets {
            session,
            registry,
            scene,
            status,
            anchor,
        } = frame;

        if let Some(error) = session.fatal_error() {
            status.set_status_text(&error.to_string());
            return;
        }
        if !session.is_tracking() {
            status.set_status_text("");
            return;
        }

        self.smoother.update(session, fps);
        let yaw = Vector3::yaw(self.smoother.anchor_yaw(session));
        if let Some(anchor) = anchor {
            scene.set_euler_angles(anchor, yaw);
        }

        let step = self.interpolation_rate / fps;
        let spin_step = self.spin_degrees_per_sec / fps;
        for object in registry.iter_mut() {
            if object.is_absolute() {
                let current = scene.position(object.wrapper);
                scene.set_position(object.wrapper, current.lerp(&object.target_position, step));
            }
            scene.set_euler_angles(object.wrapper, yaw);

            if let Some(axis) = object.spin {
                object.spin_angle = (object.spin_angle + spin_step) % 360.0;
                scene.set_euler_angles(object.object, axis.euler(object.spin_angle));
            }
        }
        trace!(fps, heading = session.smoothed_heading, "frame");

        if session.show_info {
            status.set_status_text(&info_text(session, registry, scene.camera_yaw()));
        } else {
            status.set_status_text("");
        }
    }
}

/// Diagnostic line shown when the descriptor asks for it
pub fn info_text(session: &SessionState, registry: &ObjectRegistry, camera_yaw: f32) -> String {
    let walked = session
        .original_coordinate
        .distance_to(&session.current_coordinate);
    let target = registry
        .last()
        .map(|o| o.target_position)
        .unwrap_or_default();

    format!(
        "D {:.2} N {} Lat {:.6} Lon {:.6} H {:.2} C {:.2} IH {:.2} IC {:.2} T {:.1},{:.1},{:.1}",
        walked,
        registry.len(),
        session.current_coordinate.latitude,
        session.current_coordinate.longitude,
        session.smoothed_heading,
        camera_yaw,
        session.initial_heading,
        session.initial_camera_angle,
        target.x,
        target.y,
        target.z,
    )
}
