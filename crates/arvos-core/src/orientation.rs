//! Compass heading smoothing and scene anchor yaw

use arvos_config::HeadingFilter;

use crate::session::SessionState;

/// Move `smoothed` one filter step toward `target`, both in degrees
///
/// When the two are more than half a turn apart the smaller one is lifted by
/// 360 so the filter takes the short way across north. The result is
/// normalized into [0, 360).
pub fn smooth_heading(smoothed: f32, target: f32, divisor: f32) -> f32 {
    let (mut smoothed, mut target) = (smoothed, target);
    if (target - smoothed).abs() > 180.0 {
        if target < smoothed {
            target += 360.0;
        } else {
            smoothed += 360.0;
        }
    }

    smoothed += (target - smoothed) / divisor.max(1.0);

    while smoothed >= 360.0 {
        smoothed -= 360.0;
    }
    while smoothed < 0.0 {
        smoothed += 360.0;
    }
    smoothed
}

/// Low-pass filter over the raw compass heading
#[derive(Debug, Clone, Copy)]
pub struct OrientationSmoother {
    filter: HeadingFilter,
}

impl OrientationSmoother {
    pub fn new(filter: HeadingFilter) -> Self {
        Self { filter }
    }

    /// Advance the filter one frame at the given frame rate
    ///
    /// Until lock-in the initial heading follows the filtered value.
    pub fn update(&self, session: &mut SessionState, fps: f32) {
        let divisor = self.filter.divisor(fps);
        session.smoothed_heading = smooth_heading(session.smoothed_heading, session.raw_heading, divisor);
        if session.camera_initializing {
            session.initial_heading = session.smoothed_heading;
        }
    }

    /// Yaw applied to the scene anchor and every wrapper
    pub fn anchor_yaw(&self, session: &SessionState) -> f32 {
        360.0 - session.initial_heading
    }
}
