//! Session acquisition: sensor startup, descriptor fetch, placement, tracking
//!
//! The acquisition sequence is an explicit state machine. Each call to
//! [`Acquisition::advance`] performs one synchronous step and returns a [`Step`]
//! telling the runner what to wait for before calling it again. Nothing here
//! sleeps or performs I/O itself.

use std::mem;
use std::time::{Duration, Instant};

use arvos_config::AppConfig;
use tracing::{debug, info, warn};
use url::Url;

use crate::collaborators::{LocationSensor, LocationStatus, SceneHandle, SceneRenderer};
use crate::error::{EngineError, Result};
use crate::placement::update_targets;
use crate::registry::{ObjectRegistry, PlacementContext};
use crate::session::SessionState;
use crate::spatial::GeoCoordinate;

/// Tag of the scene node every wrapper is parented to
pub const SCENE_ANCHOR_TAG: &str = "SceneAnchor";
/// Tag of the template each wrapper is cloned from
pub const WRAPPER_TAG: &str = "Wrapper";

const DESCRIPTOR_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionState {
    Idle,
    AwaitingSensorPermission,
    SensorInitializing { attempts: u32 },
    FetchingDescriptor { url: Url },
    Placing { body: String },
    SteadyState,
    Failed,
    Cancelled,
}

impl AcquisitionState {
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "idle",
            AcquisitionState::AwaitingSensorPermission => "awaiting_sensor_permission",
            AcquisitionState::SensorInitializing { .. } => "sensor_initializing",
            AcquisitionState::FetchingDescriptor { .. } => "fetching_descriptor",
            AcquisitionState::Placing { .. } => "placing",
            AcquisitionState::SteadyState => "steady_state",
            AcquisitionState::Failed => "failed",
            AcquisitionState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquisitionState::Failed | AcquisitionState::Cancelled)
    }
}

/// What the runner should do before advancing again
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Advance again right away
    Continue,
    /// Wait, then advance
    Sleep(Duration),
    /// Fetch the descriptor and hand the result to `deliver_descriptor`
    Fetch(Url),
    /// A fetch is in flight
    AwaitDescriptor,
    /// Advance again on the next frame
    NextTick,
    /// Nothing left to do
    Halted,
}

/// Borrowed view of the engine for one acquisition step
pub struct AcquisitionContext<'a> {
    pub sensor: &'a mut dyn LocationSensor,
    pub scene: &'a mut dyn SceneRenderer,
    pub session: &'a mut SessionState,
    pub registry: &'a mut ObjectRegistry,
    pub config: &'a AppConfig,
    pub device_id: &'a str,
}

#[derive(Debug)]
pub struct Acquisition {
    state: AcquisitionState,
    scene_anchor: Option<SceneHandle>,
    wrapper_template: Option<SceneHandle>,
    sensor_active: bool,
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl Acquisition {
    pub fn new() -> Self {
        Self {
            state: AcquisitionState::Idle,
            scene_anchor: None,
            wrapper_template: None,
            sensor_active: false,
        }
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn scene_anchor(&self) -> Option<SceneHandle> {
        self.scene_anchor
    }

    /// Perform one step of the acquisition sequence
    ///
    /// An `Err` is fatal for the session; the caller records it and calls
    /// [`Acquisition::fail`].
    pub fn advance(&mut self, now: Instant, ctx: AcquisitionContext<'_>) -> Result<Step> {
        match &mut self.state {
            AcquisitionState::Idle => {
                self.scene_anchor = Some(resolve_template(ctx.scene, SCENE_ANCHOR_TAG)?);
                self.wrapper_template = Some(resolve_template(ctx.scene, WRAPPER_TAG)?);
                self.transition(AcquisitionState::AwaitingSensorPermission);
                Ok(Step::Continue)
            }
            AcquisitionState::AwaitingSensorPermission => {
                if !ctx.sensor.is_location_enabled() {
                    return Err(EngineError::SensorPermission);
                }
                ctx.sensor.enable_compass();
                ctx.sensor.start_location_updates(
                    ctx.config.sensor.desired_accuracy_m,
                    ctx.config.sensor.update_distance_m,
                );
                self.sensor_active = true;
                self.transition(AcquisitionState::SensorInitializing { attempts: 0 });
                Ok(Step::Continue)
            }
            AcquisitionState::SensorInitializing { attempts } => {
                let attempts = *attempts;
                match ctx.sensor.location_status() {
                    LocationStatus::Failed => Err(EngineError::SensorFailure),
                    LocationStatus::Initializing => {
                        if attempts >= ctx.config.sensor.max_init_attempts {
                            return Err(EngineError::SensorTimeout);
                        }
                        self.state = AcquisitionState::SensorInitializing {
                            attempts: attempts + 1,
                        };
                        debug!(attempt = attempts + 1, "location service initializing");
                        Ok(Step::Sleep(ctx.config.sensor.poll_interval()))
                    }
                    LocationStatus::Running => {
                        let origin = ctx.sensor.last_coordinate();
                        ctx.session.original_coordinate = origin;
                        ctx.session.current_coordinate = origin;
                        info!(
                            latitude = origin.latitude,
                            longitude = origin.longitude,
                            "location acquired"
                        );

                        let url = descriptor_url(
                            &ctx.config.descriptor.base_url,
                            &origin,
                            &ctx.config.descriptor.channel,
                            ctx.device_id,
                        )?;
                        self.transition(AcquisitionState::FetchingDescriptor { url: url.clone() });
                        Ok(Step::Fetch(url))
                    }
                }
            }
            AcquisitionState::FetchingDescriptor { .. } => Ok(Step::AwaitDescriptor),
            AcquisitionState::Placing { body } => {
                let body = mem::take(body);
                self.place(now, &body, ctx)?;
                self.transition(AcquisitionState::SteadyState);
                Ok(Step::NextTick)
            }
            AcquisitionState::SteadyState => {
                self.track(now, ctx);
                Ok(Step::NextTick)
            }
            AcquisitionState::Failed | AcquisitionState::Cancelled => Ok(Step::Halted),
        }
    }

    /// Hand over the result of the descriptor fetch
    pub fn deliver_descriptor(&mut self, response: anyhow::Result<String>) -> Result<()> {
        let AcquisitionState::FetchingDescriptor { url } = &self.state else {
            warn!(state = self.state.name(), "descriptor delivered outside of fetch, ignored");
            return Ok(());
        };

        let body = response.map_err(|e| EngineError::Transport(format!("{e:#}")))?;
        if body.trim().is_empty() {
            return Err(EngineError::EmptyResponse {
                url: url.to_string(),
            });
        }
        debug!(bytes = body.len(), "descriptor received");
        self.transition(AcquisitionState::Placing { body });
        Ok(())
    }

    pub fn fail(&mut self) {
        self.transition(AcquisitionState::Failed);
    }

    /// Stop the sequence; a failed session stays failed
    pub fn cancel(&mut self) {
        if self.state != AcquisitionState::Failed {
            self.transition(AcquisitionState::Cancelled);
        }
    }

    /// Stop location updates if they were started; safe to call repeatedly
    pub fn release_sensor(&mut self, sensor: &mut dyn LocationSensor) {
        if mem::take(&mut self.sensor_active) {
            sensor.stop_location_updates();
            info!("location service released");
        }
    }

    fn transition(&mut self, next: AcquisitionState) {
        info!(from = self.state.name(), to = next.name(), "acquisition state changed");
        self.state = next;
    }

    fn place(&mut self, now: Instant, body: &str, ctx: AcquisitionContext<'_>) -> Result<()> {
        let (anchor, wrapper_template) = match (self.scene_anchor, self.wrapper_template) {
            (Some(anchor), Some(wrapper)) => (anchor, wrapper),
            _ => {
                return Err(EngineError::UnresolvedTag {
                    tag: SCENE_ANCHOR_TAG.to_string(),
                    line: None,
                })
            }
        };
        let placement = PlacementContext {
            anchor,
            wrapper_template,
            origin: ctx.session.original_coordinate,
            inclusion_radius_m: ctx.config.descriptor.inclusion_radius_m,
        };
        ctx.session.show_info = ctx
            .registry
            .apply_descriptor(ctx.scene, &placement, body)?;
        if ctx.registry.is_empty() {
            return Err(EngineError::EmptyPlacement);
        }

        ctx.session.begin_tracking(now, ctx.sensor.true_heading());
        Ok(())
    }

    fn track(&mut self, now: Instant, ctx: AcquisitionContext<'_>) {
        let session = ctx.session;
        session.current_coordinate = ctx.sensor.last_coordinate();
        session.raw_heading = ctx.sensor.true_heading();
        update_targets(ctx.registry, &session.current_coordinate);

        if session.camera_initializing
            && session.elapsed(now) >= ctx.config.tracking.camera_init_window()
            && session.lock_in(ctx.scene.camera_yaw())
        {
            info!(
                heading = session.initial_heading,
                camera = session.initial_camera_angle,
                "orientation locked"
            );
        }
    }
}

fn resolve_template(scene: &dyn SceneRenderer, tag: &str) -> Result<SceneHandle> {
    scene
        .find_template_by_tag(tag)
        .ok_or_else(|| EngineError::UnresolvedTag {
            tag: tag.to_string(),
            line: None,
        })
}

/// Build the descriptor request URL for the given device position
pub fn descriptor_url(
    base_url: &str,
    origin: &GeoCoordinate,
    channel: &str,
    device_id: &str,
) -> Result<Url> {
    let params = [
        ("version", DESCRIPTOR_VERSION.to_string()),
        ("lat", format!("{:.6}", origin.latitude)),
        ("lon", format!("{:.6}", origin.longitude)),
        ("channel", channel.to_string()),
        ("device", device_id.to_string()),
    ];
    Url::parse_with_params(base_url, &params)
        .map_err(|e| EngineError::Transport(format!("Invalid descriptor URL '{base_url}': {e}")))
}
