//! The positioning engine and its cooperative runner

use std::sync::Arc;
use std::time::{Duration, Instant};

use arvos_config::AppConfig;
use futures::future::{BoxFuture, OptionFuture};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::acquisition::{Acquisition, AcquisitionContext, AcquisitionState, Step};
use crate::collaborators::{DescriptorFetcher, LocationSensor, SceneRenderer, StatusSink};
use crate::error::{EngineError, Result};
use crate::frame::{FrameDriver, FrameTargets};
use crate::registry::ObjectRegistry;
use crate::session::SessionState;

/// Shortest frame period the runner ticks at
const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// What a pending acquisition suspension resolved to
enum Wake {
    Resume,
    Descriptor(anyhow::Result<String>),
}

enum Event {
    Shutdown,
    Woke(Wake),
    Frame,
}

/// Owns one positioning session and every collaborator it drives
pub struct Engine {
    config: AppConfig,
    device_id: String,
    sensor: Box<dyn LocationSensor>,
    scene: Box<dyn SceneRenderer>,
    status: Box<dyn StatusSink>,
    fetcher: Arc<dyn DescriptorFetcher>,
    session: SessionState,
    registry: ObjectRegistry,
    acquisition: Acquisition,
    frames: FrameDriver,
    exit_on_failure: bool,
}

impl Engine {
    pub fn new(
        config: AppConfig,
        sensor: Box<dyn LocationSensor>,
        scene: Box<dyn SceneRenderer>,
        fetcher: Arc<dyn DescriptorFetcher>,
        status: Box<dyn StatusSink>,
    ) -> Self {
        let device_id = config.descriptor.resolve_device_id();
        let frames = FrameDriver::new(&config.tracking);
        debug!(device_id = %device_id, "engine created");
        Self {
            config,
            device_id,
            sensor,
            scene,
            status,
            fetcher,
            session: SessionState::new(),
            registry: ObjectRegistry::new(),
            acquisition: Acquisition::new(),
            frames,
            exit_on_failure: false,
        }
    }

    /// Return from [`Engine::run`] as soon as the session fails
    ///
    /// By default a failed session keeps rendering its error text until shutdown.
    pub fn with_exit_on_failure(mut self, exit: bool) -> Self {
        self.exit_on_failure = exit;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn state(&self) -> &AcquisitionState {
        self.acquisition.state()
    }

    pub fn fatal_error(&self) -> Option<&EngineError> {
        self.session.fatal_error()
    }

    pub fn frames_per_second(&self) -> f32 {
        self.frames.fps()
    }

    /// Run one acquisition step; a failure is recorded and reported as `Halted`
    pub fn advance(&mut self, now: Instant) -> Step {
        let result = self.acquisition.advance(
            now,
            AcquisitionContext {
                sensor: &mut *self.sensor,
                scene: &mut *self.scene,
                session: &mut self.session,
                registry: &mut self.registry,
                config: &self.config,
                device_id: &self.device_id,
            },
        );
        match result {
            Ok(step) => step,
            Err(err) => {
                self.fail(err);
                Step::Halted
            }
        }
    }

    /// Advance until acquisition has to wait for something
    pub fn drive(&mut self, now: Instant) -> Step {
        loop {
            match self.advance(now) {
                Step::Continue => continue,
                step => return step,
            }
        }
    }

    pub fn deliver_descriptor(&mut self, response: anyhow::Result<String>) {
        if let Err(err) = self.acquisition.deliver_descriptor(response) {
            self.fail(err);
        }
    }

    /// Render one frame
    pub fn frame(&mut self, now: Instant) {
        self.frames.tick(
            now,
            FrameTargets {
                session: &mut self.session,
                registry: &mut self.registry,
                scene: &mut *self.scene,
                status: &mut *self.status,
                anchor: self.acquisition.scene_anchor(),
            },
        );
    }

    /// Stop the session and release the sensor
    pub fn cancel(&mut self) {
        self.acquisition.cancel();
        self.acquisition.release_sensor(&mut *self.sensor);
    }

    fn fail(&mut self, err: EngineError) {
        error!(error = %err, state = self.acquisition.state().name(), "session failed");
        self.session.fail(err);
        self.acquisition.fail();
        self.acquisition.release_sensor(&mut *self.sensor);
    }

    /// Drive acquisition and frames on the current task until `shutdown` turns true
    ///
    /// Returns the session's fatal error, if any, once the loop ends.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let period = frame_period(self.config.tracking.assumed_fps);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut wake: Option<BoxFuture<'static, Wake>> = None;
        let mut ticking = false;
        info!(device_id = %self.device_id, "positioning session started");

        loop {
            if wake.is_none() && !ticking && !self.acquisition.state().is_terminal() {
                match self.drive(now()) {
                    Step::Sleep(delay) => {
                        wake = Some(Box::pin(async move {
                            tokio::time::sleep(delay).await;
                            Wake::Resume
                        }));
                    }
                    Step::Fetch(url) => {
                        info!(%url, "fetching descriptor");
                        let fetcher = Arc::clone(&self.fetcher);
                        wake = Some(Box::pin(async move {
                            Wake::Descriptor(fetcher.fetch(&url).await)
                        }));
                    }
                    Step::NextTick => ticking = true,
                    Step::Continue | Step::AwaitDescriptor | Step::Halted => {}
                }
            }

            if self.exit_on_failure && self.session.is_failed() {
                self.frame(now());
                break;
            }

            let event = tokio::select! {
                biased;
                changed = shutdown.changed() => match changed {
                    Ok(()) if !*shutdown.borrow() => continue,
                    _ => Event::Shutdown,
                },
                Some(woke) = OptionFuture::from(wake.as_mut()), if wake.is_some() => Event::Woke(woke),
                _ = ticker.tick() => Event::Frame,
            };

            match event {
                Event::Shutdown => {
                    info!("shutdown requested");
                    self.cancel();
                    break;
                }
                Event::Woke(woke) => {
                    wake = None;
                    if let Wake::Descriptor(response) = woke {
                        self.deliver_descriptor(response);
                    }
                }
                Event::Frame => {
                    let now = now();
                    if ticking && self.advance(now) == Step::Halted {
                        ticking = false;
                    }
                    self.frame(now);
                }
            }
        }

        match self.session.fatal_error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.acquisition.release_sensor(&mut *self.sensor);
    }
}

/// Ticker period for a frame rate, never zero even for absurd rates
fn frame_period(fps: f32) -> Duration {
    Duration::try_from_secs_f32(1.0 / fps)
        .unwrap_or(MIN_FRAME_PERIOD)
        .max(MIN_FRAME_PERIOD)
}

/// Current time on the tokio clock, so paused-time tests stay consistent
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
