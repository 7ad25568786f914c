//! # arvos
//!
//! Runs a positioning session against a simulated device and prints the status
//! line as it changes, followed by a JSON summary of the placed objects.
//!
//! ## Usage
//!
//! ```bash
//! # Fetch the descriptor from the configured server
//! arvos --lat 48.2082 --lon 16.3738 --heading 90
//!
//! # Use a local descriptor and walk north at 1.5 m/s for 20 seconds
//! arvos --descriptor ar.txt --walk 1.5 --duration 20
//! ```

mod fetch;
mod sim;
mod status;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arvos_config::AppConfig;
use chrono::{DateTime, Utc};
use arvos_core::{
    Descriptor, DescriptorFetcher, Engine, GeoCoordinate, PlacedObject, PlacementCommand,
    SceneHandle,
};
use clap::Parser;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use fetch::{FileDescriptorFetcher, HttpDescriptorFetcher};
use sim::{SceneNode, SimulatedScene, SimulatedSensor};
use status::ConsoleStatus;

const DEFAULT_TEMPLATES: &str = "Cube,Sphere,Capsule,Cylinder,Plane";

#[derive(Parser, Debug)]
#[command(name = "arvos")]
#[command(about = "Location-based AR positioning engine (simulated device)")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Descriptor base URL (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Read the descriptor from this file instead of fetching it
    #[arg(short, long)]
    descriptor: Option<PathBuf>,

    /// Device latitude in degrees
    #[arg(long, default_value = "48.158808", allow_negative_numbers = true)]
    lat: f64,

    /// Device longitude in degrees
    #[arg(long, default_value = "11.578669", allow_negative_numbers = true)]
    lon: f64,

    /// Compass heading in degrees
    #[arg(long, default_value = "0")]
    heading: f32,

    /// Walk north at this speed (m/s)
    #[arg(long, default_value = "0")]
    walk: f64,

    /// Compass noise in degrees
    #[arg(long, default_value = "0")]
    jitter: f32,

    /// Frame rate (overrides tracking.assumed_fps)
    #[arg(long)]
    fps: Option<f32>,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long)]
    duration: Option<f64>,

    /// Scene template tags available to the descriptor
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_TEMPLATES)]
    templates: Vec<String>,

    /// Simulate a device without location permission
    #[arg(long)]
    permission_denied: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    device_id: &'a str,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    frames_per_second: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    origin: GeoCoordinate,
    position: GeoCoordinate,
    smoothed_heading: f32,
    objects: Vec<ObjectSummary<'a>>,
}

#[derive(Serialize)]
struct ObjectSummary<'a> {
    #[serde(flatten)]
    object: &'a PlacedObject,
    wrapper_node: Option<SceneNode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    let log_filter = init_logging(rust_log.as_deref(), args.verbose);

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Err(e) = log_filter.reload(EnvFilter::new(log_directives(
        rust_log.as_deref(),
        args.verbose,
        &config.logging.level,
    ))) {
        warn!("Failed to apply configured log level: {}", e);
    }
    if let Some(url) = &args.url {
        config.descriptor.base_url = url.clone();
    }
    if let Some(fps) = args.fps {
        config.tracking.assumed_fps = fps;
    }
    config
        .validate()
        .context("Invalid command line overrides")?;

    let mut templates = vec!["SceneAnchor".to_string(), "Wrapper".to_string()];
    templates.extend(args.templates.iter().cloned());
    let fetcher: Arc<dyn DescriptorFetcher> = match &args.descriptor {
        Some(path) => {
            templates.extend(descriptor_tags(path)?);
            Arc::new(FileDescriptorFetcher::new(path))
        }
        None => Arc::new(HttpDescriptorFetcher::new()?),
    };

    let sensor = SimulatedSensor::new(GeoCoordinate::new(args.lat, args.lon), args.heading)
        .with_walk(args.walk)
        .with_jitter(args.jitter)
        .with_permission(!args.permission_denied);
    let scene = SimulatedScene::with_templates(templates);

    let mut engine = Engine::new(
        config,
        Box::new(sensor),
        Box::new(scene.clone()),
        fetcher,
        Box::new(ConsoleStatus::stdout()),
    )
    .with_exit_on_failure(true);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let duration = args.duration.map(Duration::from_secs_f64);
    tokio::spawn(async move {
        wait_for_shutdown(tokio::signal::ctrl_c(), duration).await;
        let _ = shutdown_tx.send(true);
    });

    let result = engine.run(shutdown_rx).await;

    let summary = summarize(&engine, &scene);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    result.context("Positioning session failed")
}

/// Install the subscriber before the config is read so loading is logged;
/// the returned handle swaps in the configured level afterwards
fn init_logging(rust_log: Option<&str>, verbose: bool) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(EnvFilter::new(log_directives(rust_log, verbose, "info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// `RUST_LOG` wins, then `--verbose`, then the configured level
fn log_directives(rust_log: Option<&str>, verbose: bool, level: &str) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives.to_string(),
        _ if verbose => "debug".to_string(),
        _ => level.to_string(),
    }
}

/// Resolve once `signal` fires or `duration` elapses.
///
/// Without a working signal handler the duration still ends the session.
async fn wait_for_shutdown<F>(signal: F, duration: Option<Duration>)
where
    F: Future<Output = std::io::Result<()>>,
{
    let timer = async move {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(timer);

    tokio::select! {
        signal = signal => match signal {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                (&mut timer).await;
                info!("session duration elapsed");
            }
        },
        _ = &mut timer => info!("session duration elapsed"),
    }
}

/// Template tags a local descriptor places, so the simulated scene can provide them
fn descriptor_tags(path: &std::path::Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
    // syntax errors surface through the session itself
    let Ok(descriptor) = Descriptor::parse(&text) else {
        return Ok(Vec::new());
    };
    Ok(descriptor
        .entries
        .into_iter()
        .filter_map(|entry| match entry.command {
            PlacementCommand::Absolute { tag, .. } | PlacementCommand::Relative { tag, .. } => {
                Some(tag)
            }
            PlacementCommand::Remove { .. } => None,
        })
        .collect())
}

fn summarize<'a>(engine: &'a Engine, scene: &SimulatedScene) -> Summary<'a> {
    let session = engine.session();
    let node = |handle: SceneHandle| scene.node(handle);
    Summary {
        device_id: engine.device_id(),
        state: engine.state().name(),
        error: engine.fatal_error().map(ToString::to_string),
        frames_per_second: engine.frames_per_second(),
        started_at: session.started_at,
        origin: session.original_coordinate,
        position: session.current_coordinate,
        smoothed_heading: session.smoothed_heading,
        objects: engine
            .registry()
            .iter()
            .map(|object| ObjectSummary {
                object,
                wrapper_node: node(object.wrapper),
            })
            .collect(),
    }
}
