//! Simulated device: a GPS/compass that can walk, and an in-memory scene graph

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use arvos_core::spatial::EARTH_RADIUS_M;
use arvos_core::{GeoCoordinate, LocationSensor, LocationStatus, SceneHandle, SceneRenderer, Vector3};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, trace};

/// Status polls answered with `Initializing` before the fix arrives
const WARMUP_POLLS: u32 = 1;

pub struct SimulatedSensor {
    origin: GeoCoordinate,
    heading: f32,
    walk_mps: f64,
    jitter_deg: f32,
    permission: bool,
    started_at: Option<Instant>,
    compass: bool,
    polls: AtomicU32,
}

impl SimulatedSensor {
    pub fn new(origin: GeoCoordinate, heading: f32) -> Self {
        Self {
            origin,
            heading,
            walk_mps: 0.0,
            jitter_deg: 0.0,
            permission: true,
            started_at: None,
            compass: false,
            polls: AtomicU32::new(0),
        }
    }

    /// Walk due north at this speed once updates start
    pub fn with_walk(mut self, meters_per_second: f64) -> Self {
        self.walk_mps = meters_per_second;
        self
    }

    /// Uniform compass noise of up to this many degrees either way
    pub fn with_jitter(mut self, degrees: f32) -> Self {
        self.jitter_deg = degrees.abs();
        self
    }

    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission = granted;
        self
    }

    fn walked(&self) -> f64 {
        self.started_at
            .map(|start| start.elapsed().as_secs_f64() * self.walk_mps)
            .unwrap_or_default()
    }
}

impl LocationSensor for SimulatedSensor {
    fn is_location_enabled(&self) -> bool {
        self.permission
    }

    fn start_location_updates(&mut self, desired_accuracy: f64, update_distance: f64) {
        debug!(desired_accuracy, update_distance, "simulated location updates started");
        self.started_at = Some(Instant::now());
    }

    fn location_status(&self) -> LocationStatus {
        if self.started_at.is_none() {
            return LocationStatus::Failed;
        }
        if self.polls.fetch_add(1, Ordering::Relaxed) < WARMUP_POLLS {
            LocationStatus::Initializing
        } else {
            LocationStatus::Running
        }
    }

    fn last_coordinate(&self) -> GeoCoordinate {
        let north = (self.walked() / EARTH_RADIUS_M).to_degrees();
        GeoCoordinate::new(self.origin.latitude + north, self.origin.longitude)
    }

    fn enable_compass(&mut self) {
        self.compass = true;
    }

    fn true_heading(&self) -> f32 {
        if !self.compass {
            return 0.0;
        }
        let noise = if self.jitter_deg > 0.0 {
            rand::thread_rng().gen_range(-self.jitter_deg..=self.jitter_deg)
        } else {
            0.0
        };
        (self.heading + noise).rem_euclid(360.0)
    }

    fn stop_location_updates(&mut self) {
        debug!("simulated location updates stopped");
        self.started_at = None;
    }
}

/// One node of the simulated scene graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<SceneHandle>,
    pub position: Vector3,
    pub euler: Vector3,
    /// When a pending destroy takes effect
    #[serde(skip)]
    pub destroy_at: Option<Instant>,
}

impl SceneNode {
    /// False once a scheduled destroy has come due
    pub fn is_live(&self, now: Instant) -> bool {
        self.destroy_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct SceneGraph {
    nodes: BTreeMap<SceneHandle, SceneNode>,
    next_id: u64,
}

impl SceneGraph {
    fn insert(&mut self, node: SceneNode) -> SceneHandle {
        self.next_id += 1;
        let handle = SceneHandle(self.next_id);
        self.nodes.insert(handle, node);
        handle
    }
}

/// In-memory scene; clones share the same graph
#[derive(Debug, Clone, Default)]
pub struct SimulatedScene {
    graph: Arc<Mutex<SceneGraph>>,
}

impl SimulatedScene {
    /// Scene holding one inactive template per tag
    pub fn with_templates<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scene = Self::default();
        {
            let mut graph = scene.graph();
            for tag in tags {
                let tag = tag.into();
                if graph.nodes.values().any(|n| n.tag.as_deref() == Some(tag.as_str())) {
                    continue;
                }
                graph.insert(SceneNode {
                    name: tag.clone(),
                    tag: Some(tag),
                    ..SceneNode::default()
                });
            }
        }
        scene
    }

    fn graph(&self) -> MutexGuard<'_, SceneGraph> {
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn node(&self, handle: SceneHandle) -> Option<SceneNode> {
        self.graph().nodes.get(&handle).cloned()
    }

    /// Live nodes created by instantiation
    pub fn instances(&self) -> Vec<(SceneHandle, SceneNode)> {
        let now = Instant::now();
        self.graph()
            .nodes
            .iter()
            .filter(|(_, n)| n.tag.is_none() && n.is_live(now))
            .map(|(h, n)| (*h, n.clone()))
            .collect()
    }
}

impl SceneRenderer for SimulatedScene {
    fn find_template_by_tag(&self, tag: &str) -> Option<SceneHandle> {
        let now = Instant::now();
        self.graph()
            .nodes
            .iter()
            .find(|(_, n)| n.is_live(now) && n.tag.as_deref() == Some(tag))
            .map(|(h, _)| *h)
    }

    fn instantiate(&mut self, template: SceneHandle) -> Option<SceneHandle> {
        let mut graph = self.graph();
        let source = graph
            .nodes
            .get(&template)
            .filter(|n| n.is_live(Instant::now()))?;
        let node = SceneNode {
            name: source.name.clone(),
            ..SceneNode::default()
        };
        Some(graph.insert(node))
    }

    fn set_parent(&mut self, child: SceneHandle, parent: SceneHandle) {
        if let Some(node) = self.graph().nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    fn set_name(&mut self, handle: SceneHandle, name: &str) {
        if let Some(node) = self.graph().nodes.get_mut(&handle) {
            node.name = name.to_string();
        }
    }

    fn destroy(&mut self, handle: SceneHandle, after: Duration) {
        if let Some(node) = self.graph().nodes.get_mut(&handle) {
            let at = Instant::now() + after;
            // an earlier pending destroy keeps its deadline
            node.destroy_at = Some(node.destroy_at.map_or(at, |pending| pending.min(at)));
            debug!(%handle, name = %node.name, delay_ms = after.as_millis() as u64, "node destroy scheduled");
        }
    }

    fn set_position(&mut self, handle: SceneHandle, position: Vector3) {
        if let Some(node) = self.graph().nodes.get_mut(&handle) {
            trace!(%handle, x = position.x, y = position.y, z = position.z, "position");
            node.position = position;
        }
    }

    fn set_euler_angles(&mut self, handle: SceneHandle, angles: Vector3) {
        if let Some(node) = self.graph().nodes.get_mut(&handle) {
            node.euler = angles;
        }
    }

    fn position(&self, handle: SceneHandle) -> Vector3 {
        self.graph()
            .nodes
            .get(&handle)
            .map(|n| n.position)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_warms_up_then_runs() {
        let mut sensor = SimulatedSensor::new(GeoCoordinate::new(1.0, 2.0), 45.0);
        assert_eq!(sensor.location_status(), LocationStatus::Failed);

        sensor.enable_compass();
        sensor.start_location_updates(1.0, 0.1);
        assert_eq!(sensor.location_status(), LocationStatus::Initializing);
        assert_eq!(sensor.location_status(), LocationStatus::Running);
        assert_eq!(sensor.last_coordinate(), GeoCoordinate::new(1.0, 2.0));
        assert_eq!(sensor.true_heading(), 45.0);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut sensor = SimulatedSensor::new(GeoCoordinate::new(1.0, 2.0), 359.0).with_jitter(5.0);
        sensor.enable_compass();
        for _ in 0..100 {
            let heading = sensor.true_heading();
            assert!((0.0..360.0).contains(&heading));
            assert!(heading >= 354.0 || heading <= 4.0, "{heading}");
        }
    }

    #[test]
    fn test_permission_flag() {
        let sensor = SimulatedSensor::new(GeoCoordinate::default(), 0.0).with_permission(false);
        assert!(!sensor.is_location_enabled());
    }

    #[test]
    fn test_scene_instantiate_and_destroy() {
        let mut scene = SimulatedScene::with_templates(["SceneAnchor", "Wrapper", "Cube", "Cube"]);
        let cube = scene.find_template_by_tag("Cube").unwrap();
        let copy = scene.instantiate(cube).unwrap();
        scene.set_name(copy, "c1");
        scene.set_position(copy, Vector3::new(1.0, 2.0, 3.0));

        assert_eq!(scene.instances().len(), 1);
        assert_eq!(scene.node(copy).unwrap().name, "c1");
        assert_eq!(scene.position(copy), Vector3::new(1.0, 2.0, 3.0));

        scene.destroy(cube, Duration::ZERO);
        assert_eq!(scene.find_template_by_tag("Cube"), None);
        assert_eq!(scene.instantiate(cube), None);
    }

    #[test]
    fn test_destroy_waits_for_delay() {
        let mut scene = SimulatedScene::with_templates(["SceneAnchor", "Wrapper", "Cube"]);
        let cube = scene.find_template_by_tag("Cube").unwrap();

        scene.destroy(cube, Duration::from_millis(50));
        assert_eq!(scene.find_template_by_tag("Cube"), Some(cube));
        let copy = scene.instantiate(cube).unwrap();
        assert_eq!(scene.instances().len(), 1);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(scene.find_template_by_tag("Cube"), None);
        assert_eq!(scene.instantiate(cube), None);
        // the copy made before the deadline survives
        assert!(scene.node(copy).unwrap().is_live(Instant::now()));
    }

    #[test]
    fn test_place_remove_place_in_one_descriptor() {
        use arvos_core::registry::{ObjectRegistry, PlacementContext, REMOVE_DELAY};

        let mut scene = SimulatedScene::with_templates(["SceneAnchor", "Wrapper", "Cube"]);
        let ctx = PlacementContext {
            anchor: scene.find_template_by_tag("SceneAnchor").unwrap(),
            wrapper_template: scene.find_template_by_tag("Wrapper").unwrap(),
            origin: GeoCoordinate::new(48.0, 11.0),
            inclusion_radius_m: 250.0,
        };
        let mut registry = ObjectRegistry::new();

        registry
            .apply_descriptor(&mut scene, &ctx, "REL,Cube,a,1,1,0\nDEL,Cube\nREL,Cube,b,2,2,0\n")
            .unwrap();
        assert_eq!(registry.len(), 2);

        std::thread::sleep(REMOVE_DELAY + Duration::from_millis(10));
        assert_eq!(scene.find_template_by_tag("Cube"), None);
    }
}
