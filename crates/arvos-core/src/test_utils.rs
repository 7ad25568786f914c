//! Recording collaborators for tests
//!
//! Each mock is cheap to clone and shares its state, so a test can hand one
//! copy to the engine and inspect the other.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::collaborators::{
    DescriptorFetcher, LocationSensor, LocationStatus, SceneHandle, SceneRenderer, StatusSink,
};
use crate::spatial::{GeoCoordinate, Vector3};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct SensorState {
    pub enabled: bool,
    /// Statuses returned by successive polls; the last one repeats
    pub statuses: VecDeque<LocationStatus>,
    pub coordinate: GeoCoordinate,
    pub heading: f32,
    pub compass_enabled: bool,
    pub started_with: Option<(f64, f64)>,
    pub stop_calls: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MockSensor {
    state: Arc<Mutex<SensorState>>,
}

impl MockSensor {
    /// A sensor that is enabled and immediately running at `coordinate`
    pub fn running_at(coordinate: GeoCoordinate, heading: f32) -> Self {
        let sensor = Self::default();
        {
            let mut state = sensor.state();
            state.enabled = true;
            state.statuses.push_back(LocationStatus::Running);
            state.coordinate = coordinate;
            state.heading = heading;
        }
        sensor
    }

    pub fn state(&self) -> MutexGuard<'_, SensorState> {
        locked(&self.state)
    }
}

impl LocationSensor for MockSensor {
    fn is_location_enabled(&self) -> bool {
        self.state().enabled
    }

    fn start_location_updates(&mut self, desired_accuracy: f64, update_distance: f64) {
        self.state().started_with = Some((desired_accuracy, update_distance));
    }

    fn location_status(&self) -> LocationStatus {
        let mut state = self.state();
        if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap_or(LocationStatus::Failed)
        } else {
            state
                .statuses
                .front()
                .copied()
                .unwrap_or(LocationStatus::Initializing)
        }
    }

    fn last_coordinate(&self) -> GeoCoordinate {
        self.state().coordinate
    }

    fn enable_compass(&mut self) {
        self.state().compass_enabled = true;
    }

    fn true_heading(&self) -> f32 {
        self.state().heading
    }

    fn stop_location_updates(&mut self) {
        self.state().stop_calls += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: Option<String>,
    pub name: String,
    pub parent: Option<SceneHandle>,
    pub position: Vector3,
    pub euler: Option<Vector3>,
    pub destroyed_after: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct SceneState {
    pub nodes: HashMap<SceneHandle, Node>,
    pub next_id: u64,
    pub fail_instantiation: bool,
    pub camera_yaw: f32,
}

impl SceneState {
    fn insert(&mut self, node: Node) -> SceneHandle {
        self.next_id += 1;
        let handle = SceneHandle(self.next_id);
        self.nodes.insert(handle, node);
        handle
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockScene {
    state: Arc<Mutex<SceneState>>,
}

impl MockScene {
    /// A scene containing one tagged template per entry
    pub fn with_templates(tags: &[&str]) -> Self {
        let scene = Self::default();
        {
            let mut state = scene.state();
            for tag in tags {
                state.insert(Node {
                    tag: Some(tag.to_string()),
                    name: tag.to_string(),
                    ..Node::default()
                });
            }
        }
        scene
    }

    pub fn state(&self) -> MutexGuard<'_, SceneState> {
        locked(&self.state)
    }

    pub fn add_node(&self, name: &str) -> SceneHandle {
        self.state().insert(Node {
            name: name.to_string(),
            ..Node::default()
        })
    }

    pub fn fail_instantiation(&self) {
        self.state().fail_instantiation = true;
    }

    pub fn handle_for(&self, tag: &str) -> Option<SceneHandle> {
        self.find_template_by_tag(tag)
    }

    pub fn parent_of(&self, handle: SceneHandle) -> Option<SceneHandle> {
        self.state().nodes.get(&handle).and_then(|n| n.parent)
    }

    pub fn name_of(&self, handle: SceneHandle) -> Option<String> {
        self.state().nodes.get(&handle).map(|n| n.name.clone())
    }

    pub fn euler_of(&self, handle: SceneHandle) -> Option<Vector3> {
        self.state().nodes.get(&handle).and_then(|n| n.euler)
    }

    pub fn destroyed_after(&self, handle: SceneHandle) -> Option<Duration> {
        self.state().nodes.get(&handle).and_then(|n| n.destroyed_after)
    }

    /// Number of nodes created by instantiation
    pub fn instantiated(&self) -> usize {
        self.state().nodes.values().filter(|n| n.tag.is_none()).count()
    }
}

impl SceneRenderer for MockScene {
    fn find_template_by_tag(&self, tag: &str) -> Option<SceneHandle> {
        let state = self.state();
        let mut matches: Vec<SceneHandle> = state
            .nodes
            .iter()
            .filter(|(_, n)| n.tag.as_deref() == Some(tag))
            .map(|(h, _)| *h)
            .collect();
        matches.sort();
        matches.first().copied()
    }

    fn instantiate(&mut self, template: SceneHandle) -> Option<SceneHandle> {
        let mut state = self.state();
        if state.fail_instantiation {
            return None;
        }
        let name = state.nodes.get(&template)?.name.clone();
        Some(state.insert(Node {
            name,
            ..Node::default()
        }))
    }

    fn set_parent(&mut self, child: SceneHandle, parent: SceneHandle) {
        if let Some(node) = self.state().nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    fn set_name(&mut self, handle: SceneHandle, name: &str) {
        if let Some(node) = self.state().nodes.get_mut(&handle) {
            node.name = name.to_string();
        }
    }

    fn destroy(&mut self, handle: SceneHandle, after: Duration) {
        if let Some(node) = self.state().nodes.get_mut(&handle) {
            node.destroyed_after = Some(after);
        }
    }

    fn set_position(&mut self, handle: SceneHandle, position: Vector3) {
        if let Some(node) = self.state().nodes.get_mut(&handle) {
            node.position = position;
        }
    }

    fn set_euler_angles(&mut self, handle: SceneHandle, angles: Vector3) {
        if let Some(node) = self.state().nodes.get_mut(&handle) {
            node.euler = Some(angles);
        }
    }

    fn position(&self, handle: SceneHandle) -> Vector3 {
        self.state()
            .nodes
            .get(&handle)
            .map(|n| n.position)
            .unwrap_or_default()
    }

    fn camera_yaw(&self) -> f32 {
        self.state().camera_yaw
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockStatus {
    history: Arc<Mutex<Vec<String>>>,
}

impl MockStatus {
    pub fn last(&self) -> Option<String> {
        locked(&self.history).last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        locked(&self.history).clone()
    }
}

impl StatusSink for MockStatus {
    fn set_status_text(&mut self, text: &str) {
        locked(&self.history).push(text.to_string());
    }
}

/// Returns a canned body (or error) and records requested URLs
#[derive(Debug, Clone)]
pub struct MockFetcher {
    response: Result<String, String>,
    requests: Arc<Mutex<Vec<Url>>>,
}

impl MockFetcher {
    pub fn body(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            requests: Arc::default(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<Url> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl DescriptorFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> anyhow::Result<String> {
        locked(&self.requests).push(url.clone());
        self.response.clone().map_err(anyhow::Error::msg)
    }
}
