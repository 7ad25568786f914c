//! The live set of placed scene objects

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::collaborators::{SceneHandle, SceneRenderer};
use crate::descriptor::{self, DescriptorEntry, DescriptorLine, PlacementCommand};
use crate::error::{EngineError, Result};
use crate::placement::absolute_target;
use crate::spatial::{GeoCoordinate, Vector3};

/// Delay before a removed template disappears from the scene
pub const REMOVE_DELAY: Duration = Duration::from_millis(100);

/// How an object is anchored
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Fixed to a real-world coordinate; zero axes were already resolved
    Absolute { geo: GeoCoordinate },
    /// Fixed offset from the scene origin, independent of GPS
    Relative { x_offset: f32, z_offset: f32 },
}

/// Axis an object spins about, selected by naming it `SpinX`, `SpinY` or `SpinZ`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpinAxis {
    X,
    Y,
    Z,
}

impl SpinAxis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SpinX" => Some(SpinAxis::X),
            "SpinY" => Some(SpinAxis::Y),
            "SpinZ" => Some(SpinAxis::Z),
            _ => None,
        }
    }

    /// Euler angles for a rotation of `degrees` about this axis
    pub fn euler(&self, degrees: f32) -> Vector3 {
        match self {
            SpinAxis::X => Vector3::new(degrees, 0.0, 0.0),
            SpinAxis::Y => Vector3::new(0.0, degrees, 0.0),
            SpinAxis::Z => Vector3::new(0.0, 0.0, degrees),
        }
    }
}

/// A scene object placed from a descriptor line
#[derive(Debug, Clone, Serialize)]
pub struct PlacedObject {
    pub tag: String,
    pub name: String,
    /// Wrapper node parented to the scene anchor; carries position and orientation
    pub wrapper: SceneHandle,
    /// Template copy parented to the wrapper
    pub object: SceneHandle,
    pub placement: Placement,
    pub altitude: f32,
    pub target_position: Vector3,
    /// Descriptor line the object came from
    pub raw_text: String,
    pub spin: Option<SpinAxis>,
    pub spin_angle: f32,
}

impl PlacedObject {
    pub fn new(
        tag: impl Into<String>,
        name: impl Into<String>,
        wrapper: SceneHandle,
        object: SceneHandle,
        placement: Placement,
        altitude: f32,
        raw_text: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let target_position = match placement {
            Placement::Relative { x_offset, z_offset } => Vector3::new(x_offset, altitude, z_offset),
            Placement::Absolute { .. } => Vector3::new(0.0, altitude, 0.0),
        };
        Self {
            tag: tag.into(),
            spin: SpinAxis::from_name(&name),
            name,
            wrapper,
            object,
            placement,
            altitude,
            target_position,
            raw_text: raw_text.into(),
            spin_angle: 0.0,
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.placement, Placement::Absolute { .. })
    }
}

/// Scene nodes and limits that placement works against
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext {
    pub anchor: SceneHandle,
    pub wrapper_template: SceneHandle,
    /// Device coordinate at session start
    pub origin: GeoCoordinate,
    pub inclusion_radius_m: f64,
}

/// Owns every placed object for the lifetime of the session
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: Vec<PlacedObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and apply descriptor text line by line, stopping at the first failure.
    ///
    /// Each entry is applied as soon as it parses, so a failing entry is
    /// reported even when a later line is malformed. Returns whether the
    /// descriptor asked for the info overlay.
    pub fn apply_descriptor(
        &mut self,
        scene: &mut dyn SceneRenderer,
        ctx: &PlacementContext,
        text: &str,
    ) -> Result<bool> {
        let mut show_info = false;
        let mut applied = 0usize;
        for line in descriptor::lines(text) {
            match line? {
                DescriptorLine::ShowInfo => show_info = true,
                DescriptorLine::Entry(entry) => {
                    self.apply(scene, ctx, &entry)?;
                    applied += 1;
                }
            }
        }
        info!(objects = self.objects.len(), "applied {} descriptor entries", applied);
        Ok(show_info)
    }

    pub fn apply(
        &mut self,
        scene: &mut dyn SceneRenderer,
        ctx: &PlacementContext,
        entry: &DescriptorEntry,
    ) -> Result<()> {
        match &entry.command {
            PlacementCommand::Remove { tag } => self.remove_by_tag(scene, tag, &entry.line),
            PlacementCommand::Absolute {
                tag,
                name,
                latitude,
                longitude,
                altitude,
            } => self
                .apply_absolute(
                    scene,
                    ctx,
                    &entry.line,
                    tag,
                    name,
                    GeoCoordinate::new(*latitude, *longitude),
                    *altitude,
                )
                .map(|_| ()),
            PlacementCommand::Relative {
                tag,
                name,
                x_offset,
                z_offset,
                altitude,
            } => self.apply_relative(scene, ctx, &entry.line, tag, name, *x_offset, *z_offset, *altitude),
        }
    }

    /// Place a geo-anchored object; returns false when it lies outside the inclusion radius
    #[allow(clippy::too_many_arguments)]
    pub fn apply_absolute(
        &mut self,
        scene: &mut dyn SceneRenderer,
        ctx: &PlacementContext,
        line: &str,
        tag: &str,
        name: &str,
        declared: GeoCoordinate,
        altitude: f32,
    ) -> Result<bool> {
        let template = scene
            .find_template_by_tag(tag)
            .ok_or_else(|| EngineError::unresolved(tag, line))?;

        let geo = declared.or_axes_of(&ctx.origin);
        let distance = geo.distance_to(&ctx.origin);
        if distance > ctx.inclusion_radius_m {
            debug!(tag, name, distance, "object outside inclusion radius, skipped");
            return Ok(false);
        }

        let (wrapper, object) = spawn(scene, ctx, template, name)?;
        let mut placed = PlacedObject::new(
            tag,
            name,
            wrapper,
            object,
            Placement::Absolute { geo },
            altitude,
            line,
        );
        placed.target_position = absolute_target(&geo, altitude, &ctx.origin);
        debug!(tag, name, distance, "placed absolute object");
        self.objects.push(placed);
        Ok(true)
    }

    /// Place an object at a fixed offset from the scene origin
    #[allow(clippy::too_many_arguments)]
    pub fn apply_relative(
        &mut self,
        scene: &mut dyn SceneRenderer,
        ctx: &PlacementContext,
        line: &str,
        tag: &str,
        name: &str,
        x_offset: f32,
        z_offset: f32,
        altitude: f32,
    ) -> Result<()> {
        let template = scene
            .find_template_by_tag(tag)
            .ok_or_else(|| EngineError::unresolved(tag, line))?;

        let (wrapper, object) = spawn(scene, ctx, template, name)?;
        let placed = PlacedObject::new(
            tag,
            name,
            wrapper,
            object,
            Placement::Relative { x_offset, z_offset },
            altitude,
            line,
        );
        scene.set_position(wrapper, placed.target_position);
        debug!(tag, name, x_offset, z_offset, "placed relative object");
        self.objects.push(placed);
        Ok(())
    }

    /// Destroy the scene node carrying `tag`
    pub fn remove_by_tag(&mut self, scene: &mut dyn SceneRenderer, tag: &str, line: &str) -> Result<()> {
        let handle = scene
            .find_template_by_tag(tag)
            .ok_or_else(|| EngineError::unresolved(tag, line))?;

        scene.destroy(handle, REMOVE_DELAY);
        self.objects
            .retain(|o| o.object != handle && o.wrapper != handle);
        debug!(tag, %handle, "removed scene node");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, object: PlacedObject) {
        self.objects.push(object);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlacedObject> {
        self.objects.iter_mut()
    }

    pub fn last(&self) -> Option<&PlacedObject> {
        self.objects.last()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Instantiate a wrapper under the anchor and a template copy inside it
fn spawn(
    scene: &mut dyn SceneRenderer,
    ctx: &PlacementContext,
    template: SceneHandle,
    name: &str,
) -> Result<(SceneHandle, SceneHandle)> {
    let wrapper = scene
        .instantiate(ctx.wrapper_template)
        .ok_or_else(|| EngineError::Instantiation {
            what: "wrapper".to_string(),
        })?;
    scene.set_parent(wrapper, ctx.anchor);

    let object = scene
        .instantiate(template)
        .ok_or_else(|| EngineError::Instantiation {
            what: format!("'{name}'"),
        })?;
    scene.set_parent(object, wrapper);
    scene.set_name(object, name);

    Ok((wrapper, object))
}
