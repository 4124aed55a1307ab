//! Clip shapes edited through a handle object.
//!
//! While a clip is being edited the target carries an absolutely positioned
//! clip region, and a visible handle with the same geometry sits on top of
//! the scene. Dragging the handle drags the region. When the handle loses
//! the selection its transform is baked into the target's local space and
//! the handle goes away.
//!
//! Sessions live only as long as the scene content they were opened on. A
//! document load drops them without touching the scene, and any handle the
//! loaded document carries is picked up again as an open session.

use super::transform::world_to_local;
use crate::error::{KernelError, KernelResult, SceneError};
use crate::kernel::{
    Kernel, ModuleDef, Plugin, PluginContext, PluginDescriptor, parse_args, to_value,
};
use crate::scene::{
    ObjectId, ObjectKind, Scene, SceneEvent, SceneEventKind, SceneObject, regular_polygon_points,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Plugin name.
pub const NAME: &str = "clip-shape";

pub const ADD_CLIP_SHAPE: &str = "add_clip_shape";
pub const REMOVE_CLIP_SHAPE: &str = "remove_clip_shape";

/// Extra property marking a handle with the id of the object it clips.
pub const HANDLE_MARKER: &str = "clipHandleFor";

/// Size of a new clip relative to the target.
const INITIAL_FRACTION: f64 = 0.5;

const EVENTS: [SceneEventKind; 7] = [
    SceneEventKind::ObjectAdded,
    SceneEventKind::ObjectMoving,
    SceneEventKind::ObjectScaling,
    SceneEventKind::ObjectRotating,
    SceneEventKind::SelectionUpdated,
    SceneEventKind::SelectionCleared,
    SceneEventKind::ObjectRemoved,
];

/// Shape family of a clip region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipShape {
    #[default]
    Rect,
    Ellipse,
    Triangle,
    Polygon,
}

fn default_sides() -> usize {
    5
}

/// Arguments of `add_clip_shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRequest {
    pub target: ObjectId,
    #[serde(default)]
    pub shape: ClipShape,
    /// Vertex count for [`ClipShape::Polygon`].
    #[serde(default = "default_sides")]
    pub sides: usize,
    #[serde(default)]
    pub inverted: bool,
}

impl ClipRequest {
    pub fn new(target: ObjectId, shape: ClipShape) -> Self {
        Self {
            target,
            shape,
            sides: default_sides(),
            inverted: false,
        }
    }

    pub fn sides(mut self, sides: usize) -> Self {
        self.sides = sides;
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RemoveRequest {
    target: ObjectId,
}

/// Module definition for [`Kernel::register`].
pub fn module() -> ModuleDef {
    let descriptor = PluginDescriptor::new(NAME)
        .api(ADD_CLIP_SHAPE)
        .api(REMOVE_CLIP_SHAPE)
        .subscribe(&EVENTS);
    ModuleDef::new(descriptor, |_ctx, _options| Box::new(ClipPlugin::default()))
}

/// Build a shape of `family` centred on `center`, in scene space.
fn build_shape(
    family: ClipShape,
    sides: usize,
    center: Point,
    width: f64,
    height: f64,
    angle: f64,
) -> SceneObject {
    let mut shape = match family {
        ClipShape::Rect => SceneObject::new(ObjectKind::Rect, 0.0, 0.0, width, height),
        ClipShape::Ellipse => SceneObject::new(ObjectKind::Ellipse, 0.0, 0.0, width, height),
        ClipShape::Triangle => SceneObject::new(ObjectKind::Triangle, 0.0, 0.0, width, height),
        ClipShape::Polygon => SceneObject::polygon(regular_polygon_points(sides, width, height)),
    };
    shape.angle = angle;
    shape.set_center(center);
    shape
}

/// Copy the transform of `from` onto `to`.
fn copy_geometry(from: &SceneObject, to: &mut SceneObject) {
    to.left = from.left;
    to.top = from.top;
    to.width = from.width;
    to.height = from.height;
    to.scale_x = from.scale_x;
    to.scale_y = from.scale_y;
    to.angle = from.angle;
}

/// One clip being edited.
#[derive(Debug, Clone, PartialEq)]
struct ClipSession {
    target: ObjectId,
    handle: ObjectId,
    /// Scene generation the session was opened on.
    generation: u64,
}

/// The clip-shape plugin.
#[derive(Debug, Default)]
pub struct ClipPlugin {
    sessions: Vec<ClipSession>,
}

impl ClipPlugin {
    /// Whether a clip on `target` is currently being edited.
    pub fn is_editing(&self, target: &ObjectId) -> bool {
        self.sessions.iter().any(|s| &s.target == target)
    }

    /// Handle of the clip being edited on `target`.
    pub fn handle_of(&self, target: &ObjectId) -> Option<&ObjectId> {
        self.sessions
            .iter()
            .find(|s| &s.target == target)
            .map(|s| &s.handle)
    }

    fn take_session(&mut self, matches: impl Fn(&ClipSession) -> bool) -> Option<ClipSession> {
        let index = self.sessions.iter().position(matches)?;
        Some(self.sessions.remove(index))
    }

    fn add(&mut self, scene: &mut Scene, request: ClipRequest) -> KernelResult<ObjectId> {
        if request.shape == ClipShape::Polygon && request.sides < 3 {
            return Err(KernelError::invalid_arguments(
                ADD_CLIP_SHAPE,
                format!("a polygon needs at least 3 sides, got {}", request.sides),
            ));
        }
        let target = scene
            .object(&request.target)
            .cloned()
            .ok_or_else(|| SceneError::ObjectNotFound(request.target.clone()))?;
        if target.is_workspace() || target.extra.contains_key(HANDLE_MARKER) {
            return Err(KernelError::invalid_arguments(
                ADD_CLIP_SHAPE,
                format!("`{}` cannot be clipped", target.id),
            ));
        }
        if target.is_zero_area() {
            return Err(KernelError::invalid_arguments(
                ADD_CLIP_SHAPE,
                format!("`{}` has no area", target.id),
            ));
        }

        // A target has at most one clip in edit.
        if let Some(previous) = self.take_session(|s| s.target == target.id) {
            bake(scene, &previous);
        }

        let region = {
            let mut region = build_shape(
                request.shape,
                request.sides,
                target.center(),
                target.scaled_width().abs() * INITIAL_FRACTION,
                target.scaled_height().abs() * INITIAL_FRACTION,
                target.angle,
            );
            region.visible = false;
            region.selectable = false;
            region.absolute_positioned = true;
            region.inverted = request.inverted;
            region
        };

        let mut handle = region.clone().with_id(ObjectId::new()).with_extra(
            HANDLE_MARKER,
            Value::from(target.id.as_str()),
        );
        handle.visible = true;
        handle.selectable = true;
        handle.absolute_positioned = false;
        handle.inverted = false;
        handle.opacity = 0.5;

        scene.modify(&target.id, |object| object.clip_path = Some(Box::new(region)))?;
        let handle_id = scene.add(handle);
        scene.set_active_object(&handle_id)?;
        scene.request_render();

        log::debug!("Editing {:?} clip on {}", request.shape, target.id);
        self.sessions.push(ClipSession {
            target: target.id,
            handle: handle_id.clone(),
            generation: scene.generation(),
        });
        Ok(handle_id)
    }

    /// Drop the clip of `target`, editing or not. Returns whether one existed.
    fn remove(&mut self, scene: &mut Scene, target: &ObjectId) -> KernelResult<bool> {
        if let Some(session) = self.take_session(|s| &s.target == target) {
            scene.remove(&session.handle);
        }
        let had_clip = scene
            .object(target)
            .ok_or_else(|| SceneError::ObjectNotFound(target.clone()))?
            .clip_path
            .is_some();
        if had_clip {
            scene.modify(target, |object| object.clip_path = None)?;
            scene.request_render();
        }
        Ok(had_clip)
    }

    /// Keep the region in lockstep with a handle being transformed.
    fn follow_handle(&self, scene: &mut Scene, handle_id: &ObjectId) {
        let Some(session) = self.sessions.iter().find(|s| &s.handle == handle_id) else {
            return;
        };
        let Some(handle) = scene.object(handle_id).cloned() else {
            return;
        };
        let region = scene
            .object_mut(&session.target)
            .and_then(|target| target.clip_path.as_deref_mut());
        if let Some(region) = region {
            copy_geometry(&handle, region);
        }
    }

    fn on_deselected(&mut self, scene: &mut Scene, deselected: &[ObjectId]) {
        for id in deselected {
            if let Some(session) = self.take_session(|s| &s.handle == id) {
                bake(scene, &session);
            }
        }
    }

    /// Forget sessions opened before the last document load.
    fn drop_stale(&mut self, scene: &Scene) {
        let generation = scene.generation();
        self.sessions.retain(|s| {
            let live = s.generation == generation;
            if !live {
                log::debug!("Scene reloaded, closing clip session on {}", s.target);
            }
            live
        });
    }

    /// Resume editing when a handle shows up in loaded content.
    fn adopt(&mut self, scene: &Scene, id: &ObjectId) {
        if self.sessions.iter().any(|s| &s.handle == id) {
            return;
        }
        let Some(target) = scene
            .object(id)
            .and_then(|handle| handle.extra.get(HANDLE_MARKER))
            .and_then(Value::as_str)
            .map(ObjectId::from)
        else {
            return;
        };
        let editable = scene
            .object(&target)
            .and_then(|t| t.clip_path.as_deref())
            .is_some_and(|region| region.absolute_positioned);
        if !editable || self.is_editing(&target) {
            return;
        }
        log::debug!("Resuming clip session on {}", target);
        self.sessions.push(ClipSession {
            target,
            handle: id.clone(),
            generation: scene.generation(),
        });
    }

    fn on_removed(&mut self, scene: &mut Scene, id: &ObjectId) {
        if scene.object(id).is_some() {
            return;
        }
        if let Some(session) = self.take_session(|s| &s.target == id) {
            log::debug!("Clip target {} removed, discarding its handle", id);
            scene.remove(&session.handle);
        } else if let Some(session) = self.take_session(|s| &s.handle == id) {
            log::debug!("Clip handle {} removed, dropping the clip", id);
            if let Err(e) = scene.modify(&session.target, |object| object.clip_path = None) {
                log::warn!("Could not drop clip: {}", e);
            }
        }
    }
}

/// Bake the handle's transform into the target's local space and remove the
/// handle.
fn bake(scene: &mut Scene, session: &ClipSession) {
    let Some(handle) = scene.remove(&session.handle) else {
        return;
    };
    let Some(target) = scene.object(&session.target) else {
        return;
    };
    let Some(center) = world_to_local(handle.center(), target.transform()) else {
        log::warn!("Clip target {} is degenerate, clip left in scene space", target.id);
        return;
    };
    let angle = handle.angle - target.angle;
    let scale_x = handle.scale_x / target.scale_x;
    let scale_y = handle.scale_y / target.scale_y;

    let result = scene.modify(&session.target, |object| {
        if let Some(region) = object.clip_path.as_deref_mut() {
            copy_geometry(&handle, region);
            region.angle = angle;
            region.scale_x = scale_x;
            region.scale_y = scale_y;
            region.set_center(center);
            region.absolute_positioned = false;
        }
    });
    match result {
        Ok(()) => scene.request_render(),
        Err(e) => log::warn!("Could not bake clip: {}", e),
    }
}

impl Plugin for ClipPlugin {
    fn on_scene_event(&mut self, ctx: &PluginContext<'_>, event: &SceneEvent) {
        let mut scene = ctx.scene().borrow_mut();
        self.drop_stale(&scene);
        match event {
            SceneEvent::ObjectAdded(id) => self.adopt(&scene, id),
            SceneEvent::ObjectMoving(id)
            | SceneEvent::ObjectScaling { id, .. }
            | SceneEvent::ObjectRotating(id) => self.follow_handle(&mut scene, id),
            SceneEvent::SelectionUpdated { .. } | SceneEvent::SelectionCleared { .. } => {
                self.on_deselected(&mut scene, event.deselected())
            }
            SceneEvent::ObjectRemoved(id) => self.on_removed(&mut scene, id),
            _ => {}
        }
    }

    fn exports(&self) -> &[&'static str] {
        &[ADD_CLIP_SHAPE, REMOVE_CLIP_SHAPE]
    }

    fn call(&mut self, ctx: &PluginContext<'_>, method: &str, args: Value) -> KernelResult<Value> {
        let mut scene = ctx.scene().borrow_mut();
        self.drop_stale(&scene);
        match method {
            ADD_CLIP_SHAPE => {
                let handle = self.add(&mut scene, parse_args(method, args)?)?;
                Ok(json!({ "handle": handle }))
            }
            REMOVE_CLIP_SHAPE => {
                let RemoveRequest { target } = parse_args(method, args)?;
                to_value(method, self.remove(&mut scene, &target)?)
            }
            _ => Err(KernelError::UnknownApi(method.to_string())),
        }
    }

    fn destroy(&mut self, ctx: &PluginContext<'_>) {
        let mut scene = ctx.scene().borrow_mut();
        self.drop_stale(&scene);
        for session in std::mem::take(&mut self.sessions) {
            bake(&mut scene, &session);
        }
    }
}

#[derive(Deserialize)]
struct AddResponse {
    handle: ObjectId,
}

/// Typed access to the clip-shape plugin's API.
pub trait ClipApi {
    /// Start editing a clip; returns the handle's id.
    fn add_clip_shape(&self, request: &ClipRequest) -> KernelResult<ObjectId>;
    fn remove_clip_shape(&self, target: &ObjectId) -> KernelResult<bool>;
}

impl ClipApi for Kernel {
    fn add_clip_shape(&self, request: &ClipRequest) -> KernelResult<ObjectId> {
        let args = to_value(ADD_CLIP_SHAPE, request)?;
        let AddResponse { handle } = parse_args(ADD_CLIP_SHAPE, self.invoke(ADD_CLIP_SHAPE, args)?)?;
        Ok(handle)
    }

    fn remove_clip_shape(&self, target: &ObjectId) -> KernelResult<bool> {
        let args = to_value(
            REMOVE_CLIP_SHAPE,
            RemoveRequest {
                target: target.clone(),
            },
        )?;
        parse_args(REMOVE_CLIP_SHAPE, self.invoke(REMOVE_CLIP_SHAPE, args)?)
    }
}
