//! Polygon vertex editing.

use super::transform::world_to_local;
use crate::error::{KernelError, KernelResult, SceneError};
use crate::kernel::{
    Kernel, ModuleDef, Plugin, PluginContext, PluginDescriptor, parse_args, to_value,
};
use crate::scene::{Controls, ObjectId, ObjectKind, Scene, SceneEvent, SceneEventKind, SceneObject};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Plugin name.
pub const NAME: &str = "polygon-modify";

pub const TOGGLE_POLYGON_EDIT: &str = "toggle_polygon_edit";
pub const IS_POLYGON_EDITING: &str = "is_polygon_editing";

const EVENTS: [SceneEventKind; 4] = [
    SceneEventKind::VertexDragging,
    SceneEventKind::SelectionUpdated,
    SceneEventKind::SelectionCleared,
    SceneEventKind::ObjectRemoved,
];

/// Move vertex `index` of `polygon` to the scene point `pointer`.
///
/// The previous vertex (wrapping) is the anchor: it keeps its scene
/// position while width, height and path offset are re-derived. Returns
/// `false` and leaves the polygon untouched when the index is out of range
/// or the polygon is degenerate.
pub fn move_vertex(polygon: &mut SceneObject, index: usize, pointer: Point) -> bool {
    let count = polygon.points.len();
    if index >= count || polygon.is_zero_area() {
        return false;
    }
    let anchor = (index + count - 1) % count;
    let Some(anchor_before) = polygon.vertex_position(anchor) else {
        return false;
    };
    let Some(local) = world_to_local(pointer, polygon.rotation_frame()) else {
        return false;
    };

    let authored = Point::new(
        local.x * polygon.width / polygon.scaled_width() + polygon.path_offset.x,
        local.y * polygon.height / polygon.scaled_height() + polygon.path_offset.y,
    );
    polygon.points[index] = authored;
    polygon.update_dimensions();

    if let Some(anchor_after) = polygon.vertex_position(anchor) {
        let shift = anchor_before - anchor_after;
        polygon.left += shift.x;
        polygon.top += shift.y;
    }
    true
}

/// Arguments of both APIs; without an id the active object is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Target {
    #[serde(default)]
    id: Option<ObjectId>,
}

/// Module definition for [`Kernel::register`].
pub fn module() -> ModuleDef {
    let descriptor = PluginDescriptor::new(NAME)
        .api(TOGGLE_POLYGON_EDIT)
        .api(IS_POLYGON_EDITING)
        .subscribe(&EVENTS);
    ModuleDef::new(descriptor, |_ctx, _options| {
        Box::new(PolygonEditPlugin::default())
    })
}

/// The polygon vertex editing plugin.
#[derive(Debug, Default)]
pub struct PolygonEditPlugin {
    editing: Option<ObjectId>,
}

impl PolygonEditPlugin {
    /// The polygon currently in edit state.
    pub fn editing(&self) -> Option<&ObjectId> {
        self.editing.as_ref()
    }

    fn resolve(scene: &Scene, method: &str, target: Target) -> KernelResult<ObjectId> {
        match target.id {
            Some(id) => Ok(id),
            None => scene
                .active_object()
                .map(|o| o.id.clone())
                .ok_or_else(|| KernelError::invalid_arguments(method, "no active object")),
        }
    }

    fn toggle(&mut self, scene: &mut Scene, id: ObjectId) -> KernelResult<bool> {
        if self.editing.as_ref() == Some(&id) {
            self.exit(scene);
            return Ok(false);
        }

        let object = scene
            .object(&id)
            .ok_or_else(|| SceneError::ObjectNotFound(id.clone()))?;
        if object.kind != ObjectKind::Polygon || object.points.len() < 3 {
            return Err(KernelError::invalid_arguments(
                TOGGLE_POLYGON_EDIT,
                format!("`{}` is not an editable polygon", id),
            ));
        }

        self.exit(scene);
        if let Some(object) = scene.object_mut(&id) {
            object.controls = Controls::Vertices;
        }
        log::debug!("Editing vertices of {}", id);
        self.editing = Some(id);
        scene.request_render();
        Ok(true)
    }

    /// Leave edit state, restoring the standard handles.
    fn exit(&mut self, scene: &mut Scene) {
        let Some(id) = self.editing.take() else {
            return;
        };
        if let Some(object) = scene.object_mut(&id) {
            object.controls = Controls::Standard;
        }
        scene.request_render();
    }

    fn drag_vertex(&self, scene: &mut Scene, id: &ObjectId, index: usize, point: Point) {
        if self.editing.as_ref() != Some(id) {
            return;
        }
        let moved = scene
            .object_mut(id)
            .is_some_and(|polygon| move_vertex(polygon, index, point));
        if moved {
            scene.request_render();
        } else {
            log::debug!("Vertex {} of {} not moved", index, id);
        }
    }
}

impl Plugin for PolygonEditPlugin {
    fn on_scene_event(&mut self, ctx: &PluginContext<'_>, event: &SceneEvent) {
        let mut scene = ctx.scene().borrow_mut();
        match event {
            SceneEvent::VertexDragging { id, index, point } => {
                self.drag_vertex(&mut scene, id, *index, *point)
            }
            SceneEvent::ObjectRemoved(id) if self.editing.as_ref() == Some(id) => {
                self.editing = None;
            }
            SceneEvent::SelectionUpdated { .. } | SceneEvent::SelectionCleared { .. } => {
                let left = self
                    .editing
                    .as_ref()
                    .is_some_and(|id| event.deselected().contains(id));
                if left {
                    self.exit(&mut scene);
                }
            }
            _ => {}
        }
    }

    fn exports(&self) -> &[&'static str] {
        &[TOGGLE_POLYGON_EDIT, IS_POLYGON_EDITING]
    }

    fn call(&mut self, ctx: &PluginContext<'_>, method: &str, args: Value) -> KernelResult<Value> {
        let mut scene = ctx.scene().borrow_mut();
        let target = if args.is_null() {
            Target::default()
        } else {
            parse_args(method, args)?
        };
        let id = Self::resolve(&scene, method, target)?;
        match method {
            TOGGLE_POLYGON_EDIT => {
                let editing = self.toggle(&mut scene, id)?;
                Ok(json!({ "editing": editing }))
            }
            IS_POLYGON_EDITING => to_value(method, self.editing.as_ref() == Some(&id)),
            _ => Err(KernelError::UnknownApi(method.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct ToggleResponse {
    editing: bool,
}

/// Typed access to the polygon editing plugin's API.
pub trait PolygonApi {
    /// Toggle vertex editing; returns whether the polygon is now in edit state.
    fn toggle_polygon_edit(&self, id: &ObjectId) -> KernelResult<bool>;
    fn is_polygon_editing(&self, id: &ObjectId) -> KernelResult<bool>;
}

fn target_args(method: &str, id: &ObjectId) -> KernelResult<Value> {
    to_value(method, Target { id: Some(id.clone()) })
}

impl PolygonApi for Kernel {
    fn toggle_polygon_edit(&self, id: &ObjectId) -> KernelResult<bool> {
        let args = target_args(TOGGLE_POLYGON_EDIT, id)?;
        let ToggleResponse { editing } =
            parse_args(TOGGLE_POLYGON_EDIT, self.invoke(TOGGLE_POLYGON_EDIT, args)?)?;
        Ok(editing)
    }

    fn is_polygon_editing(&self, id: &ObjectId) -> KernelResult<bool> {
        let args = target_args(IS_POLYGON_EDITING, id)?;
        parse_args(IS_POLYGON_EDITING, self.invoke(IS_POLYGON_EDITING, args)?)
    }
}
