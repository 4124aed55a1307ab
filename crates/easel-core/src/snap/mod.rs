//! Alignment guides: snap the dragged or scaled object to its neighbours.
//!
//! Candidates are recomputed on every move tick and drawn on the overlay
//! layer after each render; nothing here is ever written to the document
//! except the snapped geometry of the active object.

mod align;
mod candidate;

pub use align::{
    DEFAULT_LINE_OFFSET, DEFAULT_MARGIN, ObjectBox, ScaleSnap, SnapSettings, TranslateSnap,
    in_range, snap_scale, snap_translate,
};
pub use candidate::{Axis, SnapCandidate};

use crate::error::KernelResult;
use crate::kernel::{
    Kernel, ModuleDef, Plugin, PluginContext, PluginDescriptor, parse_args, parse_options, to_value,
};
use crate::scene::{
    Corner, MIN_SCALED_SIZE, ObjectId, Scene, SceneEvent, SceneEventKind, SceneObject,
    SerializableColor,
};
use kurbo::Line;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin name.
pub const NAME: &str = "aligning-guidelines";

pub const SNAP_CANDIDATES: &str = "snap_candidates";
pub const SET_SNAPPING: &str = "set_snapping";

/// Rotations closer than this to a multiple of 360° count as unrotated.
const ANGLE_EPSILON: f64 = 1e-6;

const EVENTS: [SceneEventKind; 7] = [
    SceneEventKind::PointerDown,
    SceneEventKind::ObjectMoving,
    SceneEventKind::ObjectScaling,
    SceneEventKind::ObjectRotating,
    SceneEventKind::PointerUp,
    SceneEventKind::BeforeRender,
    SceneEventKind::AfterRender,
];

/// Options accepted at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapOptions {
    /// Snap tolerance in scene units.
    pub margin: f64,
    /// Guide overshoot past the aligned objects.
    pub line_offset: f64,
    /// Guide stroke width in screen pixels.
    pub line_width: f64,
    pub line_color: SerializableColor,
    pub enabled: bool,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            line_offset: DEFAULT_LINE_OFFSET,
            line_width: 1.0,
            line_color: SerializableColor::red(),
            enabled: true,
        }
    }
}

impl SnapOptions {
    fn settings(&self) -> SnapSettings {
        SnapSettings {
            margin: self.margin,
            line_offset: self.line_offset,
        }
    }
}

/// Module definition for [`Kernel::register`].
pub fn module() -> ModuleDef {
    let descriptor = PluginDescriptor::new(NAME)
        .api(SNAP_CANDIDATES)
        .api(SET_SNAPPING)
        .subscribe(&EVENTS);
    ModuleDef::new(descriptor, |_ctx, options| {
        Box::new(SnapPlugin::new(parse_options(NAME, options)))
    })
}

/// Geometry of the active object at pointer-down.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReferenceGeometry {
    left: f64,
    top: f64,
    /// Scaled width.
    width: f64,
    /// Scaled height.
    height: f64,
}

impl ReferenceGeometry {
    fn of(object: &SceneObject) -> Self {
        Self {
            left: object.left,
            top: object.top,
            width: object.scaled_width(),
            height: object.scaled_height(),
        }
    }
}

/// Handle visibility saved while a drag hides it.
#[derive(Debug, Clone, Copy)]
struct SavedHandles {
    has_controls: bool,
    has_borders: bool,
}

/// State of one drag gesture, from pointer-down to pointer-up.
#[derive(Debug, Clone)]
struct DragContext {
    target: ObjectId,
    reference: ReferenceGeometry,
    hidden: Option<SavedHandles>,
}

impl DragContext {
    fn new(object: &SceneObject) -> Self {
        Self {
            target: object.id.clone(),
            reference: ReferenceGeometry::of(object),
            hidden: None,
        }
    }

    /// Hide the target's handles for the rest of the drag.
    fn hide_handles(&mut self, scene: &mut Scene) {
        if self.hidden.is_some() {
            return;
        }
        if let Some(object) = scene.object_mut(&self.target) {
            self.hidden = Some(SavedHandles {
                has_controls: object.has_controls,
                has_borders: object.has_borders,
            });
            object.has_controls = false;
            object.has_borders = false;
        }
    }

    fn restore_handles(&mut self, scene: &mut Scene) {
        let Some(saved) = self.hidden.take() else {
            return;
        };
        if let Some(object) = scene.object_mut(&self.target) {
            object.has_controls = saved.has_controls;
            object.has_borders = saved.has_borders;
        }
    }
}

/// Objects the active object may align with, back to front.
fn snap_targets(scene: &Scene, active: &SceneObject) -> Vec<ObjectBox> {
    scene
        .objects()
        .iter()
        .filter(|o| {
            o.id != active.id
                && !o.is_workspace()
                && o.visible
                && !(active.is_guideline() && o.is_guideline())
                && !(o.is_zero_area() && !o.is_guideline())
        })
        .map(ObjectBox::of)
        .collect()
}

fn is_unrotated(object: &SceneObject) -> bool {
    let angle = object.angle.rem_euclid(360.0);
    angle < ANGLE_EPSILON || 360.0 - angle < ANGLE_EPSILON
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SetSnapping {
    enabled: bool,
}

/// The snapping plugin.
pub struct SnapPlugin {
    options: SnapOptions,
    candidates: Vec<SnapCandidate>,
    drag: Option<DragContext>,
}

impl SnapPlugin {
    pub fn new(options: SnapOptions) -> Self {
        Self {
            options,
            candidates: Vec::new(),
            drag: None,
        }
    }

    pub fn options(&self) -> &SnapOptions {
        &self.options
    }

    /// Candidates of the current tick.
    pub fn candidates(&self) -> &[SnapCandidate] {
        &self.candidates
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The drag context for `object`, started lazily if pointer-down was
    /// not seen for it.
    fn drag_for(&mut self, object: &SceneObject) -> &mut DragContext {
        let stale = self.drag.as_ref().is_none_or(|d| d.target != object.id);
        if stale {
            self.drag = Some(DragContext::new(object));
        }
        self.drag.get_or_insert_with(|| DragContext::new(object))
    }

    fn on_pointer_down(&mut self, scene: &Scene) {
        self.candidates.clear();
        self.drag = scene
            .gesture()
            .and_then(|g| scene.object(&g.target))
            .map(DragContext::new);
    }

    fn on_moving(&mut self, scene: &mut Scene, id: &ObjectId) {
        self.candidates.clear();
        let Some(object) = scene.object(id).cloned() else {
            return;
        };
        let settings = self.options.settings();
        let drag = self.drag_for(&object);
        drag.hide_handles(scene);
        if object.is_zero_area() && !object.is_guideline() {
            return;
        }

        let active = ObjectBox::new(
            object.center(),
            drag.reference.width.abs(),
            drag.reference.height.abs(),
        );
        let snap = snap_translate(&active, &snap_targets(scene, &object), settings);
        if snap.center != active.center {
            if let Some(target) = scene.object_mut(id) {
                target.set_center(snap.center);
            }
        }
        self.candidates = snap.candidates;
        scene.request_render();
    }

    fn on_scaling(&mut self, scene: &mut Scene, id: &ObjectId, corner: Corner) {
        self.candidates.clear();
        let Some(object) = scene.object(id).cloned() else {
            return;
        };
        let settings = self.options.settings();
        let drag = self.drag_for(&object);
        drag.hide_handles(scene);
        let reference = drag.reference;
        if object.is_guideline() || object.is_zero_area() || !is_unrotated(&object) {
            return;
        }

        let snap = snap_scale(&ObjectBox::of(&object), corner, &snap_targets(scene, &object), settings);
        let Some(target) = scene.object_mut(id) else {
            return;
        };
        if let Some(edge) = snap.x {
            let (left, width) = if corner.moves_right() {
                (reference.left, edge - reference.left)
            } else {
                (edge, reference.left + reference.width - edge)
            };
            if width >= MIN_SCALED_SIZE {
                target.scale_x = width / target.width;
                target.left = left;
            }
        }
        if let Some(edge) = snap.y {
            let (top, height) = if corner.moves_bottom() {
                (reference.top, edge - reference.top)
            } else {
                (edge, reference.top + reference.height - edge)
            };
            if height >= MIN_SCALED_SIZE {
                target.scale_y = height / target.height;
                target.top = top;
            }
        }
        self.candidates = snap.candidates;
        scene.request_render();
    }

    fn on_rotating(&mut self, scene: &mut Scene, id: &ObjectId) {
        self.candidates.clear();
        if let Some(object) = scene.object(id).cloned() {
            self.drag_for(&object).hide_handles(scene);
        }
    }

    fn on_release(&mut self, scene: &mut Scene) {
        self.candidates.clear();
        if let Some(mut drag) = self.drag.take() {
            drag.restore_handles(scene);
        }
        scene.request_render();
    }

    fn draw(&self, scene: &mut Scene) {
        let transform = scene.viewport().transform();
        let color = self.options.line_color.into();
        for candidate in &self.candidates {
            let line = candidate.line();
            scene.overlay_mut().draw_line(
                Line::new(transform * line.p0, transform * line.p1),
                color,
                self.options.line_width,
            );
        }
    }

    fn set_enabled(&mut self, scene: &mut Scene, enabled: bool) {
        self.options.enabled = enabled;
        if !enabled {
            self.candidates.clear();
            scene.request_render();
        }
    }
}

impl Plugin for SnapPlugin {
    fn on_scene_event(&mut self, ctx: &PluginContext<'_>, event: &SceneEvent) {
        let mut scene = ctx.scene().borrow_mut();
        match event {
            SceneEvent::BeforeRender => scene.overlay_mut().clear(),
            SceneEvent::AfterRender => self.draw(&mut scene),
            SceneEvent::PointerUp(_) => self.on_release(&mut scene),
            _ if !self.options.enabled => {}
            SceneEvent::PointerDown(_) => self.on_pointer_down(&scene),
            SceneEvent::ObjectMoving(id) => self.on_moving(&mut scene, id),
            SceneEvent::ObjectScaling { id, corner } => self.on_scaling(&mut scene, id, *corner),
            SceneEvent::ObjectRotating(id) => self.on_rotating(&mut scene, id),
            _ => {}
        }
    }

    fn exports(&self) -> &[&'static str] {
        &[SNAP_CANDIDATES, SET_SNAPPING]
    }

    fn call(&mut self, ctx: &PluginContext<'_>, method: &str, args: Value) -> KernelResult<Value> {
        if method == SET_SNAPPING {
            let SetSnapping { enabled } = parse_args(method, args)?;
            self.set_enabled(&mut ctx.scene().borrow_mut(), enabled);
            return to_value(method, SetSnapping { enabled });
        }
        to_value(method, &self.candidates)
    }
}

/// Typed access to the snapping plugin's API.
pub trait SnapApi {
    fn snap_candidates(&self) -> KernelResult<Vec<SnapCandidate>>;
    fn set_snapping(&self, enabled: bool) -> KernelResult<()>;
}

impl SnapApi for Kernel {
    fn snap_candidates(&self) -> KernelResult<Vec<SnapCandidate>> {
        parse_args(SNAP_CANDIDATES, self.invoke(SNAP_CANDIDATES, Value::Null)?)
    }

    fn set_snapping(&self, enabled: bool) -> KernelResult<()> {
        let args = to_value(SET_SNAPPING, SetSnapping { enabled })?;
        self.invoke(SET_SNAPPING, args).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Vec2};
    use serde_json::json;

    fn setup(options: Value) -> (Kernel, ObjectId, ObjectId) {
        let kernel = Kernel::new(Scene::new(1000.0, 1000.0).shared());
        kernel.register(module(), options).unwrap();
        let (a, b) = kernel.update_scene(|scene| {
            scene.add(SceneObject::workspace(1000.0, 1000.0));
            let a = scene.add(SceneObject::rect(100.0, 100.0, 200.0, 50.0));
            let b = scene.add(SceneObject::rect(100.0, 300.0, 200.0, 50.0));
            (a, b)
        });
        (kernel, a, b)
    }

    fn left_top(kernel: &Kernel, id: &ObjectId) -> (f64, f64) {
        let scene = kernel.scene().borrow();
        let object = scene.object(id).unwrap();
        (object.left, object.top)
    }

    #[test]
    fn test_centre_snap_scenario() {
        let (kernel, _a, b) = setup(Value::Null);
        kernel.pointer_down(Point::new(200.0, 325.0));
        kernel.pointer_move(Point::new(203.0, 325.0));

        assert_eq!(left_top(&kernel, &b), (100.0, 300.0));
        let candidates = kernel.snap_candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].axis, Axis::X);
        assert!((candidates[0].coordinate - 200.0).abs() < 1e-9);

        let scene = kernel.scene().borrow();
        assert_eq!(scene.overlay().lines().len(), 1);
        let line = scene.overlay().lines()[0].line;
        assert!((line.p0.x - 200.0).abs() < 1e-9);
        assert!((line.p1.x - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_tolerance_boundary() {
        let (kernel, _a, b) = setup(Value::Null);
        kernel.update_scene(|scene| {
            scene.modify(&b, |o| {
                o.left = 400.0;
                o.width = 100.0;
            })
        })
        .unwrap();

        // b's left edge 4 units right of a's right edge (300).
        kernel.pointer_down(Point::new(450.0, 325.0));
        kernel.pointer_move(Point::new(354.0, 325.0));
        assert_eq!(left_top(&kernel, &b), (300.0, 300.0));
        assert_eq!(kernel.snap_candidates().unwrap().len(), 1);

        // One unit further: no snap, no candidate.
        kernel.pointer_move(Point::new(355.0, 325.0));
        assert_eq!(left_top(&kernel, &b), (305.0, 300.0));
        assert!(kernel.snap_candidates().unwrap().is_empty());
        assert!(kernel.scene().borrow().overlay().is_empty());
    }

    #[test]
    fn test_release_clears_guides_and_restores_handles() {
        let (kernel, _a, b) = setup(Value::Null);
        kernel.pointer_down(Point::new(200.0, 325.0));
        kernel.pointer_move(Point::new(203.0, 325.0));
        {
            let scene = kernel.scene().borrow();
            let object = scene.object(&b).unwrap();
            assert!(!object.has_controls);
            assert!(!object.has_borders);
        }

        let renders = kernel.scene().borrow().render_count();
        kernel.pointer_up(Point::new(203.0, 325.0));

        assert!(kernel.snap_candidates().unwrap().is_empty());
        let scene = kernel.scene().borrow();
        assert!(scene.overlay().is_empty());
        assert_eq!(scene.render_count(), renders + 1);
        let object = scene.object(&b).unwrap();
        assert!(object.has_controls);
        assert!(object.has_borders);
    }

    #[test]
    fn test_snapping_is_zoom_invariant() {
        let (kernel, _a, b) = setup(Value::Null);
        kernel.update_scene(|scene| {
            scene.viewport_mut().set_zoom(2.0);
            scene.viewport_mut().pan_by(Vec2::new(10.0, 20.0));
        });

        // Scene (200, 325) on screen.
        kernel.pointer_down(Point::new(410.0, 670.0));
        kernel.pointer_move(Point::new(416.0, 670.0));
        assert_eq!(left_top(&kernel, &b), (100.0, 300.0));
        {
            let scene = kernel.scene().borrow();
            let line = scene.overlay().lines()[0].line;
            assert!((line.p0.x - 410.0).abs() < 1e-9);
        }

        // 5 scene units off: out of range whatever the zoom.
        kernel.pointer_move(Point::new(420.0, 670.0));
        assert_eq!(left_top(&kernel, &b), (105.0, 300.0));
        assert!(kernel.snap_candidates().unwrap().is_empty());
    }

    #[test]
    fn test_scale_handle_snaps_edge() {
        let (kernel, _a, b) = setup(Value::Null);
        kernel.update_scene(|scene| {
            scene.modify(&b, |o| o.width = 150.0).unwrap();
            scene.set_active_object(&b).unwrap();
        });

        // Right-middle handle of b sits at (250, 325).
        kernel.pointer_down(Point::new(250.0, 325.0));
        kernel.pointer_move(Point::new(297.0, 325.0));

        let scene = kernel.scene().borrow();
        let object = scene.object(&b).unwrap();
        assert!((object.left - 100.0).abs() < 1e-9);
        assert!((object.scaled_width() - 200.0).abs() < 1e-9);
        assert!((object.scale_y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_guides_do_not_snap_to_guides() {
        let kernel = Kernel::new(Scene::new(1000.0, 1000.0).shared());
        kernel.register(module(), Value::Null).unwrap();
        let guide = kernel.update_scene(|scene| {
            let mut other = SceneObject::vertical_guide(100.0, 1000.0);
            other.selectable = false;
            scene.add(other);
            let mut guide = SceneObject::vertical_guide(300.0, 1000.0);
            guide.width = 2.0;
            guide.has_controls = false;
            let id = scene.add(guide);
            scene.set_active_object(&id).unwrap();
            id
        });

        kernel.pointer_down(Point::new(301.0, 500.0));
        // Centres 2 apart: a rect would snap here.
        kernel.pointer_move(Point::new(102.0, 500.0));
        assert_eq!(left_top(&kernel, &guide), (101.0, 0.0));
        assert!(kernel.snap_candidates().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_snapping_leaves_geometry_alone() {
        let (kernel, _a, b) = setup(json!({ "enabled": false }));
        kernel.pointer_down(Point::new(200.0, 325.0));
        kernel.pointer_move(Point::new(203.0, 325.0));
        assert_eq!(left_top(&kernel, &b), (103.0, 300.0));

        kernel.set_snapping(true).unwrap();
        kernel.pointer_move(Point::new(202.0, 325.0));
        assert_eq!(left_top(&kernel, &b), (100.0, 300.0));
    }

    #[test]
    fn test_options_are_read() {
        let (kernel, _a, b) = setup(json!({ "margin": 10, "lineWidth": 2.5 }));
        kernel.pointer_down(Point::new(200.0, 325.0));
        kernel.pointer_move(Point::new(208.0, 325.0));
        assert_eq!(left_top(&kernel, &b), (100.0, 300.0));
        let width = kernel.with_module::<SnapPlugin, _>(NAME, |p| p.options().line_width);
        assert_eq!(width, Some(2.5));
    }
}
