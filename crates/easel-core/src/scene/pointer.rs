//! Pointer gestures: picking, moving, scaling, rotating and vertex dragging.

use super::event::{PointerInfo, SceneEvent};
use super::object::{Controls, ObjectId, SceneObject};
use super::Scene;
use crate::geometry::transform::world_to_local;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Control hit tolerance in screen pixels.
pub const CONTROL_HIT_TOLERANCE: f64 = 8.0;
/// Distance of the rotation control above the top edge, in screen pixels.
pub const ROTATE_CONTROL_OFFSET: f64 = 40.0;
/// Smallest scaled size a scale gesture may produce, in scene units.
pub const MIN_SCALED_SIZE: f64 = 1.0;

/// Scale handle positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Corner {
    pub const ALL: [Corner; 8] = [
        Corner::TopLeft,
        Corner::Top,
        Corner::TopRight,
        Corner::Right,
        Corner::BottomRight,
        Corner::Bottom,
        Corner::BottomLeft,
        Corner::Left,
    ];

    pub fn moves_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::Left | Corner::BottomLeft)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::Right | Corner::BottomRight)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::Top | Corner::TopRight)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::Bottom | Corner::BottomRight)
    }

    /// Position of the handle as a fraction of the object's box.
    fn unit_position(self) -> (f64, f64) {
        let x = if self.moves_left() {
            0.0
        } else if self.moves_right() {
            1.0
        } else {
            0.5
        };
        let y = if self.moves_top() {
            0.0
        } else if self.moves_bottom() {
            1.0
        } else {
            0.5
        };
        (x, y)
    }
}

/// An interactive control of the active object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Scale(Corner),
    Rotate,
    Vertex(usize),
}

/// What the current drag does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    Move,
    Scale(Corner),
    Rotate,
    Vertex(usize),
}

impl From<Control> for GestureAction {
    fn from(control: Control) -> Self {
        match control {
            Control::Scale(corner) => GestureAction::Scale(corner),
            Control::Rotate => GestureAction::Rotate,
            Control::Vertex(index) => GestureAction::Vertex(index),
        }
    }
}

/// The drag in progress between pointer-down and pointer-up.
#[derive(Debug, Clone)]
pub struct TransformGesture {
    pub target: ObjectId,
    pub action: GestureAction,
    /// Pointer-down position in scene space.
    pub start: Point,
    /// The target as it was at pointer-down.
    pub original: SceneObject,
    /// Whether any move tick changed the target.
    pub changed: bool,
}

impl Scene {
    /// Scene-space positions of an object's controls.
    pub fn control_positions(&self, object: &SceneObject) -> Vec<(Control, Point)> {
        match object.controls {
            Controls::Vertices => (0..object.points.len())
                .filter_map(|i| object.vertex_position(i).map(|p| (Control::Vertex(i), p)))
                .collect(),
            Controls::Standard if object.has_controls => {
                let frame = object.origin_frame();
                let (w, h) = (object.scaled_width(), object.scaled_height());
                let mut controls: Vec<(Control, Point)> = Corner::ALL
                    .iter()
                    .map(|&corner| {
                        let (ux, uy) = corner.unit_position();
                        (Control::Scale(corner), frame * Point::new(w * ux, h * uy))
                    })
                    .collect();
                let offset = self.viewport.screen_length(ROTATE_CONTROL_OFFSET);
                controls.push((Control::Rotate, frame * Point::new(w / 2.0, -offset)));
                controls
            }
            Controls::Standard => Vec::new(),
        }
    }

    /// Control of the active object under a scene point.
    fn hit_control(&self, point: Point) -> Option<(ObjectId, Control)> {
        let active = self.active_object()?;
        let tolerance = self.viewport.screen_length(CONTROL_HIT_TOLERANCE);
        self.control_positions(active)
            .into_iter()
            .find(|(_, p)| (*p - point).hypot() <= tolerance)
            .map(|(control, _)| (active.id.clone(), control))
    }

    /// Topmost selectable, visible object under a scene point.
    fn hit_object(&self, point: Point) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.visible && o.selectable && o.contains(point))
            .map(|o| o.id.clone())
    }

    /// Press the primary pointer at a screen position.
    pub fn pointer_down(&mut self, screen: Point) {
        let scene_point = self.viewport.screen_to_scene(screen);
        self.gesture = None;

        let (target, action) = if let Some((id, control)) = self.hit_control(scene_point) {
            (Some(id), Some(GestureAction::from(control)))
        } else if let Some(id) = self.hit_object(scene_point) {
            if self.selection != [id.clone()] {
                self.select(vec![id.clone()]);
            }
            (Some(id), Some(GestureAction::Move))
        } else {
            self.discard_active_object();
            (None, None)
        };

        if let (Some(id), Some(action)) = (&target, action) {
            match self.object(id).cloned() {
                Some(object) if object.locked => {
                    log::debug!("Object {} is locked, ignoring drag", id);
                }
                Some(original) => {
                    self.gesture = Some(TransformGesture {
                        target: id.clone(),
                        action,
                        start: scene_point,
                        original,
                        changed: false,
                    });
                }
                None => {}
            }
        }

        self.push_event(SceneEvent::PointerDown(PointerInfo {
            screen,
            scene: scene_point,
            target,
        }));
    }

    /// Move the pointer; drives the current gesture if there is one.
    pub fn pointer_move(&mut self, screen: Point) {
        let scene_point = self.viewport.screen_to_scene(screen);

        if let Some(mut gesture) = self.gesture.take() {
            let id = gesture.target.clone();
            let event = match gesture.action {
                GestureAction::Move => {
                    let delta = scene_point - gesture.start;
                    self.object_mut(&id).map(|object| {
                        object.left = gesture.original.left + delta.x;
                        object.top = gesture.original.top + delta.y;
                        SceneEvent::ObjectMoving(id.clone())
                    })
                }
                GestureAction::Scale(corner) => {
                    let original = &gesture.original;
                    self.object_mut(&id).map(|object| {
                        apply_scale(object, original, corner, scene_point);
                        SceneEvent::ObjectScaling {
                            id: id.clone(),
                            corner,
                        }
                    })
                }
                GestureAction::Rotate => {
                    let center = gesture.original.center();
                    self.object_mut(&id).map(|object| {
                        let direction = scene_point - center;
                        object.angle = direction.y.atan2(direction.x).to_degrees() + 90.0;
                        object.set_center(center);
                        SceneEvent::ObjectRotating(id.clone())
                    })
                }
                GestureAction::Vertex(index) => Some(SceneEvent::VertexDragging {
                    id: id.clone(),
                    index,
                    point: scene_point,
                }),
            };
            if let Some(event) = event {
                gesture.changed = true;
                self.push_event(event);
            }
            self.gesture = Some(gesture);
        }

        let target = self.hit_object(scene_point);
        self.push_event(SceneEvent::PointerMove(PointerInfo {
            screen,
            scene: scene_point,
            target,
        }));
    }

    /// Release the pointer, committing the gesture.
    pub fn pointer_up(&mut self, screen: Point) {
        let scene_point = self.viewport.screen_to_scene(screen);
        let gesture = self.gesture.take();

        if let Some(gesture) = &gesture {
            if gesture.changed && self.object(&gesture.target).is_some() {
                self.push_event(SceneEvent::ObjectModified(gesture.target.clone()));
            }
        }

        self.push_event(SceneEvent::PointerUp(PointerInfo {
            screen,
            scene: scene_point,
            target: gesture.map(|g| g.target),
        }));
    }
}

/// Resize `object` by dragging `corner` of `original` to `pointer`.
///
/// Works in the original's rotated frame so the opposite edges stay fixed.
fn apply_scale(object: &mut SceneObject, original: &SceneObject, corner: Corner, pointer: Point) {
    let frame = original.origin_frame();
    let Some(local) = world_to_local(pointer, frame) else {
        return;
    };

    let (mut x0, mut x1) = (0.0, original.scaled_width());
    let (mut y0, mut y1) = (0.0, original.scaled_height());
    if corner.moves_left() {
        x0 = local.x.min(x1 - MIN_SCALED_SIZE);
    }
    if corner.moves_right() {
        x1 = local.x.max(x0 + MIN_SCALED_SIZE);
    }
    if corner.moves_top() {
        y0 = local.y.min(y1 - MIN_SCALED_SIZE);
    }
    if corner.moves_bottom() {
        y1 = local.y.max(y0 + MIN_SCALED_SIZE);
    }

    if original.width.abs() > f64::EPSILON {
        object.scale_x = (x1 - x0) / original.width;
    }
    if original.height.abs() > f64::EPSILON {
        object.scale_y = (y1 - y0) / original.height;
    }
    let origin = frame * Point::new(x0, y0);
    object.left = origin.x;
    object.top = origin.y;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneEventKind;

    fn kinds(scene: &mut Scene) -> Vec<SceneEventKind> {
        scene.drain_events().iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_click_selects_topmost_object() {
        let mut scene = Scene::new(800.0, 600.0);
        let back = scene.add(SceneObject::rect(0.0, 0.0, 100.0, 100.0));
        let front = scene.add(SceneObject::rect(50.0, 50.0, 100.0, 100.0));
        scene.drain_events();

        scene.pointer_down(Point::new(75.0, 75.0));
        assert_eq!(scene.selected_ids(), &[front.clone()]);
        assert_eq!(
            kinds(&mut scene),
            vec![SceneEventKind::SelectionCreated, SceneEventKind::PointerDown]
        );
        assert_ne!(back, front);
    }

    #[test]
    fn test_drag_moves_object_and_reports_modified_once() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(0.0, 0.0, 100.0, 100.0));
        scene.drain_events();

        scene.pointer_down(Point::new(50.0, 50.0));
        scene.pointer_move(Point::new(60.0, 55.0));
        scene.pointer_move(Point::new(70.0, 80.0));
        scene.pointer_up(Point::new(70.0, 80.0));

        let object = scene.object(&id).unwrap();
        assert!((object.left - 20.0).abs() < 1e-9);
        assert!((object.top - 30.0).abs() < 1e-9);

        let events = kinds(&mut scene);
        let modified = events.iter().filter(|k| **k == SceneEventKind::ObjectModified).count();
        let moving = events.iter().filter(|k| **k == SceneEventKind::ObjectMoving).count();
        assert_eq!(modified, 1);
        assert_eq!(moving, 2);
    }

    #[test]
    fn test_drag_respects_zoom() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(0.0, 0.0, 100.0, 100.0));
        scene.viewport_mut().set_zoom(2.0);

        scene.pointer_down(Point::new(100.0, 100.0));
        scene.pointer_move(Point::new(120.0, 100.0));
        scene.pointer_up(Point::new(120.0, 100.0));

        assert!((scene.object(&id).unwrap().left - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_from_right_handle_keeps_left_edge() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(100.0, 100.0, 100.0, 50.0));
        scene.set_active_object(&id).unwrap();
        scene.drain_events();

        // Right-middle handle sits at (200, 125).
        scene.pointer_down(Point::new(200.0, 125.0));
        scene.pointer_move(Point::new(300.0, 125.0));

        let object = scene.object(&id).unwrap();
        assert!((object.left - 100.0).abs() < 1e-9);
        assert!((object.scale_x - 2.0).abs() < 1e-9);
        assert!((object.scale_y - 1.0).abs() < 1e-9);
        assert!(scene.drain_events().iter().any(|e| matches!(
            e,
            SceneEvent::ObjectScaling { corner: Corner::Right, .. }
        )));
    }

    #[test]
    fn test_scale_from_top_left_moves_origin() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(100.0, 100.0, 100.0, 100.0));
        scene.set_active_object(&id).unwrap();

        scene.pointer_down(Point::new(100.0, 100.0));
        scene.pointer_move(Point::new(150.0, 50.0));

        let object = scene.object(&id).unwrap();
        assert!((object.left - 150.0).abs() < 1e-9);
        assert!((object.top - 50.0).abs() < 1e-9);
        assert!((object.scaled_width() - 50.0).abs() < 1e-9);
        assert!((object.scaled_height() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_locked_object_is_selected_but_not_moved() {
        let mut scene = Scene::new(800.0, 600.0);
        let mut rect = SceneObject::rect(0.0, 0.0, 100.0, 100.0);
        rect.locked = true;
        let id = scene.add(rect);

        scene.pointer_down(Point::new(50.0, 50.0));
        scene.pointer_move(Point::new(90.0, 90.0));
        scene.pointer_up(Point::new(90.0, 90.0));

        assert_eq!(scene.selected_ids(), &[id.clone()]);
        assert!((scene.object(&id).unwrap().left).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_handle_turns_about_center() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(100.0, 100.0, 100.0, 100.0));
        scene.set_active_object(&id).unwrap();
        let center = scene.object(&id).unwrap().center();

        // Rotation control: above the top edge's midpoint.
        scene.pointer_down(Point::new(150.0, 100.0 - ROTATE_CONTROL_OFFSET));
        scene.pointer_move(Point::new(300.0, 150.0));

        let object = scene.object(&id).unwrap();
        assert!((object.angle - 90.0).abs() < 1e-9);
        assert!((object.center() - center).hypot() < 1e-9);
    }

    #[test]
    fn test_click_on_empty_space_clears_selection() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        scene.set_active_object(&id).unwrap();
        scene.drain_events();

        scene.pointer_down(Point::new(500.0, 500.0));
        assert!(scene.selected_ids().is_empty());
        assert_eq!(
            kinds(&mut scene),
            vec![SceneEventKind::SelectionCleared, SceneEventKind::PointerDown]
        );
    }
}
