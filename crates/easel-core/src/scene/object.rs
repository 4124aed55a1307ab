//! Scene objects and their geometry.

use crate::geometry::transform::{local_to_world, world_to_local};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Reserved id of the workspace (page background) object.
pub const WORKSPACE_ID: &str = "workspace";

/// Stable identifier of a scene object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id reserved for the workspace object.
    pub fn workspace() -> Self {
        Self(WORKSPACE_ID.to_string())
    }

    pub fn is_workspace(&self) -> bool {
        self.0 == WORKSPACE_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type discriminator of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Rect,
    Ellipse,
    Triangle,
    Polygon,
    Path,
    Text,
    Image,
    Group,
    /// A ruler guide; one-dimensional, never snapped against other guides.
    GuideLine,
}

/// Which interactive controls an object currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Controls {
    /// Corner/edge scale handles plus the rotation handle.
    #[default]
    Standard,
    /// One control per polygon vertex.
    Vertices,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn is_origin(point: &Point) -> bool {
    *point == Point::ZERO
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A renderable object in the scene.
///
/// Position is the top-left corner before rotation; `angle` rotates about
/// that corner, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    #[serde(default)]
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "yes")]
    pub selectable: bool,
    #[serde(default = "yes")]
    pub has_controls: bool,
    #[serde(default = "yes")]
    pub has_borders: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    /// Authored polygon vertices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    /// Centre of the authored vertices' bounding box.
    #[serde(default, skip_serializing_if = "is_origin")]
    pub path_offset: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<Box<SceneObject>>,
    /// Clip mask keeps the outside instead of the inside.
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverted: bool,
    /// Clip mask is expressed in scene space instead of the owner's local space.
    #[serde(default, skip_serializing_if = "is_false")]
    pub absolute_positioned: bool,
    #[serde(skip)]
    pub controls: Controls,
    /// Properties the core does not interpret (fill, text, src, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SceneObject {
    pub fn new(kind: ObjectKind, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            id: ObjectId::new(),
            kind,
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            visible: true,
            selectable: true,
            has_controls: true,
            has_borders: true,
            locked: false,
            points: Vec::new(),
            path_offset: Point::ZERO,
            clip_path: None,
            inverted: false,
            absolute_positioned: false,
            controls: Controls::Standard,
            extra: Map::new(),
        }
    }

    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(ObjectKind::Rect, left, top, width, height)
    }

    /// A polygon whose vertices are given in scene coordinates.
    pub fn polygon(points: Vec<Point>) -> Self {
        let mut polygon = Self::new(ObjectKind::Polygon, 0.0, 0.0, 0.0, 0.0);
        polygon.set_points(points);
        polygon.left = polygon.path_offset.x - polygon.width / 2.0;
        polygon.top = polygon.path_offset.y - polygon.height / 2.0;
        polygon
    }

    /// The page background object every scene may carry.
    pub fn workspace(width: f64, height: f64) -> Self {
        let mut workspace = Self::rect(0.0, 0.0, width, height);
        workspace.id = ObjectId::workspace();
        workspace.selectable = false;
        workspace.has_controls = false;
        workspace
    }

    /// A vertical ruler guide at scene x.
    pub fn vertical_guide(x: f64, length: f64) -> Self {
        Self::new(ObjectKind::GuideLine, x, 0.0, 0.0, length)
    }

    pub fn with_id(mut self, id: impl Into<ObjectId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn is_workspace(&self) -> bool {
        self.id.is_workspace()
    }

    pub fn is_guideline(&self) -> bool {
        self.kind == ObjectKind::GuideLine
    }

    pub fn scaled_width(&self) -> f64 {
        self.width * self.scale_x
    }

    pub fn scaled_height(&self) -> f64 {
        self.height * self.scale_y
    }

    pub fn angle_radians(&self) -> f64 {
        self.angle.to_radians()
    }

    /// True when either scaled dimension collapses to zero.
    pub fn is_zero_area(&self) -> bool {
        self.scaled_width().abs() < f64::EPSILON || self.scaled_height().abs() < f64::EPSILON
    }

    /// Frame with the top-left corner at the origin, rotated but not scaled.
    pub fn origin_frame(&self) -> Affine {
        Affine::translate(Vec2::new(self.left, self.top)) * Affine::rotate(self.angle_radians())
    }

    pub fn center(&self) -> Point {
        self.origin_frame() * Point::new(self.scaled_width() / 2.0, self.scaled_height() / 2.0)
    }

    /// Move the object so its centre lands on `center`.
    pub fn set_center(&mut self, center: Point) {
        let half = Affine::rotate(self.angle_radians())
            * Point::new(self.scaled_width() / 2.0, self.scaled_height() / 2.0);
        self.left = center.x - half.x;
        self.top = center.y - half.y;
    }

    /// Translate, rotate and scale about the centre.
    ///
    /// Maps local coordinates (origin at the centre, unscaled units) into
    /// scene space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.angle_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Translate and rotate about the centre, without scale.
    pub fn rotation_frame(&self) -> Affine {
        Affine::translate(self.center().to_vec2()) * Affine::rotate(self.angle_radians())
    }

    /// Corners in scene space: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let frame = self.origin_frame();
        let (w, h) = (self.scaled_width(), self.scaled_height());
        [
            frame * Point::new(0.0, 0.0),
            frame * Point::new(w, 0.0),
            frame * Point::new(w, h),
            frame * Point::new(0.0, h),
        ]
    }

    /// Hit test in scene coordinates.
    pub fn contains(&self, point: Point) -> bool {
        if self.is_zero_area() {
            return false;
        }
        let Some(local) = world_to_local(point, self.transform()) else {
            return false;
        };
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }

    /// Replace the authored vertices and re-derive size and path offset.
    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
        self.update_dimensions();
    }

    /// Recompute width, height and path offset from the authored vertices.
    pub fn update_dimensions(&mut self) {
        let Some(first) = self.points.first() else {
            return;
        };
        let mut bounds = Rect::from_points(*first, *first);
        for point in &self.points[1..] {
            bounds = bounds.union_pt(*point);
        }
        self.width = bounds.width();
        self.height = bounds.height();
        self.path_offset = bounds.center();
    }

    /// Scene position of the vertex at `index`.
    pub fn vertex_position(&self, index: usize) -> Option<Point> {
        let point = self.points.get(index)?;
        let local = Point::new(point.x - self.path_offset.x, point.y - self.path_offset.y);
        Some(local_to_world(local, self.transform()))
    }
}

/// Vertices of a regular polygon inscribed in a `width` x `height` box,
/// first vertex at the top.
pub fn regular_polygon_points(sides: usize, width: f64, height: f64) -> Vec<Point> {
    let sides = sides.max(3);
    let (rx, ry) = (width / 2.0, height / 2.0);
    (0..sides)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / sides as f64 - std::f64::consts::FRAC_PI_2;
            Point::new(rx + rx * theta.cos(), ry + ry * theta.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_center_of_unrotated_rect() {
        let mut rect = SceneObject::rect(100.0, 100.0, 200.0, 50.0);
        rect.scale_x = 2.0;
        assert!(close(rect.center(), Point::new(300.0, 125.0)));
    }

    #[test]
    fn test_set_center_respects_rotation() {
        let mut rect = SceneObject::rect(0.0, 0.0, 100.0, 40.0);
        rect.angle = 90.0;
        rect.set_center(Point::new(50.0, 50.0));
        assert!(close(rect.center(), Point::new(50.0, 50.0)));
        assert!(close(Point::new(rect.left, rect.top), Point::new(70.0, 0.0)));
    }

    #[test]
    fn test_contains_rotated() {
        let mut rect = SceneObject::rect(0.0, 0.0, 100.0, 10.0);
        rect.angle = 90.0;
        // Rotated about the top-left corner, the rect now spans x in [-10, 0].
        assert!(rect.contains(Point::new(-5.0, 50.0)));
        assert!(!rect.contains(Point::new(50.0, 5.0)));
    }

    #[test]
    fn test_zero_area_is_never_hit() {
        let guide = SceneObject::vertical_guide(10.0, 500.0);
        assert!(guide.is_zero_area());
        assert!(!guide.contains(Point::new(10.0, 10.0)));
    }

    #[test]
    fn test_polygon_dimensions_and_vertices() {
        let polygon = SceneObject::polygon(vec![
            Point::new(10.0, 10.0),
            Point::new(110.0, 10.0),
            Point::new(60.0, 60.0),
        ]);
        assert!((polygon.width - 100.0).abs() < 1e-9);
        assert!((polygon.height - 50.0).abs() < 1e-9);
        assert!(close(polygon.path_offset, Point::new(60.0, 35.0)));
        assert!(close(polygon.vertex_position(2).unwrap(), Point::new(60.0, 60.0)));
        assert!(polygon.vertex_position(3).is_none());
    }

    #[test]
    fn test_extra_properties_round_trip_through_json() {
        let rect = SceneObject::rect(1.0, 2.0, 3.0, 4.0).with_extra("fill", Value::from("#ff0000"));
        let json = serde_json::to_value(&rect).unwrap();
        assert_eq!(json["type"], "rect");
        assert_eq!(json["fill"], "#ff0000");
        assert_eq!(json["scaleX"], 1.0);

        let back: SceneObject = serde_json::from_value(json).unwrap();
        assert_eq!(back, rect);
    }

    #[test]
    fn test_regular_polygon_points() {
        let points = regular_polygon_points(4, 100.0, 100.0);
        assert_eq!(points.len(), 4);
        assert!(close(points[0], Point::new(50.0, 0.0)));
        assert!(close(points[2], Point::new(50.0, 100.0)));
    }
}
