//! World/local coordinate conversion shared by clip shapes and polygon editing.

use kurbo::{Affine, Point};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Map a point from an object's local space into scene space.
pub fn local_to_world(point: Point, matrix: Affine) -> Point {
    matrix * point
}

/// Map a scene-space point into the local space described by `matrix`.
///
/// Returns `None` when the matrix cannot be inverted (an object scaled to
/// zero on either axis).
pub fn world_to_local(point: Point, matrix: Affine) -> Option<Point> {
    if matrix.determinant().abs() < SINGULAR_EPSILON {
        return None;
    }
    Some(matrix.inverse() * point)
}
