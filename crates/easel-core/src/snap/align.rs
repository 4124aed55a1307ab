//! Alignment detection shared by translate-snap and scale-snap.
//!
//! Boxes are un-rotated and expressed in scene units, so results do not
//! depend on the viewport zoom.

use super::candidate::{Axis, SnapCandidate};
use crate::scene::{Corner, SceneObject};
use kurbo::Point;

/// Default snap tolerance in scene units.
pub const DEFAULT_MARGIN: f64 = 4.0;
/// Default guide overshoot past the aligned objects.
pub const DEFAULT_LINE_OFFSET: f64 = 5.0;

/// Centre plus un-rotated scaled size of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectBox {
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

impl ObjectBox {
    pub fn new(center: Point, width: f64, height: f64) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    pub fn of(object: &SceneObject) -> Self {
        Self::new(
            object.center(),
            object.scaled_width().abs(),
            object.scaled_height().abs(),
        )
    }

    pub fn left(&self) -> f64 {
        self.center.x - self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.center.x + self.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.center.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.center.y + self.height / 2.0
    }

    /// `(start, middle, end)` along an axis.
    fn extent(&self, axis: Axis) -> (f64, f64, f64) {
        match axis {
            Axis::X => (self.left(), self.center.x, self.right()),
            Axis::Y => (self.top(), self.center.y, self.bottom()),
        }
    }

    fn half(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width / 2.0,
            Axis::Y => self.height / 2.0,
        }
    }
}

/// Tolerance and guide layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapSettings {
    pub margin: f64,
    pub line_offset: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            line_offset: DEFAULT_LINE_OFFSET,
        }
    }
}

/// Whether two coordinates are within `margin` after rounding.
pub fn in_range(a: f64, b: f64, margin: f64) -> bool {
    (a.round() - b.round()).abs() <= margin
}

/// A translate match on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisMatch {
    /// Where the guide is drawn.
    line: f64,
    /// New centre coordinate of the active object.
    center: f64,
}

/// First matching test on `axis`: centre, start edges, end edges, then the
/// outside pairings (active start to other end, active end to other start).
fn match_translate(active: &ObjectBox, other: &ObjectBox, axis: Axis, margin: f64) -> Option<AxisMatch> {
    let (a_start, a_mid, a_end) = active.extent(axis);
    let (o_start, o_mid, o_end) = other.extent(axis);
    let half = active.half(axis);

    [
        (a_mid, o_mid, o_mid),
        (a_start, o_start, o_start + half),
        (a_end, o_end, o_end - half),
        (a_start, o_end, o_end + half),
        (a_end, o_start, o_start - half),
    ]
    .into_iter()
    .find(|(a, o, _)| in_range(*a, *o, margin))
    .map(|(_, line, center)| AxisMatch { line, center })
}

/// Outcome of a translate tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateSnap {
    /// Centre the active object should move to.
    pub center: Point,
    /// At most one candidate per axis, x first.
    pub candidates: Vec<SnapCandidate>,
}

/// Snap a moving box against `others` (back to front).
///
/// Objects are visited front to back and a later match overwrites an earlier
/// one, so on each axis the back-most matching object wins.
pub fn snap_translate(active: &ObjectBox, others: &[ObjectBox], settings: SnapSettings) -> TranslateSnap {
    let mut x: Option<(AxisMatch, &ObjectBox)> = None;
    let mut y: Option<(AxisMatch, &ObjectBox)> = None;

    for other in others.iter().rev() {
        if let Some(found) = match_translate(active, other, Axis::X, settings.margin) {
            x = Some((found, other));
        }
        if let Some(found) = match_translate(active, other, Axis::Y, settings.margin) {
            y = Some((found, other));
        }
    }

    let center = Point::new(
        x.map_or(active.center.x, |(m, _)| m.center),
        y.map_or(active.center.y, |(m, _)| m.center),
    );
    let snapped = ObjectBox { center, ..*active };
    let candidates = [(Axis::X, x), (Axis::Y, y)]
        .into_iter()
        .filter_map(|(axis, found)| {
            found.map(|(m, other)| {
                SnapCandidate::spanning(axis, m.line, &snapped, other, settings.line_offset)
            })
        })
        .collect();

    TranslateSnap { center, candidates }
}

/// Outcome of a scale tick: where each moving edge should land.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScaleSnap {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub candidates: Vec<SnapCandidate>,
}

/// The edge a corner drags on `axis`, if any.
fn moving_edge(active: &ObjectBox, corner: Corner, axis: Axis) -> Option<f64> {
    match axis {
        Axis::X if corner.moves_right() => Some(active.right()),
        Axis::X if corner.moves_left() => Some(active.left()),
        Axis::Y if corner.moves_bottom() => Some(active.bottom()),
        Axis::Y if corner.moves_top() => Some(active.top()),
        _ => None,
    }
}

/// Snap the edges a scale handle moves against `others` (back to front).
///
/// Axes the handle does not move are never snapped. Each moving edge is
/// tested against the other's centre, start and end, in that order; the
/// back-most matching object wins as in [`snap_translate`].
pub fn snap_scale(
    active: &ObjectBox,
    corner: Corner,
    others: &[ObjectBox],
    settings: SnapSettings,
) -> ScaleSnap {
    let mut result = ScaleSnap::default();
    for axis in [Axis::X, Axis::Y] {
        let Some(edge) = moving_edge(active, corner, axis) else {
            continue;
        };
        let mut found: Option<(f64, &ObjectBox)> = None;
        for other in others.iter().rev() {
            let (o_start, o_mid, o_end) = other.extent(axis);
            if let Some(target) = [o_mid, o_start, o_end]
                .into_iter()
                .find(|t| in_range(edge, *t, settings.margin))
            {
                found = Some((target, other));
            }
        }
        if let Some((target, other)) = found {
            match axis {
                Axis::X => result.x = Some(target),
                Axis::Y => result.y = Some(target),
            }
            result.candidates.push(SnapCandidate::spanning(
                axis,
                target,
                active,
                other,
                settings.line_offset,
            ));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Box from left/top/width/height.
    fn bx(left: f64, top: f64, width: f64, height: f64) -> ObjectBox {
        ObjectBox::new(Point::new(left + width / 2.0, top + height / 2.0), width, height)
    }

    #[test]
    fn test_in_range_rounds_before_comparing() {
        assert!(in_range(100.0, 104.0, 4.0));
        assert!(!in_range(100.0, 105.0, 4.0));
        assert!(in_range(100.4, 104.4, 4.0));
        assert!(in_range(99.6, 104.4, 4.0));
    }

    #[test]
    fn test_centre_snap_example() {
        let a = bx(100.0, 100.0, 200.0, 50.0);
        let b = bx(103.0, 300.0, 200.0, 50.0);
        let snap = snap_translate(&b, &[a], SnapSettings::default());
        assert!((snap.center.x - 200.0).abs() < 1e-9);
        assert!((snap.center.y - 325.0).abs() < 1e-9);
        assert_eq!(snap.candidates.len(), 1);
        let candidate = snap.candidates[0];
        assert_eq!(candidate.axis, Axis::X);
        assert!((candidate.coordinate - 200.0).abs() < 1e-9);
        assert!((candidate.start - 95.0).abs() < 1e-9);
        assert!((candidate.end - 355.0).abs() < 1e-9);
    }

    #[test]
    fn test_outside_edges_touch() {
        let a = bx(100.0, 100.0, 200.0, 50.0);
        let b = bx(304.0, 300.0, 100.0, 50.0);
        let snap = snap_translate(&b, &[a], SnapSettings::default());
        assert!((snap.center.x - 350.0).abs() < 1e-9);
        assert!((snap.candidates[0].coordinate - 300.0).abs() < 1e-9);

        let b = bx(305.0, 300.0, 100.0, 50.0);
        let snap = snap_translate(&b, &[a], SnapSettings::default());
        assert!((snap.center.x - 355.0).abs() < 1e-9);
        assert!(snap.candidates.is_empty());
    }

    #[test]
    fn test_centre_wins_over_edges_within_one_object() {
        // Left edges and centres both within tolerance.
        let a = bx(100.0, 0.0, 100.0, 10.0);
        let b = bx(102.0, 100.0, 100.0, 10.0);
        let snap = snap_translate(&b, &[a], SnapSettings::default());
        assert!((snap.candidates[0].coordinate - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_back_most_matching_object_wins() {
        let back = bx(100.0, 0.0, 50.0, 20.0);
        let front = bx(102.0, 40.0, 80.0, 20.0);
        let active = bx(101.0, 300.0, 30.0, 20.0);

        let snap = snap_translate(&active, &[back, front], SnapSettings::default());
        assert!((snap.center.x - 115.0).abs() < 1e-9);
        assert!((snap.candidates[0].coordinate - 100.0).abs() < 1e-9);

        // Swapping z-order flips the winner.
        let snap = snap_translate(&active, &[front, back], SnapSettings::default());
        assert!((snap.candidates[0].coordinate - 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_both_axes_snap_independently() {
        let a = bx(100.0, 100.0, 100.0, 100.0);
        let b = bx(202.0, 97.0, 50.0, 50.0);
        let snap = snap_translate(&b, &[a], SnapSettings::default());
        assert_eq!(snap.candidates.len(), 2);
        assert_eq!(snap.candidates[0].axis, Axis::X);
        assert_eq!(snap.candidates[1].axis, Axis::Y);
        assert!((snap.center.x - 225.0).abs() < 1e-9);
        assert!((snap.center.y - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_snaps_only_moving_edges() {
        let a = bx(100.0, 100.0, 200.0, 50.0);
        let b = bx(100.0, 300.0, 197.0, 50.0);

        let snap = snap_scale(&b, Corner::Right, &[a], SnapSettings::default());
        assert_eq!(snap.x, Some(300.0));
        assert_eq!(snap.y, None);
        assert_eq!(snap.candidates.len(), 1);

        // The left edge already matches, but a right handle never moves it.
        let snap = snap_scale(&b, Corner::Bottom, &[a], SnapSettings::default());
        assert_eq!(snap, ScaleSnap::default());
    }

    #[test]
    fn test_scale_prefers_centre_target() {
        let a = bx(0.0, 0.0, 200.0, 100.0);
        let b = bx(300.0, 0.0, 10.0, 10.0);
        // Bottom edge at 52: near a's centre (50) only.
        let b = ObjectBox::new(Point::new(b.center.x, 26.0), 10.0, 52.0);
        let snap = snap_scale(&b, Corner::BottomRight, &[a], SnapSettings::default());
        assert_eq!(snap.y, Some(50.0));
        assert_eq!(snap.x, None);
    }
}
