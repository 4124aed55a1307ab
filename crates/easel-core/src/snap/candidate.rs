//! Snap candidates: one alignment found during a drag tick.

use super::align::ObjectBox;
use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

/// Which coordinate a candidate aligns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Aligned x; drawn as a vertical guide.
    X,
    /// Aligned y; drawn as a horizontal guide.
    Y,
}

/// An alignment between the active object and another object.
///
/// For [`Axis::X`], `coordinate` is the guide's x and `start..end` its y
/// span; for [`Axis::Y`] the roles swap. All values are in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapCandidate {
    pub axis: Axis,
    pub coordinate: f64,
    pub start: f64,
    pub end: f64,
}

impl SnapCandidate {
    /// A guide through `coordinate` covering both boxes plus `offset` on
    /// each side.
    pub fn spanning(axis: Axis, coordinate: f64, a: &ObjectBox, b: &ObjectBox, offset: f64) -> Self {
        let (start, end) = match axis {
            Axis::X => (a.top().min(b.top()), a.bottom().max(b.bottom())),
            Axis::Y => (a.left().min(b.left()), a.right().max(b.right())),
        };
        Self {
            axis,
            coordinate,
            start: start - offset,
            end: end + offset,
        }
    }

    /// The guide segment in scene space.
    pub fn line(&self) -> Line {
        match self.axis {
            Axis::X => Line::new(
                Point::new(self.coordinate, self.start),
                Point::new(self.coordinate, self.end),
            ),
            Axis::Y => Line::new(
                Point::new(self.start, self.coordinate),
                Point::new(self.end, self.coordinate),
            ),
        }
    }
}
