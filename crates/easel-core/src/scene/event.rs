//! Events the scene queues for the kernel to dispatch.

use super::object::ObjectId;
use super::pointer::Corner;
use kurbo::Point;

/// Discriminant of a [`SceneEvent`], used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventKind {
    ObjectAdded,
    ObjectRemoved,
    ObjectModified,
    PathCreated,
    ObjectMoving,
    ObjectScaling,
    ObjectRotating,
    VertexDragging,
    SelectionCreated,
    SelectionUpdated,
    SelectionCleared,
    PointerDown,
    PointerMove,
    PointerUp,
    BeforeRender,
    AfterRender,
}

impl SceneEventKind {
    /// Name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::ObjectAdded => "object:added",
            Self::ObjectRemoved => "object:removed",
            Self::ObjectModified => "object:modified",
            Self::PathCreated => "path:created",
            Self::ObjectMoving => "object:moving",
            Self::ObjectScaling => "object:scaling",
            Self::ObjectRotating => "object:rotating",
            Self::VertexDragging => "vertex:dragging",
            Self::SelectionCreated => "selection:created",
            Self::SelectionUpdated => "selection:updated",
            Self::SelectionCleared => "selection:cleared",
            Self::PointerDown => "mouse:down",
            Self::PointerMove => "mouse:move",
            Self::PointerUp => "mouse:up",
            Self::BeforeRender => "before:render",
            Self::AfterRender => "after:render",
        }
    }
}

/// Pointer position in both coordinate systems plus the object under it.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInfo {
    pub screen: Point,
    pub scene: Point,
    pub target: Option<ObjectId>,
}

/// Something that happened to the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    ObjectModified(ObjectId),
    /// A freehand path was committed.
    PathCreated(ObjectId),
    ObjectMoving(ObjectId),
    ObjectScaling { id: ObjectId, corner: Corner },
    ObjectRotating(ObjectId),
    /// A polygon vertex control is being dragged to `point` (scene space).
    VertexDragging { id: ObjectId, index: usize, point: Point },
    SelectionCreated { selected: Vec<ObjectId> },
    SelectionUpdated { selected: Vec<ObjectId>, deselected: Vec<ObjectId> },
    SelectionCleared { deselected: Vec<ObjectId> },
    PointerDown(PointerInfo),
    PointerMove(PointerInfo),
    PointerUp(PointerInfo),
    BeforeRender,
    AfterRender,
}

impl SceneEvent {
    pub fn kind(&self) -> SceneEventKind {
        match self {
            Self::ObjectAdded(_) => SceneEventKind::ObjectAdded,
            Self::ObjectRemoved(_) => SceneEventKind::ObjectRemoved,
            Self::ObjectModified(_) => SceneEventKind::ObjectModified,
            Self::PathCreated(_) => SceneEventKind::PathCreated,
            Self::ObjectMoving(_) => SceneEventKind::ObjectMoving,
            Self::ObjectScaling { .. } => SceneEventKind::ObjectScaling,
            Self::ObjectRotating(_) => SceneEventKind::ObjectRotating,
            Self::VertexDragging { .. } => SceneEventKind::VertexDragging,
            Self::SelectionCreated { .. } => SceneEventKind::SelectionCreated,
            Self::SelectionUpdated { .. } => SceneEventKind::SelectionUpdated,
            Self::SelectionCleared { .. } => SceneEventKind::SelectionCleared,
            Self::PointerDown(_) => SceneEventKind::PointerDown,
            Self::PointerMove(_) => SceneEventKind::PointerMove,
            Self::PointerUp(_) => SceneEventKind::PointerUp,
            Self::BeforeRender => SceneEventKind::BeforeRender,
            Self::AfterRender => SceneEventKind::AfterRender,
        }
    }

    /// Objects that left the selection with this event.
    pub fn deselected(&self) -> &[ObjectId] {
        match self {
            Self::SelectionUpdated { deselected, .. } | Self::SelectionCleared { deselected } => {
                deselected
            }
            _ => &[],
        }
    }
}
