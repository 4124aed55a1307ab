//! Headless scene: the object graph the kernel and its plugins operate on.
//!
//! The scene owns objects (back to front), the selection, the viewport, the
//! overlay layer and a queue of [`SceneEvent`]s. It never dispatches events
//! itself; the kernel drains the queue and forwards events to plugins.

mod document;
mod event;
mod object;
mod overlay;
mod pointer;
mod style;

pub use document::{DEFAULT_BACKGROUND, DOCUMENT_VERSION, SceneDocument};
pub use event::{PointerInfo, SceneEvent, SceneEventKind};
pub use object::{Controls, ObjectId, ObjectKind, SceneObject, WORKSPACE_ID, regular_polygon_points};
pub use overlay::{Overlay, OverlayLine};
pub use pointer::{
    CONTROL_HIT_TOLERANCE, Control, Corner, GestureAction, MIN_SCALED_SIZE, ROTATE_CONTROL_OFFSET,
    TransformGesture,
};
pub use style::SerializableColor;

use crate::error::{SceneError, SceneResult};
use crate::viewport::Viewport;
use kurbo::Size;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared, single-threaded handle to the scene.
pub type SceneHandle = Rc<RefCell<Scene>>;

/// The mutable object graph plus its interaction surface.
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<SceneObject>,
    background: String,
    size: Size,
    viewport: Viewport,
    selection: Vec<ObjectId>,
    gesture: Option<TransformGesture>,
    overlay: Overlay,
    events: VecDeque<SceneEvent>,
    render_count: u64,
    generation: u64,
}

impl Scene {
    /// Create an empty scene of the given canvas size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            objects: Vec::new(),
            background: DEFAULT_BACKGROUND.to_string(),
            size: Size::new(width, height),
            viewport: Viewport::new(),
            selection: Vec::new(),
            gesture: None,
            overlay: Overlay::default(),
            events: VecDeque::new(),
            render_count: 0,
            generation: 0,
        }
    }

    /// Wrap the scene in a shared handle.
    pub fn shared(self) -> SceneHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn set_background(&mut self, background: impl Into<String>) {
        self.background = background.into();
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut Overlay {
        &mut self.overlay
    }

    /// The drag in progress, if any.
    pub fn gesture(&self) -> Option<&TransformGesture> {
        self.gesture.as_ref()
    }

    // --- objects -----------------------------------------------------------

    /// All objects, back to front.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| &o.id == id)
    }

    /// Mutable access without a modification event.
    ///
    /// Used for transient changes made during a gesture; committed changes go
    /// through [`Scene::modify`].
    pub fn object_mut(&mut self, id: &ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| &o.id == id)
    }

    pub fn index_of(&self, id: &ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| &o.id == id)
    }

    /// Append an object on top of the stack.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id.clone();
        self.objects.push(object);
        self.push_event(SceneEvent::ObjectAdded(id.clone()));
        id
    }

    /// Commit a freehand path.
    pub fn add_path(&mut self, object: SceneObject) -> ObjectId {
        let id = self.add(object);
        self.push_event(SceneEvent::PathCreated(id.clone()));
        id
    }

    /// Insert an object at a z-index (clamped to the stack).
    pub fn insert(&mut self, index: usize, object: SceneObject) -> ObjectId {
        let id = object.id.clone();
        let index = index.min(self.objects.len());
        self.objects.insert(index, object);
        self.push_event(SceneEvent::ObjectAdded(id.clone()));
        id
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let index = self.index_of(id)?;
        let object = self.objects.remove(index);
        self.selection.retain(|s| s != id);
        if self.gesture.as_ref().is_some_and(|g| &g.target == id) {
            self.gesture = None;
        }
        self.push_event(SceneEvent::ObjectRemoved(id.clone()));
        Some(object)
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.discard_active_object();
        self.gesture = None;
        for object in std::mem::take(&mut self.objects) {
            self.push_event(SceneEvent::ObjectRemoved(object.id));
        }
    }

    /// Apply a committed change to an object and report it.
    pub fn modify<R>(
        &mut self,
        id: &ObjectId,
        f: impl FnOnce(&mut SceneObject) -> R,
    ) -> SceneResult<R> {
        let object = self
            .object_mut(id)
            .ok_or_else(|| SceneError::ObjectNotFound(id.clone()))?;
        let result = f(object);
        self.push_event(SceneEvent::ObjectModified(id.clone()));
        Ok(result)
    }

    /// Read a named property from the JSON form of an object.
    pub fn get_property(&self, id: &ObjectId, name: &str) -> SceneResult<Value> {
        let object = self
            .object(id)
            .ok_or_else(|| SceneError::ObjectNotFound(id.clone()))?;
        let value = serde_json::to_value(object)?;
        value
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownProperty(name.to_string()))
    }

    /// Write a named property through the JSON form of an object.
    ///
    /// Unknown names land in the object's extra properties. A value of the
    /// wrong type for a known property is rejected and the object is left
    /// untouched.
    pub fn set_property(&mut self, id: &ObjectId, name: &str, value: Value) -> SceneResult<()> {
        if name == "id" || name == "type" {
            return Err(SceneError::InvalidProperty {
                property: name.to_string(),
                reason: "read-only".to_string(),
            });
        }
        let object = self
            .object(id)
            .ok_or_else(|| SceneError::ObjectNotFound(id.clone()))?;
        let controls = object.controls;
        let mut json = serde_json::to_value(object)?;
        if let Some(map) = json.as_object_mut() {
            map.insert(name.to_string(), value);
        }
        let mut updated: SceneObject =
            serde_json::from_value(json).map_err(|e| SceneError::InvalidProperty {
                property: name.to_string(),
                reason: e.to_string(),
            })?;
        updated.controls = controls;
        self.modify(id, |object| *object = updated)
    }

    // --- selection ---------------------------------------------------------

    pub fn selected_ids(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn selected_objects(&self) -> Vec<&SceneObject> {
        self.selection.iter().filter_map(|id| self.object(id)).collect()
    }

    /// The single selected object, if exactly one is selected.
    pub fn active_object(&self) -> Option<&SceneObject> {
        match self.selection.as_slice() {
            [id] => self.object(id),
            _ => None,
        }
    }

    pub fn set_active_object(&mut self, id: &ObjectId) -> SceneResult<()> {
        if self.object(id).is_none() {
            return Err(SceneError::ObjectNotFound(id.clone()));
        }
        self.select(vec![id.clone()]);
        Ok(())
    }

    /// Replace the selection, reporting created/updated/cleared.
    pub fn select(&mut self, ids: Vec<ObjectId>) {
        let ids: Vec<ObjectId> = ids.into_iter().filter(|id| self.object(id).is_some()).collect();
        if ids.is_empty() {
            self.discard_active_object();
            return;
        }
        let previous = std::mem::replace(&mut self.selection, ids.clone());
        if previous.is_empty() {
            self.push_event(SceneEvent::SelectionCreated { selected: ids });
        } else if previous != ids {
            let deselected = previous.into_iter().filter(|id| !ids.contains(id)).collect();
            self.push_event(SceneEvent::SelectionUpdated {
                selected: ids,
                deselected,
            });
        }
    }

    pub fn discard_active_object(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let deselected = std::mem::take(&mut self.selection);
        self.push_event(SceneEvent::SelectionCleared { deselected });
    }

    // --- serialization -----------------------------------------------------

    pub fn to_document(&self) -> SceneDocument {
        SceneDocument {
            objects: self.objects.clone(),
            background: self.background.clone(),
            width: self.size.width,
            height: self.size.height,
            ..SceneDocument::default()
        }
    }

    /// Compact JSON of the whole scene.
    pub fn to_json(&self) -> SceneResult<String> {
        Ok(self.to_document().to_json()?)
    }

    /// Replace the scene content with a document.
    pub fn load_document(&mut self, document: SceneDocument) {
        self.clear();
        self.generation += 1;
        self.background = document.background;
        if document.width > 0.0 && document.height > 0.0 {
            self.size = Size::new(document.width, document.height);
        }
        for object in document.objects {
            self.add(object);
        }
    }

    /// Parse and load a JSON document; on a parse error nothing changes.
    pub fn load_json(&mut self, json: &str) -> SceneResult<()> {
        let document = SceneDocument::from_json(json)?;
        self.load_document(document);
        Ok(())
    }

    /// Bumped each time a document replaces the content.
    ///
    /// Events queued before and during a load are dispatched after it, so
    /// plugins holding ids across events compare generations to tell a
    /// replaced scene from an edited one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // --- rendering and events ----------------------------------------------

    /// Request a render pass.
    pub fn request_render(&mut self) {
        self.render_count += 1;
        self.push_event(SceneEvent::BeforeRender);
        self.push_event(SceneEvent::AfterRender);
    }

    /// Number of render passes requested so far.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    pub(crate) fn push_event(&mut self, event: SceneEvent) {
        self.events.push_back(event);
    }

    /// Put an event back at the head of the queue.
    pub(crate) fn requeue_front(&mut self, event: SceneEvent) {
        self.events.push_front(event);
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_report_events() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.len(), 1);
        assert!(scene.remove(&id).is_some());
        assert!(scene.is_empty());
        assert_eq!(
            scene.drain_events(),
            vec![SceneEvent::ObjectAdded(id.clone()), SceneEvent::ObjectRemoved(id)]
        );
        assert!(!scene.has_pending_events());
    }

    #[test]
    fn test_load_bumps_generation() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.generation(), 0);

        let json = scene.to_json().unwrap();
        scene.load_json(&json).unwrap();
        assert_eq!(scene.generation(), 1);
        assert!(scene.load_json("{broken").is_err());
        assert_eq!(scene.generation(), 1);
    }

    #[test]
    fn test_insert_is_clamped() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        let b = scene.insert(99, SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        let c = scene.insert(0, SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.index_of(&c), Some(0));
        assert_eq!(scene.index_of(&a), Some(1));
        assert_eq!(scene.index_of(&b), Some(2));
    }

    #[test]
    fn test_set_property_known_and_extra() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        scene.drain_events();

        scene.set_property(&id, "left", Value::from(42.0)).unwrap();
        scene.set_property(&id, "fill", Value::from("#00ff00")).unwrap();

        assert!((scene.object(&id).unwrap().left - 42.0).abs() < f64::EPSILON);
        assert_eq!(scene.get_property(&id, "fill").unwrap(), "#00ff00");
        assert_eq!(scene.drain_events().len(), 2);
    }

    #[test]
    fn test_set_property_rejects_bad_values() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        scene.drain_events();

        let err = scene.set_property(&id, "left", Value::from("far")).unwrap_err();
        assert!(matches!(err, SceneError::InvalidProperty { .. }));
        assert!(scene.set_property(&id, "id", Value::from("x")).is_err());
        assert!(scene.object(&id).unwrap().left.abs() < f64::EPSILON);
        assert!(scene.drain_events().is_empty());

        let missing = ObjectId::from("missing");
        assert!(matches!(
            scene.get_property(&missing, "left"),
            Err(SceneError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_selection_transitions() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        let b = scene.add(SceneObject::rect(20.0, 0.0, 10.0, 10.0));
        scene.drain_events();

        scene.set_active_object(&a).unwrap();
        scene.set_active_object(&b).unwrap();
        scene.select(vec![a.clone(), b.clone()]);
        assert!(scene.active_object().is_none());
        assert_eq!(scene.selected_objects().len(), 2);
        scene.discard_active_object();

        assert_eq!(
            scene.drain_events(),
            vec![
                SceneEvent::SelectionCreated { selected: vec![a.clone()] },
                SceneEvent::SelectionUpdated {
                    selected: vec![b.clone()],
                    deselected: vec![a.clone()]
                },
                SceneEvent::SelectionUpdated {
                    selected: vec![a.clone(), b.clone()],
                    deselected: vec![]
                },
                SceneEvent::SelectionCleared { deselected: vec![a, b] },
            ]
        );
    }

    #[test]
    fn test_json_round_trip_replaces_content() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add(SceneObject::rect(1.0, 2.0, 3.0, 4.0).with_id("keep"));
        scene.set_background("#101010");
        let json = scene.to_json().unwrap();

        let mut other = Scene::new(10.0, 10.0);
        other.add(SceneObject::rect(0.0, 0.0, 1.0, 1.0).with_id("gone"));
        other.load_json(&json).unwrap();

        assert_eq!(other.to_json().unwrap(), json);
        assert!(other.object(&ObjectId::from("gone")).is_none());
        assert_eq!(other.background(), "#101010");
    }

    #[test]
    fn test_malformed_json_leaves_scene_untouched() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.add(SceneObject::rect(0.0, 0.0, 1.0, 1.0));
        scene.drain_events();

        assert!(scene.load_json("{\"objects\": 3}").is_err());
        assert_eq!(scene.len(), 1);
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_request_render_queues_render_events() {
        let mut scene = Scene::new(800.0, 600.0);
        scene.request_render();
        assert_eq!(scene.render_count(), 1);
        assert_eq!(
            scene.drain_events(),
            vec![SceneEvent::BeforeRender, SceneEvent::AfterRender]
        );
    }
}
