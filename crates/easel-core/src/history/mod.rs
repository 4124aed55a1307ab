//! Undo/redo over whole-scene snapshots.
//!
//! Mutation events mark the history as capturing; the snapshot is taken once
//! the kernel's turn goes idle, so one logical edit becomes one entry. While
//! a snapshot is being restored, the restore's own add/remove churn is not
//! recorded.

mod engine;
mod stack;

pub use engine::{HistoryEngine, HistoryState};
pub use stack::{HistoryCounts, HistoryStack, MAX_UNDO_HISTORY};

use crate::error::KernelResult;
use crate::kernel::{
    HookContext, HookName, HookOutcome, KeyPhase, Kernel, ModuleDef, Plugin, PluginContext,
    PluginDescriptor, parse_args, parse_options, to_value,
};
use crate::scene::{SceneEvent, SceneEventKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin name.
pub const NAME: &str = "history";
/// Emitted with [`HistoryCounts`] whenever availability changes.
pub const HISTORY_CHANGED: &str = "history-changed";

pub const UNDO: &str = "undo";
pub const REDO: &str = "redo";
pub const CLEAR_HISTORY: &str = "clear_history";
pub const HISTORY_COUNTS: &str = "history_counts";

const UNDO_SHORTCUTS: [&str; 2] = ["ctrl+z", "meta+z"];
const REDO_SHORTCUTS: [&str; 3] = ["ctrl+shift+z", "ctrl+y", "meta+shift+z"];

const MUTATIONS: [SceneEventKind; 4] = [
    SceneEventKind::ObjectAdded,
    SceneEventKind::ObjectRemoved,
    SceneEventKind::ObjectModified,
    SceneEventKind::PathCreated,
];

/// Options accepted at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryOptions {
    pub max_length: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            max_length: MAX_UNDO_HISTORY,
        }
    }
}

/// Module definition for [`Kernel::register`].
pub fn module() -> ModuleDef {
    let mut descriptor = PluginDescriptor::new(NAME)
        .event(HISTORY_CHANGED)
        .api(UNDO)
        .api(REDO)
        .api(CLEAR_HISTORY)
        .api(HISTORY_COUNTS)
        .hook(HookName::AfterImport)
        .subscribe(&MUTATIONS);
    for shortcut in UNDO_SHORTCUTS.iter().chain(REDO_SHORTCUTS.iter()) {
        descriptor = descriptor.shortcut(*shortcut);
    }
    ModuleDef::new(descriptor, |ctx, options| {
        let options: HistoryOptions = parse_options(NAME, options);
        Box::new(HistoryPlugin::new(ctx, options))
    })
}

/// The history plugin.
pub struct HistoryPlugin {
    engine: HistoryEngine,
}

impl HistoryPlugin {
    fn new(ctx: &PluginContext<'_>, options: HistoryOptions) -> Self {
        let mut plugin = Self {
            engine: HistoryEngine::new(options.max_length),
        };
        plugin.seed_from_scene(ctx);
        plugin
    }

    pub fn engine(&self) -> &HistoryEngine {
        &self.engine
    }

    pub fn counts(&self) -> HistoryCounts {
        self.engine.counts()
    }

    fn snapshot(ctx: &PluginContext<'_>) -> Option<String> {
        match ctx.scene().borrow().to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("Could not serialize scene for history: {}", e);
                None
            }
        }
    }

    fn seed_from_scene(&mut self, ctx: &PluginContext<'_>) {
        if let Some(snapshot) = Self::snapshot(ctx) {
            self.engine.seed(snapshot);
        }
    }

    /// Listeners get the counts after this callback returns.
    fn notify(&self, ctx: &PluginContext<'_>) {
        match serde_json::to_value(self.counts()) {
            Ok(payload) => ctx.emit(HISTORY_CHANGED, payload),
            Err(e) => log::error!("Could not encode history counts: {}", e),
        }
    }

    /// Commit a pending capture, if any.
    fn commit_pending(&mut self, ctx: &PluginContext<'_>) {
        if !self.engine.is_capturing() {
            return;
        }
        let Some(snapshot) = Self::snapshot(ctx) else {
            return;
        };
        if self.engine.commit(snapshot) {
            log::debug!("History entry recorded ({:?})", self.counts());
            self.notify(ctx);
        }
    }

    fn restore(&mut self, ctx: &PluginContext<'_>, snapshot: Option<String>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        let loaded = ctx.scene().borrow_mut().load_json(&snapshot);
        match loaded {
            Ok(()) => ctx.scene().borrow_mut().request_render(),
            Err(e) => {
                log::error!("Could not restore history snapshot: {}", e);
                self.engine.abort_restore();
            }
        }
    }

    pub fn undo(&mut self, ctx: &PluginContext<'_>) {
        self.commit_pending(ctx);
        let snapshot = self.engine.begin_undo();
        self.restore(ctx, snapshot);
    }

    pub fn redo(&mut self, ctx: &PluginContext<'_>) {
        self.commit_pending(ctx);
        let snapshot = self.engine.begin_redo();
        self.restore(ctx, snapshot);
    }

    /// Reset to a single entry holding the current scene.
    pub fn clear_and_record_current(&mut self, ctx: &PluginContext<'_>) {
        self.seed_from_scene(ctx);
        self.notify(ctx);
    }
}

impl Plugin for HistoryPlugin {
    fn on_scene_event(&mut self, _ctx: &PluginContext<'_>, event: &SceneEvent) {
        if !self.engine.on_mutation() {
            log::trace!("Ignoring {} during restore", event.kind().name());
        }
    }

    fn on_idle(&mut self, ctx: &PluginContext<'_>) {
        match self.engine.state() {
            HistoryState::Capturing => self.commit_pending(ctx),
            HistoryState::Restoring => {
                if self.engine.finish_restore().is_some() {
                    self.notify(ctx);
                }
            }
            HistoryState::Idle => {}
        }
    }

    fn on_hook(&mut self, ctx: &PluginContext<'_>, hook: HookName, _args: &HookContext) -> HookOutcome {
        if hook == HookName::AfterImport {
            self.clear_and_record_current(ctx);
        }
        HookOutcome::ok()
    }

    fn on_shortcut(&mut self, ctx: &PluginContext<'_>, shortcut: &str, phase: KeyPhase) {
        if phase != KeyPhase::Down {
            return;
        }
        if UNDO_SHORTCUTS.contains(&shortcut) {
            self.undo(ctx);
        } else if REDO_SHORTCUTS.contains(&shortcut) {
            self.redo(ctx);
        }
    }

    fn exports(&self) -> &[&'static str] {
        &[UNDO, REDO, CLEAR_HISTORY, HISTORY_COUNTS]
    }

    fn call(&mut self, ctx: &PluginContext<'_>, method: &str, _args: Value) -> KernelResult<Value> {
        match method {
            UNDO => self.undo(ctx),
            REDO => self.redo(ctx),
            CLEAR_HISTORY => self.clear_and_record_current(ctx),
            _ => {}
        }
        to_value(method, self.counts())
    }
}

/// Typed access to the history plugin's API.
pub trait HistoryApi {
    fn undo(&self) -> KernelResult<HistoryCounts>;
    fn redo(&self) -> KernelResult<HistoryCounts>;
    fn clear_history(&self) -> KernelResult<HistoryCounts>;
    fn history_counts(&self) -> KernelResult<HistoryCounts>;
}

impl HistoryApi for Kernel {
    fn undo(&self) -> KernelResult<HistoryCounts> {
        parse_args(UNDO, self.invoke(UNDO, Value::Null)?)
    }

    fn redo(&self) -> KernelResult<HistoryCounts> {
        parse_args(REDO, self.invoke(REDO, Value::Null)?)
    }

    fn clear_history(&self) -> KernelResult<HistoryCounts> {
        parse_args(CLEAR_HISTORY, self.invoke(CLEAR_HISTORY, Value::Null)?)
    }

    fn history_counts(&self) -> KernelResult<HistoryCounts> {
        parse_args(HISTORY_COUNTS, self.invoke(HISTORY_COUNTS, Value::Null)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KeyEvent, Modifiers};
    use crate::scene::{ObjectId, ObjectKind, Scene, SceneObject};
    use kurbo::Point;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup(options: Value) -> Kernel {
        let kernel = Kernel::new(Scene::new(800.0, 600.0).shared());
        kernel.register(module(), options).unwrap();
        kernel
    }

    fn scene_json(kernel: &Kernel) -> String {
        kernel.scene().borrow().to_json().unwrap()
    }

    fn add_rect(kernel: &Kernel, x: f64) -> ObjectId {
        kernel.update_scene(|scene| scene.add(SceneObject::rect(x, 0.0, 10.0, 10.0)))
    }

    fn stack_len(kernel: &Kernel) -> usize {
        kernel
            .with_module::<HistoryPlugin, _>(NAME, |h| h.engine().stack().len())
            .unwrap()
    }

    #[test]
    fn test_one_entry_per_logical_edit() {
        let kernel = setup(Value::Null);
        kernel.update_scene(|scene| {
            let id = scene.add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
            scene.modify(&id, |o| o.left = 5.0).unwrap();
            scene.modify(&id, |o| o.top = 5.0).unwrap();
        });
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 1, redo: 0 });
    }

    #[test]
    fn test_freehand_path_is_one_entry() {
        let kernel = setup(Value::Null);
        let initial = scene_json(&kernel);
        kernel.update_scene(|scene| {
            let stroke = SceneObject::new(ObjectKind::Path, 10.0, 10.0, 40.0, 25.0);
            scene.add_path(stroke)
        });
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 1, redo: 0 });

        kernel.undo().unwrap();
        assert_eq!(scene_json(&kernel), initial);
    }

    #[test]
    fn test_undo_all_edits_restores_initial_state() {
        let kernel = setup(Value::Null);
        let initial = scene_json(&kernel);

        let mut states = vec![initial.clone()];
        for i in 0..5 {
            add_rect(&kernel, i as f64 * 20.0);
            states.push(scene_json(&kernel));
        }

        for expected in states.iter().rev().skip(1) {
            kernel.undo().unwrap();
            assert_eq!(&scene_json(&kernel), expected);
        }
        assert_eq!(scene_json(&kernel), initial);
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 0, redo: 5 });

        // Nothing left to undo.
        kernel.undo().unwrap();
        assert_eq!(scene_json(&kernel), initial);
    }

    #[test]
    fn test_undo_then_redo_returns_to_latest() {
        let kernel = setup(Value::Null);
        for i in 0..4 {
            add_rect(&kernel, i as f64 * 20.0);
        }
        let latest = scene_json(&kernel);

        for _ in 0..3 {
            kernel.undo().unwrap();
        }
        for _ in 0..3 {
            kernel.redo().unwrap();
        }
        assert_eq!(scene_json(&kernel), latest);
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 4, redo: 0 });
    }

    #[test]
    fn test_new_edit_after_undo_drops_redo() {
        let kernel = setup(Value::Null);
        add_rect(&kernel, 0.0);
        add_rect(&kernel, 20.0);
        kernel.undo().unwrap();
        assert_eq!(kernel.history_counts().unwrap().redo, 1);

        add_rect(&kernel, 40.0);
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 2, redo: 0 });
        let before = scene_json(&kernel);
        kernel.redo().unwrap();
        assert_eq!(scene_json(&kernel), before);
    }

    #[test]
    fn test_history_is_capped() {
        let kernel = setup(json!({ "maxLength": 5 }));
        let mut states = vec![scene_json(&kernel)];
        for i in 0..8 {
            add_rect(&kernel, i as f64 * 20.0);
            states.push(scene_json(&kernel));
        }
        assert_eq!(stack_len(&kernel), 5);

        for _ in 0..10 {
            kernel.undo().unwrap();
        }
        // Only the last five states survive: the oldest is after edit 4.
        assert_eq!(scene_json(&kernel), states[4]);
    }

    #[test]
    fn test_restore_is_not_recorded() {
        let kernel = setup(Value::Null);
        add_rect(&kernel, 0.0);
        add_rect(&kernel, 20.0);
        assert_eq!(stack_len(&kernel), 3);

        kernel.undo().unwrap();
        kernel.redo().unwrap();
        kernel.undo().unwrap();
        assert_eq!(stack_len(&kernel), 3);
        let state = kernel
            .with_module::<HistoryPlugin, _>(NAME, |h| h.engine().state())
            .unwrap();
        assert_eq!(state, HistoryState::Idle);
    }

    #[test]
    fn test_unflushed_edit_is_recorded_before_undo() {
        let kernel = setup(Value::Null);
        let initial = scene_json(&kernel);
        // The second edit is still queued when undo arrives.
        kernel
            .scene()
            .borrow_mut()
            .add(SceneObject::rect(0.0, 0.0, 10.0, 10.0));
        kernel.flush();
        kernel
            .scene()
            .borrow_mut()
            .add(SceneObject::rect(50.0, 0.0, 10.0, 10.0));

        kernel.undo().unwrap();
        assert_eq!(kernel.scene().borrow().len(), 1);
        kernel.undo().unwrap();
        assert_eq!(scene_json(&kernel), initial);
    }

    #[test]
    fn test_drag_records_single_entry() {
        let kernel = setup(Value::Null);
        let id = add_rect(&kernel, 0.0);
        kernel.pointer_down(Point::new(5.0, 5.0));
        kernel.pointer_move(Point::new(15.0, 5.0));
        kernel.pointer_move(Point::new(25.0, 5.0));
        kernel.pointer_up(Point::new(25.0, 5.0));
        assert_eq!(kernel.history_counts().unwrap().undo, 2);

        kernel.undo().unwrap();
        let left = kernel.scene().borrow().object(&id).map(|o| o.left);
        assert_eq!(left, Some(0.0));
    }

    #[test]
    fn test_import_resets_history() {
        let kernel = setup(Value::Null);
        add_rect(&kernel, 0.0);
        add_rect(&kernel, 20.0);

        let json = r#"{"objects":[{"type":"rect","id":"x","width":4,"height":4}]}"#;
        pollster::block_on(kernel.load_json(json)).unwrap();
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 0, redo: 0 });
        assert_eq!(stack_len(&kernel), 1);
    }

    #[test]
    fn test_failed_import_keeps_history() {
        let kernel = setup(Value::Null);
        add_rect(&kernel, 0.0);
        assert!(pollster::block_on(kernel.load_json("{broken")).is_err());
        assert_eq!(kernel.history_counts().unwrap(), HistoryCounts { undo: 1, redo: 0 });
    }

    #[test]
    fn test_shortcuts_act_on_key_down() {
        let kernel = setup(Value::Null);
        add_rect(&kernel, 0.0);

        kernel.key_event(&KeyEvent::up("z", Modifiers::ctrl()));
        assert_eq!(kernel.scene().borrow().len(), 1);

        kernel.key_event(&KeyEvent::down("z", Modifiers::ctrl()));
        assert_eq!(kernel.scene().borrow().len(), 0);

        kernel.key_event(&KeyEvent::down("z", Modifiers::meta().with_shift()));
        assert_eq!(kernel.scene().borrow().len(), 1);
    }

    #[test]
    fn test_history_changed_carries_counts() {
        let kernel = setup(Value::Null);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        kernel.on(HISTORY_CHANGED, move |payload| sink.borrow_mut().push(payload.clone()));

        add_rect(&kernel, 0.0);
        kernel.undo().unwrap();
        kernel.clear_history().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                json!({ "undo": 1, "redo": 0 }),
                json!({ "undo": 0, "redo": 1 }),
                json!({ "undo": 0, "redo": 0 }),
            ]
        );
    }

    #[test]
    fn test_listener_can_query_history() {
        let kernel = Rc::new(setup(Value::Null));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let weak = Rc::downgrade(&kernel);
        kernel.on(HISTORY_CHANGED, move |_| {
            if let Some(kernel) = weak.upgrade() {
                sink.borrow_mut().push(kernel.history_counts().ok());
            }
        });

        add_rect(&kernel, 0.0);
        kernel.undo().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                Some(HistoryCounts { undo: 1, redo: 0 }),
                Some(HistoryCounts { undo: 0, redo: 1 }),
            ]
        );
    }
}
