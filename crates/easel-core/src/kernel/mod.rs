//! Plugin kernel: registry, hook pipelines, shortcut and API binding.
//!
//! The kernel owns every plugin instance and is the only path between them.
//! It also pumps the scene's event queue: host entry points mutate the
//! scene, then [`Kernel::flush`] forwards queued events to subscribed
//! plugins and closes the turn with each plugin's idle callback.

pub mod hook;
mod plugin;
mod shortcut;

pub use hook::{HookContext, HookFuture, HookName, HookOutcome};
pub use plugin::{
    ModuleDef, Plugin, PluginContext, PluginDescriptor, PluginFactory, PluginHandle, parse_args,
    parse_options, to_value,
};
pub use shortcut::{KeyEvent, KeyPhase, Modifiers, Shortcut};

use crate::error::{HookError, KernelError, KernelResult, PipelineError, SceneError};
use crate::scene::{Scene, SceneDocument, SceneEvent, SceneHandle};
use hook::{HookPipeline, pipeline_error};
use kurbo::Point;
use serde_json::Value;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Upper bound on dispatch rounds in one flush.
pub const MAX_FLUSH_ROUNDS: usize = 32;

/// Handle returned by [`Kernel::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&Value)>;

struct Entry {
    descriptor: PluginDescriptor,
    instance: PluginHandle,
}

struct ShortcutBinding {
    plugin: String,
    identifier: String,
    shortcut: Shortcut,
    instance: PluginHandle,
}

struct ListenerEntry {
    id: ListenerId,
    event: String,
    callback: Listener,
}

#[derive(Default)]
struct Registry {
    /// Registration order.
    plugins: Vec<Entry>,
    /// Declared event name -> owning plugin.
    events: HashMap<String, String>,
    /// Declared API method -> owning plugin.
    apis: HashMap<String, String>,
    /// API methods the owner actually exports.
    bound_apis: HashMap<String, (String, PluginHandle)>,
    pipelines: HashMap<HookName, HookPipeline>,
    shortcuts: Vec<ShortcutBinding>,
    listeners: Vec<ListenerEntry>,
}

impl Registry {
    fn conflict(&self, descriptor: &PluginDescriptor) -> Option<KernelError> {
        if self.plugins.iter().any(|e| e.descriptor.name == descriptor.name) {
            return Some(KernelError::DuplicatePlugin(descriptor.name.clone()));
        }
        for event in &descriptor.events {
            if let Some(owner) = self.events.get(event) {
                return Some(KernelError::DuplicateEvent {
                    event: event.clone(),
                    owner: owner.clone(),
                });
            }
        }
        for method in &descriptor.apis {
            if let Some(owner) = self.apis.get(method) {
                return Some(KernelError::DuplicateApi {
                    method: method.clone(),
                    owner: owner.clone(),
                });
            }
        }
        None
    }
}

/// Central registry bound to one scene.
pub struct Kernel {
    scene: SceneHandle,
    registry: RefCell<Registry>,
    /// Plugin callbacks currently on the stack.
    depth: Cell<usize>,
    flushing: Cell<bool>,
    next_listener: Cell<u64>,
    /// Events emitted by plugins, held until no plugin is borrowed.
    outbox: RefCell<VecDeque<(String, Value)>>,
}

impl Kernel {
    pub fn new(scene: SceneHandle) -> Self {
        Self {
            scene,
            registry: RefCell::new(Registry::default()),
            depth: Cell::new(0),
            flushing: Cell::new(false),
            next_listener: Cell::new(1),
            outbox: RefCell::new(VecDeque::new()),
        }
    }

    pub fn scene(&self) -> &SceneHandle {
        &self.scene
    }

    // --- registration ------------------------------------------------------

    /// Register a module.
    ///
    /// Fails only when the module's name, one of its events or one of its
    /// API methods is already claimed; the existing bindings are untouched.
    pub fn register(&self, module: ModuleDef, options: Value) -> KernelResult<&Self> {
        let ModuleDef {
            descriptor,
            factory,
        } = module;
        if let Some(err) = self.registry.borrow().conflict(&descriptor) {
            return Err(err);
        }

        let name = descriptor.name.clone();
        let instance = self.enter(|| factory(&PluginContext::new(self, &name), &options));
        let exports = instance.exports().to_vec();
        let instance: PluginHandle = Rc::new(RefCell::new(instance));

        let mut registry = self.registry.borrow_mut();
        // The factory may have registered other modules.
        if let Some(err) = registry.conflict(&descriptor) {
            return Err(err);
        }

        for event in &descriptor.events {
            registry.events.insert(event.clone(), name.clone());
        }
        for method in &descriptor.apis {
            registry.apis.insert(method.clone(), name.clone());
            if exports.contains(&method.as_str()) {
                registry
                    .bound_apis
                    .insert(method.clone(), (name.clone(), instance.clone()));
            } else {
                log::warn!("Plugin `{}` declares API `{}` but does not export it", name, method);
            }
        }
        for hook in &descriptor.hooks {
            registry
                .pipelines
                .entry(*hook)
                .or_default()
                .tap(&name, instance.clone());
        }
        for identifier in &descriptor.shortcuts {
            match Shortcut::parse(identifier) {
                Ok(shortcut) => registry.shortcuts.push(ShortcutBinding {
                    plugin: name.clone(),
                    identifier: identifier.clone(),
                    shortcut,
                    instance: instance.clone(),
                }),
                Err(e) => log::warn!("Plugin `{}`: {}, not bound", name, e),
            }
        }
        registry.plugins.push(Entry {
            descriptor,
            instance,
        });
        drop(registry);

        log::info!("Registered plugin `{}`", name);
        Ok(self)
    }

    /// Look up a plugin instance by name.
    pub fn get_module(&self, name: &str) -> Option<PluginHandle> {
        self.registry
            .borrow()
            .plugins
            .iter()
            .find(|e| e.descriptor.name == name)
            .map(|e| e.instance.clone())
    }

    /// Borrow a plugin as its concrete type.
    ///
    /// Returns `None` if the name is unknown, the type does not match or the
    /// plugin is in the middle of a callback.
    pub fn with_module<T: Plugin, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        let handle = self.get_module(name)?;
        let guard = handle.try_borrow().ok()?;
        let plugin: &dyn Plugin = &**guard;
        let any: &dyn Any = plugin;
        any.downcast_ref::<T>().map(f)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.get_module(name).is_some()
    }

    /// Registered plugin names, in registration order.
    pub fn module_names(&self) -> Vec<String> {
        self.registry
            .borrow()
            .plugins
            .iter()
            .map(|e| e.descriptor.name.clone())
            .collect()
    }

    /// Bound shortcuts as `(plugin, identifier, parsed)`, in binding order.
    pub fn shortcuts(&self) -> Vec<(String, String, Shortcut)> {
        self.registry
            .borrow()
            .shortcuts
            .iter()
            .map(|b| (b.plugin.clone(), b.identifier.clone(), b.shortcut.clone()))
            .collect()
    }

    /// Number of taps on a hook pipeline.
    pub fn hook_taps(&self, hook: HookName) -> usize {
        self.registry
            .borrow()
            .pipelines
            .get(&hook)
            .map_or(0, HookPipeline::len)
    }

    // --- plugin calls ------------------------------------------------------

    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        self.depth.set(self.depth.get() + 1);
        let result = f();
        self.depth.set(self.depth.get() - 1);
        result
    }

    fn call_plugin<R>(
        &self,
        name: &str,
        handle: &PluginHandle,
        f: impl FnOnce(&mut dyn Plugin, &PluginContext<'_>) -> R,
    ) -> KernelResult<R> {
        let mut plugin = handle
            .try_borrow_mut()
            .map_err(|_| KernelError::PluginBusy(name.to_string()))?;
        let ctx = PluginContext::new(self, name);
        Ok(self.enter(|| f(&mut **plugin, &ctx)))
    }

    /// Call a plugin API by method name.
    ///
    /// Events the host queued beforehand are dispatched first, so the plugin
    /// sees a settled scene.
    pub fn invoke(&self, method: &str, args: Value) -> KernelResult<Value> {
        self.flush();
        let (owner, handle) = self
            .registry
            .borrow()
            .bound_apis
            .get(method)
            .cloned()
            .ok_or_else(|| KernelError::UnknownApi(method.to_string()))?;
        let result = self.call_plugin(&owner, &handle, |plugin, ctx| plugin.call(ctx, method, args))?;
        self.flush();
        result
    }

    // --- custom events -----------------------------------------------------

    /// Subscribe to a plugin-declared event.
    pub fn on(&self, event: &str, listener: impl Fn(&Value) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.registry.borrow_mut().listeners.push(ListenerEntry {
            id,
            event: event.to_string(),
            callback: Rc::new(listener),
        });
        id
    }

    /// Unsubscribe; returns whether the listener existed.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.listeners.len();
        registry.listeners.retain(|l| l.id != id);
        registry.listeners.len() != before
    }

    /// Deliver a declared event to its listeners.
    ///
    /// Events emitted from inside a plugin callback are held back and
    /// delivered once the outermost entry point finishes, so listeners may
    /// call back into any plugin, the emitter included.
    pub fn emit(&self, event: &str, payload: Value) {
        self.emit_from(None, event, payload);
    }

    pub(crate) fn emit_from(&self, sender: Option<&str>, event: &str, payload: Value) {
        {
            let registry = self.registry.borrow();
            match (registry.events.get(event), sender) {
                (None, _) => {
                    log::warn!("Dropping undeclared event `{}`", event);
                    return;
                }
                (Some(owner), Some(sender)) if owner != sender => {
                    log::warn!(
                        "Plugin `{}` emitted `{}`, which belongs to `{}`; dropped",
                        sender,
                        event,
                        owner
                    );
                    return;
                }
                _ => {}
            }
        }
        if self.depth.get() > 0 {
            self.outbox.borrow_mut().push_back((event.to_string(), payload));
            return;
        }
        self.deliver(event, &payload);
    }

    fn deliver(&self, event: &str, payload: &Value) {
        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.event == event)
            .map(|l| l.callback.clone())
            .collect();
        log::debug!("Event `{}` -> {} listener(s)", event, listeners.len());
        for listener in listeners {
            listener(payload);
        }
    }

    fn drain_outbox(&self) {
        loop {
            let next = self.outbox.borrow_mut().pop_front();
            let Some((event, payload)) = next else {
                break;
            };
            self.deliver(&event, &payload);
        }
    }

    // --- event pumping -----------------------------------------------------

    /// Dispatch queued scene events, then run idle callbacks.
    ///
    /// Does nothing when called from inside a plugin callback or a running
    /// flush; the outermost entry point flushes once it regains control.
    pub fn flush(&self) {
        if self.flushing.get() || self.depth.get() > 0 {
            return;
        }
        self.flushing.set(true);

        let mut rounds = 0;
        loop {
            let events = self.scene.borrow_mut().drain_events();
            if events.is_empty() {
                self.run_idle();
                if !self.scene.borrow().has_pending_events() {
                    break;
                }
                continue;
            }
            rounds += 1;
            if rounds > MAX_FLUSH_ROUNDS {
                log::warn!(
                    "Scene events still queued after {} rounds, deferring",
                    MAX_FLUSH_ROUNDS
                );
                let mut scene = self.scene.borrow_mut();
                for event in events.into_iter().rev() {
                    scene.requeue_front(event);
                }
                break;
            }
            for event in &events {
                self.dispatch_scene_event(event);
            }
        }

        self.flushing.set(false);
        self.drain_outbox();
    }

    fn subscribers(&self, filter: impl Fn(&PluginDescriptor) -> bool) -> Vec<(String, PluginHandle)> {
        self.registry
            .borrow()
            .plugins
            .iter()
            .filter(|e| filter(&e.descriptor))
            .map(|e| (e.descriptor.name.clone(), e.instance.clone()))
            .collect()
    }

    fn dispatch_scene_event(&self, event: &SceneEvent) {
        let kind = event.kind();
        for (name, handle) in self.subscribers(|d| d.scene_events.contains(&kind)) {
            if let Err(e) = self.call_plugin(&name, &handle, |plugin, ctx| {
                plugin.on_scene_event(ctx, event)
            }) {
                log::warn!("Skipped {} for `{}`: {}", kind.name(), name, e);
            }
        }
    }

    fn run_idle(&self) {
        for (name, handle) in self.subscribers(|_| true) {
            if let Err(e) = self.call_plugin(&name, &handle, |plugin, ctx| plugin.on_idle(ctx)) {
                log::warn!("Skipped idle for `{}`: {}", name, e);
            }
        }
    }

    // --- host entry points -------------------------------------------------

    pub fn pointer_down(&self, screen: Point) {
        self.scene.borrow_mut().pointer_down(screen);
        self.flush();
    }

    pub fn pointer_move(&self, screen: Point) {
        self.scene.borrow_mut().pointer_move(screen);
        self.flush();
    }

    pub fn pointer_up(&self, screen: Point) {
        self.scene.borrow_mut().pointer_up(screen);
        self.flush();
    }

    /// Forward a key event to every plugin with a matching shortcut.
    /// Returns whether any shortcut matched.
    pub fn key_event(&self, event: &KeyEvent) -> bool {
        self.flush();
        let matches: Vec<(String, String, PluginHandle)> = self
            .registry
            .borrow()
            .shortcuts
            .iter()
            .filter(|b| b.shortcut.matches(event))
            .map(|b| (b.plugin.clone(), b.identifier.clone(), b.instance.clone()))
            .collect();
        for (plugin, identifier, handle) in &matches {
            if let Err(e) = self.call_plugin(plugin, handle, |p, ctx| {
                p.on_shortcut(ctx, identifier, event.phase)
            }) {
                log::warn!("Shortcut `{}` not delivered: {}", identifier, e);
            }
        }
        self.flush();
        !matches.is_empty()
    }

    /// Mutate the scene from the host, then flush.
    pub fn update_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        let result = f(&mut *self.scene.borrow_mut());
        self.flush();
        result
    }

    // --- hooks and lifecycle -----------------------------------------------

    /// Run a pipeline: taps in registration order, each awaited before the
    /// next; the first failure stops the run.
    pub(crate) async fn run_hook(
        &self,
        hook: HookName,
        args: &HookContext,
    ) -> Result<(), PipelineError> {
        let taps = self
            .registry
            .borrow()
            .pipelines
            .get(&hook)
            .map(|p| p.taps().to_vec())
            .unwrap_or_default();

        for tap in taps {
            let outcome = self
                .call_plugin(&tap.plugin, &tap.instance, |plugin, ctx| {
                    plugin.on_hook(ctx, hook, args)
                })
                .unwrap_or_else(|e| HookOutcome::Ready(Err(HookError::new(e.to_string()))));
            outcome
                .into_future()
                .await
                .map_err(|source| pipeline_error(hook, &tap.plugin, source))?;
        }
        Ok(())
    }

    async fn run_hook_logged(&self, hook: HookName, args: &HookContext) {
        if let Err(e) = self.run_hook(hook, args).await {
            log::error!("{}", e);
        }
    }

    /// Import a scene document.
    ///
    /// Hooks run around the load: `before-import` on the whole document,
    /// `transform-object` once per object, `after-import` once the scene
    /// holds the new content. Hook failures are logged; a malformed document
    /// is returned as an error and leaves the scene as it was.
    pub async fn load_json(&self, json: &str) -> KernelResult<()> {
        let document: Value =
            serde_json::from_str(json).map_err(|e| KernelError::InvalidDocument(e.to_string()))?;
        if !document.is_object() {
            return Err(KernelError::InvalidDocument(
                "expected a JSON object".to_string(),
            ));
        }

        let args = HookContext::new(self.scene.clone(), document);
        self.run_hook_logged(HookName::BeforeImport, &args).await;
        let mut document = args.into_data();

        if let Some(objects) = document.get_mut("objects").and_then(Value::as_array_mut) {
            for object in objects.iter_mut() {
                let args = HookContext::new(self.scene.clone(), object.take());
                self.run_hook_logged(HookName::TransformObject, &args).await;
                *object = args.into_data();
            }
        }

        let document = SceneDocument::from_value(document)
            .map_err(|e| KernelError::InvalidDocument(e.to_string()))?;
        log::info!("Importing scene with {} object(s)", document.objects.len());
        self.update_scene(|scene| scene.load_document(document));

        let args = HookContext::new(self.scene.clone(), Value::Null);
        self.run_hook_logged(HookName::AfterImport, &args).await;
        self.update_scene(Scene::request_render);
        Ok(())
    }

    /// Serialize the scene, running `before-save` and `after-save` around it.
    pub async fn save_json(&self) -> KernelResult<String> {
        let args = HookContext::new(self.scene.clone(), Value::Null);
        self.run_hook_logged(HookName::BeforeSave, &args).await;
        self.flush();

        let document = self.scene.borrow().to_document();
        let json = document.to_json().map_err(SceneError::from)?;

        let saved = serde_json::to_value(&document).map_err(SceneError::from)?;
        let args = HookContext::new(self.scene.clone(), saved);
        self.run_hook_logged(HookName::AfterSave, &args).await;
        Ok(json)
    }

    /// Destroy every plugin and clear all bindings. Safe to call twice.
    pub fn teardown(&self) {
        let registry = std::mem::take(&mut *self.registry.borrow_mut());
        if registry.plugins.is_empty() {
            return;
        }
        for entry in registry.plugins.iter().rev() {
            let name = &entry.descriptor.name;
            if let Err(e) = self.call_plugin(name, &entry.instance, |plugin, ctx| plugin.destroy(ctx)) {
                log::warn!("Could not destroy `{}`: {}", name, e);
            }
        }
        log::info!("Kernel torn down ({} plugin(s))", registry.plugins.len());
    }
}
