//! The contract every module implements to take part in the kernel.

use super::Kernel;
use super::hook::{HookContext, HookName, HookOutcome};
use super::shortcut::KeyPhase;
use crate::error::{KernelError, KernelResult};
use crate::scene::{SceneEvent, SceneEventKind, SceneHandle};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// A registered plugin instance.
pub type PluginHandle = Rc<RefCell<Box<dyn Plugin>>>;

/// Builds a plugin instance from the registration context and its options.
pub type PluginFactory = Box<dyn FnOnce(&PluginContext<'_>, &Value) -> Box<dyn Plugin>>;

/// A feature module living inside the kernel.
///
/// Every callback receives a [`PluginContext`] giving access to the scene
/// and to the rest of the kernel. All callbacks have no-op defaults.
pub trait Plugin: Any {
    /// A scene event this plugin subscribed to via its descriptor.
    fn on_scene_event(&mut self, _ctx: &PluginContext<'_>, _event: &SceneEvent) {}

    /// End of an event-loop turn: every queued scene event has been handled.
    fn on_idle(&mut self, _ctx: &PluginContext<'_>) {}

    /// A lifecycle hook listed in the descriptor.
    fn on_hook(
        &mut self,
        _ctx: &PluginContext<'_>,
        _hook: HookName,
        _args: &HookContext,
    ) -> HookOutcome {
        HookOutcome::ok()
    }

    /// A bound shortcut was pressed or released.
    fn on_shortcut(&mut self, _ctx: &PluginContext<'_>, _shortcut: &str, _phase: KeyPhase) {}

    /// API methods this instance can actually serve.
    fn exports(&self) -> &[&'static str] {
        &[]
    }

    /// Serve an API call routed by the kernel.
    fn call(&mut self, _ctx: &PluginContext<'_>, method: &str, _args: Value) -> KernelResult<Value> {
        Err(KernelError::UnknownApi(method.to_string()))
    }

    /// Release resources; called once on teardown.
    fn destroy(&mut self, _ctx: &PluginContext<'_>) {}
}

/// Static declaration of a module: its name and everything it claims.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginDescriptor {
    pub name: String,
    /// Custom events the plugin emits.
    pub events: Vec<String>,
    /// API methods the plugin exposes through the kernel.
    pub apis: Vec<String>,
    /// Shortcut identifiers, e.g. `ctrl+z`.
    pub shortcuts: Vec<String>,
    pub hooks: Vec<HookName>,
    pub scene_events: Vec<SceneEventKind>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }

    pub fn api(mut self, method: impl Into<String>) -> Self {
        self.apis.push(method.into());
        self
    }

    pub fn shortcut(mut self, identifier: impl Into<String>) -> Self {
        self.shortcuts.push(identifier.into());
        self
    }

    pub fn hook(mut self, hook: HookName) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn subscribe(mut self, kinds: &[SceneEventKind]) -> Self {
        self.scene_events.extend_from_slice(kinds);
        self
    }
}

/// A module ready for registration: descriptor plus instance factory.
pub struct ModuleDef {
    pub descriptor: PluginDescriptor,
    pub factory: PluginFactory,
}

impl ModuleDef {
    pub fn new<F>(descriptor: PluginDescriptor, factory: F) -> Self
    where
        F: FnOnce(&PluginContext<'_>, &Value) -> Box<dyn Plugin> + 'static,
    {
        Self {
            descriptor,
            factory: Box::new(factory),
        }
    }
}

/// What a plugin sees of the kernel while one of its callbacks runs.
pub struct PluginContext<'a> {
    kernel: &'a Kernel,
    name: &'a str,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(kernel: &'a Kernel, name: &'a str) -> Self {
        Self { kernel, name }
    }

    /// Name of the plugin being called.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn scene(&self) -> &SceneHandle {
        self.kernel.scene()
    }

    pub fn kernel(&self) -> &Kernel {
        self.kernel
    }

    /// Emit a custom event declared by this plugin.
    pub fn emit(&self, event: &str, payload: Value) {
        self.kernel.emit_from(Some(self.name), event, payload);
    }

    /// Call another plugin's API.
    pub fn invoke(&self, method: &str, args: Value) -> KernelResult<Value> {
        self.kernel.invoke(method, args)
    }
}

/// Deserialize plugin options, falling back to defaults on bad input.
pub fn parse_options<T>(plugin: &str, options: &Value) -> T
where
    T: DeserializeOwned + Default,
{
    if options.is_null() {
        return T::default();
    }
    match serde_json::from_value(options.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Invalid options for plugin `{}`, using defaults: {}", plugin, e);
            T::default()
        }
    }
}

/// Deserialize API arguments, mapping failures to `InvalidArguments`.
pub fn parse_args<T: DeserializeOwned>(method: &str, args: Value) -> KernelResult<T> {
    serde_json::from_value(args).map_err(|e| KernelError::invalid_arguments(method, e))
}

/// Serialize an API result.
pub fn to_value<T: serde::Serialize>(method: &str, value: T) -> KernelResult<Value> {
    serde_json::to_value(value).map_err(|e| KernelError::invalid_arguments(method, e))
}
