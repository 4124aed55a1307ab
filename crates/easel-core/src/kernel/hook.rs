//! Lifecycle hook pipelines.
//!
//! A pipeline is an ordered list of taps, one per plugin implementing the
//! hook, awaited one after another in registration order.

use super::plugin::PluginHandle;
use crate::error::{HookError, PipelineError};
use crate::scene::SceneHandle;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// A hook future. Not `Send`: everything runs on the editor thread.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<(), HookError>>>>;

/// Named lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    BeforeImport,
    AfterImport,
    BeforeSave,
    AfterSave,
    TransformObject,
}

impl HookName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeImport => "before-import",
            Self::AfterImport => "after-import",
            Self::BeforeSave => "before-save",
            Self::AfterSave => "after-save",
            Self::TransformObject => "transform-object",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook implementation returns: done now, or a future to await.
pub enum HookOutcome {
    Ready(Result<(), HookError>),
    Pending(HookFuture),
}

impl HookOutcome {
    pub fn ok() -> Self {
        Self::Ready(Ok(()))
    }

    pub fn pending(future: impl Future<Output = Result<(), HookError>> + 'static) -> Self {
        Self::Pending(Box::pin(future))
    }

    /// Normalize to an awaitable.
    pub fn into_future(self) -> HookFuture {
        match self {
            Self::Ready(result) => Box::pin(std::future::ready(result)),
            Self::Pending(future) => future,
        }
    }
}

impl From<Result<(), HookError>> for HookOutcome {
    fn from(result: Result<(), HookError>) -> Self {
        Self::Ready(result)
    }
}

/// Arguments handed to every tap of one pipeline run.
///
/// `data` is the hook's mutable payload: the whole document for the
/// import/save hooks, a single object for `transform-object`. Taps see the
/// edits of the taps before them.
#[derive(Clone)]
pub struct HookContext {
    pub scene: SceneHandle,
    pub data: Rc<RefCell<Value>>,
}

impl HookContext {
    pub fn new(scene: SceneHandle, data: Value) -> Self {
        Self {
            scene,
            data: Rc::new(RefCell::new(data)),
        }
    }

    /// Take the payload back out once the pipeline is done.
    pub fn into_data(self) -> Value {
        match Rc::try_unwrap(self.data) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Tap {
    pub plugin: String,
    pub instance: PluginHandle,
}

/// Ordered taps for one lifecycle point.
#[derive(Clone, Default)]
pub(crate) struct HookPipeline {
    taps: Vec<Tap>,
}

impl HookPipeline {
    pub fn tap(&mut self, plugin: &str, instance: PluginHandle) {
        self.taps.push(Tap {
            plugin: plugin.to_string(),
            instance,
        });
    }

    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }
}

/// Wrap a tap failure with the hook and plugin it came from.
pub(crate) fn pipeline_error(hook: HookName, plugin: &str, source: HookError) -> PipelineError {
    PipelineError {
        hook: hook.as_str(),
        plugin: plugin.to_string(),
        source,
    }
}
