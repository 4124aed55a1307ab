//! Easel Core Library
//!
//! Headless core of the easel scene editor: the scene model, the plugin
//! kernel, undo/redo history, alignment guides and the geometry helpers.

pub mod error;
pub mod geometry;
pub mod history;
pub mod kernel;
pub mod scene;
pub mod snap;
pub mod viewport;

pub use error::{HookError, KernelError, KernelResult, PipelineError, SceneError, SceneResult};
pub use geometry::{ClipApi, ClipRequest, ClipShape, PolygonApi};
pub use history::{HistoryApi, HistoryCounts, HistoryOptions};
pub use kernel::{
    HookContext, HookName, HookOutcome, KeyEvent, Kernel, ModuleDef, Plugin, PluginContext,
    PluginDescriptor, Shortcut,
};
pub use scene::{ObjectId, Scene, SceneDocument, SceneEvent, SceneHandle, SceneObject};
pub use snap::{SnapApi, SnapCandidate, SnapOptions};
pub use viewport::Viewport;
