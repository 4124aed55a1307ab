//! Error types for the kernel, the scene and hook pipelines.

use crate::scene::ObjectId;
use thiserror::Error;

/// Errors raised by scene operations.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("Unknown property `{0}`")]
    UnknownProperty(String),
    #[error("Invalid value for property `{property}`: {reason}")]
    InvalidProperty { property: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error produced by a single hook implementation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A hook pipeline stopped at a failing tap.
#[derive(Debug, Clone, Error)]
#[error("Hook `{hook}` failed in plugin `{plugin}`: {source}")]
pub struct PipelineError {
    pub hook: &'static str,
    pub plugin: String,
    #[source]
    pub source: HookError,
}

/// Kernel errors.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Plugin `{0}` is already registered")]
    DuplicatePlugin(String),
    #[error("Event `{event}` is already declared by plugin `{owner}`")]
    DuplicateEvent { event: String, owner: String },
    #[error("API method `{method}` is already exposed by plugin `{owner}`")]
    DuplicateApi { method: String, owner: String },
    #[error("No plugin exposes API method `{0}`")]
    UnknownApi(String),
    #[error("Plugin `{0}` is busy")]
    PluginBusy(String),
    #[error("Invalid arguments for `{method}`: {reason}")]
    InvalidArguments { method: String, reason: String },
    #[error("Invalid shortcut `{0}`")]
    InvalidShortcut(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl KernelError {
    /// Build an `InvalidArguments` error from any displayable reason.
    pub fn invalid_arguments(method: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidArguments {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
