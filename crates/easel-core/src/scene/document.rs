//! The JSON scene snapshot.

use super::object::SceneObject;
use serde::{Deserialize, Serialize};

/// Format version written into every document.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Default canvas background.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

/// A complete serialized scene: ordered objects plus canvas properties.
///
/// The compact JSON form of this struct is what history snapshots store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default = "default_version")]
    pub version: String,
    /// Objects, back to front.
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            objects: Vec::new(),
            background: default_background(),
            width: 0.0,
            height: 0.0,
        }
    }
}

impl SceneDocument {
    /// Compact JSON, used for snapshots.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
