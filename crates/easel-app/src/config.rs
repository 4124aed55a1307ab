//! Application configuration: defaults, optionally overridden by a JSON file.

use crate::error::{AppError, AppResult};
use easel_core::history::MAX_UNDO_HISTORY;
use easel_core::scene::DEFAULT_BACKGROUND;
use easel_core::snap::DEFAULT_MARGIN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for one editing session.
///
/// Every field is optional in the file; missing ones keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub background: String,
    pub history_length: usize,
    pub snap_margin: f64,
    pub snapping: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1920.0,
            canvas_height: 1080.0,
            background: DEFAULT_BACKGROUND.to_string(),
            history_length: MAX_UNDO_HISTORY,
            snap_margin: DEFAULT_MARGIN,
            snapping: true,
        }
    }
}

impl AppConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
