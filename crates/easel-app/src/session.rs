//! A headless editing session: one scene, one kernel, the stock plugins.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::shortcuts::{self, ShortcutEntry};
use easel_core::geometry::{clip, polygon};
use easel_core::{HistoryApi, HistoryCounts, Kernel, Scene, history, snap};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

/// What `easel info` prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub objects: usize,
    pub width: f64,
    pub height: f64,
    pub background: String,
    pub history: HistoryCounts,
    pub plugins: Vec<String>,
}

pub struct Session {
    kernel: Kernel,
}

impl Session {
    /// Build the scene and register history, snapping, clip shapes and
    /// polygon editing.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let mut scene = Scene::new(config.canvas_width, config.canvas_height);
        scene.set_background(config.background.clone());

        let kernel = Kernel::new(scene.shared());
        kernel
            .register(
                history::module(),
                json!({ "maxLength": config.history_length }),
            )?
            .register(
                snap::module(),
                json!({ "margin": config.snap_margin, "enabled": config.snapping }),
            )?
            .register(clip::module(), Value::Null)?
            .register(polygon::module(), Value::Null)?;
        log::info!("Session ready with {} plugin(s)", kernel.module_names().len());

        Ok(Self { kernel })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Import a scene document through the kernel's import pipeline.
    pub async fn open(&self, path: &Path) -> AppResult<()> {
        let json = fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.kernel.load_json(&json).await?;
        log::info!("Opened {}", path.display());
        Ok(())
    }

    /// Export the scene through the kernel's save pipeline.
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        let json = self.kernel.save_json().await?;
        fs::write(path, json).map_err(|source| AppError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Saved {}", path.display());
        Ok(())
    }

    pub fn summary(&self) -> AppResult<SessionSummary> {
        let history = self.kernel.history_counts()?;
        let scene = self.kernel.scene().borrow();
        Ok(SessionSummary {
            objects: scene.len(),
            width: scene.size().width,
            height: scene.size().height,
            background: scene.background().to_string(),
            history,
            plugins: self.kernel.module_names(),
        })
    }

    pub fn shortcuts(&self) -> Vec<ShortcutEntry> {
        shortcuts::collect(&self.kernel)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.kernel.teardown();
    }
}
