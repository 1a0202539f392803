use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_PIXELS_PER_SECOND, PROJECT_EXTENSION};
use crate::idgen;
use crate::model::{GridParams, Note};

pub const PROJECT_VERSION: &str = "1.0.0";

/// Everything needed to reopen an editing session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Project {
    pub version: String,
    pub name: String,
    pub notes: Vec<Note>,
    pub grid: GridParams,
    #[serde(default = "default_zoom")]
    pub pixels_per_second: f32,
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub midi_path: Option<PathBuf>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

fn default_zoom() -> f32 {
    DEFAULT_PIXELS_PER_SECOND
}

impl Project {
    pub fn new(name: impl Into<String>, notes: Vec<Note>, grid: GridParams) -> Self {
        let now = chrono::Utc::now();
        Self {
            version: PROJECT_VERSION.to_string(),
            name: name.into(),
            notes,
            grid,
            pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
            audio_path: None,
            midi_path: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        // Keep the previous save around
        if path.exists() {
            let backup = path.with_extension(format!("{}.bak", PROJECT_EXTENSION));
            fs::copy(path, &backup)?;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.modified_at = chrono::Utc::now();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("saved project {} ({} notes)", path.display(), self.notes.len());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let mut project: Project = serde_json::from_str(&json)?;
        if project.version.split('.').next() != PROJECT_VERSION.split('.').next() {
            return Err(anyhow!("Unsupported project version {}", project.version));
        }

        project.grid = GridParams::new(project.grid.tempo, project.grid.offset, project.grid.subdivision);
        project.notes.retain(|n| n.duration > 0.0 && n.pitch <= 127);

        // New notes must not reuse ids stored in the file.
        if let Some(max_id) = project.notes.iter().map(|n| n.id).max() {
            idgen::seed_from_max(max_id);
        }
        Ok(project)
    }
}

/// Append the project extension when the user typed a bare name.
pub fn with_project_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(PROJECT_EXTENSION) => path.to_path_buf(),
        _ => path.with_extension(PROJECT_EXTENSION),
    }
}
