use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    AUTO_SCROLL_MARGIN, DEFAULT_BPM, DEFAULT_PIXELS_PER_SECOND, DEFAULT_STAFF_HEIGHT,
    DEFAULT_WAVEFORM_HEIGHT, HISTORY_LIMIT,
};
use crate::model::Subdivision;
use crate::paths::config_path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub view: ViewConfig,
    pub editor: EditorConfig,
    pub waveform: WaveformConfig,
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub pixels_per_second: f32,
    pub auto_scroll_margin: f32,
    pub staff_height: f32,
    pub show_keyboard: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub default_tempo: f64,
    pub default_subdivision: Subdivision,
    pub history_limit: usize,
    pub playback_speed: f64,
}

/// Look of the waveform strip and settings handed to the transport engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WaveformConfig {
    pub wave_color: (u8, u8, u8),
    pub progress_color: (u8, u8, u8),
    pub height_px: f32,
    pub bar_width: f32,
    pub bar_gap: f32,
    /// Kept equal to the roll's pixels per second so waveform and notes line up.
    pub samples_per_pixel: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PathConfig {
    pub last_midi_dir: Option<PathBuf>,
    pub last_audio_dir: Option<PathBuf>,
    pub last_export_dir: Option<PathBuf>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
            auto_scroll_margin: AUTO_SCROLL_MARGIN,
            staff_height: DEFAULT_STAFF_HEIGHT,
            show_keyboard: true,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_tempo: DEFAULT_BPM,
            default_subdivision: Subdivision::default(),
            history_limit: HISTORY_LIMIT,
            playback_speed: 1.0,
        }
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            wave_color: (120, 130, 150),
            progress_color: (90, 160, 230),
            height_px: DEFAULT_WAVEFORM_HEIGHT,
            bar_width: 2.0,
            bar_gap: 1.0,
            samples_per_pixel: DEFAULT_PIXELS_PER_SECOND,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(path) = config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
