use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::object::StrokeWidth;

/// Editor defaults plus the tuned interaction constants. The text-tool
/// numbers are heuristics, not invariants, so they live here rather than in
/// the tool code.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub last_color: [u8; 4],
    pub last_stroke: StrokeWidth,
    /// Narrowest textbox a drag can produce.
    pub text_min_width: f32,
    /// Font size used when the text drag has no usable height.
    pub text_default_font: f32,
    pub text_font_min: f32,
    pub text_font_max: f32,
    /// Maximum undo depth; past it the oldest snapshot is evicted.
    pub history_cap: usize,
    /// Drags smaller than this (surface units) are discarded, not promoted.
    pub min_drag: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            last_color: [229, 62, 62, 255],
            last_stroke: StrokeWidth::Medium,
            text_min_width: 160.0,
            text_default_font: 28.0,
            text_font_min: 14.0,
            text_font_max: 120.0,
            history_cap: 50,
            min_drag: 5.0,
        }
    }
}

impl EditorConfig {
    pub fn clamp_font(&self, size: f32) -> f32 {
        size.clamp(self.text_font_min, self.text_font_max)
    }

    fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "snapcrop", "snapcrop")?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir).ok()?;
        Some(config_dir.join("settings.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
