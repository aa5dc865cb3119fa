//! # Application Settings
//!
//! Loaded once at startup from `pitchtrace.json` in the working directory.
//! Every field is optional in the file; a missing file means defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use pitchtrace_core::{CameraSettings, TrackerConfig};

pub const SETTINGS_PATH: &str = "pitchtrace.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // --- Audio ---
    /// Input device index, `None` for the host default
    pub device_index: Option<usize>,
    /// Frequency of A4 in Hz
    pub standard_pitch: f32,
    /// Seconds of pitch history on screen
    pub analysis_window_seconds: f32,
    /// Half-width of the median filter in seconds
    pub filter_window_seconds: f32,
    pub silence_threshold_db: f32,

    // --- Graphics ---
    pub window_width: f32,
    pub window_height: f32,
    pub target_fps: u32,
    pub start_in_fullscreen: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            device_index: None,
            standard_pitch: 440.0,
            analysis_window_seconds: 10.0,
            filter_window_seconds: 0.2,
            silence_threshold_db: -60.0,
            window_width: 1024.0,
            window_height: 768.0,
            target_fps: 60,
            start_in_fullscreen: false,
        }
    }
}

impl AppSettings {
    /// Reads settings from `path`, falling back to defaults if it does not exist.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read or is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("invalid settings in {}", path.display()))
    }

    /// Configuration of the pitch tracker.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            device_index: self.device_index,
            silence_threshold_db: self.silence_threshold_db,
            analysis_window_seconds: self.analysis_window_seconds,
            filter_window_seconds: self.filter_window_seconds,
            ..TrackerConfig::default()
        }
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            standard_pitch: self.standard_pitch,
            ..CameraSettings::default()
        }
    }

    /// Logs the effective configuration.
    pub fn log_summary(&self) {
        log::info!("Audio configuration:");
        match self.device_index {
            Some(index) => log::info!("  device_index: {}", index),
            None => log::info!("  device_index: default"),
        }
        log::info!("  standard_pitch: {} Hz", self.standard_pitch);
        log::info!("  analysis_window: {} s", self.analysis_window_seconds);
        log::info!("  filter_window: {} s", self.filter_window_seconds);
        log::info!("  silence_threshold: {} dB", self.silence_threshold_db);
        log::info!("Graphics configuration:");
        log::info!("  window: {}x{}", self.window_width, self.window_height);
        log::info!("  target_fps: {}", self.target_fps);
        log::info!("  start_in_fullscreen: {}", self.start_in_fullscreen);
    }
}
