// pitchtrace-core/src/lib.rs

//! The core logic for the vocal pitch visualizer.
//! This crate captures audio, estimates the pitch of every hop, keeps a
//! bounded history of the results, smooths it with a median filter and
//! derives the visible note range for the graph. It is completely headless
//! and contains no GUI code.

pub mod audio;
pub mod camera;
pub mod config;
pub mod easing;
pub mod error;
pub mod fft;
pub mod filter;
pub mod notes;
pub mod pitch;
pub mod trace;
pub mod tracker;
pub mod window;
pub mod worker;

#[cfg(test)]
mod testing;

pub use camera::{Camera, CameraBounds, CameraSettings};
pub use config::{TrackerConfig, TrackerParams};
pub use error::{ConfigError, Result, TrackerError};
pub use tracker::PitchTracker;

/// Represents the result of analysing a single hop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisResult {
    /// Wall-clock time of the analysis in seconds since the Unix epoch.
    pub timestamp: f64,
    /// The detected fundamental frequency in Hz, 0.0 for silence.
    pub pitch_hz: f32,
    /// The level of the hop in dB.
    pub volume_db: f32,
    /// The confidence of the detected frequency (0.0 to 1.0).
    pub confidence: f32,
    /// Onset strength; onset detection is not enabled, so always 0.0.
    pub onset: f32,
}
