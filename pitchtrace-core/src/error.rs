//! # Error Types
//!
//! Every fallible operation in the core returns [`TrackerError`]. Configuration
//! problems are reported synchronously by the call that received the
//! configuration and are never retried.

use thiserror::Error;

/// Invalid tracker parameters, detected before any audio device is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("hop size {hop_size} exceeds buffer size {buffer_size}")]
    HopExceedsBuffer { hop_size: usize, buffer_size: usize },
    #[error("filter window ({filter_window_len} hops) exceeds analysis window ({analysis_window_len} hops)")]
    FilterExceedsWindow {
        filter_window_len: usize,
        analysis_window_len: usize,
    },
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("{field} must be finite and at most {max}")]
    TooLarge { field: &'static str, max: f32 },
}

/// Tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Invalid note name: {0:?}")]
    InvalidNoteName(String),
    #[error("Capture worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
