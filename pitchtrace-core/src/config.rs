//! # Tracker Configuration
//!
//! [`TrackerConfig`] is immutable for the lifetime of one capture session.
//! Changing the device or the silence threshold goes through a full
//! stop/restart of the capture worker.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest history and filter window accepted, in seconds.
pub const MAX_WINDOW_SECONDS: f32 = 3600.0;

/// Settings of one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Index into the host's input devices, `None` for the host default.
    pub device_index: Option<usize>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples used by the pitch estimator per estimation call
    pub buffer_size: usize,
    /// Levels below this (in dB) are treated as silence
    pub silence_threshold_db: f32,
    /// Seconds of history kept for display and filtering
    pub analysis_window_seconds: f32,
    /// Half-width of the median filter neighbourhood in seconds
    pub filter_window_seconds: f32,
    /// Lowest pitch that must fit into a single hop, in Hz
    pub pitch_floor_hz: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            device_index: None,
            sample_rate: 44100,
            buffer_size: 4096,
            silence_threshold_db: -50.0,
            analysis_window_seconds: 30.0,
            filter_window_seconds: 0.2,
            pitch_floor_hz: 65.4064, // C2
        }
    }
}

/// Lengths derived from a [`TrackerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerParams {
    /// Samples consumed per analysis step
    pub hop_size: usize,
    /// Capacity of the analysis window, in hops
    pub analysis_window_len: usize,
    /// Median filter half-width, in hops
    pub filter_window_len: usize,
}

impl TrackerParams {
    /// Duration of a single hop in seconds.
    pub fn hop_seconds(&self, sample_rate: u32) -> f64 {
        self.hop_size as f64 / sample_rate as f64
    }
}

impl TrackerConfig {
    /// Derives hop size and window lengths and checks them for consistency.
    ///
    /// - `hop_size = ceil(sample_rate / pitch_floor_hz)`
    /// - window lengths are `ceil(seconds / hop_duration)`
    ///
    /// # Errors
    /// * [`ConfigError::NonPositive`] for a zero or negative rate, size or window
    /// * [`ConfigError::TooLarge`] for a window longer than [`MAX_WINDOW_SECONDS`] or not finite
    /// * [`ConfigError::HopExceedsBuffer`] if one hop does not fit into the estimator buffer
    /// * [`ConfigError::FilterExceedsWindow`] if the filter is wider than the history
    pub fn derive(&self) -> Result<TrackerParams, ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::NonPositive { field: "sample_rate" });
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::NonPositive { field: "buffer_size" });
        }
        if !(self.pitch_floor_hz > 0.0) {
            return Err(ConfigError::NonPositive { field: "pitch_floor_hz" });
        }
        if !(self.analysis_window_seconds > 0.0) {
            return Err(ConfigError::NonPositive { field: "analysis_window_seconds" });
        }
        if !(self.filter_window_seconds >= 0.0) {
            return Err(ConfigError::NonPositive { field: "filter_window_seconds" });
        }
        for (field, seconds) in [
            ("analysis_window_seconds", self.analysis_window_seconds),
            ("filter_window_seconds", self.filter_window_seconds),
        ] {
            if !(seconds <= MAX_WINDOW_SECONDS) {
                return Err(ConfigError::TooLarge { field, max: MAX_WINDOW_SECONDS });
            }
        }

        let sample_rate = self.sample_rate as f64;
        let hop_size = (sample_rate / self.pitch_floor_hz as f64).ceil() as usize;
        if hop_size > self.buffer_size {
            return Err(ConfigError::HopExceedsBuffer {
                hop_size,
                buffer_size: self.buffer_size,
            });
        }

        let hops = |seconds: f32| (seconds as f64 * sample_rate / hop_size as f64).ceil() as usize;
        let analysis_window_len = hops(self.analysis_window_seconds);
        let filter_window_len = hops(self.filter_window_seconds);
        if filter_window_len > analysis_window_len {
            return Err(ConfigError::FilterExceedsWindow {
                filter_window_len,
                analysis_window_len,
            });
        }

        Ok(TrackerParams {
            hop_size,
            analysis_window_len,
            filter_window_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn singing_config() -> TrackerConfig {
        TrackerConfig {
            analysis_window_seconds: 10.0,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_derived_lengths() {
        let params = singing_config().derive().unwrap();
        // ceil(44100 / 65.4064) = ceil(674.25)
        assert_eq!(params.hop_size, 675);
        assert_eq!(params.analysis_window_len, 654);
        assert_eq!(params.filter_window_len, 14);
        assert!((params.hop_seconds(44100) - 675.0 / 44100.0).abs() < 1e-12);
    }

    #[test]
    fn test_hop_exceeds_buffer() {
        let config = TrackerConfig {
            buffer_size: 512,
            ..singing_config()
        };
        assert_eq!(
            config.derive(),
            Err(ConfigError::HopExceedsBuffer { hop_size: 675, buffer_size: 512 })
        );
    }

    #[test]
    fn test_filter_exceeds_window() {
        let config = TrackerConfig {
            analysis_window_seconds: 0.1,
            filter_window_seconds: 0.5,
            ..singing_config()
        };
        assert!(matches!(
            config.derive(),
            Err(ConfigError::FilterExceedsWindow { .. })
        ));
    }

    #[test]
    fn test_zero_filter_window_is_allowed() {
        let config = TrackerConfig {
            filter_window_seconds: 0.0,
            ..singing_config()
        };
        assert_eq!(config.derive().unwrap().filter_window_len, 0);
    }

    #[test]
    fn test_non_positive_values() {
        let config = TrackerConfig {
            pitch_floor_hz: 0.0,
            ..singing_config()
        };
        assert_eq!(
            config.derive(),
            Err(ConfigError::NonPositive { field: "pitch_floor_hz" })
        );
        let config = TrackerConfig {
            sample_rate: 0,
            ..singing_config()
        };
        assert_eq!(
            config.derive(),
            Err(ConfigError::NonPositive { field: "sample_rate" })
        );
    }

    #[test]
    fn test_oversized_windows_are_rejected() {
        let config = TrackerConfig {
            analysis_window_seconds: 1e30,
            ..singing_config()
        };
        assert_eq!(
            config.derive(),
            Err(ConfigError::TooLarge { field: "analysis_window_seconds", max: MAX_WINDOW_SECONDS })
        );

        let config = TrackerConfig {
            analysis_window_seconds: f32::INFINITY,
            filter_window_seconds: f32::INFINITY,
            ..singing_config()
        };
        assert!(matches!(config.derive(), Err(ConfigError::TooLarge { .. })));

        let config = TrackerConfig {
            analysis_window_seconds: MAX_WINDOW_SECONDS,
            ..singing_config()
        };
        assert_eq!(config.derive().unwrap().analysis_window_len, 235_200);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{ "device_index": 2, "silence_threshold_db": -60.0 }"#).unwrap();
        assert_eq!(config.device_index, Some(2));
        assert_eq!(config.silence_threshold_db, -60.0);
        assert_eq!(config.buffer_size, 4096);
    }
}
