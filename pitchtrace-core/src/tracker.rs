//! # Pitch Tracker
//!
//! The analysis buffer with its capture lifecycle. A [`PitchTracker`] owns at
//! most one [`CaptureWorker`] at a time and the [`AnalysisWindow`] it fills.
//!
//! Reconfiguration is never applied to a running worker: changing the device
//! or the silence threshold stops the worker, waits for it to release the
//! device and starts a new one.

use std::sync::Arc;

use crate::audio::{AudioBackend, AudioDevice, CpalBackend, StreamRequest};
use crate::config::{TrackerConfig, TrackerParams};
use crate::error::Result;
use crate::filter;
use crate::pitch::{self, EstimatorFactory, EstimatorSettings};
use crate::window::AnalysisWindow;
use crate::worker::CaptureWorker;
use crate::AnalysisResult;

pub struct PitchTracker {
    config: TrackerConfig,
    params: TrackerParams,
    backend: Arc<dyn AudioBackend>,
    estimators: EstimatorFactory,
    window: Arc<AnalysisWindow>,
    worker: Option<CaptureWorker>,
}

impl PitchTracker {
    /// Creates a stopped tracker capturing through CPAL with the YIN estimator.
    ///
    /// # Errors
    /// * [`crate::TrackerError::Config`] if `config` is inconsistent
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(CpalBackend), pitch::yin_factory())
    }

    /// Creates a stopped tracker with a custom audio backend and estimator.
    pub fn with_backend(
        config: TrackerConfig,
        backend: Arc<dyn AudioBackend>,
        estimators: EstimatorFactory,
    ) -> Result<Self> {
        let params = config.derive()?;
        log::debug!(
            "Tracker parameters: hop {} samples ({:.1} ms), history {} hops, filter {} hops",
            params.hop_size,
            params.hop_seconds(config.sample_rate) * 1000.0,
            params.analysis_window_len,
            params.filter_window_len
        );

        Ok(Self {
            config,
            params,
            backend,
            estimators,
            window: Arc::new(AnalysisWindow::new(params.analysis_window_len)),
            worker: None,
        })
    }

    /// Starts capturing with the current configuration.
    ///
    /// A running worker is stopped first. The history is cleared.
    ///
    /// # Errors
    /// * [`crate::TrackerError::DeviceUnavailable`] if the input device cannot be opened
    /// * [`crate::TrackerError::Worker`] if the capture thread fails
    pub fn start_tracking(&mut self) -> Result<()> {
        self.stop_tracking()?;
        self.window.clear();

        let request = StreamRequest {
            device_index: self.config.device_index,
            sample_rate: self.config.sample_rate,
            hop_size: self.params.hop_size,
        };
        let settings = EstimatorSettings {
            buffer_size: self.config.buffer_size,
            hop_size: self.params.hop_size,
            sample_rate: self.config.sample_rate,
            silence_threshold_db: self.config.silence_threshold_db,
        };

        let worker = CaptureWorker::start(
            request,
            settings,
            Arc::clone(&self.backend),
            Arc::clone(&self.estimators),
            Arc::clone(&self.window),
        )?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Stops capturing and waits until the device is released.
    ///
    /// Does nothing if the tracker is not running.
    pub fn stop_tracking(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.stop(),
            None => Ok(()),
        }
    }

    /// Restarts capturing on another input device.
    pub fn change_device(&mut self, device_index: usize) -> Result<()> {
        log::info!("Switching to input device {}", device_index);
        let config = TrackerConfig {
            device_index: Some(device_index),
            ..self.config.clone()
        };
        self.apply_config(config)
    }

    /// Restarts capturing with another silence threshold in dB.
    pub fn set_silence_threshold(&mut self, silence_threshold_db: f32) -> Result<()> {
        log::info!("Silence threshold set to {} dB", silence_threshold_db);
        let config = TrackerConfig {
            silence_threshold_db,
            ..self.config.clone()
        };
        self.apply_config(config)
    }

    /// Replaces the configuration: stop, then start with `config`.
    ///
    /// An invalid `config` is rejected before the running worker is touched.
    pub fn apply_config(&mut self, config: TrackerConfig) -> Result<()> {
        let params = config.derive()?;
        self.stop_tracking()?;

        if params.analysis_window_len != self.window.capacity() {
            self.window = Arc::new(AnalysisWindow::new(params.analysis_window_len));
        }
        self.config = config;
        self.params = params;

        self.start_tracking()
    }

    /// Returns true while a worker is capturing.
    ///
    /// Turns false on its own if the input stream ends.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(CaptureWorker::is_alive)
    }

    /// Point-in-time copy of the unfiltered history, oldest first.
    pub fn snapshot(&self) -> Vec<AnalysisResult> {
        self.window.snapshot()
    }

    /// Median-filtered copy of the history for display.
    pub fn get_display_results(&self) -> Vec<AnalysisResult> {
        filter::filter_results(&self.window.snapshot(), self.params.filter_window_len)
    }

    /// Input devices of the tracker's audio backend.
    pub fn input_devices(&self) -> Result<Vec<AudioDevice>> {
        self.backend.input_devices()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn hop_size(&self) -> usize {
        self.params.hop_size
    }

    pub fn analysis_window_len(&self) -> usize {
        self.params.analysis_window_len
    }

    pub fn filter_window_len(&self) -> usize {
        self.params.filter_window_len
    }
}

impl Drop for PitchTracker {
    fn drop(&mut self) {
        if let Err(e) = self.stop_tracking() {
            log::error!("Failed to stop tracking: {}", e);
        }
    }
}
