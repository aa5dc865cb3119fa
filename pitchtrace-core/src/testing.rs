//! In-memory audio backend and estimator for exercising the capture path
//! without audio hardware.
//!
//! Every scripted frame is filled with a single value; the scripted estimator
//! reports that value as the pitch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::audio::{AudioBackend, AudioDevice, FrameSource, Hop, StreamRequest};
use crate::error::{Result, TrackerError};
use crate::pitch::{EstimatorFactory, EstimatorSettings, PitchEstimate, PitchEstimator};

#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<f32>>>,
    failing_device: Option<usize>,
    close_after_script: bool,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<StreamRequest>>>,
}

impl ScriptedBackend {
    pub(crate) fn new(pitches: Vec<f32>) -> Self {
        Self {
            script: Arc::new(Mutex::new(pitches.into())),
            ..Self::default()
        }
    }

    /// Opening this device index fails.
    pub(crate) fn failing_device(mut self, index: usize) -> Self {
        self.failing_device = Some(index);
        self
    }

    /// Sources report a closed stream once the script runs out.
    pub(crate) fn closing_after_script(mut self) -> Self {
        self.close_after_script = true;
        self
    }

    pub(crate) fn shared(&self) -> Arc<dyn AudioBackend> {
        Arc::new(self.clone())
    }

    pub(crate) fn feed(&self, pitches: impl IntoIterator<Item = f32>) {
        self.script.lock().unwrap().extend(pitches);
    }

    /// Sources currently open.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Most sources ever open at the same time.
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl AudioBackend for ScriptedBackend {
    fn open(&self, request: &StreamRequest) -> Result<Box<dyn FrameSource>> {
        self.requests.lock().unwrap().push(*request);
        if request.device_index.is_some() && request.device_index == self.failing_device {
            return Err(TrackerError::DeviceUnavailable("scripted failure".to_string()));
        }

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(ScriptedSource {
            script: Arc::clone(&self.script),
            close_after_script: self.close_after_script,
            active: Arc::clone(&self.active),
        }))
    }

    fn input_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok((0..4)
            .map(|index| AudioDevice { name: format!("Scripted {index}"), index })
            .collect())
    }
}

struct ScriptedSource {
    script: Arc<Mutex<VecDeque<f32>>>,
    close_after_script: bool,
    active: Arc<AtomicUsize>,
}

impl FrameSource for ScriptedSource {
    fn read(&mut self, frame: &mut [f32]) -> Result<Hop> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(value) => {
                frame.fill(value);
                Ok(Hop::Ready)
            }
            None if self.close_after_script => {
                Err(TrackerError::DeviceUnavailable("script finished".to_string()))
            }
            None => {
                thread::sleep(Duration::from_millis(1));
                Ok(Hop::Pending)
            }
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct EchoEstimator;

impl PitchEstimator for EchoEstimator {
    fn estimate(&mut self, hop: &[f32]) -> PitchEstimate {
        let frequency = hop.first().copied().unwrap_or(0.0);
        PitchEstimate {
            frequency,
            confidence: if frequency > 0.0 { 1.0 } else { 0.0 },
        }
    }
}

/// Estimator factory echoing the scripted values, plus a log of the
/// settings every session was built with.
pub(crate) fn scripted_estimators() -> (EstimatorFactory, Arc<Mutex<Vec<EstimatorSettings>>>) {
    let sessions = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&sessions);
    let factory: EstimatorFactory = Arc::new(move |settings: &EstimatorSettings| {
        log.lock().unwrap().push(*settings);
        Box::new(EchoEstimator) as Box<dyn PitchEstimator>
    });
    (factory, sessions)
}
