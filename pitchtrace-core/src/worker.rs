//! # Capture Worker
//!
//! Owns the audio stream on a dedicated thread. Every hop is read, estimated
//! and appended to the shared [`AnalysisWindow`]. The render loop never waits
//! on device I/O; only [`CaptureWorker::stop`] waits for the thread to exit.
//!
//! The device is opened on the worker thread (CPAL streams are not `Send`)
//! and the outcome is reported back before [`CaptureWorker::start`] returns,
//! so an unavailable device fails the start call itself.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::audio::{AudioBackend, FrameSource, Hop, StreamRequest};
use crate::error::{Result, TrackerError};
use crate::pitch::{self, EstimatorFactory, EstimatorSettings, PitchEstimator};
use crate::window::AnalysisWindow;
use crate::AnalysisResult;

/// Handle to a running capture thread.
///
/// Dropping the handle stops the thread and waits for it, like [`CaptureWorker::stop`].
#[derive(Debug)]
pub struct CaptureWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    /// Spawns the capture thread and waits until its stream is open.
    ///
    /// # Arguments
    /// * `request` - Device, sample rate and hop size of the stream
    /// * `settings` - Parameters for the session's pitch estimator
    /// * `backend` - Opens the audio stream on the worker thread
    /// * `estimators` - Builds the session's pitch estimator
    /// * `window` - Destination of the analysis results
    ///
    /// # Errors
    /// * [`TrackerError::DeviceUnavailable`] if the stream cannot be opened
    /// * [`TrackerError::Worker`] if the thread cannot be spawned or dies during startup
    pub fn start(
        request: StreamRequest,
        settings: EstimatorSettings,
        backend: Arc<dyn AudioBackend>,
        estimators: EstimatorFactory,
        window: Arc<AnalysisWindow>,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        let thread_handle = thread::Builder::new()
            .name("pitchtrace-capture".to_string())
            .spawn(move || {
                log::debug!("Capture thread starting, opening {:?}", request);
                let source = match backend.open(&request) {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let estimator = estimators(&settings);
                let _ = ready_tx.send(Ok(()));

                capture_loop(source, estimator, request.hop_size, &window, &shutdown_rx);
                log::debug!("Capture thread finished, device released");
            })
            .map_err(|e| TrackerError::Worker(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!(
                    "Capture started ({} Hz, hop {} samples)",
                    request.sample_rate, request.hop_size
                );
                Ok(Self {
                    shutdown_tx,
                    thread_handle: Some(thread_handle),
                })
            }
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(TrackerError::Worker("capture thread exited during startup".to_string()))
            }
        }
    }

    /// Returns false once the capture thread has exited on its own.
    pub fn is_alive(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the thread to stop and waits until it has released the device.
    ///
    /// The hop being read or estimated is finished first, so this returns
    /// within roughly one hop.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.thread_handle.take() else {
            return Ok(());
        };
        let _ = self.shutdown_tx.try_send(());
        handle
            .join()
            .map_err(|_| TrackerError::Worker("capture thread panicked".to_string()))?;
        log::info!("Capture stopped");
        Ok(())
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("{}", e);
        }
    }
}

/// Reads, estimates and stores hops until a shutdown signal arrives.
fn capture_loop(
    mut source: Box<dyn FrameSource>,
    mut estimator: Box<dyn PitchEstimator>,
    hop_size: usize,
    window: &AnalysisWindow,
    shutdown_rx: &Receiver<()>,
) {
    let mut frame = vec![0.0; hop_size];
    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match source.read(&mut frame) {
            Ok(Hop::Ready) => {}
            Ok(Hop::Overflowed { dropped }) => {
                log::debug!("Input overflow, {} samples dropped", dropped);
            }
            Ok(Hop::Pending) => continue,
            Err(e) => {
                log::error!("Capture aborted: {}", e);
                break;
            }
        }

        window.push(analyze_hop(&frame, estimator.as_mut()));
    }
}

/// Builds the analysis record for one hop.
pub(crate) fn analyze_hop(frame: &[f32], estimator: &mut dyn PitchEstimator) -> AnalysisResult {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let estimate = estimator.estimate(frame);

    AnalysisResult {
        timestamp,
        pitch_hz: estimate.frequency,
        volume_db: pitch::volume_db(frame),
        confidence: estimate.confidence,
        onset: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, scripted_estimators};
    use std::time::{Duration, Instant};

    const SETTINGS: EstimatorSettings = EstimatorSettings {
        buffer_size: 64,
        hop_size: 16,
        sample_rate: 1600,
        silence_threshold_db: -50.0,
    };

    fn request(device_index: Option<usize>) -> StreamRequest {
        StreamRequest { device_index, sample_rate: 1600, hop_size: 16 }
    }

    fn wait_for(window: &AnalysisWindow, len: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while window.len() < len {
            assert!(Instant::now() < deadline, "timed out waiting for {len} results");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_appends_one_result_per_hop() {
        let backend = ScriptedBackend::new(vec![220.0, 0.0, 330.0]);
        let (estimators, _) = scripted_estimators();
        let window = Arc::new(AnalysisWindow::new(10));

        let worker = CaptureWorker::start(request(None), SETTINGS, backend.shared(), estimators, Arc::clone(&window)).unwrap();
        wait_for(&window, 3);
        worker.stop().unwrap();

        let results = window.snapshot();
        let pitches: Vec<f32> = results.iter().map(|r| r.pitch_hz).collect();
        assert_eq!(pitches, vec![220.0, 0.0, 330.0]);
        assert_eq!(results[1].volume_db, f32::NEG_INFINITY);
        assert!(results.iter().all(|r| r.onset == 0.0));
        assert!(results[0].timestamp <= results[2].timestamp);
        assert_eq!(backend.active(), 0);
    }

    #[test]
    fn test_device_failure_surfaces_from_start() {
        let backend = ScriptedBackend::new(vec![220.0]).failing_device(3);
        let (estimators, _) = scripted_estimators();
        let window = Arc::new(AnalysisWindow::new(10));

        let err = CaptureWorker::start(request(Some(3)), SETTINGS, backend.shared(), estimators, window).unwrap_err();
        assert!(matches!(err, TrackerError::DeviceUnavailable(_)));
        assert_eq!(backend.active(), 0);
    }

    #[test]
    fn test_stop_is_prompt_while_idle() {
        let backend = ScriptedBackend::new(Vec::new());
        let (estimators, _) = scripted_estimators();
        let window = Arc::new(AnalysisWindow::new(10));
        let worker = CaptureWorker::start(request(None), SETTINGS, backend.shared(), estimators, window).unwrap();
        assert!(worker.is_alive());

        let started = Instant::now();
        worker.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(backend.active(), 0);
    }

    #[test]
    fn test_closed_stream_ends_worker() {
        let backend = ScriptedBackend::new(vec![220.0]).closing_after_script();
        let (estimators, _) = scripted_estimators();
        let window = Arc::new(AnalysisWindow::new(10));
        let worker = CaptureWorker::start(request(None), SETTINGS, backend.shared(), estimators, Arc::clone(&window)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.is_alive() {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(window.len(), 1);
        worker.stop().unwrap();
    }
}
