//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! The capture worker reads fixed-size hops through the [`FrameSource`] trait; the
//! [`AudioBackend`] that opens sources can be swapped out, which is how the
//! tracker is exercised without audio hardware.
//!
//! ## Features
//! - Input device enumeration and selection by index
//! - Mono 32-bit float capture, multi-channel input is downmixed
//! - Hop-sized frames handed over through a bounded channel
//! - Overflow tolerance: frames are dropped (and counted) instead of blocking the callback

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Hops the callback may run ahead of the capture worker before frames are dropped.
const FRAME_QUEUE_HOPS: usize = 32;

/// An input device as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub index: usize,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.index, self.name)
    }
}

/// What the capture worker asks a backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// `None` selects the host's default input device
    pub device_index: Option<usize>,
    pub sample_rate: u32,
    pub hop_size: usize,
}

impl StreamRequest {
    /// Longest time a read waits for a hop before reporting [`Hop::Pending`]:
    /// the duration of one hop.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.hop_size as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Outcome of reading one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// The frame was filled
    Ready,
    /// The frame was filled, but samples were lost since the previous read
    Overflowed { dropped: usize },
    /// No complete hop arrived in time; the frame is unchanged
    Pending,
}

/// A stream of mono samples read one hop at a time.
///
/// Sources live on the capture thread; they do not need to be `Send`.
pub trait FrameSource {
    /// Blocks until `frame.len()` samples are available or about one hop's
    /// duration elapses.
    ///
    /// # Errors
    /// * [`TrackerError::DeviceUnavailable`] if the stream is gone for good
    fn read(&mut self, frame: &mut [f32]) -> Result<Hop>;
}

/// Opens audio input streams.
pub trait AudioBackend: Send + Sync {
    /// Opens a stream according to `request`.
    ///
    /// # Errors
    /// * [`TrackerError::DeviceUnavailable`] if the device cannot be opened
    fn open(&self, request: &StreamRequest) -> Result<Box<dyn FrameSource>>;

    /// Lists the input devices this backend can open.
    fn input_devices(&self) -> Result<Vec<AudioDevice>>;
}

/// Lists the input devices of the default host.
pub fn list_audio_devices() -> Result<Vec<AudioDevice>> {
    CpalBackend.input_devices()
}

/// Backend for the default CPAL host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open(&self, request: &StreamRequest) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(CpalSource::open(request)?))
    }

    fn input_devices(&self) -> Result<Vec<AudioDevice>> {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(unavailable)?;
        Ok(devices
            .enumerate()
            .map(|(index, device)| AudioDevice {
                name: device.name().unwrap_or_else(|_| "Unknown Device".to_string()),
                index,
            })
            .collect())
    }
}

/// A running CPAL input stream chunked into hops.
///
/// Dropping the source stops the stream and releases the device.
pub struct CpalSource {
    _stream: cpal::Stream,
    frames: Receiver<Vec<f32>>,
    recycled: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
    timeout: Duration,
}

impl CpalSource {
    /// Opens and starts capture on the requested device.
    ///
    /// This function:
    /// 1. Selects the device by index (or the host default)
    /// 2. Picks a 32-bit float configuration at the requested sample rate
    /// 3. Sets up a callback that downmixes to mono and emits hop-sized frames
    pub fn open(request: &StreamRequest) -> Result<Self> {
        let host = cpal::default_host();
        let device = match request.device_index {
            Some(index) => host
                .input_devices()
                .map_err(unavailable)?
                .nth(index)
                .ok_or_else(|| TrackerError::DeviceUnavailable(format!("no input device with index {index}")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| TrackerError::DeviceUnavailable("no default input device".to_string()))?,
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        log::info!("Using audio input device: {}", device_name);

        let configs = device.supported_input_configs().map_err(unavailable)?.collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, request.sample_rate).ok_or_else(|| {
            TrackerError::DeviceUnavailable(format!(
                "{device_name} has no f32 input format at {} Hz",
                request.sample_rate
            ))
        })?;

        let config: cpal::StreamConfig = supported_config
            .with_sample_rate(cpal::SampleRate(request.sample_rate))
            .into();
        let channels = usize::from(config.channels.max(1));
        log::info!(
            "Selected stream format: {} Hz, {} channel(s), hop {} samples",
            request.sample_rate, channels, request.hop_size
        );

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE_HOPS);
        let (recycled_tx, recycled_rx) = crossbeam_channel::bounded(FRAME_QUEUE_HOPS);
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut chunker = HopChunker::new(request.hop_size, channels, frame_tx, recycled_rx, Arc::clone(&dropped));

        let err_fn = |err: cpal::StreamError| log::warn!("An error occurred on the audio stream: {}", err);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| chunker.push(data),
                err_fn,
                None,
            )
            .map_err(unavailable)?;

        stream.play().map_err(unavailable)?;

        Ok(Self {
            _stream: stream,
            frames: frame_rx,
            recycled: recycled_tx,
            dropped,
            timeout: request.read_timeout(),
        })
    }
}

impl FrameSource for CpalSource {
    fn read(&mut self, frame: &mut [f32]) -> Result<Hop> {
        read_hop(&self.frames, &self.recycled, &self.dropped, self.timeout, frame)
    }
}

/// Receives one hop from the callback's channel and hands its buffer back.
fn read_hop(
    frames: &Receiver<Vec<f32>>,
    recycled: &Sender<Vec<f32>>,
    dropped: &AtomicUsize,
    timeout: Duration,
    frame: &mut [f32],
) -> Result<Hop> {
    match frames.recv_timeout(timeout) {
        Ok(hop) => {
            let len = hop.len().min(frame.len());
            frame[..len].copy_from_slice(&hop[..len]);
            frame[len..].fill(0.0);
            // A full pool just lets this buffer go.
            let _ = recycled.try_send(hop);
            match dropped.swap(0, Ordering::Relaxed) {
                0 => Ok(Hop::Ready),
                dropped => Ok(Hop::Overflowed { dropped }),
            }
        }
        Err(RecvTimeoutError::Timeout) => Ok(Hop::Pending),
        Err(RecvTimeoutError::Disconnected) => {
            Err(TrackerError::DeviceUnavailable("audio stream closed".to_string()))
        }
    }
}

/// Accumulates interleaved callback data into mono hop-sized frames.
///
/// Hop buffers come back from the reader through `recycled`, so the callback
/// only allocates until the pool has warmed up.
struct HopChunker {
    hop_size: usize,
    channels: usize,
    pending: Vec<f32>,
    sender: Sender<Vec<f32>>,
    recycled: Receiver<Vec<f32>>,
    /// Buffer of a hop the full queue refused
    spare: Option<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl HopChunker {
    fn new(
        hop_size: usize,
        channels: usize,
        sender: Sender<Vec<f32>>,
        recycled: Receiver<Vec<f32>>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            hop_size,
            channels,
            pending: Vec::with_capacity(hop_size * 2),
            sender,
            recycled,
            spare: None,
            dropped,
        }
    }

    fn take_buffer(&mut self) -> Vec<f32> {
        let mut buffer = self
            .spare
            .take()
            .or_else(|| self.recycled.try_recv().ok())
            .unwrap_or_else(|| Vec::with_capacity(self.hop_size));
        buffer.clear();
        buffer
    }

    fn push(&mut self, data: &[f32]) {
        if self.channels == 1 {
            self.pending.extend_from_slice(data);
        } else {
            let channels = self.channels;
            self.pending.extend(
                data.chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        // While we have enough data for a full hop, hand it over.
        while self.pending.len() >= self.hop_size {
            let mut hop = self.take_buffer();
            hop.extend(self.pending.drain(..self.hop_size));
            match self.sender.try_send(hop) {
                Ok(()) => {}
                Err(TrySendError::Full(hop)) => {
                    self.dropped.fetch_add(hop.len(), Ordering::Relaxed);
                    self.spare = Some(hop);
                }
                // The worker is gone; the stream is about to be dropped.
                Err(TrySendError::Disconnected(_)) => {
                    self.pending.clear();
                    return;
                }
            }
        }
    }
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// This function searches through available audio configurations and selects
/// the one that best matches our requirements:
/// - 32-bit float format
/// - Target sample rate inside the supported range
/// - Fewest channels (mono preferred)
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.sample_format() == cpal::SampleFormat::F32
                && c.min_sample_rate().0 <= target_rate
                && c.max_sample_rate().0 >= target_rate
        })
        .min_by_key(|c| c.channels())
}

fn unavailable(err: impl fmt::Display) -> TrackerError {
    TrackerError::DeviceUnavailable(err.to_string())
}
