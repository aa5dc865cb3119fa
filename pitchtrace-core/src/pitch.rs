//! # Pitch Detection Module
//!
//! Per-hop pitch, confidence and volume estimation for the capture worker.
//! The worker only sees the [`PitchEstimator`] trait; the default
//! implementation is a YIN detector refined against an FFT spectrum.
//!
//! ## Features
//! - Sliding analysis buffer advanced by one hop per call
//! - Silence gate in dB
//! - YIN with parabolic interpolation for sub-sample accuracy
//! - Spectrum refinement for improved precision

use std::sync::Arc;

use crate::fft::SpectrumAnalyzer;

/// Absolute threshold on the normalized difference function for picking a period.
const YIN_THRESHOLD: f32 = 0.15;

/// Periods whose normalized difference stays above this are reported as unvoiced.
const CLARITY_THRESHOLD: f32 = 0.35;

/// Spectrum refinement may move an estimate by at most this ratio (about half a semitone).
const MAX_REFINEMENT_RATIO: f32 = 1.03;

/// Parameters an estimator is built with for one capture session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorSettings {
    pub buffer_size: usize,
    pub hop_size: usize,
    pub sample_rate: u32,
    pub silence_threshold_db: f32,
}

/// Result of estimating one hop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchEstimate {
    /// Fundamental frequency in Hz, 0.0 for silence or unvoiced input
    pub frequency: f32,
    /// Confidence of the estimate (0.0 to 1.0)
    pub confidence: f32,
}

/// Turns consecutive hops of samples into pitch estimates.
pub trait PitchEstimator {
    fn estimate(&mut self, hop: &[f32]) -> PitchEstimate;
}

/// Builds a fresh estimator for every capture session.
pub type EstimatorFactory = Arc<dyn Fn(&EstimatorSettings) -> Box<dyn PitchEstimator> + Send + Sync>;

/// Factory for the default [`YinEstimator`].
pub fn yin_factory() -> EstimatorFactory {
    Arc::new(|settings: &EstimatorSettings| Box::new(YinEstimator::new(*settings)) as Box<dyn PitchEstimator>)
}

/// Volume of a frame in dB: `10 * log10(mean(sample^2))`.
///
/// An all-zero (or empty) frame yields negative infinity.
pub fn volume_db(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return f32::NEG_INFINITY;
    }
    let energy = frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32;
    10.0 * energy.log10()
}

/// YIN pitch detector over a sliding buffer.
///
/// Each call shifts `hop.len()` new samples into a buffer of `buffer_size`
/// samples and analyses the whole buffer. Periods are searched up to one hop,
/// so the lowest detectable pitch is the pitch floor the hop was derived from.
pub struct YinEstimator {
    settings: EstimatorSettings,
    buffer: Vec<f32>,
    yin_buffer: Vec<f32>,
    max_tau: usize,
    spectrum: SpectrumAnalyzer,
}

impl YinEstimator {
    pub fn new(settings: EstimatorSettings) -> Self {
        let buffer_size = settings.buffer_size.max(4);
        let max_tau = (settings.hop_size + 1).clamp(2, buffer_size / 2);
        Self {
            settings,
            buffer: vec![0.0; buffer_size],
            yin_buffer: vec![0.0; max_tau + 1],
            max_tau,
            spectrum: SpectrumAnalyzer::new(buffer_size),
        }
    }

    fn push_hop(&mut self, hop: &[f32]) {
        let len = self.buffer.len();
        let hop = &hop[hop.len().saturating_sub(len)..];
        self.buffer.copy_within(hop.len().., 0);
        self.buffer[len - hop.len()..].copy_from_slice(hop);
    }

    /// Runs YIN on the current buffer.
    ///
    /// # Returns
    /// * `Some((frequency, normalized_difference))` at the chosen period
    /// * `None` - No period found
    fn detect_pitch_yin(&mut self) -> Option<(f32, f32)> {
        let signal = &self.buffer;
        let max_tau = self.max_tau;
        let window = signal.len() - max_tau;
        let yin_buffer = &mut self.yin_buffer;

        // --- Step 1 & 2: Difference function ---
        for tau in 1..=max_tau {
            let mut diff = 0.0;
            for i in 0..window {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            yin_buffer[tau] = diff;
        }

        // --- Step 3: Cumulative mean normalized difference ---
        let mut running_sum = 0.0;
        yin_buffer[0] = 1.0;
        for tau in 1..=max_tau {
            running_sum += yin_buffer[tau];
            if running_sum != 0.0 {
                yin_buffer[tau] *= tau as f32 / running_sum;
            } else {
                yin_buffer[tau] = 1.0;
            }
        }

        // --- Step 4: First dip under the threshold, else the global minimum ---
        let mut period = 0;
        for tau in 2..max_tau {
            if yin_buffer[tau] < YIN_THRESHOLD {
                let mut best = tau;
                while best + 1 < max_tau && yin_buffer[best + 1] < yin_buffer[best] {
                    best += 1;
                }
                period = best;
                break;
            }
        }
        if period == 0 {
            period = (2..max_tau)
                .min_by(|&a, &b| yin_buffer[a].total_cmp(&yin_buffer[b]))?;
        }

        // --- Step 5: Parabolic interpolation for better precision ---
        let y1 = yin_buffer[period - 1];
        let y2 = yin_buffer[period];
        let y3 = yin_buffer[period + 1];

        let period_float = if (y1 - 2.0 * y2 + y3) != 0.0 {
            let peak_shift = (y1 - y3) / (2.0 * (y1 - 2.0 * y2 + y3));
            period as f32 + peak_shift.clamp(-1.0, 1.0)
        } else {
            period as f32
        };

        let frequency = self.settings.sample_rate as f32 / period_float;
        if frequency.is_finite() && frequency > 0.0 {
            Some((frequency, y2))
        } else {
            None
        }
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, hop: &[f32]) -> PitchEstimate {
        self.push_hop(hop);

        if volume_db(hop) < self.settings.silence_threshold_db {
            return PitchEstimate::default();
        }

        let Some((rough_freq, difference)) = self.detect_pitch_yin() else {
            return PitchEstimate::default();
        };
        let confidence = (1.0 - difference).clamp(0.0, 1.0);

        if difference > CLARITY_THRESHOLD {
            return PitchEstimate { frequency: 0.0, confidence };
        }

        let magnitudes = self.spectrum.magnitudes(&self.buffer);
        let frequency = refine_from_spectrum(&magnitudes, rough_freq, self.settings.sample_rate)
            .filter(|refined| {
                let ratio = refined / rough_freq;
                ratio < MAX_REFINEMENT_RATIO && ratio > 1.0 / MAX_REFINEMENT_RATIO
            })
            .unwrap_or(rough_freq);

        PitchEstimate { frequency, confidence }
    }
}

/// Refines a frequency estimate using a pre-computed magnitude spectrum.
///
/// Searches two bins around the estimate for the magnitude peak and
/// interpolates it parabolically on a log scale for sub-bin accuracy.
///
/// # Arguments
/// * `spectrum_magnitudes` - Magnitude spectrum from FFT
/// * `rough_freq` - Initial frequency estimate in Hz
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// * `Some(refined_freq)` - Refined frequency estimate, or the original one
///   if the neighbourhood has no usable peak
/// * `None` - Refinement impossible (empty spectrum or invalid estimate)
pub fn refine_from_spectrum(
    spectrum_magnitudes: &[f32],
    rough_freq: f32,
    sample_rate: u32,
) -> Option<f32> {
    if rough_freq <= 0.0 || spectrum_magnitudes.len() < 3 { return None; }
    let buffer_size = spectrum_magnitudes.len() * 2;
    let target_bin = (rough_freq * buffer_size as f32) / sample_rate as f32;
    let search_radius = 2.0;
    let start_bin = (target_bin - search_radius).max(0.0) as usize;
    let end_bin = (target_bin + search_radius).min((spectrum_magnitudes.len() - 1) as f32) as usize;
    if start_bin >= end_bin { return Some(rough_freq); }

    let peak_bin_result = spectrum_magnitudes[start_bin..=end_bin]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1));

    let peak_bin = if let Some((offset, _)) = peak_bin_result {
        start_bin + offset
    } else {
        return Some(rough_freq);
    };

    if peak_bin == 0 || peak_bin >= spectrum_magnitudes.len() - 1 { return Some(rough_freq); }

    let y1 = spectrum_magnitudes[peak_bin - 1].ln();
    let y2 = spectrum_magnitudes[peak_bin].ln();
    let y3 = spectrum_magnitudes[peak_bin + 1].ln();

    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() { return Some(rough_freq); }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 { return Some(rough_freq); }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    let interpolated_bin = peak_bin as f32 + peak_shift;
    let final_freq = (interpolated_bin * sample_rate as f32) / buffer_size as f32;

    if final_freq.is_finite() && final_freq > 0.0 {
        Some(final_freq)
    } else {
        Some(rough_freq)
    }
}
