//! # Fast Fourier Transform (FFT) Module
//!
//! Magnitude spectra for refining pitch estimates. The transform is planned
//! once per analysis buffer size and reused for every hop.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Hann windowing for reduced spectral leakage
//! - DC offset removal for accurate analysis

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Removes the DC offset from a signal by making its average value zero.
///
/// # Arguments
/// * `signal` - Audio signal to process (modified in-place)
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 { return; }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Applies a Hann window to the input buffer to reduce spectral leakage.
///
/// # Arguments
/// * `buffer` - Audio buffer to window (modified in-place)
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 { return; }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Forward FFT of a fixed size producing magnitude spectra.
pub struct SpectrumAnalyzer {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Plans a forward FFT for frames of `size` samples.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self {
            size,
            fft,
            scratch: vec![Complex { re: 0.0, im: 0.0 }; size],
        }
    }

    /// Calculates the magnitude spectrum of `signal` up to the Nyquist frequency.
    ///
    /// This function processes the input signal through the following steps:
    /// 1. DC offset removal
    /// 2. Hann windowing
    /// 3. Forward FFT transformation
    ///
    /// # Returns
    /// * `Vec<f32>` - `size / 2` magnitudes, or an empty vector if
    ///   `signal.len()` differs from the planned size
    pub fn magnitudes(&mut self, signal: &[f32]) -> Vec<f32> {
        if signal.len() != self.size {
            return Vec::new();
        }

        let mut processed_signal = signal.to_vec();
        remove_dc_offset(&mut processed_signal);
        apply_hann_window(&mut processed_signal);

        for (slot, sample) in self.scratch.iter_mut().zip(processed_signal) {
            *slot = Complex { re: sample, im: 0.0 };
        }
        self.fft.process(&mut self.scratch);

        self.scratch
            .iter()
            .take(self.size / 2)
            .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
            .collect()
    }
}
