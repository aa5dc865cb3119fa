//! # Median Filter
//!
//! De-spikes the pitch trace of a history snapshot. Pitch values that differ
//! from the local median by more than a factor of [`MAX_DEVIATION_FACTOR`]
//! are replaced by that median; everything else in the record is untouched.
//! The filter works on a copy, stored history never changes.

use std::cmp::Ordering;

use crate::AnalysisResult;

/// Largest accepted ratio between a pitch and its local median.
pub const MAX_DEVIATION_FACTOR: f32 = 1.5;

/// Returns a copy of `results` with outlier pitches replaced by the local median.
///
/// For every index `i` with `filter_window_len <= i < len - filter_window_len`
/// the median is taken over `[i - filter_window_len, i + filter_window_len)`.
/// Indices closer than `filter_window_len` to either edge are left as they are.
///
/// # Arguments
/// * `results` - Snapshot of the analysis window, oldest first
/// * `filter_window_len` - Half-width of the neighbourhood in hops; 0 disables filtering
pub fn filter_results(results: &[AnalysisResult], filter_window_len: usize) -> Vec<AnalysisResult> {
    let mut filtered = results.to_vec();
    if filter_window_len == 0 || results.len() < filter_window_len {
        return filtered;
    }

    let pitches: Vec<f32> = results.iter().map(|r| r.pitch_hz).collect();
    let mut scratch = Vec::with_capacity(2 * filter_window_len);

    let end = pitches.len().saturating_sub(filter_window_len);
    for i in filter_window_len..end {
        scratch.clear();
        scratch.extend_from_slice(&pitches[i - filter_window_len..i + filter_window_len]);
        let median = median(&mut scratch);

        let pitch = pitches[i];
        if pitch < median / MAX_DEVIATION_FACTOR || pitch > median * MAX_DEVIATION_FACTOR {
            filtered[i].pitch_hz = median;
        }
    }

    filtered
}

/// Median of `values`, averaging the two middle elements for even lengths.
fn median(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = n / 2;
    if n % 2 == 1 {
        values[mid]
    } else {
        0.5 * (values[mid - 1] + values[mid])
    }
}
