//! Splits a pitch history into drawable curve segments.

use crate::AnalysisResult;

/// A run of consecutive drawable samples as `(index, pitch_hz)` pairs.
pub type Segment = Vec<(usize, f32)>;

/// Splits `results` into runs of samples with `0 < pitch <= highest_hz`.
///
/// Silence and out-of-range pitches end the current run, so the curve shows
/// a gap instead of a line across them. Runs of a single sample are dropped.
/// Indices refer to positions in `results`.
pub fn trace_segments(results: &[AnalysisResult], highest_hz: f32) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Segment = Vec::new();

    for (index, result) in results.iter().enumerate() {
        let pitch = result.pitch_hz;
        if pitch > 0.0 && pitch <= highest_hz {
            current.push((index, pitch));
        } else if !current.is_empty() {
            finish(&mut segments, std::mem::take(&mut current));
        }
    }
    finish(&mut segments, current);

    segments
}

fn finish(segments: &mut Vec<Segment>, segment: Segment) {
    if segment.len() > 1 {
        segments.push(segment);
    }
}
