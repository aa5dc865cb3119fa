//! # Camera Controller
//!
//! Derives the visible frequency range of the pitch graph from the analysis
//! history and animates it between target ranges.
//!
//! - [`Camera::update_bounds`] picks a new target range from a snapshot,
//!   ignoring notes that occur too rarely to be more than noise.
//! - [`Camera::advance`] moves the visible range towards the target and must
//!   be called once per rendered frame.
//!
//! A new target always starts from the range currently on screen, so a
//! change in the middle of an animation redirects it smoothly.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::easing::{ease_in_out_expo, interp};
use crate::notes::{self, DEFAULT_STANDARD_PITCH};
use crate::AnalysisResult;

/// Fixed parameters of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// Pitches above this are never used for the range (Hz)
    pub highest_displayable_hz: f32,
    /// A note must occur strictly more often than this in a snapshot to count
    pub min_occurrences: usize,
    /// Duration of a range transition in seconds
    pub animation_seconds: f32,
    /// Frequency of A4 in Hz
    pub standard_pitch: f32,
    /// Lowest note shown before any pitch was detected
    pub initial_low_note: i32,
    /// Highest note shown before any pitch was detected
    pub initial_high_note: i32,
    /// Map frequency linearly instead of spacing notes evenly
    pub exponential_scaling: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            highest_displayable_hz: 2000.0,
            min_occurrences: 10,
            animation_seconds: 0.5,
            standard_pitch: DEFAULT_STANDARD_PITCH,
            initial_low_note: 28,  // E2
            initial_high_note: 52, // E4
            exponential_scaling: false,
        }
    }
}

/// The visible range at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBounds {
    pub low_freq: f32,
    pub high_freq: f32,
    pub low_note: i32,
    pub high_note: i32,
}

#[derive(Debug, Clone)]
pub struct Camera {
    settings: CameraSettings,
    low_note_target: i32,
    high_note_target: i32,
    low_freq: f32,
    high_freq: f32,
    low_freq_previous: f32,
    high_freq_previous: f32,
    low_freq_target: f32,
    high_freq_target: f32,
    progress: f32,
}

impl Camera {
    /// Creates a camera resting on the initial note range.
    pub fn new(settings: CameraSettings) -> Self {
        let low_freq = notes::note_to_frequency(settings.initial_low_note as f32, settings.standard_pitch);
        let high_freq = notes::note_to_frequency(settings.initial_high_note as f32, settings.standard_pitch);
        Self {
            settings,
            low_note_target: settings.initial_low_note,
            high_note_target: settings.initial_high_note,
            low_freq,
            high_freq,
            low_freq_previous: low_freq,
            high_freq_previous: high_freq,
            low_freq_target: low_freq,
            high_freq_target: high_freq,
            progress: 1.0,
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Picks a new target range from a snapshot of results.
    ///
    /// A pitch qualifies if it lies in `(0, highest_displayable_hz]` and its
    /// rounded note occurs more than `min_occurrences` times in `results`.
    /// The target spans the lowest and highest qualifying notes plus one
    /// semitone on each side.
    ///
    /// # Returns
    /// * `true` if the target changed and a new transition started
    pub fn update_bounds(&mut self, results: &[AnalysisResult]) -> bool {
        let standard_pitch = self.settings.standard_pitch;

        let mut occurrences: HashMap<i32, usize> = HashMap::new();
        for result in results {
            *occurrences
                .entry(notes::frequency_to_note(result.pitch_hz, standard_pitch))
                .or_insert(0) += 1;
        }

        let mut lowest = f32::INFINITY;
        let mut highest = 0.0_f32;
        for result in results {
            let pitch = result.pitch_hz;
            if !(pitch > 0.0 && pitch <= self.settings.highest_displayable_hz) {
                continue;
            }
            let note = notes::frequency_to_note(pitch, standard_pitch);
            if occurrences.get(&note).copied().unwrap_or(0) <= self.settings.min_occurrences {
                continue;
            }
            lowest = lowest.min(pitch);
            highest = highest.max(pitch);
        }

        if !(highest > lowest) {
            return false;
        }

        let low_note = notes::frequency_to_note(lowest, standard_pitch) - 1;
        let high_note = notes::frequency_to_note(highest, standard_pitch) + 1;
        if low_note == self.low_note_target && high_note == self.high_note_target {
            return false;
        }

        log::debug!(
            "Camera target {}..{}",
            notes::value_to_note_name(low_note),
            notes::value_to_note_name(high_note)
        );

        self.low_freq_previous = self.low_freq;
        self.high_freq_previous = self.high_freq;
        self.low_note_target = low_note;
        self.high_note_target = high_note;
        self.low_freq_target = notes::note_to_frequency(low_note as f32, standard_pitch);
        self.high_freq_target = notes::note_to_frequency(high_note as f32, standard_pitch);
        self.progress = 0.0;
        true
    }

    /// Advances the current transition by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.progress = if self.settings.animation_seconds > 0.0 {
            (self.progress + dt.max(0.0) / self.settings.animation_seconds).min(1.0)
        } else {
            1.0
        };

        self.low_freq = interp(self.low_freq_previous, self.low_freq_target, self.progress, ease_in_out_expo);
        self.high_freq = interp(self.high_freq_previous, self.high_freq_target, self.progress, ease_in_out_expo);
    }

    /// Returns true while a transition is running.
    pub fn is_animating(&self) -> bool {
        self.progress < 1.0
    }

    /// Target notes of the current (or last) transition.
    pub fn target_notes(&self) -> (i32, i32) {
        (self.low_note_target, self.high_note_target)
    }

    /// The range currently on screen.
    pub fn bounds(&self) -> CameraBounds {
        let standard_pitch = self.settings.standard_pitch;
        CameraBounds {
            low_freq: self.low_freq,
            high_freq: self.high_freq,
            low_note: notes::frequency_to_note(self.low_freq, standard_pitch),
            high_note: notes::frequency_to_note(self.high_freq, standard_pitch),
        }
    }

    /// Notes with a grid line on screen.
    pub fn visible_notes(&self) -> RangeInclusive<i32> {
        let bounds = self.bounds();
        bounds.low_note..=bounds.high_note
    }

    /// Maps a frequency to a y coordinate in a plot `height` units tall,
    /// 0 at the top.
    ///
    /// Returns 0 when the visible range is empty.
    pub fn frequency_to_y(&self, freq: f32, height: f32) -> f32 {
        let (low, high, value) = if self.settings.exponential_scaling {
            (self.low_freq, self.high_freq, freq)
        } else {
            let standard_pitch = self.settings.standard_pitch;
            (
                notes::frequency_to_note_continuous(self.low_freq, standard_pitch),
                notes::frequency_to_note_continuous(self.high_freq, standard_pitch),
                notes::frequency_to_note_continuous(freq, standard_pitch),
            )
        };

        let range = high - low;
        if range == 0.0 {
            return 0.0;
        }
        height - height * (value - low) / range
    }

    /// Maps a note value to a y coordinate, like [`Camera::frequency_to_y`].
    pub fn note_to_y(&self, note: i32, height: f32) -> f32 {
        let freq = notes::note_to_frequency(note as f32, self.settings.standard_pitch);
        self.frequency_to_y(freq, height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_hz(note: i32) -> f32 {
        notes::note_to_frequency(note as f32, DEFAULT_STANDARD_PITCH)
    }

    fn results(pitches: impl IntoIterator<Item = f32>) -> Vec<AnalysisResult> {
        pitches
            .into_iter()
            .map(|pitch_hz| AnalysisResult { pitch_hz, ..AnalysisResult::default() })
            .collect()
    }

    fn repeated(note: i32, count: usize) -> impl Iterator<Item = f32> {
        std::iter::repeat_n(note_hz(note), count)
    }

    fn settle(camera: &mut Camera) {
        for _ in 0..100 {
            camera.advance(1.0 / 60.0);
        }
    }

    #[test]
    fn test_initial_range_is_e2_to_e4() {
        let camera = Camera::default();
        let bounds = camera.bounds();
        assert_eq!((bounds.low_note, bounds.high_note), (28, 52));
        assert!((bounds.low_freq - 82.4069).abs() < 0.01);
        assert!((bounds.high_freq - 329.628).abs() < 0.01);
        assert!(!camera.is_animating());
    }

    #[test]
    fn test_rare_outlier_does_not_widen_range() {
        // C3..C4 well established, B4 only a handful of times
        let mut pitches: Vec<f32> = (36..=48).flat_map(|note| repeated(note, 20)).collect();
        pitches.extend(repeated(59, 5));

        let mut camera = Camera::default();
        assert!(camera.update_bounds(&results(pitches)));
        assert_eq!(camera.target_notes(), (35, 49));
    }

    #[test]
    fn test_occurrence_threshold_is_strict() {
        let pitches = repeated(45, 11).chain(repeated(57, 11)).chain(repeated(69, 10));

        let mut camera = Camera::default();
        camera.update_bounds(&results(pitches));
        assert_eq!(camera.target_notes(), (44, 58));
    }

    #[test]
    fn test_silence_and_out_of_range_are_ignored() {
        let pitches = std::iter::repeat_n(0.0, 200)
            .chain(repeated(45, 20))
            .chain(std::iter::repeat_n(2500.0, 50))
            .chain(repeated(57, 20));

        let mut camera = Camera::default();
        camera.update_bounds(&results(pitches));
        assert_eq!(camera.target_notes(), (44, 58));
    }

    #[test]
    fn test_single_note_keeps_target() {
        let mut camera = Camera::default();
        assert!(!camera.update_bounds(&results(std::iter::repeat_n(0.0, 50))));
        assert!(!camera.update_bounds(&results(repeated(45, 50))));
        assert_eq!(camera.target_notes(), (28, 52));
    }

    #[test]
    fn test_unchanged_target_does_not_restart() {
        let snapshot = results(repeated(45, 20).chain(repeated(57, 20)));
        let mut camera = Camera::default();
        assert!(camera.update_bounds(&snapshot));
        settle(&mut camera);
        assert!(!camera.is_animating());

        assert!(!camera.update_bounds(&snapshot));
        assert!(!camera.is_animating());
    }

    #[test]
    fn test_animation_reaches_target() {
        let mut camera = Camera::default();
        camera.update_bounds(&results(repeated(45, 20).chain(repeated(57, 20))));
        assert!(camera.is_animating());

        camera.advance(0.25);
        let halfway = camera.bounds();
        assert!(halfway.low_freq > note_hz(28) && halfway.low_freq < note_hz(44));
        assert!(halfway.high_freq > note_hz(52) && halfway.high_freq < note_hz(58));

        camera.advance(0.25);
        assert!(!camera.is_animating());
        let bounds = camera.bounds();
        assert!((bounds.low_freq - note_hz(44)).abs() < 1e-3);
        assert!((bounds.high_freq - note_hz(58)).abs() < 1e-3);
        assert_eq!((bounds.low_note, bounds.high_note), (44, 58));
    }

    #[test]
    fn test_redirect_starts_from_live_position() {
        let mut camera = Camera::default();
        camera.update_bounds(&results(repeated(45, 20).chain(repeated(57, 20))));
        camera.advance(0.3);
        let live = camera.bounds();

        camera.update_bounds(&results(repeated(60, 20).chain(repeated(72, 20))));
        assert_eq!(camera.target_notes(), (59, 73));
        assert!(camera.is_animating());

        camera.advance(0.0);
        let restarted = camera.bounds();
        assert!((restarted.low_freq - live.low_freq).abs() < 1e-3);
        assert!((restarted.high_freq - live.high_freq).abs() < 1e-3);

        settle(&mut camera);
        assert!((camera.bounds().low_freq - note_hz(59)).abs() < 1e-2);
    }

    #[test]
    fn test_frequency_to_y_spaces_notes_evenly() {
        let camera = Camera::default();
        let height = 240.0;
        assert!((camera.frequency_to_y(note_hz(28), height) - height).abs() < 1e-2);
        assert!(camera.frequency_to_y(note_hz(52), height).abs() < 1e-2);
        assert!((camera.note_to_y(40, height) - height / 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_frequency_to_y_exponential() {
        let camera = Camera::new(CameraSettings {
            exponential_scaling: true,
            ..CameraSettings::default()
        });
        let bounds = camera.bounds();
        let middle = (bounds.low_freq + bounds.high_freq) / 2.0;
        assert!((camera.frequency_to_y(middle, 100.0) - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_empty_range_maps_to_zero() {
        for exponential_scaling in [false, true] {
            let camera = Camera::new(CameraSettings {
                initial_low_note: 45,
                initial_high_note: 45,
                exponential_scaling,
                ..CameraSettings::default()
            });
            assert_eq!(camera.frequency_to_y(220.0, 480.0), 0.0);
            assert_eq!(camera.frequency_to_y(440.0, 480.0), 0.0);
        }
    }

    #[test]
    fn test_visible_notes() {
        let camera = Camera::default();
        assert_eq!(camera.visible_notes(), 28..=52);
    }
}
