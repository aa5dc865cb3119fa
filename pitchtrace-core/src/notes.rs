//! # Note Math Module
//!
//! Stateless conversions between frequencies in Hz, semitone note values and
//! note names in 12-tone equal temperament.
//!
//! ## Conventions
//! - Note value `0` is C0, relative to a configurable standard pitch
//!   (A4 = 440 Hz by default), so A4 is value 57.
//! - `C0 = standard_pitch * 2^(-4.75)`
//! - Octaves change at C, as on a piano keyboard.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::error::{Result, TrackerError};

/// Reference pitch of A4 in Hz used when nothing else is configured.
pub const DEFAULT_STANDARD_PITCH: f32 = 440.0;

/// Returned by [`frequency_to_note`] for a frequency of 0 Hz (silence).
pub const NO_NOTE: i32 = -1;

/// Chromatic note names starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Static map for quick pitch class lookups while parsing note names.
static PITCH_CLASSES: Lazy<BTreeMap<&'static str, i32>> = Lazy::new(|| {
    NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i as i32))
        .collect()
});

/// Frequency of C0 for the given standard pitch.
fn c0(standard_pitch: f32) -> f32 {
    standard_pitch * 2.0_f32.powf(-4.75)
}

/// Converts a frequency to the nearest note value.
///
/// # Arguments
/// * `freq` - Frequency in Hz
/// * `standard_pitch` - Frequency of A4 in Hz
///
/// # Returns
/// * The rounded note value, or [`NO_NOTE`] when `freq` is not a positive
///   finite frequency (0 Hz is the silence sentinel)
pub fn frequency_to_note(freq: f32, standard_pitch: f32) -> i32 {
    if !is_pitched(freq) {
        return NO_NOTE;
    }
    frequency_to_note_continuous(freq, standard_pitch).round() as i32
}

/// Converts a frequency to a continuous (non-rounded) note value.
///
/// Used for smooth axis interpolation. Returns `-1.0` for silence, like
/// [`frequency_to_note`].
pub fn frequency_to_note_continuous(freq: f32, standard_pitch: f32) -> f32 {
    if !is_pitched(freq) {
        return NO_NOTE as f32;
    }
    12.0 * (freq / c0(standard_pitch)).log2()
}

/// Converts a (possibly fractional) note value back to a frequency in Hz.
pub fn note_to_frequency(note: f32, standard_pitch: f32) -> f32 {
    c0(standard_pitch) * 2.0_f32.powf(note / 12.0)
}

/// Parses a note name such as `"A4"`, `"C#3"` or `"B-1"` into a note value.
///
/// The name must be a letter `A`-`G`, an optional `#`, and an integer octave,
/// with nothing else around it.
///
/// # Errors
/// * [`TrackerError::InvalidNoteName`] if the pattern does not match
pub fn note_name_to_value(name: &str) -> Result<i32> {
    let invalid = || TrackerError::InvalidNoteName(name.to_string());
    if !name.is_ascii() {
        return Err(invalid());
    }

    let split = match name.as_bytes().get(1) {
        Some(b'#') => 2,
        Some(_) => 1,
        None => return Err(invalid()),
    };
    let (pitch_class, octave) = name.split_at(split);

    let index = PITCH_CLASSES.get(pitch_class).ok_or_else(invalid)?;

    let digits = octave.strip_prefix('-').unwrap_or(octave);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let octave: i32 = octave.parse().map_err(|_| invalid())?;

    Ok(12 * octave + index)
}

/// Formats a note value as a name such as `"A4"`.
///
/// Uses floor division so values below C0 land in negative octaves
/// (`-1` is `"B-1"`, not `"B0"`).
pub fn value_to_note_name(value: i32) -> String {
    let octave = value.div_euclid(12);
    let pitch_class = value.rem_euclid(12) as usize;
    format!("{}{}", NOTE_NAMES[pitch_class], octave)
}

/// Returns true if the note value is a sharp (black key).
pub fn is_sharp(value: i32) -> bool {
    NOTE_NAMES[value.rem_euclid(12) as usize].ends_with('#')
}

/// Distance in semitones between two note names.
pub fn note_distance(a: &str, b: &str) -> Result<i32> {
    Ok((note_name_to_value(a)? - note_name_to_value(b)?).abs())
}

fn is_pitched(freq: f32) -> bool {
    freq.is_finite() && freq > 0.0
}
