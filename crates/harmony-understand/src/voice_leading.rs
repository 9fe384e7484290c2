//! Nearest-tone voice-leading distance between chord tone sets.

/// Semitone distance around the pitch-class circle (0–6).
pub fn circular_distance(a: u8, b: u8) -> u8 {
    let d = (a % 12 + 12 - b % 12) % 12;
    d.min(12 - d)
}

/// Total movement when each tone of `from` moves to its nearest tone in `to`.
pub fn movement(from: &[u8], to: &[u8]) -> u32 {
    from.iter()
        .map(|&a| to.iter().map(|&b| circular_distance(a, b)).min().unwrap_or(0) as u32)
        .sum()
}

/// Average semitones per voice above which a change counts as a leap.
const MAX_SMOOTH_MOVE: f64 = 3.0;

/// Smoothness of one chord change: 1.0 for common tones, 0.0 for
/// `MAX_SMOOTH_MOVE` semitones per voice or more.
pub fn transition_quality(from: &[u8], to: &[u8]) -> f64 {
    if from.is_empty() || to.is_empty() {
        return 1.0;
    }
    let cost = movement(from, to) as f64 / (from.len() as f64 * MAX_SMOOTH_MOVE);
    1.0 - cost.min(1.0)
}

/// Mean transition quality across a chord sequence.
pub fn progression_quality<'a>(chords: impl IntoIterator<Item = &'a [u8]>) -> f64 {
    let chords: Vec<&[u8]> = chords.into_iter().collect();
    if chords.len() < 2 {
        return 1.0;
    }
    let total: f64 = chords
        .windows(2)
        .map(|pair| transition_quality(pair[0], pair[1]))
        .sum();
    total / (chords.len() - 1) as f64
}
