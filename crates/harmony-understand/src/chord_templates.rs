use crate::types::{ChordQuality, KeyMode};

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

const NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

/// Pitch classes conventionally spelled with flats.
pub static FLAT_KEY_ROOTS: [u8; 6] = [1, 3, 5, 6, 8, 10];

pub fn note_name(pitch_class: u8, use_flats: bool) -> &'static str {
    let idx = (pitch_class % 12) as usize;
    if use_flats {
        NOTE_NAMES_FLAT[idx]
    } else {
        NOTE_NAMES_SHARP[idx]
    }
}

/// Parse a note name ("A", "f#", "Bb", "Cbb") into a pitch class.
///
/// Unrecognized names map to 0 (C).
pub fn parse_note_name(name: &str) -> u8 {
    let mut chars = name.trim().chars();
    let base: i32 = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return 0,
    };

    let mut offset = 0i32;
    for c in chars {
        match c {
            '#' | '♯' => offset += 1,
            'b' | '♭' => offset -= 1,
            _ => return 0,
        }
    }
    (base + offset).rem_euclid(12) as u8
}

/// Bitmask of the pitch classes present, ignoring order and octave.
pub fn pitch_class_mask(pitch_classes: &[u8]) -> u16 {
    pitch_classes
        .iter()
        .fold(0u16, |mask, &pc| mask | 1 << (pc % 12))
}

/// Chord tones as pitch classes, root first.
pub fn chord_tones(root: u8, quality: ChordQuality) -> Vec<u8> {
    quality
        .intervals()
        .iter()
        .map(|&i| (root + i) % 12)
        .collect()
}

/// "Bb7", "F#m", "C".
pub fn chord_symbol(root: u8, quality: ChordQuality, use_flats: bool) -> String {
    format!("{}{}", note_name(root, use_flats), quality.suffix())
}

/// Stack thirds on a seven-note scale, returning the chord tones for one degree.
///
/// `degree` is zero-based. Seventh chords add the fourth stacked third.
pub fn stack_thirds(scale: &[u8; 7], degree: usize, sevenths: bool) -> Vec<u8> {
    let count = if sevenths { 4 } else { 3 };
    (0..count).map(|k| scale[(degree + 2 * k) % 7]).collect()
}

/// Name the quality of a set of tones whose first entry is the root.
pub fn quality_of(tones: &[u8]) -> ChordQuality {
    let Some(&root) = tones.first() else {
        return ChordQuality::Major;
    };
    let mut intervals: Vec<u8> = tones.iter().map(|&pc| (pc + 12 - root) % 12).collect();
    intervals.sort_unstable();
    intervals.dedup();
    ChordQuality::from_intervals(&intervals)
}

/// Roman numeral for a chord relative to a key.
///
/// Case follows the chord's third; the accidental prefix is measured
/// against the key's own scale (natural minor for minor keys).
pub fn roman_numeral(tonic: u8, mode: KeyMode, root: u8, quality: ChordQuality) -> String {
    let (accidental, degree) = scale_degree_of(tonic, mode, root);
    let numeral = if quality.is_minor_like() {
        NUMERALS[degree].to_lowercase()
    } else {
        NUMERALS[degree].to_string()
    };
    format!("{}{}{}", accidental, numeral, quality.roman_suffix())
}

/// Locate a root on the key's scale as (accidental, zero-based degree).
///
/// Major keys prefer flats (bVI, bVII); minor keys prefer raised degrees
/// (#III, #VII) except for the flat supertonic. Never spells a root as an
/// altered tonic.
fn scale_degree_of(tonic: u8, mode: KeyMode, root: u8) -> (&'static str, usize) {
    let scale = mode.intervals();
    let interval = (root % 12 + 12 - tonic % 12) % 12;

    if let Some(idx) = scale.iter().position(|&s| s == interval) {
        return ("", idx);
    }
    let flat = ("b", (interval + 1) % 12);
    let sharp = ("#", (interval + 11) % 12);
    let attempts = match mode {
        KeyMode::Major => [flat, sharp],
        KeyMode::Minor => [sharp, flat],
    };
    attempts
        .into_iter()
        .find_map(|(accidental, target)| {
            scale
                .iter()
                .position(|&s| s == target)
                .filter(|&idx| idx != 0)
                .map(|idx| (accidental, idx))
        })
        .unwrap_or(("", 0))
}
