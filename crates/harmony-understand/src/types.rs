use serde::{Deserialize, Serialize};

use crate::chord_templates::{note_name, pitch_class_mask, FLAT_KEY_ROOTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    Major,
    Minor,
}

impl KeyMode {
    /// Scale steps from the tonic.
    pub fn intervals(&self) -> [u8; 7] {
        match self {
            KeyMode::Major => ParallelMode::Major.intervals(),
            KeyMode::Minor => ParallelMode::Minor.intervals(),
        }
    }

    pub fn as_parallel(&self) -> ParallelMode {
        match self {
            KeyMode::Major => ParallelMode::Major,
            KeyMode::Minor => ParallelMode::Minor,
        }
    }
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::Major => write!(f, "major"),
            KeyMode::Minor => write!(f, "minor"),
        }
    }
}

/// Modes sharing a tonic with the active key; the sources of borrowed chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelMode {
    Major,
    Minor,
    Dorian,
    Mixolydian,
    /// Only reached through the Neapolitan substitution.
    Phrygian,
}

impl ParallelMode {
    /// Parallel modes scanned for borrowed chords, in priority order.
    pub const BORROWING_ORDER: [ParallelMode; 4] = [
        ParallelMode::Major,
        ParallelMode::Minor,
        ParallelMode::Dorian,
        ParallelMode::Mixolydian,
    ];

    pub fn intervals(&self) -> [u8; 7] {
        match self {
            ParallelMode::Major => [0, 2, 4, 5, 7, 9, 11],
            ParallelMode::Minor => [0, 2, 3, 5, 7, 8, 10],
            ParallelMode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            ParallelMode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            ParallelMode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParallelMode::Major => "major",
            ParallelMode::Minor => "minor",
            ParallelMode::Dorian => "dorian",
            ParallelMode::Mixolydian => "mixolydian",
            ParallelMode::Phrygian => "phrygian",
        }
    }
}

impl std::fmt::Display for ParallelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicFunction {
    Tonic,
    Subdominant,
    Dominant,
}

impl std::fmt::Display for HarmonicFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarmonicFunction::Tonic => write!(f, "tonic"),
            HarmonicFunction::Subdominant => write!(f, "subdominant"),
            HarmonicFunction::Dominant => write!(f, "dominant"),
        }
    }
}

/// Where a suggested chord came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChordSource {
    Diatonic,
    /// Applied dominant seventh, or its tritone substitute.
    SecondaryDominant { tritone_substitute: bool },
    Borrowed { mode: ParallelMode },
}

impl ChordSource {
    pub fn slug(&self) -> &'static str {
        match self {
            ChordSource::Diatonic => "diatonic",
            ChordSource::SecondaryDominant {
                tritone_substitute: false,
            } => "secondary",
            ChordSource::SecondaryDominant {
                tritone_substitute: true,
            } => "tritone",
            ChordSource::Borrowed {
                mode: ParallelMode::Phrygian,
            } => "neapolitan",
            ChordSource::Borrowed { .. } => "borrowed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Suspended4,
    Suspended2,
    Dominant7,
    Major7,
    Minor7,
    MinorMajor7,
    Diminished7,
    HalfDiminished7,
    Major6,
    Minor6,
    Add9,
    Power,
}

impl ChordQuality {
    /// Suffix for chord symbol display
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Suspended4 => "sus4",
            ChordQuality::Suspended2 => "sus2",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::MinorMajor7 => "m(maj7)",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::HalfDiminished7 => "m7b5",
            ChordQuality::Major6 => "6",
            ChordQuality::Minor6 => "m6",
            ChordQuality::Add9 => "add9",
            ChordQuality::Power => "5",
        }
    }

    /// Semitones above the root, root first.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Suspended4 => &[0, 5, 7],
            ChordQuality::Suspended2 => &[0, 2, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::MinorMajor7 => &[0, 3, 7, 11],
            ChordQuality::Diminished7 => &[0, 3, 6, 9],
            ChordQuality::HalfDiminished7 => &[0, 3, 6, 10],
            ChordQuality::Major6 => &[0, 4, 7, 9],
            ChordQuality::Minor6 => &[0, 3, 7, 9],
            ChordQuality::Add9 => &[0, 2, 4, 7],
            ChordQuality::Power => &[0, 7],
        }
    }

    /// Parse a symbol suffix ("m7", "dim", "maj7", ...).
    ///
    /// Unrecognized suffixes fall back to a major triad.
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix.trim() {
            "" | "maj" | "M" => ChordQuality::Major,
            "m" | "min" | "-" => ChordQuality::Minor,
            "dim" | "°" | "o" => ChordQuality::Diminished,
            "aug" | "+" => ChordQuality::Augmented,
            "sus4" | "sus" => ChordQuality::Suspended4,
            "sus2" => ChordQuality::Suspended2,
            "7" | "dom7" => ChordQuality::Dominant7,
            "maj7" | "M7" | "Δ7" => ChordQuality::Major7,
            "m7" | "min7" | "-7" => ChordQuality::Minor7,
            "m(maj7)" | "mM7" => ChordQuality::MinorMajor7,
            "dim7" | "°7" | "o7" => ChordQuality::Diminished7,
            "m7b5" | "ø7" | "ø" => ChordQuality::HalfDiminished7,
            "6" => ChordQuality::Major6,
            "m6" => ChordQuality::Minor6,
            "add9" => ChordQuality::Add9,
            "5" => ChordQuality::Power,
            _ => ChordQuality::Major,
        }
    }

    /// Identify a quality from its interval set; unknown sets read as major.
    pub fn from_intervals(intervals: &[u8]) -> Self {
        const ALL: [ChordQuality; 16] = [
            ChordQuality::Major,
            ChordQuality::Minor,
            ChordQuality::Diminished,
            ChordQuality::Augmented,
            ChordQuality::Suspended4,
            ChordQuality::Suspended2,
            ChordQuality::Dominant7,
            ChordQuality::Major7,
            ChordQuality::Minor7,
            ChordQuality::MinorMajor7,
            ChordQuality::Diminished7,
            ChordQuality::HalfDiminished7,
            ChordQuality::Major6,
            ChordQuality::Minor6,
            ChordQuality::Add9,
            ChordQuality::Power,
        ];
        ALL.into_iter()
            .find(|q| q.intervals() == intervals)
            .unwrap_or(ChordQuality::Major)
    }

    /// Minor third above the root (lowercase Roman numeral).
    pub fn is_minor_like(&self) -> bool {
        matches!(
            self,
            ChordQuality::Minor
                | ChordQuality::Diminished
                | ChordQuality::Minor7
                | ChordQuality::MinorMajor7
                | ChordQuality::Diminished7
                | ChordQuality::HalfDiminished7
                | ChordQuality::Minor6
        )
    }

    /// Suffix appended to a Roman numeral.
    pub fn roman_suffix(&self) -> &'static str {
        match self {
            ChordQuality::Diminished => "°",
            ChordQuality::Augmented => "+",
            ChordQuality::Diminished7 => "°7",
            ChordQuality::HalfDiminished7 => "ø7",
            ChordQuality::Dominant7 | ChordQuality::Minor7 => "7",
            ChordQuality::Major7 | ChordQuality::MinorMajor7 => "maj7",
            ChordQuality::Suspended4 => "sus4",
            ChordQuality::Suspended2 => "sus2",
            ChordQuality::Major6 | ChordQuality::Minor6 => "6",
            ChordQuality::Add9 => "add9",
            ChordQuality::Power => "5",
            ChordQuality::Major | ChordQuality::Minor => "",
        }
    }
}

/// Duration-weighted pitch-class distribution of a note sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchClassFeatures {
    /// Index = pitch class (C=0); sums to 1.0, or all zeros for no notes
    pub weights: [f64; 12],
    /// Pitch classes with nonzero weight, heaviest first, ties by lower index
    pub top_pitch_classes: Vec<u8>,
    /// Pitch class of the last note to start
    pub last_note_pc: Option<u8>,
    /// Pitch class of the lowest note
    pub bass_pc: Option<u8>,
    pub note_count: usize,
    /// Sum of note durations in seconds
    pub total_duration: f64,
}

impl PitchClassFeatures {
    pub fn empty() -> Self {
        Self {
            weights: [0.0; 12],
            top_pitch_classes: Vec::new(),
            last_note_pc: None,
            bass_pc: None,
            note_count: 0,
            total_duration: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.iter().all(|&w| w <= 0.0)
    }

    pub fn weight(&self, pitch_class: u8) -> f64 {
        self.weights[(pitch_class % 12) as usize]
    }

    pub fn max_weight(&self) -> f64 {
        self.weights.iter().copied().fold(0.0, f64::max)
    }
}

/// Per-term breakdown of a key candidate's fit score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvidence {
    /// Feature mass inside the scale (0–1)
    pub in_scale: f64,
    /// Feature mass outside the scale (0–1)
    pub out_of_scale: f64,
    /// Tonic weight relative to the heaviest pitch class (0–1)
    pub tonic_strength: f64,
    /// Feature mass on the tonic triad (0–1)
    pub tonic_triad: f64,
    pub ends_on_tonic: bool,
    pub bass_on_tonic: bool,
}

/// One of the 24 major/minor key hypotheses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyCandidate {
    /// "A-minor", "Db-major", ...
    pub id: String,
    pub tonic: u8,
    /// Root note name: "C", "Db", "F#", etc.
    pub tonic_name: String,
    pub mode: KeyMode,
    /// Scale pitch classes starting at the tonic
    pub scale: Vec<u8>,
    /// Fit score 0–1
    pub score: f64,
    /// Pitch classes outside the scale that carry weight
    pub out_of_scale: Vec<u8>,
    pub evidence: KeyEvidence,
}

impl KeyCandidate {
    pub fn uses_flats(&self) -> bool {
        uses_flats(self.tonic, self.mode)
    }

    /// Display name: "A minor".
    pub fn name(&self) -> String {
        format!("{} {}", self.tonic_name, self.mode)
    }
}

/// Key-signature spelling: flat keys and minor keys whose relative major is flat.
pub fn uses_flats(tonic: u8, mode: KeyMode) -> bool {
    let major_root = match mode {
        KeyMode::Major => tonic % 12,
        KeyMode::Minor => (tonic + 3) % 12,
    };
    FLAT_KEY_ROOTS.contains(&major_root)
}

/// Key id in the "Tonic-mode" form used by [`KeyCandidate::id`].
pub fn key_id(tonic: u8, mode: KeyMode) -> String {
    format!("{}-{}", note_name(tonic, uses_flats(tonic, mode)), mode)
}

/// A chord proposed for the active key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSuggestion {
    /// Unique within one suggestion result: "diatonic:iv", "secondary:V7/v"
    pub id: String,
    /// Full chord symbol: "Am", "E7", "Bb"
    pub symbol: String,
    pub roman: String,
    /// `None` for chords whose role is ambiguous
    pub function: Option<HarmonicFunction>,
    pub root: u8,
    pub quality: ChordQuality,
    /// Pitch classes, root first, one per chord tone
    pub tones: Vec<u8>,
    /// Scale degree (1–7) the chord is built on, when it comes from a scale
    pub degree: Option<u8>,
    /// How well the chord tones match the played pitch classes (0–1)
    pub support_score: f64,
    /// Harmonic distance from the plain diatonic set (0–1)
    pub color_score: f64,
    pub source: ChordSource,
    /// Numeral the chord leads to; for the raised dominant of a minor key,
    /// the diatonic v it stands in for
    pub resolves_to_roman: Option<String>,
    pub note: Option<String>,
}

impl ChordSuggestion {
    pub fn cardinality(&self) -> usize {
        self.tones.len()
    }

    pub fn is_color(&self) -> bool {
        !matches!(self.source, ChordSource::Diatonic)
    }

    /// Fixed blend of support and color used for combined ranking.
    pub fn rank_score(&self, support_weight: f64, color_weight: f64) -> f64 {
        support_weight * self.support_score + color_weight * self.color_score
    }

    /// Tone set ignoring order, for duplicate detection.
    pub fn tone_set(&self) -> u16 {
        pitch_class_mask(&self.tones)
    }
}

/// Single-slot decoration applied to a skeleton progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    AppliedDominant { slot: usize, target: String },
    /// Minor-key v replaced by the dominant seventh with the raised leading tone
    RaisedDominant { slot: usize },
    Neapolitan { slot: usize },
    ModalBorrowing { slot: usize, mode: ParallelMode },
}

impl Transformation {
    pub fn slot(&self) -> usize {
        match self {
            Transformation::AppliedDominant { slot, .. }
            | Transformation::RaisedDominant { slot }
            | Transformation::Neapolitan { slot }
            | Transformation::ModalBorrowing { slot, .. } => *slot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSlot {
    /// Functional role label from the skeleton: "tonic", "predominant", ...
    pub role: String,
    pub function: HarmonicFunction,
    pub chord: ChordSuggestion,
    /// Other catalog chords that fit the same slot, best first
    pub alternatives: Vec<ChordSuggestion>,
}

/// Score terms behind a progression's overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionScore {
    /// Mean support score across slots (0–1)
    pub fit: f64,
    /// Combined color of the slots (0–1)
    pub spice: f64,
    /// 1.0 = every chord change moves by common tones (0–1)
    pub voice_leading: f64,
    /// Strength of the closing resolution (0–1)
    pub cadence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSuggestion {
    /// Skeleton the progression was built from
    pub template: String,
    pub transformation: Option<Transformation>,
    pub symbols: Vec<String>,
    pub numerals: Vec<String>,
    pub slots: Vec<ProgressionSlot>,
    pub has_color_chord: bool,
    pub has_secondary_dominant: bool,
    pub has_borrowed_chord: bool,
    /// Overall ranking score (0–1) for the weirdness it was generated with
    pub score: f64,
    pub breakdown: ProgressionScore,
}

impl ProgressionSuggestion {
    pub fn is_all_diatonic(&self) -> bool {
        !self.has_color_chord
    }
}
