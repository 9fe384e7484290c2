use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chord_templates::{
    chord_symbol, chord_tones, pitch_class_mask, quality_of, roman_numeral, stack_thirds,
};
use crate::types::{
    ChordQuality, ChordSource, ChordSuggestion, HarmonicFunction, KeyCandidate, KeyMode,
    ParallelMode, PitchClassFeatures,
};

/// Color score of chords from the key's own scale.
pub const DIATONIC_COLOR: f64 = 0.0;
/// Color score of chords borrowed from a parallel mode.
pub const BORROWED_COLOR: f64 = 0.5;
/// Color score of applied dominants.
pub const SECONDARY_COLOR: f64 = 0.6;
/// Color score of the Neapolitan (flat-II) chord.
pub const NEAPOLITAN_COLOR: f64 = 0.7;
/// Color score of tritone substitutes.
pub const TRITONE_COLOR: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordParams {
    /// Weight of support score in the combined ranking
    pub support_weight: f64,
    /// Weight of color score in the combined ranking
    pub color_weight: f64,
    /// Build diatonic and borrowed chords as sevenths instead of triads
    pub diatonic_sevenths: bool,
}

impl Default for ChordParams {
    fn default() -> Self {
        Self {
            support_weight: 0.7,
            color_weight: 0.3,
            diatonic_sevenths: false,
        }
    }
}

/// Chord catalog for one key candidate.
///
/// The three family lists are the only stored data; rankings and lookups
/// are derived from them on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordSuggestionResult {
    key_id: String,
    diatonic: Vec<ChordSuggestion>,
    secondary: Vec<ChordSuggestion>,
    borrowed: Vec<ChordSuggestion>,
    support_weight: f64,
    color_weight: f64,
}

/// Lookup tables borrowed from a [`ChordSuggestionResult`].
#[derive(Debug, Default)]
pub struct ChordIndex<'a> {
    pub by_id: HashMap<&'a str, &'a ChordSuggestion>,
    pub by_roman: HashMap<&'a str, Vec<&'a ChordSuggestion>>,
    pub by_function: HashMap<HarmonicFunction, Vec<&'a ChordSuggestion>>,
    pub by_resolution: HashMap<&'a str, Vec<&'a ChordSuggestion>>,
}

impl ChordSuggestionResult {
    pub fn empty(key_id: impl Into<String>, params: &ChordParams) -> Self {
        Self {
            key_id: key_id.into(),
            diatonic: Vec::new(),
            secondary: Vec::new(),
            borrowed: Vec::new(),
            support_weight: params.support_weight,
            color_weight: params.color_weight,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn diatonic(&self) -> &[ChordSuggestion] {
        &self.diatonic
    }

    /// Applied dominants and their tritone substitutes.
    pub fn secondary(&self) -> &[ChordSuggestion] {
        &self.secondary
    }

    pub fn borrowed(&self) -> &[ChordSuggestion] {
        &self.borrowed
    }

    /// Every chord, family by family.
    pub fn all(&self) -> impl Iterator<Item = &ChordSuggestion> {
        self.diatonic
            .iter()
            .chain(self.secondary.iter())
            .chain(self.borrowed.iter())
    }

    pub fn len(&self) -> usize {
        self.diatonic.len() + self.secondary.len() + self.borrowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rank_score(&self, chord: &ChordSuggestion) -> f64 {
        chord.rank_score(self.support_weight, self.color_weight)
    }

    /// All chords by blended support/color score, then id.
    pub fn ranked(&self) -> Vec<&ChordSuggestion> {
        let mut ranked: Vec<&ChordSuggestion> = self.all().collect();
        ranked.sort_by(|a, b| {
            self.rank_score(b)
                .partial_cmp(&self.rank_score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked
    }

    pub fn by_id(&self, id: &str) -> Option<&ChordSuggestion> {
        self.all().find(|c| c.id == id)
    }

    pub fn by_roman(&self, roman: &str) -> Vec<&ChordSuggestion> {
        self.all().filter(|c| c.roman == roman).collect()
    }

    pub fn by_function(&self, function: HarmonicFunction) -> Vec<&ChordSuggestion> {
        self.all().filter(|c| c.function == Some(function)).collect()
    }

    /// Chords whose resolution target is `roman`.
    pub fn by_resolution(&self, roman: &str) -> Vec<&ChordSuggestion> {
        self.all()
            .filter(|c| c.resolves_to_roman.as_deref() == Some(roman))
            .collect()
    }

    /// Build all lookup tables at once.
    pub fn index(&self) -> ChordIndex<'_> {
        let mut index = ChordIndex::default();
        for chord in self.all() {
            index.by_id.insert(chord.id.as_str(), chord);
            index
                .by_roman
                .entry(chord.roman.as_str())
                .or_default()
                .push(chord);
            if let Some(function) = chord.function {
                index.by_function.entry(function).or_default().push(chord);
            }
            if let Some(target) = chord.resolves_to_roman.as_deref() {
                index.by_resolution.entry(target).or_default().push(chord);
            }
        }
        index
    }
}

/// Degree → function for major keys (I ii iii IV V vi vii°).
const MAJOR_FUNCTIONS: [HarmonicFunction; 7] = [
    HarmonicFunction::Tonic,
    HarmonicFunction::Subdominant,
    HarmonicFunction::Tonic,
    HarmonicFunction::Subdominant,
    HarmonicFunction::Dominant,
    HarmonicFunction::Tonic,
    HarmonicFunction::Dominant,
];

/// Degree → function for natural minor keys (i ii° III iv v VI VII).
const MINOR_FUNCTIONS: [HarmonicFunction; 7] = [
    HarmonicFunction::Tonic,
    HarmonicFunction::Subdominant,
    HarmonicFunction::Tonic,
    HarmonicFunction::Subdominant,
    HarmonicFunction::Dominant,
    HarmonicFunction::Subdominant,
    HarmonicFunction::Dominant,
];

/// Degree → function for borrowed chords; the mediant stays ambiguous.
const BORROWED_FUNCTIONS: [Option<HarmonicFunction>; 7] = [
    Some(HarmonicFunction::Tonic),
    Some(HarmonicFunction::Subdominant),
    None,
    Some(HarmonicFunction::Subdominant),
    Some(HarmonicFunction::Dominant),
    Some(HarmonicFunction::Subdominant),
    Some(HarmonicFunction::Dominant),
];

pub fn diatonic_function(mode: KeyMode, degree: usize) -> HarmonicFunction {
    match mode {
        KeyMode::Major => MAJOR_FUNCTIONS[degree % 7],
        KeyMode::Minor => MINOR_FUNCTIONS[degree % 7],
    }
}

/// Generate diatonic, applied-dominant and borrowed chords for a key.
///
/// Empty features produce an empty catalog.
pub fn generate_chord_suggestions(
    candidate: &KeyCandidate,
    features: &PitchClassFeatures,
    params: &ChordParams,
) -> ChordSuggestionResult {
    let mut result = ChordSuggestionResult::empty(candidate.id.clone(), params);
    if features.is_empty() {
        return result;
    }

    let ctx = KeyContext::new(candidate, features);
    result.diatonic = diatonic_chords(&ctx, params.diatonic_sevenths);
    result.secondary = secondary_dominants(&ctx, &result.diatonic);
    result.borrowed = borrowed_chords(&ctx, &result.diatonic, params.diatonic_sevenths);

    debug!(
        key = %candidate.id,
        diatonic = result.diatonic.len(),
        secondary = result.secondary.len(),
        borrowed = result.borrowed.len(),
        "chord catalog generated"
    );
    result
}

/// Key facts shared by every generator.
struct KeyContext<'a> {
    tonic: u8,
    mode: KeyMode,
    scale: [u8; 7],
    use_flats: bool,
    features: &'a PitchClassFeatures,
}

impl<'a> KeyContext<'a> {
    fn new(candidate: &KeyCandidate, features: &'a PitchClassFeatures) -> Self {
        let tonic = candidate.tonic % 12;
        Self {
            tonic,
            mode: candidate.mode,
            scale: mode_scale(tonic, candidate.mode.as_parallel()),
            use_flats: candidate.uses_flats(),
            features,
        }
    }

    /// Sum of chord-tone weights divided by the chord's cardinality.
    fn support(&self, tones: &[u8]) -> f64 {
        if tones.is_empty() {
            return 0.0;
        }
        let sum: f64 = tones.iter().map(|&pc| self.features.weight(pc)).sum();
        round6((sum / tones.len() as f64).clamp(0.0, 1.0))
    }

    fn is_diatonic(&self, tones: &[u8]) -> bool {
        tones.iter().all(|pc| self.scale.contains(pc))
    }

    fn chord(&self, spec: ChordSpec) -> ChordSuggestion {
        // Lowered degrees spell with flats and raised ones with sharps in any key.
        let use_flats = spec.force_flats
            || spec.roman.starts_with('b')
            || (self.use_flats && !spec.roman.starts_with('#'));
        ChordSuggestion {
            id: format!("{}:{}", spec.source.slug(), spec.roman),
            symbol: chord_symbol(spec.root, spec.quality, use_flats),
            support_score: self.support(&spec.tones),
            roman: spec.roman,
            function: spec.function,
            root: spec.root,
            quality: spec.quality,
            tones: spec.tones,
            degree: spec.degree,
            color_score: spec.color,
            source: spec.source,
            resolves_to_roman: spec.resolves_to,
            note: spec.note,
        }
    }
}

struct ChordSpec {
    root: u8,
    quality: ChordQuality,
    tones: Vec<u8>,
    roman: String,
    function: Option<HarmonicFunction>,
    degree: Option<u8>,
    color: f64,
    source: ChordSource,
    resolves_to: Option<String>,
    note: Option<String>,
    force_flats: bool,
}

pub(crate) fn mode_scale(tonic: u8, mode: ParallelMode) -> [u8; 7] {
    mode.intervals().map(|i| (tonic + i) % 12)
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

fn diatonic_chords(ctx: &KeyContext<'_>, sevenths: bool) -> Vec<ChordSuggestion> {
    (0..7)
        .map(|degree| {
            let tones = stack_thirds(&ctx.scale, degree, sevenths);
            let quality = quality_of(&tones);
            let root = tones[0];
            ctx.chord(ChordSpec {
                root,
                quality,
                roman: roman_numeral(ctx.tonic, ctx.mode, root, quality),
                tones,
                function: Some(diatonic_function(ctx.mode, degree)),
                degree: Some(degree as u8 + 1),
                color: DIATONIC_COLOR,
                source: ChordSource::Diatonic,
                resolves_to: None,
                note: None,
                force_flats: false,
            })
        })
        .collect()
}

/// Applied dominant sevenths and tritone substitutes for every degree whose
/// triad is major or minor.
///
/// In a minor key the dominant of i carries the raised leading tone and
/// stands in for the diatonic v, so it resolves to "v". Its tritone
/// substitute still leads to i.
fn secondary_dominants(ctx: &KeyContext<'_>, diatonic: &[ChordSuggestion]) -> Vec<ChordSuggestion> {
    let mut out = Vec::new();

    for (degree, target) in diatonic.iter().enumerate() {
        let triad = stack_thirds(&ctx.scale, degree, false);
        if !matches!(quality_of(&triad), ChordQuality::Major | ChordQuality::Minor) {
            continue;
        }

        let target_roman = target.roman.clone();
        let (dominant_label, sub_label) = if degree == 0 {
            ("V7".to_string(), "subV7".to_string())
        } else {
            (format!("V7/{target_roman}"), format!("subV7/{target_roman}"))
        };

        let dominant_root = (target.root + 7) % 12;
        let dominant_tones = chord_tones(dominant_root, ChordQuality::Dominant7);
        let dominant_symbol = chord_symbol(dominant_root, ChordQuality::Dominant7, ctx.use_flats);

        let (resolves_to, note) = match (&ctx.mode, diatonic.get(4)) {
            (KeyMode::Minor, Some(minor_v)) if degree == 0 => (
                minor_v.roman.clone(),
                format!(
                    "raised dominant in place of {}, leads to {}",
                    minor_v.symbol, target.symbol
                ),
            ),
            _ if ctx.is_diatonic(&dominant_tones) => (
                target_roman.clone(),
                format!("dominant of {}, all scale tones", target.symbol),
            ),
            _ => (target_roman.clone(), format!("dominant of {}", target.symbol)),
        };

        out.push(ctx.chord(ChordSpec {
            root: dominant_root,
            quality: ChordQuality::Dominant7,
            tones: dominant_tones,
            roman: dominant_label,
            function: Some(HarmonicFunction::Dominant),
            degree: None,
            color: SECONDARY_COLOR,
            source: ChordSource::SecondaryDominant {
                tritone_substitute: false,
            },
            resolves_to: Some(resolves_to),
            note: Some(note),
            force_flats: false,
        }));

        let sub_root = (dominant_root + 6) % 12;
        out.push(ctx.chord(ChordSpec {
            root: sub_root,
            quality: ChordQuality::Dominant7,
            tones: chord_tones(sub_root, ChordQuality::Dominant7),
            roman: sub_label,
            function: Some(HarmonicFunction::Dominant),
            degree: None,
            color: TRITONE_COLOR,
            source: ChordSource::SecondaryDominant {
                tritone_substitute: true,
            },
            resolves_to: Some(target_roman),
            note: Some(format!("tritone substitute for {dominant_symbol}")),
            force_flats: true,
        }));
    }

    out
}

/// Chords from parallel modes that the key's own scale lacks, plus the Neapolitan.
///
/// A tone set reachable from several modes appears once, credited to the
/// first mode in borrowing order; later modes are listed in its note.
fn borrowed_chords(
    ctx: &KeyContext<'_>,
    diatonic: &[ChordSuggestion],
    sevenths: bool,
) -> Vec<ChordSuggestion> {
    let own_sets: Vec<u16> = diatonic.iter().map(ChordSuggestion::tone_set).collect();
    let own_mode = ctx.mode.as_parallel();
    let mut out: Vec<ChordSuggestion> = Vec::new();

    for mode in ParallelMode::BORROWING_ORDER {
        if mode == own_mode {
            continue;
        }
        let scale = mode_scale(ctx.tonic, mode);
        for degree in 0..7 {
            let tones = stack_thirds(&scale, degree, sevenths);
            let set = pitch_class_mask(&tones);
            if own_sets.contains(&set) {
                continue;
            }
            if let Some(existing) = out.iter_mut().find(|c| c.tone_set() == set) {
                if let Some(note) = existing.note.as_mut() {
                    note.push_str(&format!(", {mode}"));
                }
                continue;
            }

            let quality = quality_of(&tones);
            let root = tones[0];
            out.push(ctx.chord(ChordSpec {
                root,
                quality,
                roman: roman_numeral(ctx.tonic, ctx.mode, root, quality),
                tones,
                function: BORROWED_FUNCTIONS[degree],
                degree: Some(degree as u8 + 1),
                color: BORROWED_COLOR,
                source: ChordSource::Borrowed { mode },
                resolves_to: None,
                note: Some(format!("borrowed from parallel {mode}")),
                force_flats: false,
            }));
        }
    }

    let neapolitan = neapolitan(ctx);
    let set = neapolitan.tone_set();
    if !own_sets.contains(&set) && !out.iter().any(|c| c.tone_set() == set) {
        out.push(neapolitan);
    }
    out
}

/// Major triad on the lowered supertonic, a subdominant substitute.
fn neapolitan(ctx: &KeyContext<'_>) -> ChordSuggestion {
    let root = (ctx.tonic + 1) % 12;
    ctx.chord(ChordSpec {
        root,
        quality: ChordQuality::Major,
        tones: chord_tones(root, ChordQuality::Major),
        roman: "bII".to_string(),
        function: Some(HarmonicFunction::Subdominant),
        degree: Some(2),
        color: NEAPOLITAN_COLOR,
        source: ChordSource::Borrowed {
            mode: ParallelMode::Phrygian,
        },
        resolves_to: None,
        note: Some("Neapolitan".to_string()),
        force_flats: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{score_candidate, KeyWeights};

    fn even_features(pcs: &[u8]) -> PitchClassFeatures {
        let mut weights = [0.0; 12];
        for &pc in pcs {
            weights[pc as usize] = 1.0 / pcs.len() as f64;
        }
        PitchClassFeatures {
            weights,
            top_pitch_classes: pcs.to_vec(),
            last_note_pc: pcs.first().copied(),
            bass_pc: pcs.first().copied(),
            note_count: pcs.len(),
            total_duration: pcs.len() as f64,
        }
    }

    fn catalog(tonic: u8, mode: KeyMode, params: &ChordParams) -> ChordSuggestionResult {
        let features = even_features(&[9, 0, 2, 4, 7]);
        let candidate = score_candidate(tonic, mode, &features, &KeyWeights::default());
        generate_chord_suggestions(&candidate, &features, params)
    }

    #[test]
    fn a_minor_diatonic_numerals() {
        let result = catalog(9, KeyMode::Minor, &ChordParams::default());
        let romans: Vec<&str> = result.diatonic().iter().map(|c| c.roman.as_str()).collect();
        assert_eq!(romans, vec!["i", "ii°", "III", "iv", "v", "VI", "VII"]);
        let symbols: Vec<&str> = result.diatonic().iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["Am", "Bdim", "C", "Dm", "Em", "F", "G"]);
        assert!(result.diatonic().iter().all(|c| c.tones.len() == 3));
    }

    #[test]
    fn sevenths_flag_builds_four_note_chords() {
        let params = ChordParams {
            diatonic_sevenths: true,
            ..ChordParams::default()
        };
        let result = catalog(0, KeyMode::Major, &params);
        let romans: Vec<&str> = result.diatonic().iter().map(|c| c.roman.as_str()).collect();
        assert_eq!(romans, vec!["Imaj7", "ii7", "iii7", "IVmaj7", "V7", "vi7", "viiø7"]);
        assert!(result.diatonic().iter().all(|c| c.tones.len() == 4));
    }

    #[test]
    fn raised_dominant_stands_in_for_minor_v() {
        let result = catalog(9, KeyMode::Minor, &ChordParams::default());
        let max_diatonic = result
            .diatonic()
            .iter()
            .map(|c| c.color_score)
            .fold(0.0, f64::max);

        let to_v = result.by_resolution("v");
        let e7 = to_v
            .iter()
            .find(|c| c.root == 4)
            .expect("dominant seventh on E resolving to v");
        assert_eq!(e7.symbol, "E7");
        assert_eq!(e7.quality, ChordQuality::Dominant7);
        assert_eq!(e7.tones, vec![4, 8, 11, 2]);
        assert_eq!(e7.resolves_to_roman.as_deref(), Some("v"));
        assert!(e7.color_score > max_diatonic);
        assert_eq!(e7.id, "secondary:V7");

        // B7 still tonicizes v, and Bb7 substitutes for E7 on the way to i
        let b7 = result.by_id("secondary:V7/v").unwrap();
        assert_eq!(b7.symbol, "B7");
        assert_eq!(b7.resolves_to_roman.as_deref(), Some("v"));
        let symbols: Vec<&str> = to_v.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["E7", "B7", "F7"]);
        let sub = result.by_id("tritone:subV7").unwrap();
        assert_eq!(sub.symbol, "Bb7");
        assert_eq!(sub.resolves_to_roman.as_deref(), Some("i"));

        assert!(result.secondary().iter().all(|c| c.color_score > max_diatonic));
    }

    #[test]
    fn every_tonicizable_degree_gets_a_dominant() {
        let major = catalog(0, KeyMode::Major, &ChordParams::default());
        let g7 = major.by_id("secondary:V7").unwrap();
        assert_eq!(g7.symbol, "G7");
        assert_eq!(g7.resolves_to_roman.as_deref(), Some("I"));
        let to_tonic: Vec<&str> = major
            .by_resolution("I")
            .iter()
            .map(|c| c.symbol.as_str())
            .collect();
        assert_eq!(to_tonic, vec!["G7", "Db7"]);
        // ii, iii, IV, V and vi are tonicizable besides I
        let dominants = major
            .secondary()
            .iter()
            .filter(|c| c.source == ChordSource::SecondaryDominant { tritone_substitute: false })
            .count();
        assert_eq!(dominants, 6);

        // G7 tonicizes III with scale tones only and is still listed
        let minor = catalog(9, KeyMode::Minor, &ChordParams::default());
        let g7 = minor.by_id("secondary:V7/III").unwrap();
        assert_eq!(g7.symbol, "G7");
        assert!(g7.note.as_deref().unwrap().contains("all scale tones"));
        assert!(minor.by_id("tritone:subV7/III").is_some());
    }

    #[test]
    fn support_is_mean_weight_of_chord_tones() {
        // Evenly weighted A C D E G: each tone carries 0.2
        let result = catalog(9, KeyMode::Minor, &ChordParams::default());
        let a_minor = &result.diatonic()[0];
        assert_eq!(a_minor.symbol, "Am");
        assert_eq!(a_minor.support_score, 0.2);

        // Bdim holds only D: 0.2 / 3
        let b_dim = &result.diatonic()[1];
        assert_eq!(b_dim.support_score, round6(0.2 / 3.0));

        // E7 holds E and D out of four tones
        let e7 = result.by_id("secondary:V7").unwrap();
        assert_eq!(e7.support_score, 0.1);
    }

    #[test]
    fn tritone_substitute_shares_tritone() {
        let result = catalog(0, KeyMode::Major, &ChordParams::default());
        let sub = result.by_id("tritone:subV7").unwrap();
        assert_eq!(sub.symbol, "Db7");
        // G7's tritone is B–F; Db7 holds F and Cb (B)
        assert!(sub.tones.contains(&5));
        assert!(sub.tones.contains(&11));
        assert_eq!(
            sub.source,
            ChordSource::SecondaryDominant {
                tritone_substitute: true
            }
        );
    }

    #[test]
    fn borrowed_chords_are_unique_and_outside_the_key() {
        let result = catalog(0, KeyMode::Major, &ChordParams::default());
        let diatonic_sets: Vec<u16> = result.diatonic().iter().map(|c| c.tone_set()).collect();
        let mut seen = Vec::new();
        for chord in result.borrowed() {
            assert!(!diatonic_sets.contains(&chord.tone_set()), "{} is diatonic", chord.id);
            assert!(!seen.contains(&chord.tone_set()), "{} duplicated", chord.id);
            seen.push(chord.tone_set());
        }

        let flat_six = result.by_id("borrowed:bVI").unwrap();
        assert_eq!(flat_six.symbol, "Ab");
        assert_eq!(
            flat_six.source,
            ChordSource::Borrowed {
                mode: ParallelMode::Minor
            }
        );
        // bVII is in both minor and mixolydian
        let flat_seven = result.by_id("borrowed:bVII").unwrap();
        assert!(flat_seven.note.as_deref().unwrap().contains("mixolydian"));

        let neapolitan = result.by_id("neapolitan:bII").unwrap();
        assert_eq!(neapolitan.symbol, "Db");
        assert_eq!(neapolitan.color_score, NEAPOLITAN_COLOR);
    }

    #[test]
    fn indexes_match_flat_lists() {
        let result = catalog(9, KeyMode::Minor, &ChordParams::default());
        let index = result.index();
        assert_eq!(index.by_id.len(), result.len());
        for chord in result.all() {
            assert_eq!(index.by_id[chord.id.as_str()], chord);
        }
        let dominants = &index.by_function[&HarmonicFunction::Dominant];
        assert_eq!(dominants.len(), result.by_function(HarmonicFunction::Dominant).len());
        assert_eq!(index.by_resolution["v"].len(), result.by_resolution("v").len());
        assert_eq!(result.by_roman("iv").len(), 1);
    }

    #[test]
    fn ranking_blends_support_and_color() {
        let result = catalog(9, KeyMode::Minor, &ChordParams::default());
        let ranked = result.ranked();
        assert_eq!(ranked.len(), result.len());
        for pair in ranked.windows(2) {
            assert!(result.rank_score(pair[0]) >= result.rank_score(pair[1]));
        }
        assert!(result.all().all(|c| (0.0..=1.0).contains(&c.support_score)));
    }

    #[test]
    fn empty_features_give_empty_catalog() {
        let features = PitchClassFeatures::empty();
        let candidate = score_candidate(0, KeyMode::Major, &features, &KeyWeights::default());
        let result = generate_chord_suggestions(&candidate, &features, &ChordParams::default());
        assert!(result.is_empty());
        assert!(result.ranked().is_empty());
        assert_eq!(result.key_id(), "C-major");
    }
}
