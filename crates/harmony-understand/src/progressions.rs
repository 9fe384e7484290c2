use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chords::ChordSuggestionResult;
use crate::types::HarmonicFunction::{Dominant as D, Subdominant as S, Tonic as T};
use crate::types::{
    ChordQuality, ChordSource, ChordSuggestion, HarmonicFunction, KeyCandidate, ParallelMode,
    PitchClassFeatures, ProgressionScore, ProgressionSlot, ProgressionSuggestion, Transformation,
};
use crate::voice_leading::progression_quality;

/// Weight of the conventional score at weirdness 0.
pub const CONVENTIONAL_WEIGHT_AT_ZERO: f64 = 1.0;
/// Weight of the conventional score at weirdness 1.
pub const CONVENTIONAL_WEIGHT_AT_ONE: f64 = 0.3;
/// Weight of spice at weirdness 0; negative so color is penalized.
pub const SPICE_WEIGHT_AT_ZERO: f64 = -1.5;
/// Weight of spice at weirdness 1.
pub const SPICE_WEIGHT_AT_ONE: f64 = 1.0;

/// Cadence strength when a dominant resolves to the tonic.
const AUTHENTIC_CADENCE: f64 = 1.0;
/// Cadence strength when a subdominant resolves to the tonic.
const PLAGAL_CADENCE: f64 = 0.6;
/// Cadence strength for any other approach to the tonic.
const WEAK_CADENCE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionParams {
    pub fit_weight: f64,
    pub voice_leading_weight: f64,
    pub cadence_weight: f64,
    /// Default weirdness (0 = conventional, 1 = colorful)
    pub weirdness: f64,
    pub max_results: usize,
    /// Alternatives listed per slot
    pub max_alternatives: usize,
}

impl Default for ProgressionParams {
    fn default() -> Self {
        Self {
            fit_weight: 0.5,
            voice_leading_weight: 0.2,
            cadence_weight: 0.3,
            weirdness: 0.0,
            max_results: 12,
            max_alternatives: 4,
        }
    }
}

/// A key-independent sequence of functional roles, each tied to a scale degree.
pub struct Skeleton {
    pub name: &'static str,
    pub slots: &'static [(HarmonicFunction, u8)],
}

pub static SKELETONS: &[Skeleton] = &[
    Skeleton {
        name: "authentic",
        slots: &[(T, 1), (S, 4), (D, 5), (T, 1)],
    },
    Skeleton {
        name: "two-five-one",
        slots: &[(T, 1), (S, 2), (D, 5), (T, 1)],
    },
    Skeleton {
        name: "pop-axis",
        slots: &[(T, 1), (D, 5), (T, 6), (S, 4)],
    },
    Skeleton {
        name: "circle",
        slots: &[(T, 1), (T, 6), (S, 2), (D, 5)],
    },
    Skeleton {
        name: "rock",
        slots: &[(T, 1), (D, 5), (S, 4), (T, 1)],
    },
    Skeleton {
        name: "five-slot",
        slots: &[(T, 1), (T, 6), (S, 4), (D, 5), (T, 1)],
    },
    Skeleton {
        name: "mediant",
        slots: &[(T, 1), (T, 3), (S, 4), (D, 5), (T, 1)],
    },
];

/// Weights `(conventional, spice)` for a weirdness value.
pub fn weirdness_weights(weirdness: f64) -> (f64, f64) {
    let w = weirdness.clamp(0.0, 1.0);
    (
        CONVENTIONAL_WEIGHT_AT_ZERO + (CONVENTIONAL_WEIGHT_AT_ONE - CONVENTIONAL_WEIGHT_AT_ZERO) * w,
        SPICE_WEIGHT_AT_ZERO + (SPICE_WEIGHT_AT_ONE - SPICE_WEIGHT_AT_ZERO) * w,
    )
}

/// Blend conventional and spice scores (both 0–1) into a 0–1 overall score.
pub fn blend_score(conventional: f64, spice: f64, weirdness: f64) -> f64 {
    let (cw, sw) = weirdness_weights(weirdness);
    let raw = cw * conventional + sw * spice;
    let lo = sw.min(0.0);
    let hi = cw + sw.max(0.0);
    round6(((raw - lo) / (hi - lo)).clamp(0.0, 1.0))
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

/// Build, decorate, score and rank progressions for the active key.
pub fn generate_progressions(
    candidate: &KeyCandidate,
    chords: &ChordSuggestionResult,
    features: &PitchClassFeatures,
    weirdness: f64,
    params: &ProgressionParams,
) -> Vec<ProgressionSuggestion> {
    if chords.is_empty() || features.is_empty() {
        return Vec::new();
    }

    let ranked = chords.ranked();
    let mut seen: Vec<Vec<String>> = Vec::new();
    let mut out = Vec::new();

    for skeleton in SKELETONS {
        let Some(base) = fill_skeleton(skeleton, chords) else {
            continue;
        };

        let variants = std::iter::once((None, base.clone()))
            .chain(transformations(skeleton, &base, chords).into_iter().map(|(t, c)| (Some(t), c)));

        for (transformation, slot_chords) in variants {
            let symbols: Vec<String> = slot_chords.iter().map(|c| c.symbol.clone()).collect();
            if seen.contains(&symbols) {
                continue;
            }
            seen.push(symbols);
            out.push(build_suggestion(
                skeleton,
                transformation,
                slot_chords,
                &ranked,
                weirdness,
                params,
            ));
        }
    }

    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.breakdown
                    .spice
                    .partial_cmp(&b.breakdown.spice)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| a.symbols.cmp(&b.symbols))
    });
    out.truncate(params.max_results);

    debug!(
        key = %candidate.id,
        weirdness,
        count = out.len(),
        "progressions ranked"
    );
    out
}

/// Fill each slot with the diatonic chord on its degree.
fn fill_skeleton(skeleton: &Skeleton, chords: &ChordSuggestionResult) -> Option<Vec<ChordSuggestion>> {
    skeleton
        .slots
        .iter()
        .map(|&(_, degree)| {
            chords
                .diatonic()
                .iter()
                .find(|c| c.degree == Some(degree))
                .cloned()
        })
        .collect()
}

/// Every single-slot decoration of a filled skeleton.
fn transformations(
    skeleton: &Skeleton,
    base: &[ChordSuggestion],
    chords: &ChordSuggestionResult,
) -> Vec<(Transformation, Vec<ChordSuggestion>)> {
    let mut out = Vec::new();
    let last = base.len() - 1;

    let replace = |slot: usize, chord: &ChordSuggestion| {
        let mut replaced = base.to_vec();
        replaced[slot] = chord.clone();
        replaced
    };

    // Applied dominants lead into the following slot's chord. A chord on the
    // target's own root stands in for it rather than approaching it.
    for slot in 1..last {
        let target = &base[slot + 1];
        for chord in chords.by_resolution(&target.roman) {
            if chord.root == target.root {
                continue;
            }
            out.push((
                Transformation::AppliedDominant {
                    slot,
                    target: target.roman.clone(),
                },
                replace(slot, chord),
            ));
        }
    }

    for (slot, chord) in base.iter().enumerate() {
        if chord.function != Some(HarmonicFunction::Dominant) {
            continue;
        }
        for raised in chords.by_resolution(&chord.roman) {
            if raised.root == chord.root && raised.quality == ChordQuality::Dominant7 {
                out.push((Transformation::RaisedDominant { slot }, replace(slot, raised)));
            }
        }
    }

    if let Some(neapolitan) = chords
        .borrowed()
        .iter()
        .find(|c| c.source == ChordSource::Borrowed { mode: ParallelMode::Phrygian })
    {
        for slot in 0..last {
            if skeleton.slots[slot].0 == HarmonicFunction::Subdominant
                && skeleton.slots[slot + 1].0 == HarmonicFunction::Dominant
            {
                out.push((Transformation::Neapolitan { slot }, replace(slot, neapolitan)));
            }
        }
    }

    // A closing slot only takes a borrowed tonic.
    for slot in 1..=last {
        let degree = skeleton.slots[slot].1;
        if slot == last && degree != 1 {
            continue;
        }
        for chord in chords.borrowed() {
            let ChordSource::Borrowed { mode } = chord.source else {
                continue;
            };
            if mode == ParallelMode::Phrygian || chord.degree != Some(degree) {
                continue;
            }
            out.push((Transformation::ModalBorrowing { slot, mode }, replace(slot, chord)));
        }
    }

    out
}

fn build_suggestion(
    skeleton: &Skeleton,
    transformation: Option<Transformation>,
    slot_chords: Vec<ChordSuggestion>,
    ranked: &[&ChordSuggestion],
    weirdness: f64,
    params: &ProgressionParams,
) -> ProgressionSuggestion {
    let breakdown = score_progression(&slot_chords);
    let weight_sum = params.fit_weight + params.voice_leading_weight + params.cadence_weight;
    let conventional = if weight_sum > 0.0 {
        (params.fit_weight * breakdown.fit
            + params.voice_leading_weight * breakdown.voice_leading
            + params.cadence_weight * breakdown.cadence)
            / weight_sum
    } else {
        0.0
    };
    let score = blend_score(conventional, breakdown.spice, weirdness);

    let symbols = slot_chords.iter().map(|c| c.symbol.clone()).collect();
    let numerals = slot_chords.iter().map(|c| c.roman.clone()).collect();
    let has_color_chord = slot_chords.iter().any(ChordSuggestion::is_color);
    let has_secondary_dominant = slot_chords
        .iter()
        .any(|c| matches!(c.source, ChordSource::SecondaryDominant { .. }));
    let has_borrowed_chord = slot_chords
        .iter()
        .any(|c| matches!(c.source, ChordSource::Borrowed { .. }));

    let slots = slot_chords
        .iter()
        .enumerate()
        .map(|(i, chord)| {
            let (function, degree) = skeleton.slots[i];
            let next_roman = slot_chords.get(i + 1).map(|c| c.roman.as_str());
            let alternatives = ranked
                .iter()
                .filter(|alt| alt.id != chord.id)
                .filter(|alt| {
                    alt.function == Some(function)
                        || (next_roman.is_some() && alt.resolves_to_roman.as_deref() == next_roman)
                })
                .take(params.max_alternatives)
                .map(|alt| (*alt).clone())
                .collect();
            ProgressionSlot {
                role: role_label(function, degree).to_string(),
                function,
                chord: chord.clone(),
                alternatives,
            }
        })
        .collect();

    ProgressionSuggestion {
        template: skeleton.name.to_string(),
        transformation,
        symbols,
        numerals,
        slots,
        has_color_chord,
        has_secondary_dominant,
        has_borrowed_chord,
        score,
        breakdown,
    }
}

fn role_label(function: HarmonicFunction, degree: u8) -> &'static str {
    match (function, degree) {
        (HarmonicFunction::Tonic, 1) => "tonic",
        (HarmonicFunction::Tonic, _) => "tonic substitute",
        (HarmonicFunction::Subdominant, _) => "predominant",
        (HarmonicFunction::Dominant, _) => "dominant",
    }
}

/// Fit, spice, voice leading and cadence for a resolved chord sequence.
pub fn score_progression(chords: &[ChordSuggestion]) -> ProgressionScore {
    if chords.is_empty() {
        return ProgressionScore {
            fit: 0.0,
            spice: 0.0,
            voice_leading: 0.0,
            cadence: 0.0,
        };
    }

    let fit = chords.iter().map(|c| c.support_score).sum::<f64>() / chords.len() as f64;
    let spice = 1.0
        - chords
            .iter()
            .map(|c| 1.0 - c.color_score.clamp(0.0, 1.0))
            .product::<f64>();
    let voice_leading = progression_quality(chords.iter().map(|c| c.tones.as_slice()));

    ProgressionScore {
        fit: round6(fit),
        spice: round6(spice),
        voice_leading: round6(voice_leading),
        cadence: cadence_strength(chords),
    }
}

fn cadence_strength(chords: &[ChordSuggestion]) -> f64 {
    let [.., penultimate, last] = chords else {
        return 0.0;
    };
    if last.degree != Some(1) {
        return 0.0;
    }
    match penultimate.function {
        Some(HarmonicFunction::Dominant) => AUTHENTIC_CADENCE,
        Some(HarmonicFunction::Subdominant) => PLAGAL_CADENCE,
        _ => WEAK_CADENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::{generate_chord_suggestions, ChordParams};
    use crate::key::{score_candidate, KeyWeights};
    use crate::types::KeyMode;

    fn setup(tonic: u8, mode: KeyMode, pcs: &[u8]) -> (KeyCandidate, ChordSuggestionResult, PitchClassFeatures) {
        let mut weights = [0.0; 12];
        for &pc in pcs {
            weights[pc as usize] = 1.0 / pcs.len() as f64;
        }
        let features = PitchClassFeatures {
            weights,
            top_pitch_classes: pcs.to_vec(),
            last_note_pc: Some(tonic),
            bass_pc: Some(tonic),
            note_count: pcs.len(),
            total_duration: 1.0,
        };
        let candidate = score_candidate(tonic, mode, &features, &KeyWeights::default());
        let chords = generate_chord_suggestions(&candidate, &features, &ChordParams::default());
        (candidate, chords, features)
    }

    #[test]
    fn weights_interpolate_linearly() {
        assert_eq!(weirdness_weights(0.0), (1.0, -1.5));
        let (cw, sw) = weirdness_weights(1.0);
        assert!((cw - 0.3).abs() < 1e-12);
        assert_eq!(sw, 1.0);
        assert_eq!(weirdness_weights(7.0), weirdness_weights(1.0));
        let (cw, sw) = weirdness_weights(0.5);
        assert!((cw - 0.65).abs() < 1e-12);
        assert!((sw + 0.25).abs() < 1e-12);
    }

    #[test]
    fn blend_stays_in_range() {
        for w in [0.0, 0.25, 0.5, 0.75, 1.0] {
            for (c, s) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.4, 0.6)] {
                let score = blend_score(c, s, w);
                assert!((0.0..=1.0).contains(&score), "w={w} c={c} s={s} -> {score}");
            }
        }
    }

    #[test]
    fn spice_preference_rises_with_weirdness() {
        let diatonic = |w| blend_score(0.8, 0.0, w);
        let colorful = |w| blend_score(0.8, 0.6, w);
        let gaps: Vec<f64> = [0.0, 0.25, 0.5, 0.75, 1.0]
            .iter()
            .map(|&w| colorful(w) - diatonic(w))
            .collect();
        for pair in gaps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(gaps[0] < 0.0);
        assert!(gaps[4] > 0.0);
    }

    #[test]
    fn slot_counts_follow_templates() {
        let (candidate, chords, features) = setup(0, KeyMode::Major, &[0, 2, 4, 5, 7, 9, 11]);
        let progressions = generate_progressions(&candidate, &chords, &features, 0.5, &ProgressionParams {
            max_results: 1000,
            ..ProgressionParams::default()
        });
        assert!(!progressions.is_empty());
        for p in &progressions {
            let skeleton = SKELETONS.iter().find(|s| s.name == p.template).unwrap();
            assert_eq!(p.slots.len(), skeleton.slots.len());
            assert_eq!(p.symbols.len(), p.slots.len());
            assert_eq!(p.numerals.len(), p.slots.len());
            assert!((0.0..=1.0).contains(&p.score));
            assert!(p.slots.iter().all(|s| s.alternatives.len() <= 4));
            assert_eq!(p.transformation.is_none(), !p.has_color_chord);
        }
    }

    #[test]
    fn authentic_cadence_in_c_major() {
        let (candidate, chords, features) = setup(0, KeyMode::Major, &[0, 2, 4, 5, 7, 9, 11]);
        let progressions = generate_progressions(&candidate, &chords, &features, 0.0, &ProgressionParams::default());
        let authentic = progressions
            .iter()
            .find(|p| p.template == "authentic" && p.transformation.is_none())
            .unwrap();
        assert_eq!(authentic.symbols, vec!["C", "F", "G", "C"]);
        assert_eq!(authentic.numerals, vec!["I", "IV", "V", "I"]);
        assert_eq!(authentic.breakdown.cadence, 1.0);
        assert_eq!(authentic.slots[1].role, "predominant");
    }

    #[test]
    fn weirdness_zero_prefers_diatonic() {
        let (candidate, chords, features) = setup(9, KeyMode::Minor, &[9, 0, 2, 4, 7]);
        let progressions = generate_progressions(&candidate, &chords, &features, 0.0, &ProgressionParams::default());
        assert!(progressions[0].is_all_diatonic());
    }

    #[test]
    fn weirdness_one_promotes_color() {
        let (candidate, chords, features) = setup(9, KeyMode::Minor, &[9, 0, 2, 4, 7]);
        let progressions = generate_progressions(&candidate, &chords, &features, 1.0, &ProgressionParams::default());
        assert!(progressions[0].has_color_chord);
    }

    #[test]
    fn colored_never_outranks_equal_fit_diatonic_at_zero() {
        let (candidate, chords, features) = setup(0, KeyMode::Major, &[0, 2, 4, 5, 7, 9, 11]);
        let progressions = generate_progressions(&candidate, &chords, &features, 0.0, &ProgressionParams {
            max_results: 1000,
            ..ProgressionParams::default()
        });

        let mut pairs = 0;
        for (i, plain) in progressions.iter().enumerate() {
            if !plain.is_all_diatonic() {
                continue;
            }
            for (j, colored) in progressions.iter().enumerate() {
                if !colored.has_color_chord
                    || (colored.breakdown.fit - plain.breakdown.fit).abs() > 1e-9
                {
                    continue;
                }
                pairs += 1;
                assert!(
                    i < j && plain.score >= colored.score,
                    "{:?} ({}) outranks {:?} ({})",
                    colored.symbols,
                    colored.score,
                    plain.symbols,
                    plain.score
                );
            }
        }
        // G7 carries the same support as G, so C F G7 C ties C F G C on fit
        assert!(pairs > 0);
    }

    #[test]
    fn minor_dominant_slot_takes_raised_seventh() {
        let (candidate, chords, features) = setup(9, KeyMode::Minor, &[9, 0, 2, 4, 7]);
        let progressions = generate_progressions(&candidate, &chords, &features, 1.0, &ProgressionParams {
            max_results: 1000,
            ..ProgressionParams::default()
        });
        let raised = progressions
            .iter()
            .find(|p| p.template == "authentic" && p.transformation == Some(Transformation::RaisedDominant { slot: 2 }))
            .unwrap();
        assert_eq!(raised.symbols, vec!["Am", "Dm", "E7", "Am"]);
        assert_eq!(raised.breakdown.cadence, 1.0);
        assert!(raised.has_secondary_dominant);

        // E7 never approaches Em as an applied dominant
        assert!(!progressions.iter().any(|p| {
            p.symbols.windows(2).any(|w| w[0] == "E7" && w[1] == "Em")
        }));
    }

    #[test]
    fn neapolitan_precedes_dominant() {
        let (candidate, chords, features) = setup(0, KeyMode::Major, &[0, 2, 4, 5, 7, 9, 11]);
        let progressions = generate_progressions(&candidate, &chords, &features, 1.0, &ProgressionParams {
            max_results: 1000,
            ..ProgressionParams::default()
        });
        let neapolitan = progressions
            .iter()
            .find(|p| p.template == "authentic" && matches!(p.transformation, Some(Transformation::Neapolitan { .. })))
            .unwrap();
        assert_eq!(neapolitan.symbols, vec!["C", "Db", "G", "C"]);
        assert!(neapolitan.has_borrowed_chord);
        assert!(!neapolitan.has_secondary_dominant);
    }

    #[test]
    fn symbol_sequences_are_unique() {
        let (candidate, chords, features) = setup(9, KeyMode::Minor, &[9, 0, 2, 4, 7]);
        let progressions = generate_progressions(&candidate, &chords, &features, 0.5, &ProgressionParams {
            max_results: 1000,
            ..ProgressionParams::default()
        });
        let mut symbols: Vec<&Vec<String>> = progressions.iter().map(|p| &p.symbols).collect();
        let before = symbols.len();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), before);
    }

    #[test]
    fn empty_catalog_yields_nothing() {
        let features = PitchClassFeatures::empty();
        let candidate = score_candidate(0, KeyMode::Major, &features, &KeyWeights::default());
        let chords = generate_chord_suggestions(&candidate, &features, &ChordParams::default());
        assert!(generate_progressions(&candidate, &chords, &features, 0.5, &ProgressionParams::default()).is_empty());
    }
}
