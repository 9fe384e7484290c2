use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chord_templates::note_name;
use crate::types::{key_id, uses_flats, KeyCandidate, KeyEvidence, KeyMode, PitchClassFeatures};

/// Fixed weights of the key-fit score terms.
///
/// `score = in_scale·mass_in + tonic_strength·strength + tonic_triad·triad
///        + cadence·[last == tonic] + bass·[bass == tonic] − out_of_scale·mass_out`,
/// clamped to 0–1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyWeights {
    pub in_scale: f64,
    pub tonic_strength: f64,
    pub tonic_triad: f64,
    pub cadence: f64,
    pub bass: f64,
    pub out_of_scale: f64,
    /// How many candidates the ranked view exposes
    pub top_n: usize,
}

impl Default for KeyWeights {
    fn default() -> Self {
        Self {
            in_scale: 0.55,
            tonic_strength: 0.1,
            tonic_triad: 0.1,
            cadence: 0.1,
            bass: 0.1,
            out_of_scale: 0.25,
            top_n: 8,
        }
    }
}

/// Scored key hypotheses for one feature vector, plus the active selection.
///
/// Always holds all 24 candidates in rank order. Selecting another candidate
/// produces a new value and leaves every score untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonyAnalysis {
    candidates: Vec<KeyCandidate>,
    top_n: usize,
    selected_id: String,
    #[serde(skip)]
    selected: usize,
}

impl HarmonyAnalysis {
    /// All 24 candidates, best first.
    pub fn candidates(&self) -> &[KeyCandidate] {
        &self.candidates
    }

    /// The top `top_n` candidates.
    pub fn ranked_top(&self) -> &[KeyCandidate] {
        &self.candidates[..self.top_n.min(self.candidates.len())]
    }

    pub fn selected(&self) -> &KeyCandidate {
        &self.candidates[self.selected]
    }

    pub fn selected_id(&self) -> &str {
        &self.selected_id
    }

    pub fn candidate(&self, id: &str) -> Option<&KeyCandidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Same scores with another candidate active; `None` for an unknown id.
    pub fn select(&self, id: &str) -> Option<Self> {
        let idx = self.candidates.iter().position(|c| c.id == id)?;
        Some(Self {
            candidates: self.candidates.clone(),
            top_n: self.top_n,
            selected_id: self.candidates[idx].id.clone(),
            selected: idx,
        })
    }
}

/// Score all 24 major/minor keys and select the best.
pub fn analyze_harmony(features: &PitchClassFeatures, weights: &KeyWeights) -> HarmonyAnalysis {
    let mut candidates: Vec<KeyCandidate> = (0..12u8)
        .flat_map(|tonic| [KeyMode::Major, KeyMode::Minor].map(|mode| (tonic, mode)))
        .map(|(tonic, mode)| score_candidate(tonic, mode, features, weights))
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.tonic.cmp(&b.tonic))
            .then(mode_rank(a.mode).cmp(&mode_rank(b.mode)))
    });

    let selected_id = candidates[0].id.clone();
    debug!(
        key = %selected_id,
        score = candidates[0].score,
        "key candidates ranked"
    );

    HarmonyAnalysis {
        candidates,
        top_n: weights.top_n,
        selected_id,
        selected: 0,
    }
}

fn mode_rank(mode: KeyMode) -> u8 {
    match mode {
        KeyMode::Major => 0,
        KeyMode::Minor => 1,
    }
}

/// Fit one key hypothesis against a feature vector.
pub fn score_candidate(
    tonic: u8,
    mode: KeyMode,
    features: &PitchClassFeatures,
    weights: &KeyWeights,
) -> KeyCandidate {
    let tonic = tonic % 12;
    let scale: Vec<u8> = mode.intervals().iter().map(|&i| (tonic + i) % 12).collect();

    let mut in_scale = 0.0;
    let mut out_of_scale = 0.0;
    let mut outside = Vec::new();
    for pc in 0..12u8 {
        let w = features.weight(pc);
        if scale.contains(&pc) {
            in_scale += w;
        } else {
            out_of_scale += w;
            if w > 0.0 {
                outside.push(pc);
            }
        }
    }

    let max_weight = features.max_weight();
    let tonic_strength = if max_weight > 0.0 {
        features.weight(tonic) / max_weight
    } else {
        0.0
    };
    let tonic_triad: f64 = [scale[0], scale[2], scale[4]]
        .iter()
        .map(|&pc| features.weight(pc))
        .sum();
    let ends_on_tonic = features.last_note_pc == Some(tonic);
    let bass_on_tonic = features.bass_pc == Some(tonic);

    let raw = weights.in_scale * in_scale
        + weights.tonic_strength * tonic_strength
        + weights.tonic_triad * tonic_triad
        + if ends_on_tonic { weights.cadence } else { 0.0 }
        + if bass_on_tonic { weights.bass } else { 0.0 }
        - weights.out_of_scale * out_of_scale;
    let score = (raw.clamp(0.0, 1.0) * 1e6).round() / 1e6;

    KeyCandidate {
        id: key_id(tonic, mode),
        tonic,
        tonic_name: note_name(tonic, uses_flats(tonic, mode)).to_string(),
        mode,
        scale,
        score,
        out_of_scale: outside,
        evidence: KeyEvidence {
            in_scale,
            out_of_scale,
            tonic_strength,
            tonic_triad,
            ends_on_tonic,
            bass_on_tonic,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features_from(weights: [f64; 12], last: Option<u8>, bass: Option<u8>) -> PitchClassFeatures {
        let total: f64 = weights.iter().sum();
        let mut normalized = weights;
        if total > 0.0 {
            for w in &mut normalized {
                *w /= total;
            }
        }
        PitchClassFeatures {
            weights: normalized,
            top_pitch_classes: Vec::new(),
            last_note_pc: last,
            bass_pc: bass,
            note_count: 0,
            total_duration: 0.0,
        }
    }

    #[test]
    fn scores_all_24_candidates() {
        let features = features_from([1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0], Some(0), Some(0));
        let analysis = analyze_harmony(&features, &KeyWeights::default());
        assert_eq!(analysis.candidates().len(), 24);
        assert_eq!(analysis.ranked_top().len(), 8);
        assert_eq!(analysis.selected().id, "C-major");
        assert!(analysis.candidates().iter().all(|c| (0.0..=1.0).contains(&c.score)));
    }

    #[test]
    fn silent_baseline_orders_by_tonic_then_mode() {
        let analysis = analyze_harmony(&PitchClassFeatures::empty(), &KeyWeights::default());
        let ids: Vec<&str> = analysis.candidates().iter().take(4).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C-major", "C-minor", "C#-major", "C#-minor"]);
        assert!(analysis.candidates().iter().all(|c| c.score == 0.0));
    }

    #[test]
    fn a_minor_pentatonic_prefers_a_minor() {
        // A C D E G, A heaviest
        let mut w = [0.0; 12];
        w[9] = 3.0;
        w[0] = 1.0;
        w[2] = 1.0;
        w[4] = 2.0;
        w[7] = 1.0;
        let features = features_from(w, Some(9), Some(9));
        let analysis = analyze_harmony(&features, &KeyWeights::default());
        assert_eq!(analysis.selected().id, "A-minor");
        let c_major = analysis.candidate("C-major").unwrap();
        assert!(analysis.selected().score > c_major.score);
        assert!(analysis.selected().out_of_scale.is_empty());
    }

    #[test]
    fn out_of_scale_pitch_classes_are_listed() {
        let mut w = [0.0; 12];
        w[0] = 1.0;
        w[1] = 0.5;
        let features = features_from(w, None, None);
        let c_major = score_candidate(0, KeyMode::Major, &features, &KeyWeights::default());
        assert_eq!(c_major.out_of_scale, vec![1]);
        assert!((c_major.evidence.out_of_scale - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn select_keeps_scores() {
        let analysis = analyze_harmony(&PitchClassFeatures::empty(), &KeyWeights::default());
        let reselected = analysis.select("F#-minor").unwrap();
        assert_eq!(reselected.selected().id, "F#-minor");
        assert_eq!(reselected.candidates(), analysis.candidates());
        assert!(analysis.select("H-major").is_none());
        assert_eq!(analysis.selected_id(), "C-major");
    }

    #[test]
    fn flat_keys_spell_with_flats() {
        let candidate = score_candidate(10, KeyMode::Major, &PitchClassFeatures::empty(), &KeyWeights::default());
        assert_eq!(candidate.id, "Bb-major");
        assert_eq!(candidate.name(), "Bb major");
        let minor = score_candidate(6, KeyMode::Minor, &PitchClassFeatures::empty(), &KeyWeights::default());
        assert_eq!(minor.id, "F#-minor");
    }
}
