use note_analysis::NoteEvent;

use crate::chords::{generate_chord_suggestions, ChordParams, ChordSuggestionResult};
use crate::features::{extract_features, FeatureParams};
use crate::key::{analyze_harmony, HarmonyAnalysis, KeyWeights};
use crate::progressions::{generate_progressions, ProgressionParams};
use crate::types::{KeyCandidate, PitchClassFeatures, ProgressionSuggestion};

/// Trait for harmony analysis backends.
///
/// `HeuristicAnalyzer` is the rule-based default; a learned backend can
/// slot in behind the same calls.
pub trait HarmonyAnalyzer: Send + Sync {
    fn extract_features(&self, notes: &[NoteEvent], params: &FeatureParams) -> PitchClassFeatures;

    fn analyze_key(&self, features: &PitchClassFeatures, weights: &KeyWeights) -> HarmonyAnalysis;

    fn suggest_chords(
        &self,
        candidate: &KeyCandidate,
        features: &PitchClassFeatures,
        params: &ChordParams,
    ) -> ChordSuggestionResult;

    fn suggest_progressions(
        &self,
        candidate: &KeyCandidate,
        chords: &ChordSuggestionResult,
        features: &PitchClassFeatures,
        weirdness: f64,
        params: &ProgressionParams,
    ) -> Vec<ProgressionSuggestion>;
}

/// Scale-membership key scoring, tertian chord generation and
/// skeleton-based progressions.
pub struct HeuristicAnalyzer;

impl HarmonyAnalyzer for HeuristicAnalyzer {
    fn extract_features(&self, notes: &[NoteEvent], params: &FeatureParams) -> PitchClassFeatures {
        extract_features(notes, params)
    }

    fn analyze_key(&self, features: &PitchClassFeatures, weights: &KeyWeights) -> HarmonyAnalysis {
        analyze_harmony(features, weights)
    }

    fn suggest_chords(
        &self,
        candidate: &KeyCandidate,
        features: &PitchClassFeatures,
        params: &ChordParams,
    ) -> ChordSuggestionResult {
        generate_chord_suggestions(candidate, features, params)
    }

    fn suggest_progressions(
        &self,
        candidate: &KeyCandidate,
        chords: &ChordSuggestionResult,
        features: &PitchClassFeatures,
        weirdness: f64,
        params: &ProgressionParams,
    ) -> Vec<ProgressionSuggestion> {
        generate_progressions(candidate, chords, features, weirdness, params)
    }
}
