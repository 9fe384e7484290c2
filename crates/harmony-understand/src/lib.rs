//! Harmonic analysis of short instrumental recordings.
//!
//! Turns cleaned note events into key candidates, a chord catalog for the
//! selected key, and ranked chord progressions. Every stage is a pure
//! function; [`HarmonyEngine`] runs them in order and returns an immutable
//! [`AnalysisSnapshot`].
//!
//! ```text
//! notes → consolidate → features → 24 key candidates → chords → progressions
//! ```

pub mod analyzer;
pub mod chord_templates;
pub mod chords;
pub mod config;
pub mod features;
pub mod key;
pub mod progressions;
pub mod snapshot;
pub mod transcription;
pub mod types;
pub mod voice_leading;

pub use analyzer::{HarmonyAnalyzer, HeuristicAnalyzer};
pub use chord_templates::{note_name, parse_note_name};
pub use chords::{generate_chord_suggestions, ChordIndex, ChordParams, ChordSuggestionResult};
pub use config::{ConfigError, ConfigSources, HarmonyConfig};
pub use features::{extract_features, FeatureParams};
pub use key::{analyze_harmony, HarmonyAnalysis, KeyWeights};
pub use progressions::{generate_progressions, ProgressionParams};
pub use snapshot::{AnalysisSnapshot, DiagnosticSink, LatestSnapshotSink};
pub use transcription::{Transcriber, TranscriptionCoordinator, TranscriptionError};
pub use types::{
    ChordQuality, ChordSource, ChordSuggestion, HarmonicFunction, KeyCandidate, KeyEvidence,
    KeyMode, ParallelMode, PitchClassFeatures, ProgressionScore, ProgressionSlot,
    ProgressionSuggestion, Transformation,
};

use std::sync::Arc;

use note_analysis::{
    consolidate, is_confirmed_attack, snap_notes_to_onsets, AudioBuffer, NoteEvent, OnsetDetector,
    OnsetEvent,
};
use tracing::info;

/// Current algorithm version, recorded in every snapshot.
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no key candidate with id {0:?}")]
    UnknownCandidate(String),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs the full pipeline with one configuration.
pub struct HarmonyEngine {
    analyzer: Arc<dyn HarmonyAnalyzer>,
    config: HarmonyConfig,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl HarmonyEngine {
    /// Create with the default heuristic analyzer.
    pub fn new(config: HarmonyConfig) -> Self {
        Self::with_analyzer(Arc::new(HeuristicAnalyzer), config)
    }

    /// Create with a custom analyzer.
    pub fn with_analyzer(analyzer: Arc<dyn HarmonyAnalyzer>, config: HarmonyConfig) -> Self {
        Self {
            analyzer,
            config,
            sink: None,
        }
    }

    /// Write every produced snapshot to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &HarmonyConfig {
        &self.config
    }

    /// Analyze a complete note set from the transcriber.
    pub fn analyze(&self, notes: &[NoteEvent]) -> AnalysisSnapshot {
        self.run(notes, Vec::new())
    }

    /// Align note starts to onsets detected in `audio`, then analyze.
    pub fn analyze_with_audio(&self, notes: &[NoteEvent], audio: &AudioBuffer) -> AnalysisSnapshot {
        let detector = OnsetDetector::new(self.config.onsets.clone());
        let onsets = detector.detect(&audio.samples, audio.sample_rate);
        info!(
            onsets = onsets.len(),
            duration = audio.duration_seconds(),
            "detected onsets"
        );
        let snapped = snap_notes_to_onsets(notes, &onsets, self.config.onsets.snap_distance);
        let confirmed = snapped
            .iter()
            .filter(|n| is_confirmed_attack(&onsets, n.start))
            .count();
        info!(notes = snapped.len(), confirmed, "note starts aligned to onsets");
        self.run(&snapped, onsets)
    }

    /// The same analysis with another key candidate feeding chords and progressions.
    pub fn select_key(&self, snapshot: &AnalysisSnapshot, id: &str) -> Result<AnalysisSnapshot> {
        let harmony = snapshot
            .harmony
            .select(id)
            .ok_or_else(|| Error::UnknownCandidate(id.to_string()))?;
        info!(key = id, score = harmony.selected().score, "key selected");
        Ok(self.finish(
            snapshot.consolidated.clone(),
            snapshot.onsets.clone(),
            snapshot.features.clone(),
            harmony,
            snapshot.weirdness,
        ))
    }

    /// The same analysis with progressions re-ranked for `weirdness` (clamped to 0–1).
    pub fn with_weirdness(&self, snapshot: &AnalysisSnapshot, weirdness: f64) -> AnalysisSnapshot {
        let weirdness = weirdness.clamp(0.0, 1.0);
        let progressions = self.analyzer.suggest_progressions(
            snapshot.harmony.selected(),
            &snapshot.chords,
            &snapshot.features,
            weirdness,
            &self.config.progressions,
        );
        let next = AnalysisSnapshot {
            progressions,
            weirdness,
            ..snapshot.clone()
        };
        self.publish(&next);
        next
    }

    fn run(&self, notes: &[NoteEvent], onsets: Vec<OnsetEvent>) -> AnalysisSnapshot {
        let consolidated = consolidate(notes, &self.config.consolidation);
        info!(
            input = notes.len(),
            consolidated = consolidated.len(),
            "notes consolidated"
        );

        let features = self
            .analyzer
            .extract_features(&consolidated, &self.config.features);
        let harmony = self.analyzer.analyze_key(&features, &self.config.key);
        info!(
            key = harmony.selected_id(),
            score = harmony.selected().score,
            "key candidates scored"
        );

        let weirdness = self.config.progressions.weirdness.clamp(0.0, 1.0);
        self.finish(consolidated, onsets, features, harmony, weirdness)
    }

    fn finish(
        &self,
        consolidated: Vec<NoteEvent>,
        onsets: Vec<OnsetEvent>,
        features: PitchClassFeatures,
        harmony: HarmonyAnalysis,
        weirdness: f64,
    ) -> AnalysisSnapshot {
        let candidate = harmony.selected();
        let chords = self
            .analyzer
            .suggest_chords(candidate, &features, &self.config.chords);
        let progressions = self.analyzer.suggest_progressions(
            candidate,
            &chords,
            &features,
            weirdness,
            &self.config.progressions,
        );
        info!(
            key = %candidate.id,
            diatonic = chords.diatonic().len(),
            secondary = chords.secondary().len(),
            borrowed = chords.borrowed().len(),
            progressions = progressions.len(),
            "harmony suggestions generated"
        );

        let snapshot = AnalysisSnapshot {
            version: CURRENT_VERSION,
            consolidated,
            onsets,
            features,
            harmony,
            chords,
            progressions,
            weirdness,
        };
        self.publish(&snapshot);
        snapshot
    }

    fn publish(&self, snapshot: &AnalysisSnapshot) {
        if let Some(sink) = &self.sink {
            sink.record(snapshot);
        }
    }
}
