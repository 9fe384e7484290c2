use std::sync::Mutex;

use note_analysis::{NoteEvent, NoteStats, OnsetEvent};
use serde::Serialize;

use crate::chords::ChordSuggestionResult;
use crate::key::HarmonyAnalysis;
use crate::types::{KeyCandidate, PitchClassFeatures, ProgressionSuggestion};
use crate::Result;

/// Everything one analysis run produced.
///
/// Snapshots are never edited; re-selecting a key or changing weirdness
/// yields a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    /// Algorithm version that produced the snapshot
    pub version: u32,
    pub consolidated: Vec<NoteEvent>,
    /// Empty when no audio was supplied
    pub onsets: Vec<OnsetEvent>,
    pub features: PitchClassFeatures,
    pub harmony: HarmonyAnalysis,
    pub chords: ChordSuggestionResult,
    pub progressions: Vec<ProgressionSuggestion>,
    pub weirdness: f64,
}

impl AnalysisSnapshot {
    pub fn selected_key(&self) -> &KeyCandidate {
        self.harmony.selected()
    }

    /// Nested-record JSON export for debugging.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One-line-per-item overview for terminals.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let stats = NoteStats::from_notes(&self.consolidated);
        out.push_str(&format!(
            "notes: {}  range: {}-{}  coverage: {:.2}  onsets: {}\n",
            stats.note_count,
            stats.pitch_min,
            stats.pitch_max,
            stats.coverage,
            self.onsets.len()
        ));
        out.push_str("keys:\n");
        for candidate in self.harmony.ranked_top() {
            let marker = if candidate.id == self.harmony.selected_id() { "*" } else { " " };
            out.push_str(&format!("  {marker} {:<10} {:.3}\n", candidate.id, candidate.score));
        }
        out.push_str("chords:\n");
        for chord in self.chords.ranked() {
            out.push_str(&format!(
                "    {:<8} {:<10} support {:.2}  color {:.2}\n",
                chord.symbol, chord.roman, chord.support_score, chord.color_score
            ));
        }
        out.push_str(&format!("progressions (weirdness {:.2}):\n", self.weirdness));
        for progression in &self.progressions {
            out.push_str(&format!(
                "    {:.3}  {}  ({})\n",
                progression.score,
                progression.symbols.join(" "),
                progression.numerals.join(" ")
            ));
        }
        out
    }
}

/// Receives every snapshot the engine produces.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, snapshot: &AnalysisSnapshot);
}

/// Keeps the most recent snapshot as JSON for manual inspection.
#[derive(Debug, Default)]
pub struct LatestSnapshotSink {
    latest: Mutex<Option<String>>,
}

impl LatestSnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_json(&self) -> Option<String> {
        self.latest.lock().ok().and_then(|guard| guard.clone())
    }
}

impl DiagnosticSink for LatestSnapshotSink {
    fn record(&self, snapshot: &AnalysisSnapshot) {
        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode analysis snapshot");
                return;
            }
        };
        if let Ok(mut guard) = self.latest.lock() {
            *guard = Some(json);
        }
    }
}
