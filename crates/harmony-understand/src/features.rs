use note_analysis::NoteEvent;
use serde::{Deserialize, Serialize};

use crate::types::PitchClassFeatures;

/// Velocity floor so quiet notes still count when velocity weighting is on.
const MIN_VELOCITY_WEIGHT: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Scale each note's duration weight by its velocity
    pub velocity_weighting: bool,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            velocity_weighting: true,
        }
    }
}

/// Reduce a note sequence to a normalized pitch-class distribution.
///
/// Each note adds `duration` (times velocity, when enabled) to the bin for
/// `pitch % 12`. If every note ends up with zero weight the vector falls back
/// to plain note counts, so nonempty input always sums to 1.
pub fn extract_features(notes: &[NoteEvent], params: &FeatureParams) -> PitchClassFeatures {
    if notes.is_empty() {
        return PitchClassFeatures::empty();
    }

    let mut weights = [0.0_f64; 12];
    for note in notes {
        weights[note.pitch_class() as usize] += note_weight(note, params);
    }

    let mut total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        weights = [0.0; 12];
        for note in notes {
            weights[note.pitch_class() as usize] += 1.0;
        }
        total = notes.len() as f64;
    }
    for w in &mut weights {
        *w /= total;
    }

    PitchClassFeatures {
        top_pitch_classes: rank_pitch_classes(&weights),
        weights,
        last_note_pc: last_note(notes).map(NoteEvent::pitch_class),
        bass_pc: notes.iter().map(|n| n.pitch).min().map(|p| p % 12),
        note_count: notes.len(),
        total_duration: notes.iter().map(NoteEvent::duration).sum(),
    }
}

fn note_weight(note: &NoteEvent, params: &FeatureParams) -> f64 {
    let duration = note.duration();
    if params.velocity_weighting {
        duration * note.velocity.max(MIN_VELOCITY_WEIGHT)
    } else {
        duration
    }
}

/// Nonzero pitch classes, heaviest first, lower index on ties.
fn rank_pitch_classes(weights: &[f64; 12]) -> Vec<u8> {
    let mut ranked: Vec<u8> = (0..12u8).filter(|&pc| weights[pc as usize] > 0.0).collect();
    ranked.sort_by(|&a, &b| {
        weights[b as usize]
            .partial_cmp(&weights[a as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    ranked
}

/// The note with the greatest start time; later entries win ties.
fn last_note(notes: &[NoteEvent]) -> Option<&NoteEvent> {
    notes.iter().fold(None, |best: Option<&NoteEvent>, note| match best {
        Some(b) if b.start > note.start => Some(b),
        _ => Some(note),
    })
}
