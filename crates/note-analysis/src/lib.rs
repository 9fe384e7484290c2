//! Cleanup of transcribed note events and signal-level onset detection.
//!
//! The transcription model upstream hallucinates short blips, doubles
//! notes and over-reports polyphony. [`consolidate`] turns that output into
//! a small, musically coherent sequence; [`OnsetDetector`] finds attacks in
//! the raw audio so note starts can be aligned to them.

pub mod consolidate;
pub mod note;
pub mod onset;

pub use consolidate::{
    absorb_wobbles, consolidate, limit_polyphony, max_polyphony, merge_consecutive, smart_merge,
    split_phrases, ConsolidationParams,
};
pub use note::{AudioBuffer, NoteEvent, NoteStats, OnsetEvent};
pub use onset::{
    detect_onsets, find_nearest_onset, has_strong_onset_near, is_confirmed_attack, onset_density,
    snap_notes_to_onsets, OnsetDetector, OnsetParams,
};

/// Errors from constructing note-analysis inputs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("note must end after it starts (start {start}, end {end})")]
    InvalidTiming { start: f64, end: f64 },

    #[error("velocity {0} outside 0.0..=1.0")]
    InvalidVelocity(f64),

    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
