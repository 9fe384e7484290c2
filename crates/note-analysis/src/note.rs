use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single transcribed note with absolute timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset time in seconds
    pub start: f64,
    /// Release time in seconds, always greater than `start`
    pub end: f64,
    /// Semitone number (MIDI numbering, 60 = middle C)
    pub pitch: u8,
    /// Normalized velocity 0.0–1.0
    pub velocity: f64,
    /// Pitch-bend samples in semitones, in time order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_bends: Option<Vec<f64>>,
}

impl NoteEvent {
    /// Build a note, rejecting non-positive durations and out-of-range velocity.
    pub fn new(start: f64, end: f64, pitch: u8, velocity: f64) -> Result<Self> {
        let note = Self {
            start,
            end,
            pitch,
            velocity,
            pitch_bends: None,
        };
        note.validate()?;
        Ok(note)
    }

    pub fn with_pitch_bends(mut self, bends: Vec<f64>) -> Self {
        self.pitch_bends = Some(bends);
        self
    }

    /// Check the invariants a transcriber must uphold.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.end <= self.start {
            return Err(Error::InvalidTiming {
                start: self.start,
                end: self.end,
            });
        }
        if !(0.0..=1.0).contains(&self.velocity) {
            return Err(Error::InvalidVelocity(self.velocity));
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn pitch_class(&self) -> u8 {
        self.pitch % 12
    }

    /// Largest absolute bend in semitones, 0.0 when no bends were captured.
    pub fn max_bend(&self) -> f64 {
        self.pitch_bends
            .as_ref()
            .map(|bends| bends.iter().fold(0.0_f64, |acc, b| acc.max(b.abs())))
            .unwrap_or(0.0)
    }

    /// Half-open interval overlap: a note ending exactly where another starts does not overlap.
    pub fn overlaps(&self, other: &NoteEvent) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Concatenate the bend sequences of several notes, already in time order.
///
/// Returns `None` when none of the notes carried bends.
pub(crate) fn concat_bends<'a>(notes: impl IntoIterator<Item = &'a NoteEvent>) -> Option<Vec<f64>> {
    let mut out: Option<Vec<f64>> = None;
    for note in notes {
        if let Some(bends) = &note.pitch_bends {
            out.get_or_insert_with(Vec::new).extend_from_slice(bends);
        }
    }
    out
}

/// A detected attack in the raw signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    /// Time in seconds
    pub time: f64,
    /// Relative strength 0.0–1.0 (1.0 = strongest onset in the buffer)
    pub strength: f64,
}

/// Mono audio handed to the onset detector and the transcription collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Downmix interleaved multichannel samples to mono by averaging.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels <= 1 {
            return Self::new(samples.to_vec(), sample_rate);
        }
        let mono = samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        Self::new(mono, sample_rate)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Summary statistics over a note sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteStats {
    pub note_count: usize,
    pub pitch_min: u8,
    pub pitch_max: u8,
    pub mean_pitch: f64,
    /// Fraction of the sequence's time span covered by notes (0.0–1.0)
    pub coverage: f64,
}

impl NoteStats {
    pub fn from_notes(notes: &[NoteEvent]) -> Self {
        if notes.is_empty() {
            return Self {
                note_count: 0,
                pitch_min: 0,
                pitch_max: 0,
                mean_pitch: 0.0,
                coverage: 0.0,
            };
        }

        let pitch_min = notes.iter().map(|n| n.pitch).min().unwrap_or(0);
        let pitch_max = notes.iter().map(|n| n.pitch).max().unwrap_or(0);
        let mean_pitch = notes.iter().map(|n| n.pitch as f64).sum::<f64>() / notes.len() as f64;

        let first_start = notes.iter().map(|n| n.start).fold(f64::INFINITY, f64::min);
        let last_end = notes.iter().map(|n| n.end).fold(f64::NEG_INFINITY, f64::max);
        let span = last_end - first_start;

        let sounding: f64 = notes.iter().map(NoteEvent::duration).sum();
        let coverage = if span > 0.0 {
            (sounding / span).min(1.0)
        } else {
            0.0
        };

        Self {
            note_count: notes.len(),
            pitch_min,
            pitch_max,
            mean_pitch,
            coverage,
        }
    }
}
