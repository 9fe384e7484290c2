//! Signal-level attack detection, independent of the transcription model.
//!
//! Algorithm:
//! 1. Frame the signal (`frame_size`, `hop_size`) and compute RMS per frame
//! 2. Novelty: half-wave rectified log-energy difference between frames
//! 3. Peak-pick local maxima above `threshold` × local mean novelty
//! 4. Drop onsets closer than `min_interval` to a stronger neighbour
//!
//! Detected onsets are used to align note starts reported by the transcriber.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::{NoteEvent, OnsetEvent};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Default search radius when snapping note starts (seconds).
pub const DEFAULT_SNAP_DISTANCE: f64 = 0.05;

/// Default radius for strong-onset checks (seconds).
pub const DEFAULT_STRONG_ONSET_DISTANCE: f64 = 0.03;

/// Default strength an onset needs to count as strong.
pub const DEFAULT_STRONG_ONSET_STRENGTH: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetParams {
    /// Analysis window in samples. Default: 1024.
    pub frame_size: usize,
    /// Hop between frames in samples. Default: 256.
    pub hop_size: usize,
    /// Multiplicative threshold over the local mean novelty. Default: 1.5.
    pub threshold: f32,
    /// Frames on each side averaged for the adaptive threshold. Default: 8.
    pub average_window: usize,
    /// Frames on each side a peak must dominate. Default: 2.
    pub peak_window: usize,
    /// Minimum spacing between reported onsets (seconds). Default: 0.03.
    ///
    /// Not symmetric in time: a later onset inside the window is dropped
    /// unless it is stronger, in which case it replaces the earlier one.
    pub min_interval: f64,
    /// Buffers whose loudest frame is below this RMS are treated as silence. Default: 1e-4.
    pub silence_rms: f32,
    /// Search radius when snapping note starts (seconds). Default: 0.05.
    pub snap_distance: f64,
}

impl Default for OnsetParams {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 256,
            threshold: 1.5,
            average_window: 8,
            peak_window: 2,
            min_interval: 0.03,
            silence_rms: 1e-4,
            snap_distance: DEFAULT_SNAP_DISTANCE,
        }
    }
}

pub struct OnsetDetector {
    params: OnsetParams,
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new(OnsetParams::default())
    }
}

impl OnsetDetector {
    pub fn new(params: OnsetParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &OnsetParams {
        &self.params
    }

    /// Detect attack times in a mono buffer.
    ///
    /// Returns an empty list for buffers shorter than one frame and for
    /// near-silent buffers.
    pub fn detect(&self, samples: &[f32], sample_rate: u32) -> Vec<OnsetEvent> {
        let p = &self.params;
        if sample_rate == 0 || p.frame_size == 0 || p.hop_size == 0 || samples.len() < p.frame_size {
            return Vec::new();
        }

        let energies = frame_rms(samples, p.frame_size, p.hop_size);
        let loudest = energies.iter().copied().fold(0.0_f32, f32::max);
        if loudest < p.silence_rms {
            debug!(loudest, "onset detection skipped: near-silent buffer");
            return Vec::new();
        }

        let novelty = log_energy_flux(&energies, p.silence_rms);
        let peak = novelty.iter().copied().fold(0.0_f32, f32::max);
        if peak <= EPSILON {
            return Vec::new();
        }

        let candidates: Vec<OnsetEvent> = self
            .peak_pick(&novelty)
            .into_iter()
            .map(|frame| OnsetEvent {
                time: self.frame_time(frame, sample_rate),
                strength: (novelty[frame] / peak) as f64,
            })
            .collect();

        let onsets = enforce_min_interval(candidates, p.min_interval);
        debug!(
            frames = energies.len(),
            onsets = onsets.len(),
            "detected onsets"
        );
        onsets
    }

    /// Time of the newest hop in a frame: a rise first seen in frame `i`
    /// entered through its last `hop_size` samples.
    fn frame_time(&self, frame: usize, sample_rate: u32) -> f64 {
        let p = &self.params;
        let sample = if frame == 0 {
            0
        } else {
            frame * p.hop_size + p.frame_size.saturating_sub(p.hop_size)
        };
        sample as f64 / sample_rate as f64
    }

    /// Local maxima exceeding the adaptive threshold.
    fn peak_pick(&self, novelty: &[f32]) -> Vec<usize> {
        let p = &self.params;
        let len = novelty.len();
        let mut peaks = Vec::new();

        for i in 0..len {
            let value = novelty[i];
            if value <= EPSILON {
                continue;
            }

            let lo = i.saturating_sub(p.peak_window);
            let hi = (i + p.peak_window).min(len - 1);
            // Strictly greater than earlier neighbours so plateaus report their first frame
            let is_max = (lo..=hi).all(|j| {
                if j < i {
                    novelty[j] < value
                } else {
                    novelty[j] <= value
                }
            });
            if !is_max {
                continue;
            }

            let avg_lo = i.saturating_sub(p.average_window);
            let avg_hi = (i + p.average_window).min(len - 1);
            let (sum, count) = (avg_lo..=avg_hi)
                .filter(|&j| j != i)
                .fold((0.0_f32, 0usize), |(s, c), j| (s + novelty[j], c + 1));
            let local_mean = if count > 0 { sum / count as f32 } else { 0.0 };

            if value > local_mean * p.threshold {
                peaks.push(i);
            }
        }

        peaks
    }
}

/// Detect onsets with default parameters.
pub fn detect_onsets(samples: &[f32], sample_rate: u32) -> Vec<OnsetEvent> {
    OnsetDetector::default().detect(samples, sample_rate)
}

fn frame_rms(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    (0..num_frames)
        .map(|i| {
            let frame = &samples[i * hop_size..i * hop_size + frame_size];
            let sum_sq: f32 = frame.iter().map(|&x| x * x).sum();
            (sum_sq / frame_size as f32).sqrt()
        })
        .collect()
}

/// Rectified log-energy rise. Frame 0 rises from the silence floor, so a
/// buffer that starts with an attack reports it at time zero.
fn log_energy_flux(energies: &[f32], floor: f32) -> Vec<f32> {
    let floor = floor.max(EPSILON);
    let mut previous = floor.ln();
    energies
        .iter()
        .map(|&e| {
            let current = e.max(floor).ln();
            let rise = (current - previous).max(0.0);
            previous = current;
            rise
        })
        .collect()
}

/// Suppress onsets within `min_interval` of a stronger (or equal) earlier onset.
/// A stronger onset arriving inside the window replaces the weaker one.
fn enforce_min_interval(candidates: Vec<OnsetEvent>, min_interval: f64) -> Vec<OnsetEvent> {
    let mut kept: Vec<OnsetEvent> = Vec::with_capacity(candidates.len());
    for onset in candidates {
        match kept.last_mut() {
            Some(last) if onset.time - last.time < min_interval => {
                if onset.strength > last.strength {
                    *last = onset;
                }
            }
            _ => kept.push(onset),
        }
    }
    kept
}

/// Closest onset within `max_distance` of `time`, if any.
///
/// On equal distance the earlier entry in `onsets` wins.
pub fn find_nearest_onset(onsets: &[OnsetEvent], time: f64, max_distance: f64) -> Option<&OnsetEvent> {
    onsets
        .iter()
        .filter(|o| (o.time - time).abs() <= max_distance)
        .fold(None, |best: Option<&OnsetEvent>, o| match best {
            Some(b) if (b.time - time).abs() <= (o.time - time).abs() => Some(b),
            _ => Some(o),
        })
}

/// Move each note's start to the nearest onset within `max_distance`.
///
/// Notes with no qualifying onset are unchanged, as are notes whose
/// snapped start would land on or after their end.
pub fn snap_notes_to_onsets(notes: &[NoteEvent], onsets: &[OnsetEvent], max_distance: f64) -> Vec<NoteEvent> {
    notes
        .iter()
        .map(|note| match find_nearest_onset(onsets, note.start, max_distance) {
            Some(onset) if onset.time < note.end => NoteEvent {
                start: onset.time,
                ..note.clone()
            },
            _ => note.clone(),
        })
        .collect()
}

/// Onsets per second in `[start, end)`; 0.0 for an empty or inverted window.
pub fn onset_density(onsets: &[OnsetEvent], start: f64, end: f64) -> f64 {
    let length = end - start;
    if length <= 0.0 {
        return 0.0;
    }
    let count = onsets.iter().filter(|o| o.time >= start && o.time < end).count();
    count as f64 / length
}

/// True when any onset within `max_distance` of `time` has at least `min_strength`.
pub fn has_strong_onset_near(onsets: &[OnsetEvent], time: f64, max_distance: f64, min_strength: f64) -> bool {
    onsets
        .iter()
        .any(|o| (o.time - time).abs() <= max_distance && o.strength >= min_strength)
}

/// [`has_strong_onset_near`] with the default radius and strength.
pub fn is_confirmed_attack(onsets: &[OnsetEvent], time: f64) -> bool {
    has_strong_onset_near(
        onsets,
        time,
        DEFAULT_STRONG_ONSET_DISTANCE,
        DEFAULT_STRONG_ONSET_STRENGTH,
    )
}
