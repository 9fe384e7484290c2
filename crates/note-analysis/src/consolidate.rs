use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::note::{concat_bends, NoteEvent};

/// Parameters controlling note consolidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationParams {
    /// Maximum notes allowed to sound at once. Default: 4.
    pub max_simultaneous: usize,
    /// Gap (seconds) above which a new phrase starts, and below which
    /// same-pitch neighbours merge. Default: 0.15.
    pub merge_gap: f64,
    /// A wobble's middle note must be shorter than this (seconds). Default: 0.2.
    pub wobble_max_duration: f64,
    /// Largest pitch distance (semitones) of a wobble's middle note. Default: 1.
    pub wobble_max_interval: u8,
    /// A middle note bending further than this (semitones) is a real note. Default: 0.3.
    pub wobble_max_bend: f64,
}

impl Default for ConsolidationParams {
    fn default() -> Self {
        Self {
            max_simultaneous: 4,
            merge_gap: 0.15,
            wobble_max_duration: 0.2,
            wobble_max_interval: 1,
            wobble_max_bend: 0.3,
        }
    }
}

/// Stable sort by start time.
fn sort_by_start(notes: &mut [NoteEvent]) {
    notes.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));
}

/// Full cleanup: polyphony limiting followed by phrase-wise smart merge.
///
/// The result is a fixed point: consolidating it again returns it unchanged.
pub fn consolidate(notes: &[NoteEvent], params: &ConsolidationParams) -> Vec<NoteEvent> {
    let limited = limit_polyphony(notes, params.max_simultaneous);
    let merged = smart_merge(&limited, params);
    debug!(
        input = notes.len(),
        after_polyphony = limited.len(),
        output = merged.len(),
        "consolidated notes"
    );
    merged
}

/// Keep at most `max_simultaneous` overlapping notes, preferring louder ones.
///
/// Notes are processed in start order. When an incoming note would exceed
/// the limit it replaces the quietest currently-overlapping kept note if it
/// is strictly louder; otherwise it is dropped. Among equally quiet kept
/// notes the most recently admitted one is evicted, so earlier notes win ties.
pub fn limit_polyphony(notes: &[NoteEvent], max_simultaneous: usize) -> Vec<NoteEvent> {
    if max_simultaneous == 0 {
        return Vec::new();
    }

    let mut sorted = notes.to_vec();
    sort_by_start(&mut sorted);

    // Slots are `None` once evicted.
    let mut kept: Vec<Option<NoteEvent>> = Vec::with_capacity(sorted.len());
    let mut active: Vec<usize> = Vec::new();

    for note in sorted {
        active.retain(|&idx| kept[idx].as_ref().is_some_and(|k| k.end > note.start));

        if active.len() < max_simultaneous {
            active.push(kept.len());
            kept.push(Some(note));
            continue;
        }

        // Quietest active note; on equal velocity the later-admitted one.
        let quietest = active
            .iter()
            .enumerate()
            .filter_map(|(pos, &idx)| kept[idx].as_ref().map(|k| (pos, idx, k.velocity)))
            .fold(None::<(usize, usize, f64)>, |best, cur| match best {
                Some(b) if b.2 < cur.2 => Some(b),
                _ => Some(cur),
            });

        if let Some((pos, idx, velocity)) = quietest {
            if note.velocity > velocity {
                kept[idx] = None;
                active.remove(pos);
                active.push(kept.len());
                kept.push(Some(note));
            }
        }
    }

    kept.into_iter().flatten().collect()
}

/// Largest number of notes sounding at any instant.
pub fn max_polyphony(notes: &[NoteEvent]) -> usize {
    let mut events: Vec<(f64, i32)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        events.push((note.start, 1));
        events.push((note.end, -1));
    }
    // At equal times, releases before onsets
    events.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });

    let mut current = 0i32;
    let mut max = 0i32;
    for &(_, delta) in &events {
        current += delta;
        max = max.max(current);
    }
    max.max(0) as usize
}

/// Split into phrases at rests longer than `merge_gap`.
///
/// The gap is measured from the latest release seen so far in the phrase,
/// so a held note bridges shorter notes that end before it.
pub fn split_phrases(notes: &[NoteEvent], merge_gap: f64) -> Vec<Vec<NoteEvent>> {
    let mut sorted = notes.to_vec();
    sort_by_start(&mut sorted);

    let mut phrases: Vec<Vec<NoteEvent>> = Vec::new();
    let mut phrase_end = f64::NEG_INFINITY;

    for note in sorted {
        match phrases.last_mut() {
            Some(phrase) if note.start - phrase_end <= merge_gap => {
                phrase_end = phrase_end.max(note.end);
                phrase.push(note);
            }
            _ => {
                phrase_end = note.end;
                phrases.push(vec![note]);
            }
        }
    }

    phrases
}

/// Phrase-wise cleanup: wobble absorption, then same-pitch merging.
///
/// Each phrase is cleaned independently and repeatedly until nothing more
/// collapses, so rests between phrases survive untouched.
pub fn smart_merge(notes: &[NoteEvent], params: &ConsolidationParams) -> Vec<NoteEvent> {
    let mut out = Vec::with_capacity(notes.len());

    for phrase in split_phrases(notes, params.merge_gap) {
        let mut current = phrase;
        loop {
            let next = merge_consecutive(&absorb_wobbles(&current, params), params.merge_gap);
            let settled = next.len() == current.len();
            current = next;
            if settled {
                break;
            }
        }
        out.extend(current);
    }

    sort_by_start(&mut out);
    out
}

fn is_wobble(a: &NoteEvent, b: &NoteEvent, a2: &NoteEvent, params: &ConsolidationParams) -> bool {
    a.pitch == a2.pitch
        && a.pitch.abs_diff(b.pitch) <= params.wobble_max_interval
        && b.duration() < params.wobble_max_duration
        && b.max_bend() <= params.wobble_max_bend
}

/// Collapse A–B–A′ triples where B is a brief neighbour-tone blip.
///
/// The collapsed note spans A's start to A′'s end at A's pitch. Its
/// velocity averages A and A′ only; B's bends are kept in time order.
pub fn absorb_wobbles(phrase: &[NoteEvent], params: &ConsolidationParams) -> Vec<NoteEvent> {
    let mut out = Vec::with_capacity(phrase.len());
    let mut i = 0;

    while i < phrase.len() {
        if i + 2 < phrase.len() {
            let (a, b, a2) = (&phrase[i], &phrase[i + 1], &phrase[i + 2]);
            if is_wobble(a, b, a2, params) {
                out.push(NoteEvent {
                    start: a.start,
                    end: a2.end.max(a.end),
                    pitch: a.pitch,
                    velocity: (a.velocity + a2.velocity) / 2.0,
                    pitch_bends: concat_bends([a, b, a2]),
                });
                i += 3;
                continue;
            }
        }
        out.push(phrase[i].clone());
        i += 1;
    }

    out
}

/// Merge adjacent notes of identical pitch separated by at most `merge_gap`.
pub fn merge_consecutive(phrase: &[NoteEvent], merge_gap: f64) -> Vec<NoteEvent> {
    let mut out: Vec<NoteEvent> = Vec::with_capacity(phrase.len());

    for note in phrase {
        if let Some(last) = out.last_mut() {
            if last.pitch == note.pitch && note.start - last.end <= merge_gap {
                last.pitch_bends = concat_bends([&*last, note]);
                last.start = last.start.min(note.start);
                last.end = last.end.max(note.end);
                last.velocity = (last.velocity + note.velocity) / 2.0;
                continue;
            }
        }
        out.push(note.clone());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn note(start: f64, end: f64, pitch: u8, velocity: f64) -> NoteEvent {
        NoteEvent {
            start,
            end,
            pitch,
            velocity,
            pitch_bends: None,
        }
    }

    #[test]
    fn polyphony_keeps_louder_incoming_note() {
        let notes = vec![
            note(0.0, 1.0, 60, 0.9),
            note(0.0, 1.0, 64, 0.2),
            note(0.1, 1.0, 67, 0.5),
        ];
        let kept = limit_polyphony(&notes, 2);
        let pitches: Vec<u8> = kept.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 67]);
    }

    #[test]
    fn polyphony_drops_quieter_incoming_note() {
        let notes = vec![
            note(0.0, 1.0, 60, 0.9),
            note(0.0, 1.0, 64, 0.6),
            note(0.1, 1.0, 67, 0.5),
        ];
        let kept = limit_polyphony(&notes, 2);
        let pitches: Vec<u8> = kept.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 64]);
    }

    #[test]
    fn polyphony_equal_velocity_keeps_earlier() {
        let notes = vec![
            note(0.0, 1.0, 60, 0.5),
            note(0.0, 1.0, 64, 0.5),
            note(0.2, 1.0, 67, 0.5),
        ];
        let kept = limit_polyphony(&notes, 2);
        let pitches: Vec<u8> = kept.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 64]);
    }

    #[test]
    fn polyphony_limit_holds_on_dense_cluster() {
        let mut notes = Vec::new();
        for i in 0..40u8 {
            let start = (i as f64) * 0.05;
            let velocity = ((i as u32 * 37) % 100) as f64 / 100.0;
            notes.push(note(start, start + 0.4 + (i % 5) as f64 * 0.1, 48 + i % 24, velocity));
        }
        for max in 1..=4 {
            let kept = limit_polyphony(&notes, max);
            assert!(max_polyphony(&kept) <= max, "limit {} violated", max);
        }
    }

    #[test]
    fn zero_limit_drops_everything() {
        assert!(limit_polyphony(&[note(0.0, 1.0, 60, 0.5)], 0).is_empty());
    }

    #[test]
    fn wobble_collapses_into_one_note() {
        let params = ConsolidationParams::default();
        let notes = vec![
            note(0.0, 0.5, 60, 0.8).with_pitch_bends(vec![0.0]),
            note(0.5, 0.6, 61, 0.1).with_pitch_bends(vec![0.1]),
            note(0.6, 1.0, 60, 0.4).with_pitch_bends(vec![0.05]),
        ];
        let merged = smart_merge(&notes, &params);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 1.0);
        assert_eq!(merged[0].pitch, 60);
        assert!((merged[0].velocity - 0.6).abs() < 1e-12);
        assert_eq!(merged[0].pitch_bends, Some(vec![0.0, 0.1, 0.05]));
    }

    #[test]
    fn bent_middle_note_is_not_a_wobble() {
        let params = ConsolidationParams::default();
        let notes = vec![
            note(0.0, 0.5, 60, 0.8),
            note(0.5, 0.6, 61, 0.5).with_pitch_bends(vec![0.0, 0.6]),
            note(0.6, 1.0, 60, 0.8),
        ];
        let merged = smart_merge(&notes, &params);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn long_middle_note_is_not_a_wobble() {
        let params = ConsolidationParams::default();
        let notes = vec![
            note(0.0, 0.5, 60, 0.8),
            note(0.5, 0.8, 61, 0.5),
            note(0.8, 1.2, 60, 0.8),
        ];
        assert_eq!(smart_merge(&notes, &params).len(), 3);
    }

    #[test]
    fn same_pitch_neighbours_merge() {
        let params = ConsolidationParams::default();
        let notes = vec![note(0.0, 0.4, 62, 0.5), note(0.5, 0.9, 62, 0.25)];
        let merged = smart_merge(&notes, &params);
        assert_eq!(merged, vec![note(0.0, 0.9, 62, 0.375)]);
    }

    #[test]
    fn rests_between_phrases_are_preserved() {
        let params = ConsolidationParams::default();
        let notes = vec![note(0.0, 0.4, 62, 0.6), note(1.0, 1.4, 62, 0.6)];
        let merged = smart_merge(&notes, &params);
        assert_eq!(merged.len(), 2);
        assert_eq!(split_phrases(&notes, params.merge_gap).len(), 2);
    }

    #[test]
    fn chained_wobbles_reach_fixed_point() {
        let params = ConsolidationParams::default();
        let notes = vec![
            note(0.0, 0.3, 60, 0.8),
            note(0.3, 0.4, 61, 0.3),
            note(0.4, 0.7, 60, 0.8),
            note(0.7, 0.8, 59, 0.3),
            note(0.8, 1.1, 60, 0.8),
        ];
        let once = consolidate(&notes, &params);
        assert_eq!(once.len(), 1);
        assert_eq!(consolidate(&once, &params), once);
    }

    #[test]
    fn consolidation_is_idempotent() {
        let params = ConsolidationParams::default();
        let mut notes = Vec::new();
        for i in 0..30u8 {
            let start = i as f64 * 0.12;
            let pitch = [60, 61, 60, 64, 64, 67, 66, 67][(i % 8) as usize];
            notes.push(note(start, start + 0.09 + (i % 3) as f64 * 0.05, pitch, 0.3 + (i % 7) as f64 * 0.1));
            if i % 4 == 0 {
                notes.push(note(start, start + 0.5, pitch - 12, 0.5));
            }
        }
        let once = consolidate(&notes, &params);
        let twice = consolidate(&once, &params);
        assert_eq!(once, twice);
    }
}
