//! Reading note files and WAV audio.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use note_analysis::{AudioBuffer, NoteEvent};
use serde::Deserialize;

/// Accepts either a bare array of notes or `{ "notes": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NoteFile {
    Bare(Vec<NoteEvent>),
    Wrapped { notes: Vec<NoteEvent> },
}

pub fn read_notes(path: &Path) -> Result<Vec<NoteEvent>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading notes: {}", path.display()))?;
    parse_notes(&contents).with_context(|| format!("parsing notes: {}", path.display()))
}

pub fn parse_notes(contents: &str) -> Result<Vec<NoteEvent>> {
    let notes = match serde_json::from_str(contents)? {
        NoteFile::Bare(notes) => notes,
        NoteFile::Wrapped { notes } => notes,
    };
    for (i, note) in notes.iter().enumerate() {
        note.validate().with_context(|| format!("note {i}"))?;
    }
    Ok(notes)
}

pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let data = std::fs::read(path).with_context(|| format!("reading audio: {}", path.display()))?;
    decode_wav(&data).with_context(|| format!("decoding audio: {}", path.display()))
}

/// Decode WAV audio to a mono buffer, averaging channels.
pub fn decode_wav(data: &[u8]) -> Result<AudioBuffer> {
    let reader = hound::WavReader::new(Cursor::new(data)).context("failed to parse WAV header")?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read float samples")?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read int samples")?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    )?)
}
