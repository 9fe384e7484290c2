//! Cancellation around the external audio-to-notes transcriber.
//!
//! Only one transcription is live at a time: starting a new request cancels
//! the previous one, and a cancelled request never hands notes to the
//! pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use note_analysis::{AudioBuffer, NoteEvent};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Superseded or aborted by the caller; not a failure to report.
    #[error("transcription cancelled")]
    Cancelled,

    #[error("transcription failed: {0}")]
    Failed(String),
}

impl TranscriptionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TranscriptionError::Cancelled)
    }
}

/// An audio-to-notes model.
///
/// Implementations should check `cancel` at convenient points; the
/// coordinator also drops the future as soon as the token fires.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        cancel: CancellationToken,
    ) -> Result<Vec<NoteEvent>, TranscriptionError>;
}

/// Runs one transcription at a time, cancelling the in-flight request when
/// a new one starts.
pub struct TranscriptionCoordinator {
    transcriber: Arc<dyn Transcriber>,
    /// Request number and token of the live request
    current: Mutex<Option<(u64, CancellationToken)>>,
    next_request: AtomicU64,
}

impl TranscriptionCoordinator {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            current: Mutex::new(None),
            next_request: AtomicU64::new(0),
        }
    }

    /// Transcribe `audio`, superseding any request still running.
    pub async fn transcribe(&self, audio: &AudioBuffer) -> Result<Vec<NoteEvent>, TranscriptionError> {
        let request = self.next_request.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        {
            let mut current = self.current.lock().await;
            if let Some((previous_request, previous)) = current.replace((request, token.clone())) {
                debug!(request, superseded = previous_request, "cancelling in-flight transcription");
                previous.cancel();
            }
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TranscriptionError::Cancelled),
            result = self.transcriber.transcribe(audio, token.clone()) => result,
        };

        // A result that races with cancellation is still discarded.
        let result = if token.is_cancelled() {
            Err(TranscriptionError::Cancelled)
        } else {
            result
        };

        {
            let mut current = self.current.lock().await;
            if current.as_ref().is_some_and(|(live, _)| *live == request) {
                *current = None;
            }
        }

        match &result {
            Ok(notes) => info!(notes = notes.len(), "transcription complete"),
            Err(e) if e.is_cancelled() => debug!("transcription cancelled"),
            Err(e) => info!(error = %e, "transcription failed"),
        }
        result
    }

    /// Cancel the in-flight request, if any.
    pub async fn cancel(&self) {
        if let Some((_, token)) = self.current.lock().await.take() {
            token.cancel();
        }
    }

    pub async fn is_busy(&self) -> bool {
        self.current.lock().await.is_some()
    }
}
