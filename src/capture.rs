//! Capture session management
//!
//! Owns the state machine gating when voice capture is active. The
//! transcription engine itself is an external capability reached through
//! [`TranscriptionControl`]; finalized transcripts arrive on a channel the
//! embedder wires up.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// Finalized text of one completed utterance
///
/// Immutable once produced; consumed exactly once by interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    /// Wrap finalized utterance text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The transcript text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Consume the transcript, returning its text
    #[must_use]
    pub fn into_text(self) -> String {
        self.0
    }
}

/// Error from the transcription collaborator
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The recognizer rejected a control request
    #[error("recognizer error: {0}")]
    Recognizer(String),
}

/// Trait for the external transcription engine
///
/// Partial results stay inside the engine; only finalized transcripts reach
/// the core, exactly one per completed utterance.
#[async_trait]
pub trait TranscriptionControl: Send + Sync {
    /// Start recognizing a new utterance
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer cannot start.
    async fn begin(&self) -> Result<(), CaptureError>;

    /// Finalize the current utterance, flushing any pending partial so a
    /// final transcript is produced even if recognition has not naturally
    /// completed
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer cannot finalize.
    async fn finalize(&self) -> Result<(), CaptureError>;
}

/// State of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No capture in progress
    Idle,
    /// Voice capture active
    Capturing,
}

/// Gates when voice capture may start and end
///
/// At most one session is live at a time. Input gestures map onto
/// [`on_capture_begin`](Self::on_capture_begin) and
/// [`on_capture_end`](Self::on_capture_end) from whatever layer drives them;
/// no particular modality is assumed. Ending a session never cancels a
/// dispatch already submitted from an earlier transcript.
pub struct CaptureSessionManager {
    control: Arc<dyn TranscriptionControl>,
    state: Mutex<SessionState>,
}

impl CaptureSessionManager {
    /// Create a manager driving `control`
    #[must_use]
    pub fn new(control: Arc<dyn TranscriptionControl>) -> Self {
        Self {
            control,
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// Begin a capture session
    ///
    /// No-op while a session is already active, so re-entrant press/drag
    /// gestures cannot start a second concurrent capture.
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer fails to start; the session reverts
    /// to idle.
    pub async fn on_capture_begin(&self) -> Result<(), CaptureError> {
        if !self.transition(SessionState::Idle, SessionState::Capturing) {
            tracing::trace!("capture already active");
            return Ok(());
        }

        tracing::debug!("capture session started");
        if let Err(e) = self.control.begin().await {
            self.transition(SessionState::Capturing, SessionState::Idle);
            return Err(e);
        }
        Ok(())
    }

    /// End the capture session
    ///
    /// Idempotent: the first call after a begin forces the session idle and
    /// tells the recognizer to finalize; a racing natural end or repeated
    /// call finds the session already idle and does nothing.
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer fails to finalize; the session stays
    /// idle regardless.
    pub async fn on_capture_end(&self) -> Result<(), CaptureError> {
        if !self.transition(SessionState::Capturing, SessionState::Idle) {
            tracing::trace!("capture already idle");
            return Ok(());
        }

        tracing::debug!("capture session ended, finalizing transcript");
        self.control.finalize().await
    }

    /// Whether a capture session is active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .map(|state| *state == SessionState::Capturing)
            .unwrap_or_default()
    }

    /// Atomically move from `from` to `to`; false if the state was not `from`
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }
}
