//! Shared test fakes for the dispatch pipeline

use std::sync::Mutex;

use async_trait::async_trait;
use hearth_gateway::capture::{CaptureError, TranscriptionControl};
use hearth_gateway::messaging::{
    FailureKind, MessagingClient, PublishError, PublishRequest,
};
use hearth_gateway::speech::{SpeechError, SpeechSink};
use hearth_gateway::Transcript;
use tokio::sync::mpsc;

/// Messaging client that records accepted requests
///
/// Tests drive delivery outcomes themselves; an optional reject kind makes
/// every submission fail immediately.
pub struct RecordingClient {
    requests: Mutex<Vec<PublishRequest>>,
    reject: Option<FailureKind>,
}

impl RecordingClient {
    pub fn accepting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reject: None,
        }
    }

    pub fn rejecting(kind: FailureKind) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reject: Some(kind),
        }
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for RecordingClient {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        match self.reject {
            Some(FailureKind::Security) => {
                Err(PublishError::Security("credentials rejected".to_string()))
            }
            Some(FailureKind::Transport) => {
                Err(PublishError::Transport("broker unreachable".to_string()))
            }
            None => {
                self.requests.lock().unwrap().push(request.clone());
                Ok(())
            }
        }
    }
}

/// Speech sink that records every accepted utterance
pub struct RecordingSink {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Recognizer that flushes the last fed utterance on finalize
pub struct PendingRecognizer {
    pending: Mutex<Option<String>>,
    transcripts: mpsc::Sender<Transcript>,
}

impl PendingRecognizer {
    pub fn new(transcripts: mpsc::Sender<Transcript>) -> Self {
        Self {
            pending: Mutex::new(None),
            transcripts,
        }
    }

    pub fn feed(&self, text: &str) {
        *self.pending.lock().unwrap() = Some(text.to_string());
    }
}

#[async_trait]
impl TranscriptionControl for PendingRecognizer {
    async fn begin(&self) -> Result<(), CaptureError> {
        *self.pending.lock().unwrap() = None;
        Ok(())
    }

    async fn finalize(&self) -> Result<(), CaptureError> {
        let flushed = self.pending.lock().unwrap().take();
        if let Some(text) = flushed {
            self.transcripts
                .send(Transcript::new(text))
                .await
                .map_err(|e| CaptureError::Recognizer(e.to_string()))?;
        }
        Ok(())
    }
}
