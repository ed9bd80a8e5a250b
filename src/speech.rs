//! Speech synthesis sink capability
//!
//! Utterances are handed off with an immediate accept/reject; synthesis runs
//! on the sink's own schedule and overlapping requests are serialized there,
//! never by the caller.

use serde::Serialize;
use thiserror::Error;

/// Longest utterance a sink has to accept, in UTF-8 bytes
pub const MAX_UTTERANCE_BYTES: usize = 1024;

/// Immediate rejection of an utterance
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The sink refused the utterance
    #[error("utterance rejected: {0}")]
    Rejected(String),
}

/// Trait for speech synthesis sinks
///
/// `speak` must return without waiting for synthesis or playback.
pub trait SpeechSink: Send + Sync {
    /// Get the sink name
    fn name(&self) -> &'static str;

    /// Accept an utterance for synthesis
    ///
    /// # Errors
    ///
    /// Returns [`SpeechError::Rejected`] when the utterance is empty or
    /// exceeds [`MAX_UTTERANCE_BYTES`].
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Validate an utterance before hand-off
fn check_utterance(text: &str) -> Result<(), SpeechError> {
    if text.is_empty() {
        return Err(SpeechError::Rejected("empty utterance".to_string()));
    }
    if text.len() > MAX_UTTERANCE_BYTES {
        return Err(SpeechError::Rejected(format!(
            "utterance exceeds {MAX_UTTERANCE_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Synthesis parameters sent with every utterance
#[derive(Debug, Clone)]
pub struct SpeechParams {
    /// Voice identifier
    pub voice: String,
    /// Output volume (0-15)
    pub volume: u8,
    /// Voice pitch (0-9)
    pub pitch: u8,
    /// Speed multiplier
    pub speed: f32,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            voice: "0".to_string(),
            volume: 8,
            pitch: 5,
            speed: 1.0,
        }
    }
}

/// Request body for the speech service
#[derive(Debug, Serialize)]
struct SynthesisRequest {
    text: String,
    voice: String,
    volume: u8,
    pitch: u8,
    speed: f32,
}

/// Sink that posts utterances to a speech-service endpoint
///
/// Requests are spawned fire-and-forget; a synthesis failure is logged and
/// never reported back to the caller.
pub struct HttpSpeechSink {
    client: reqwest::Client,
    endpoint: String,
    params: SpeechParams,
}

impl HttpSpeechSink {
    /// Create a sink posting to `endpoint`
    #[must_use]
    pub fn new(endpoint: String, params: SpeechParams) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            params,
        }
    }
}

impl SpeechSink for HttpSpeechSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        check_utterance(text)?;

        let request = SynthesisRequest {
            text: text.to_string(),
            voice: self.params.voice.clone(),
            volume: self.params.volume,
            pitch: self.params.pitch,
            speed: self.params.speed,
        };
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        drop(tokio::spawn(async move {
            match client.post(&endpoint).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(text = %request.text, "utterance synthesized");
                }
                Ok(response) => {
                    tracing::warn!(
                        status = %response.status(),
                        text = %request.text,
                        "speech service error"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, text = %request.text, "speech request failed");
                }
            }
        }));

        Ok(())
    }
}

/// Sink that logs utterances instead of synthesizing them
///
/// Used when no speech endpoint is configured.
pub struct LogSpeechSink;

impl SpeechSink for LogSpeechSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        check_utterance(text)?;
        tracing::info!(%text, "speak");
        Ok(())
    }
}
