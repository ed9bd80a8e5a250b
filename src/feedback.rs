//! Spoken feedback
//!
//! Drives fixed user-facing utterances through the speech sink. Every entry
//! point is fire-and-forget: a sink rejection is logged and never propagated,
//! and nothing here waits on synthesis.

use std::sync::{Arc, Mutex};

use crate::dispatch::{DispatchError, DispatchOutcome, OutcomeStatus};
use crate::speech::SpeechSink;

/// Spoken when no command could be recognized in a transcript
pub const UNRECOGNIZED_UTTERANCE: &str = "对不起，我没听懂您在说什么！";

/// Spoken at submit time, before the broker acknowledges
pub const EXECUTING_UTTERANCE: &str = "正在执行您的指令...";

/// Spoken when a command failed at submission or delivery
pub const FAULT_UTTERANCE: &str = "对不起，由于系统问题，您的指令无法正常执行。";

/// Whether an utterance hand-off is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerState {
    /// No utterance being handed off
    Idle,
    /// An utterance is being handed to the sink
    Speaking,
}

/// Drives spoken feedback for the dispatch pipeline
pub struct FeedbackController {
    sink: Arc<dyn SpeechSink>,
    state: Mutex<SpeakerState>,
}

impl FeedbackController {
    /// Create a controller speaking through `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn SpeechSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(SpeakerState::Idle),
        }
    }

    /// Announce that a transcript was not understood
    pub fn on_unrecognized(&self) {
        self.say(UNRECOGNIZED_UTTERANCE);
    }

    /// Announce execution immediately after a successful submission
    ///
    /// Spoken optimistically at submit time, not at confirmed delivery.
    pub fn on_dispatch_started(&self) {
        self.say(EXECUTING_UTTERANCE);
    }

    /// Report the resolved outcome of a dispatched command
    ///
    /// An acknowledgment triggers no utterance; the "executing" line was
    /// already spoken at submit time.
    pub fn on_outcome(&self, outcome: &DispatchOutcome) {
        match outcome.status {
            OutcomeStatus::Ack => {
                tracing::debug!(
                    correlation_id = %outcome.correlation_id,
                    "command acknowledged"
                );
            }
            OutcomeStatus::SecurityError | OutcomeStatus::TransportError => {
                tracing::warn!(
                    correlation_id = %outcome.correlation_id,
                    status = ?outcome.status,
                    "command failed after submission"
                );
                self.say(FAULT_UTTERANCE);
            }
        }
    }

    /// Report a submission that the messaging client rejected outright
    pub fn on_dispatch_failed(&self, error: &DispatchError) {
        tracing::warn!(error = %error, "command rejected at submission");
        self.say(FAULT_UTTERANCE);
    }

    /// Current hand-off state
    #[must_use]
    pub fn state(&self) -> SpeakerState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(SpeakerState::Idle)
    }

    /// Hand one utterance to the sink, logging a rejection
    fn say(&self, text: &str) {
        self.set_state(SpeakerState::Speaking);
        if let Err(e) = self.sink.speak(text) {
            tracing::warn!(sink = self.sink.name(), error = %e, "utterance dropped");
        }
        self.set_state(SpeakerState::Idle);
    }

    fn set_state(&self, state: SpeakerState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use uuid::Uuid;

    use super::*;
    use crate::speech::SpeechError;

    /// Sink that records accepted utterances, optionally rejecting all
    struct RecordingSink {
        spoken: StdMutex<Vec<String>>,
        reject: bool,
    }

    impl RecordingSink {
        fn new(reject: bool) -> Self {
            Self {
                spoken: StdMutex::new(Vec::new()),
                reject,
            }
        }

        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    impl SpeechSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn speak(&self, text: &str) -> Result<(), SpeechError> {
            if self.reject {
                return Err(SpeechError::Rejected("forced".to_string()));
            }
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn outcome(status: OutcomeStatus) -> DispatchOutcome {
        DispatchOutcome {
            correlation_id: Uuid::new_v4(),
            status,
        }
    }

    #[test]
    fn unrecognized_speaks_fixed_utterance() {
        let sink = Arc::new(RecordingSink::new(false));
        let controller = FeedbackController::new(sink.clone());

        controller.on_unrecognized();
        assert_eq!(sink.spoken(), vec![UNRECOGNIZED_UTTERANCE.to_string()]);
    }

    #[test]
    fn ack_triggers_no_utterance() {
        let sink = Arc::new(RecordingSink::new(false));
        let controller = FeedbackController::new(sink.clone());

        controller.on_dispatch_started();
        controller.on_outcome(&outcome(OutcomeStatus::Ack));

        assert_eq!(sink.spoken(), vec![EXECUTING_UTTERANCE.to_string()]);
    }

    #[test]
    fn delivery_failures_speak_fault() {
        for status in [OutcomeStatus::SecurityError, OutcomeStatus::TransportError] {
            let sink = Arc::new(RecordingSink::new(false));
            let controller = FeedbackController::new(sink.clone());

            controller.on_outcome(&outcome(status));
            assert_eq!(sink.spoken(), vec![FAULT_UTTERANCE.to_string()]);
        }
    }

    #[test]
    fn submission_failure_speaks_fault() {
        let sink = Arc::new(RecordingSink::new(false));
        let controller = FeedbackController::new(sink.clone());

        controller.on_dispatch_failed(&DispatchError::Security("denied".to_string()));
        assert_eq!(sink.spoken(), vec![FAULT_UTTERANCE.to_string()]);
    }

    #[test]
    fn sink_rejection_never_propagates() {
        let sink = Arc::new(RecordingSink::new(true));
        let controller = FeedbackController::new(sink.clone());

        controller.on_unrecognized();
        controller.on_dispatch_started();
        controller.on_outcome(&outcome(OutcomeStatus::TransportError));

        assert!(sink.spoken().is_empty());
        assert_eq!(controller.state(), SpeakerState::Idle);
    }
}
