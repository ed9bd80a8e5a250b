//! Gateway orchestration
//!
//! Wires transcript intake through interpretation, dispatch, and feedback,
//! and serializes every outcome callback through a single loop before it
//! touches shared state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::capture::Transcript;
use crate::dispatch::{
    DispatchCoordinator, DispatchOutcome, OutcomeStatus, OUTCOME_TIMEOUT,
};
use crate::feedback::FeedbackController;
use crate::interpret::{interpret, Interpretation};
use crate::messaging::{DeliveryEvent, FailureKind};
use crate::Result;

/// How often the pending table is swept for overdue entries
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// The Hearth gateway - drives transcripts to device actions
pub struct Gateway {
    coordinator: Arc<DispatchCoordinator>,
    feedback: Arc<FeedbackController>,
}

impl Gateway {
    /// Create a gateway from its collaborators
    #[must_use]
    pub const fn new(
        coordinator: Arc<DispatchCoordinator>,
        feedback: Arc<FeedbackController>,
    ) -> Self {
        Self {
            coordinator,
            feedback,
        }
    }

    /// Run the gateway until shutdown or the transcript source closes
    ///
    /// Transcripts, delivery events, and the eviction sweep are serialized
    /// through this single loop; nothing else touches the pending table once
    /// a request is in flight.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for startup failures.
    pub async fn run(
        &self,
        mut transcripts: mpsc::Receiver<Transcript>,
        mut events: mpsc::UnboundedReceiver<DeliveryEvent>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                transcript = transcripts.recv() => {
                    let Some(transcript) = transcript else {
                        tracing::info!("transcript source closed");
                        break;
                    };
                    self.handle_transcript(transcript).await;
                }
                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => self.handle_delivery(event),
                        None => {
                            tracing::warn!("delivery event channel closed");
                            events_open = false;
                        }
                    }
                }
                _ = sweep.tick() => self.sweep_overdue(),
            }
        }

        Ok(())
    }

    /// Process one finalized transcript through the full pipeline
    pub async fn handle_transcript(&self, transcript: Transcript) {
        tracing::info!(text = %transcript.text(), "transcript received");

        match interpret(&transcript) {
            Interpretation::Unrecognized => {
                tracing::info!("no command recognized");
                self.feedback.on_unrecognized();
            }
            Interpretation::DeviceOnly(device) => {
                // A device named without a target state is dropped silently.
                tracing::info!(?device, "no target state recognized, dropping");
            }
            Interpretation::Command(cmd) => match self.coordinator.dispatch(cmd).await {
                Ok(correlation_id) => {
                    tracing::debug!(%correlation_id, "submission accepted");
                    self.feedback.on_dispatch_started();
                }
                Err(e) => self.feedback.on_dispatch_failed(&e),
            },
        }
    }

    /// Route one delivery event to its pending request
    ///
    /// Events for unknown or already-evicted correlation ids are late
    /// arrivals and are discarded.
    pub fn handle_delivery(&self, event: DeliveryEvent) {
        let correlation_id = event.correlation_id();

        let Some(entry) = self.coordinator.resolve(correlation_id) else {
            tracing::debug!(%correlation_id, "late outcome discarded");
            return;
        };

        let status = match event {
            DeliveryEvent::Ack(_) => OutcomeStatus::Ack,
            DeliveryEvent::Failure(_, FailureKind::Security) => OutcomeStatus::SecurityError,
            DeliveryEvent::Failure(_, FailureKind::Transport) => OutcomeStatus::TransportError,
        };

        tracing::debug!(
            topic = %entry.request.topic,
            %correlation_id,
            ?status,
            "outcome received"
        );

        self.feedback.on_outcome(&DispatchOutcome {
            correlation_id,
            status,
        });
    }

    /// Evict requests that never received an outcome
    ///
    /// Evicted entries are reported as transport failures.
    pub fn sweep_overdue(&self) {
        for entry in self.coordinator.evict_older_than(OUTCOME_TIMEOUT) {
            let correlation_id = entry.request.correlation_id;
            tracing::warn!(
                topic = %entry.request.topic,
                %correlation_id,
                "no outcome within timeout"
            );
            self.feedback.on_outcome(&DispatchOutcome {
                correlation_id,
                status: OutcomeStatus::TransportError,
            });
        }
    }
}
