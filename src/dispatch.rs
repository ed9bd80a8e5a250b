//! Command dispatch coordination
//!
//! Turns a device command into a publish request, submits it through the
//! messaging client, and tracks the in-flight request until its outcome is
//! matched or the entry is evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::interpret::DeviceCommand;
use crate::messaging::{
    CorrelationId, MessagingClient, PublishError, PublishRequest, QoS,
};
use crate::status::StatusSink;

/// How long an in-flight request may wait for its outcome before the pending
/// entry is evicted and treated as a transport failure
pub const OUTCOME_TIMEOUT: Duration = Duration::from_secs(30);

/// Ambient per-publish settings
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Delivery guarantee for every publish
    pub qos: QoS,
    /// Retain flag for every publish
    pub retain: bool,
}

/// Terminal failure of a single dispatch attempt
///
/// A command gets exactly one publish attempt; neither kind is retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Credential or authorization failure at submission
    #[error("security failure at submission: {0}")]
    Security(String),

    /// Any other submission-time failure
    #[error("transport failure at submission: {0}")]
    Transport(String),
}

impl From<PublishError> for DispatchError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Security(msg) => Self::Security(msg),
            PublishError::Transport(msg) => Self::Transport(msg),
        }
    }
}

/// Final status of a dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Broker acknowledged delivery
    Ack,
    /// Credential or authorization failure
    SecurityError,
    /// Any other delivery failure, including outcome-wait eviction
    TransportError,
}

/// Resolved outcome of one dispatched command
#[derive(Debug, Clone, Copy)]
pub struct DispatchOutcome {
    /// The request this outcome belongs to
    pub correlation_id: CorrelationId,
    /// Final status
    pub status: OutcomeStatus,
}

/// A submitted request awaiting its outcome
#[derive(Debug, Clone)]
pub struct PendingDispatch {
    /// The immutable request as submitted
    pub request: PublishRequest,
    /// When the request was submitted
    pub submitted_at: Instant,
}

/// Coordinates command dispatch and outcome matching
///
/// Exclusively owns the pending table: entries are inserted on submission and
/// removed by [`resolve`](Self::resolve) or
/// [`evict_older_than`](Self::evict_older_than). An outcome arriving for an
/// id no longer in the table is late and is discarded by the caller.
pub struct DispatchCoordinator {
    client: Arc<dyn MessagingClient>,
    status: Arc<dyn StatusSink>,
    config: DispatchConfig,
    pending: Mutex<HashMap<CorrelationId, PendingDispatch>>,
}

impl DispatchCoordinator {
    /// Create a coordinator submitting through `client`
    #[must_use]
    pub fn new(
        client: Arc<dyn MessagingClient>,
        status: Arc<dyn StatusSink>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            client,
            status,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Derive the publish request for a command
    ///
    /// Topic is the device identifier verbatim; payload is the action's
    /// integer code as UTF-8 text.
    #[must_use]
    pub fn build_request(&self, cmd: DeviceCommand) -> PublishRequest {
        PublishRequest {
            topic: cmd.device.topic().to_string(),
            payload: cmd.action.code().to_string().into_bytes(),
            qos: self.config.qos,
            retain: self.config.retain,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Dispatch a command
    ///
    /// Submits one publish request and returns immediately with the
    /// correlation id used to match the eventual outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Security`] or [`DispatchError::Transport`]
    /// when the client rejects the submission; the pending entry is rolled
    /// back and no retry is attempted.
    pub async fn dispatch(&self, cmd: DeviceCommand) -> Result<CorrelationId, DispatchError> {
        let request = self.build_request(cmd);
        let correlation_id = request.correlation_id;

        self.status.request_resolved(&request);

        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(
                correlation_id,
                PendingDispatch {
                    request: request.clone(),
                    submitted_at: Instant::now(),
                },
            );
        }

        if let Err(e) = self.client.publish(&request).await {
            self.resolve(correlation_id);
            tracing::error!(
                client = self.client.name(),
                topic = %request.topic,
                error = %e,
                "publish submission failed"
            );
            return Err(e.into());
        }

        tracing::info!(
            client = self.client.name(),
            topic = %request.topic,
            payload = %String::from_utf8_lossy(&request.payload),
            qos = request.qos.level(),
            retain = request.retain,
            correlation_id = %correlation_id,
            "command dispatched"
        );

        Ok(correlation_id)
    }

    /// Remove and return the pending entry for an outcome
    ///
    /// `None` means the outcome is late: the entry was already resolved or
    /// evicted.
    pub fn resolve(&self, correlation_id: CorrelationId) -> Option<PendingDispatch> {
        self.pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&correlation_id))
    }

    /// Evict pending entries older than `age` and return them
    pub fn evict_older_than(&self, age: Duration) -> Vec<PendingDispatch> {
        let Ok(mut pending) = self.pending.lock() else {
            return Vec::new();
        };

        let overdue: Vec<CorrelationId> = pending
            .iter()
            .filter(|(_, entry)| entry.submitted_at.elapsed() > age)
            .map(|(id, _)| *id)
            .collect();

        overdue
            .into_iter()
            .filter_map(|id| pending.remove(&id))
            .collect()
    }

    /// Number of requests currently awaiting an outcome
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or_default()
    }
}
