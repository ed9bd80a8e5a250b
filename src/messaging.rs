//! Messaging client capability
//!
//! The broker transport is an opaque capability behind the [`MessagingClient`]
//! trait: submission returns an immediate accept/reject, delivery outcomes
//! arrive later as [`DeliveryEvent`]s on the channel the client was built with.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque token linking a publish request to its asynchronous outcome
pub type CorrelationId = Uuid;

/// Delivery guarantee level for a publish request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// Fire and forget
    AtMostOnce,
    /// Delivered at least once
    AtLeastOnce,
    /// Delivered exactly once
    ExactlyOnce,
}

impl QoS {
    /// Numeric level (0/1/2)
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }

    /// Parse a numeric level, `None` for anything outside 0..=2
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

/// An immutable publish request
///
/// Derived deterministically from a device command plus dispatch
/// configuration; never mutated after submission.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Broker topic
    pub topic: String,
    /// Message payload
    pub payload: Vec<u8>,
    /// Delivery guarantee
    pub qos: QoS,
    /// Whether the broker should retain the value for late subscribers
    pub retain: bool,
    /// Token matching this request to its eventual outcome
    pub correlation_id: CorrelationId,
}

/// Immediate submission failure reported by the client
#[derive(Debug, Error)]
pub enum PublishError {
    /// Credential or authorization failure
    #[error("security failure: {0}")]
    Security(String),

    /// Any other submission failure
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Kind of asynchronous delivery failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential or authorization failure
    Security,
    /// Any other delivery failure
    Transport,
}

/// Asynchronous delivery outcome for a submitted publish request
#[derive(Debug, Clone, Copy)]
pub enum DeliveryEvent {
    /// Broker acknowledged the publish
    Ack(CorrelationId),
    /// Delivery failed after submission
    Failure(CorrelationId, FailureKind),
}

impl DeliveryEvent {
    /// Correlation id this event refers to
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::Ack(id) | Self::Failure(id, _) => *id,
        }
    }
}

/// Trait for messaging client capabilities
///
/// `publish` submits asynchronously and must not block the caller beyond the
/// submission itself; delivery outcomes are reported through the event
/// channel handed to the client at construction.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Get the client name
    fn name(&self) -> &'static str;

    /// Submit a publish request
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Security`] on an immediate credential failure
    /// and [`PublishError::Transport`] on any other immediate failure. No
    /// retry is attempted either way.
    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError>;
}

/// In-process client that acknowledges every accepted publish
///
/// Stands in for a broker connection in development and tests; the real
/// transport lives outside this crate.
pub struct LoopbackClient {
    events: mpsc::UnboundedSender<DeliveryEvent>,
}

impl LoopbackClient {
    /// Create a loopback client reporting outcomes on `events`
    #[must_use]
    pub const fn new(events: mpsc::UnboundedSender<DeliveryEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl MessagingClient for LoopbackClient {
    fn name(&self) -> &'static str {
        "loopback"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        tracing::debug!(
            topic = %request.topic,
            qos = request.qos.level(),
            retain = request.retain,
            correlation_id = %request.correlation_id,
            "loopback publish accepted"
        );

        self.events
            .send(DeliveryEvent::Ack(request.correlation_id))
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}
