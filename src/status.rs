//! Display-only status reporting
//!
//! A resolved publish request is mirrored to a status sink purely for
//! display before submission; nothing here affects correctness.

use crate::messaging::PublishRequest;

/// Trait for display sinks observing resolved publish requests
pub trait StatusSink: Send + Sync {
    /// Called with every resolved request, before submission
    fn request_resolved(&self, request: &PublishRequest);
}

/// Status sink that reports through the log
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn request_resolved(&self, request: &PublishRequest) {
        tracing::info!(
            topic = %request.topic,
            payload = %String::from_utf8_lossy(&request.payload),
            qos = request.qos.level(),
            retain = request.retain,
            "command resolved"
        );
    }
}
