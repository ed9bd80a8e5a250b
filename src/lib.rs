//! Hearth Gateway - Voice control gateway for smart home devices
//!
//! This library provides the core functionality for the Hearth gateway:
//! - Transcript interpretation into structured device commands
//! - Command dispatch over a publish/subscribe broker
//! - Spoken feedback through a speech synthesis sink
//! - Capture session management alongside in-flight dispatches
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Transcription engine                    │
//! │        (external, finalized transcripts)             │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Hearth Gateway                        │
//! │  Interpreter │ Dispatch │ Feedback │ Capture        │
//! └──────┬──────────────────────────────────┬───────────┘
//!        │                                  │
//! ┌──────▼──────────────┐      ┌────────────▼───────────┐
//! │  Messaging broker   │      │  Speech synthesis sink │
//! │  (publish/ack)      │      │  (fire-and-forget)     │
//! └─────────────────────┘      └────────────────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod interpret;
pub mod messaging;
pub mod speech;
pub mod status;

pub use capture::{CaptureSessionManager, Transcript, TranscriptionControl};
pub use config::Config;
pub use dispatch::{
    DispatchConfig, DispatchCoordinator, DispatchError, DispatchOutcome, OutcomeStatus,
};
pub use error::{Error, Result};
pub use feedback::FeedbackController;
pub use gateway::Gateway;
pub use interpret::{interpret, Action, Device, DeviceCommand, Interpretation};
pub use messaging::{
    CorrelationId, DeliveryEvent, FailureKind, LoopbackClient, MessagingClient, PublishRequest,
    QoS,
};
pub use speech::{HttpSpeechSink, LogSpeechSink, SpeechSink};
pub use status::{LogStatusSink, StatusSink};
