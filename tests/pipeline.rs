//! End-to-end pipeline tests
//!
//! Exercise the transcript-to-publish flow against fake capabilities,
//! without a broker or speech hardware.

use std::sync::Arc;
use std::time::Duration;

use hearth_gateway::capture::CaptureSessionManager;
use hearth_gateway::dispatch::{DispatchConfig, DispatchCoordinator};
use hearth_gateway::feedback::{
    FeedbackController, EXECUTING_UTTERANCE, FAULT_UTTERANCE, UNRECOGNIZED_UTTERANCE,
};
use hearth_gateway::messaging::{DeliveryEvent, FailureKind, QoS};
use hearth_gateway::{Gateway, LogStatusSink, Transcript};
use tokio::sync::mpsc;
use tokio_test::assert_ok;

mod common;

use common::{PendingRecognizer, RecordingClient, RecordingSink};

/// Wire a gateway around a recording client and sink
fn gateway(client: Arc<RecordingClient>, sink: Arc<RecordingSink>) -> Gateway {
    let coordinator = Arc::new(DispatchCoordinator::new(
        client,
        Arc::new(LogStatusSink),
        DispatchConfig {
            qos: QoS::AtLeastOnce,
            retain: false,
        },
    ));
    let feedback = Arc::new(FeedbackController::new(sink));
    Gateway::new(coordinator, feedback)
}

#[tokio::test]
async fn light_on_transcript_publishes_wire_format() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("打开灯")).await;

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].topic, "light");
    assert_eq!(requests[0].payload, b"1");
    assert_eq!(requests[0].qos, QoS::AtLeastOnce);
    assert!(!requests[0].retain);

    assert_eq!(sink.spoken(), vec![EXECUTING_UTTERANCE.to_string()]);
}

#[tokio::test]
async fn air_conditioner_off_transcript_publishes_wire_format() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("关闭空调")).await;

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].topic, "air_condition");
    assert_eq!(requests[0].payload, b"0");
}

#[tokio::test]
async fn unrecognized_transcript_never_publishes() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("你好")).await;

    assert!(client.requests().is_empty());
    assert_eq!(sink.spoken(), vec![UNRECOGNIZED_UTTERANCE.to_string()]);
}

#[tokio::test]
async fn device_without_action_never_publishes() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("电视机")).await;

    assert!(client.requests().is_empty());
    assert!(sink.spoken().is_empty());
}

#[tokio::test]
async fn ack_adds_nothing_after_optimistic_announcement() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("打开窗帘")).await;
    let correlation_id = client.requests()[0].correlation_id;
    gateway.handle_delivery(DeliveryEvent::Ack(correlation_id));

    // Exactly one "executing" line, spoken at submit time; the ack is silent.
    assert_eq!(sink.spoken(), vec![EXECUTING_UTTERANCE.to_string()]);
}

#[tokio::test]
async fn security_rejection_speaks_fault_and_skips_announcement() {
    let client = Arc::new(RecordingClient::rejecting(FailureKind::Security));
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("打开灯")).await;

    assert!(client.requests().is_empty());
    assert_eq!(sink.spoken(), vec![FAULT_UTTERANCE.to_string()]);
}

#[tokio::test]
async fn transport_rejection_speaks_fault() {
    let client = Arc::new(RecordingClient::rejecting(FailureKind::Transport));
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("关灯")).await;

    assert_eq!(sink.spoken(), vec![FAULT_UTTERANCE.to_string()]);
}

#[tokio::test]
async fn delivery_failure_after_ack_window_speaks_fault() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    gateway.handle_transcript(Transcript::new("打开电视")).await;
    let correlation_id = client.requests()[0].correlation_id;
    gateway.handle_delivery(DeliveryEvent::Failure(
        correlation_id,
        FailureKind::Transport,
    ));

    assert_eq!(
        sink.spoken(),
        vec![EXECUTING_UTTERANCE.to_string(), FAULT_UTTERANCE.to_string()]
    );

    // A duplicate outcome for the same id is late and must stay silent.
    gateway.handle_delivery(DeliveryEvent::Ack(correlation_id));
    assert_eq!(sink.spoken().len(), 2);
}

#[tokio::test]
async fn double_capture_end_finalizes_once() {
    let (tx, mut rx) = mpsc::channel(4);
    let recognizer = Arc::new(PendingRecognizer::new(tx));
    let manager = CaptureSessionManager::new(recognizer.clone());

    assert_ok!(manager.on_capture_begin().await);
    recognizer.feed("打开灯");
    assert_ok!(manager.on_capture_end().await);
    assert_ok!(manager.on_capture_end().await);

    let transcript = rx.recv().await.unwrap();
    assert_eq!(transcript.text(), "打开灯");
    assert!(rx.try_recv().is_err());
    assert!(!manager.is_active());
}

#[tokio::test]
async fn capture_end_does_not_cancel_in_flight_dispatch() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = gateway(client.clone(), sink.clone());

    let (tx, mut rx) = mpsc::channel(4);
    let recognizer = Arc::new(PendingRecognizer::new(tx));
    let manager = CaptureSessionManager::new(recognizer.clone());

    // First session dispatches a command.
    manager.on_capture_begin().await.unwrap();
    recognizer.feed("打开灯");
    manager.on_capture_end().await.unwrap();
    let transcript = rx.recv().await.unwrap();
    gateway.handle_transcript(transcript).await;
    let correlation_id = client.requests()[0].correlation_id;

    // A second session starts while the first dispatch is still in flight.
    manager.on_capture_begin().await.unwrap();
    assert!(manager.is_active());

    // The earlier dispatch still resolves normally.
    gateway.handle_delivery(DeliveryEvent::Ack(correlation_id));
    assert_eq!(sink.spoken(), vec![EXECUTING_UTTERANCE.to_string()]);

    manager.on_capture_end().await.unwrap();
}

#[tokio::test]
async fn run_loop_drives_transcripts_to_outcomes() {
    let client = Arc::new(RecordingClient::accepting());
    let sink = Arc::new(RecordingSink::new());
    let gateway = Arc::new(gateway(client.clone(), sink.clone()));

    let (transcript_tx, transcript_rx) = mpsc::channel(4);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let runner = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            gateway
                .run(transcript_rx, event_rx, &mut shutdown_rx)
                .await
        })
    };

    transcript_tx
        .send(Transcript::new("打开灯"))
        .await
        .unwrap();

    // Wait for the publish to land, then ack it through the event channel.
    let correlation_id = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Some(request) = client.requests().first() {
                break request.correlation_id;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    event_tx.send(DeliveryEvent::Ack(correlation_id)).unwrap();

    shutdown_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), runner)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(sink.spoken(), vec![EXECUTING_UTTERANCE.to_string()]);
}
