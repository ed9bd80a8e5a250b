use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hearth_gateway::capture::{CaptureError, CaptureSessionManager, TranscriptionControl};
use hearth_gateway::feedback::FeedbackController;
use hearth_gateway::{
    interpret, Config, DispatchCoordinator, Gateway, HttpSpeechSink, Interpretation,
    LogSpeechSink, LogStatusSink, LoopbackClient, SpeechSink, Transcript,
};

/// Hearth - Voice control gateway for smart home devices
#[derive(Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interpret a transcript without dispatching it
    Interpret {
        /// Transcript text
        text: String,
        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Test the speech sink
    Say {
        /// Text to speak
        #[arg(default_value = "正在执行您的指令...")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,hearth_gateway=info",
        1 => "info,hearth_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Interpret { text, json } => cmd_interpret(&text, json),
            Command::Say { text } => cmd_say(&config, &text).await,
        };
    }

    run_gateway(config).await
}

/// Print the interpretation of a transcript
fn cmd_interpret(text: &str, json: bool) -> anyhow::Result<()> {
    let interpretation = interpret(&Transcript::new(text));

    if json {
        #[derive(serde::Serialize)]
        struct InterpretOutput<'a> {
            recognized: bool,
            topic: Option<&'a str>,
            payload: Option<u8>,
        }

        let output = match interpretation {
            Interpretation::Command(cmd) => InterpretOutput {
                recognized: true,
                topic: Some(cmd.device.topic()),
                payload: Some(cmd.action.code()),
            },
            Interpretation::DeviceOnly(device) => InterpretOutput {
                recognized: false,
                topic: Some(device.topic()),
                payload: None,
            },
            Interpretation::Unrecognized => InterpretOutput {
                recognized: false,
                topic: None,
                payload: None,
            },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match interpretation {
        Interpretation::Command(cmd) => {
            println!("topic:   {}", cmd.device.topic());
            println!("payload: {}", cmd.action.code());
        }
        Interpretation::DeviceOnly(device) => {
            println!("device {device:?} recognized, but no target state");
        }
        Interpretation::Unrecognized => {
            println!("no command recognized");
        }
    }
    Ok(())
}

/// Speak one utterance through the configured sink
async fn cmd_say(config: &Config, text: &str) -> anyhow::Result<()> {
    let sink = build_speech_sink(config);
    println!("Speaking via {} sink: \"{text}\"", sink.name());
    sink.speak(text)?;

    // Give a fire-and-forget synthesis request time to land before exit.
    tokio::time::sleep(Duration::from_secs(1)).await;
    Ok(())
}

/// Run the gateway, reading stdin lines as finalized transcripts
async fn run_gateway(config: Config) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (transcript_tx, transcript_rx) = mpsc::channel(16);

    let client = Arc::new(LoopbackClient::new(event_tx));
    let coordinator = Arc::new(DispatchCoordinator::new(
        client,
        Arc::new(LogStatusSink),
        config.dispatch_config(),
    ));
    let feedback = Arc::new(FeedbackController::new(build_speech_sink(&config)));
    let gateway = Gateway::new(coordinator, feedback);

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    // Each stdin line simulates one hold-to-talk gesture: press, speak, release.
    let recognizer = Arc::new(LineRecognizer::new(transcript_tx));
    let capture = CaptureSessionManager::new(recognizer.clone());
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Err(e) = feed_line(&capture, &recognizer, line).await {
                tracing::warn!(error = %e, "capture session failed");
            }
        }
        tracing::debug!("stdin closed");
    });

    tracing::info!(
        broker = %config.broker.url,
        client_id = %config.broker.client_id,
        qos = config.broker.default_qos.level(),
        retain = config.broker.retain,
        "hearth gateway ready - type a command"
    );

    gateway.run(transcript_rx, event_rx, &mut shutdown_rx).await?;
    Ok(())
}

/// Build the speech sink from configuration
fn build_speech_sink(config: &Config) -> Arc<dyn SpeechSink> {
    match &config.speech.endpoint {
        Some(endpoint) => Arc::new(HttpSpeechSink::new(
            endpoint.clone(),
            config.speech_params(),
        )),
        None => Arc::new(LogSpeechSink),
    }
}

/// Run one line through a full capture session
async fn feed_line(
    capture: &CaptureSessionManager,
    recognizer: &LineRecognizer,
    line: String,
) -> Result<(), CaptureError> {
    capture.on_capture_begin().await?;
    recognizer.feed(line);
    capture.on_capture_end().await
}

/// Recognizer stand-in that treats each fed line as the pending utterance
struct LineRecognizer {
    pending: Mutex<Option<String>>,
    transcripts: mpsc::Sender<Transcript>,
}

impl LineRecognizer {
    fn new(transcripts: mpsc::Sender<Transcript>) -> Self {
        Self {
            pending: Mutex::new(None),
            transcripts,
        }
    }

    fn feed(&self, line: String) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(line);
        }
    }
}

#[async_trait]
impl TranscriptionControl for LineRecognizer {
    async fn begin(&self) -> Result<(), CaptureError> {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = None;
        }
        Ok(())
    }

    async fn finalize(&self) -> Result<(), CaptureError> {
        let flushed = self
            .pending
            .lock()
            .map(|mut pending| pending.take())
            .unwrap_or_default();

        if let Some(text) = flushed {
            self.transcripts
                .send(Transcript::new(text))
                .await
                .map_err(|e| CaptureError::Recognizer(e.to_string()))?;
        }
        Ok(())
    }
}
