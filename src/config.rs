//! Configuration management for Hearth gateway
//!
//! Configuration is a TOML file overlaid on defaults; every field is
//! optional. The default location is the XDG config directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dispatch::DispatchConfig;
use crate::messaging::QoS;
use crate::speech::SpeechParams;
use crate::{Error, Result};

/// Hearth gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker connection settings
    pub broker: BrokerConfig,

    /// Speech synthesis settings
    pub speech: SpeechConfig,
}

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker URL
    pub url: String,

    /// Client identifier presented to the broker
    pub client_id: String,

    /// Delivery guarantee for every publish
    pub default_qos: QoS,

    /// Retain flag for every publish
    pub retain: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "tcp://localhost:1883".to_string(),
            client_id: "hearth".to_string(),
            default_qos: QoS::AtLeastOnce,
            retain: false,
        }
    }
}

/// Speech synthesis settings
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speech service endpoint; `None` routes utterances to the log
    pub endpoint: Option<String>,

    /// Voice identifier
    pub voice: String,

    /// Output volume (0-15)
    pub volume: u8,

    /// Voice pitch (0-9)
    pub pitch: u8,

    /// Speed multiplier
    pub speed: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let params = SpeechParams::default();
        Self {
            endpoint: None,
            voice: params.voice,
            volume: params.volume,
            pitch: params.pitch,
            speed: params.speed,
        }
    }
}

/// Top-level TOML configuration file schema
///
/// All fields optional; the file is a partial overlay on top of defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    broker: BrokerFileConfig,

    #[serde(default)]
    speech: SpeechFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct BrokerFileConfig {
    url: Option<String>,
    client_id: Option<String>,
    qos: Option<u8>,
    retain: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechFileConfig {
    endpoint: Option<String>,
    voice: Option<String>,
    volume: Option<u8>,
    pitch: Option<u8>,
    speed: Option<f32>,
}

impl Config {
    /// Load configuration from `path`, or from the default location
    ///
    /// A missing file yields defaults; a present file overlays only the
    /// fields it names.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed, or
    /// names an invalid QoS level.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(Self::default_path, |p| Some(p.to_path_buf()));

        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config = Self::parse(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse a TOML overlay into a full configuration
    ///
    /// # Errors
    ///
    /// Returns error on malformed TOML or an invalid QoS level.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::default();

        if let Some(url) = file.broker.url {
            config.broker.url = url;
        }
        if let Some(client_id) = file.broker.client_id {
            config.broker.client_id = client_id;
        }
        if let Some(level) = file.broker.qos {
            config.broker.default_qos = QoS::from_level(level)
                .ok_or_else(|| Error::Config(format!("invalid qos level: {level}")))?;
        }
        if let Some(retain) = file.broker.retain {
            config.broker.retain = retain;
        }

        if let Some(endpoint) = file.speech.endpoint {
            config.speech.endpoint = Some(endpoint);
        }
        if let Some(voice) = file.speech.voice {
            config.speech.voice = voice;
        }
        if let Some(volume) = file.speech.volume {
            config.speech.volume = volume;
        }
        if let Some(pitch) = file.speech.pitch {
            config.speech.pitch = pitch;
        }
        if let Some(speed) = file.speech.speed {
            config.speech.speed = speed;
        }

        Ok(config)
    }

    /// Default config file path under the XDG config directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "hearth", "hearth")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Per-publish dispatch settings
    #[must_use]
    pub const fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            qos: self.broker.default_qos,
            retain: self.broker.retain,
        }
    }

    /// Synthesis parameters for the speech sink
    #[must_use]
    pub fn speech_params(&self) -> SpeechParams {
        SpeechParams {
            voice: self.speech.voice.clone(),
            volume: self.speech.volume,
            pitch: self.speech.pitch,
            speed: self.speech.speed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}
