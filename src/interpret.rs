//! Transcript interpretation
//!
//! Maps a finalized transcript onto a structured device command by substring
//! containment against fixed keyword tables.

use crate::capture::Transcript;

/// A controllable home device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Room lighting
    Light,
    /// Air conditioner
    AirConditioner,
    /// Television
    Tv,
    /// Window curtain
    Curtain,
}

/// Device evaluation order. Overlapping keyword hits resolve to the first
/// matching category, not the most specific one. Known limitation: "电视窗帘"
/// resolves to [`Device::Tv`].
const DEVICE_PRIORITY: [Device; 4] = [
    Device::Light,
    Device::AirConditioner,
    Device::Tv,
    Device::Curtain,
];

impl Device {
    /// Spoken keywords that select this device
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Light => &["灯"],
            Self::AirConditioner => &["空调"],
            Self::Tv => &["电视", "TV", "电视机"],
            Self::Curtain => &["窗", "窗帘"],
        }
    }

    /// Broker topic this device is addressed on
    #[must_use]
    pub const fn topic(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::AirConditioner => "air_condition",
            Self::Tv => "tv",
            Self::Curtain => "window",
        }
    }
}

/// Target state for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Switch the device on
    On,
    /// Switch the device off
    Off,
}

impl Action {
    /// Integer wire code (`1` = on, `0` = off)
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::On => 1,
            Self::Off => 0,
        }
    }
}

/// A fully resolved device command, ready for dispatch
///
/// Only commands with a known action exist as this type; a transcript that
/// names a device without an on/off keyword never produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCommand {
    /// Device the command addresses
    pub device: Device,
    /// Target state
    pub action: Action,
}

/// Result of interpreting one transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    /// Device and action both recognized
    Command(DeviceCommand),
    /// Device recognized but neither on- nor off-keyword present
    DeviceOnly(Device),
    /// No device keyword present
    Unrecognized,
}

impl Interpretation {
    /// Whether this interpretation carries a dispatchable command
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }
}

/// Interpret a finalized transcript into a device command
///
/// Pure function of the transcript and the fixed keyword tables. Empty or
/// whitespace-only transcripts are unrecognized, never an error.
#[must_use]
pub fn interpret(transcript: &Transcript) -> Interpretation {
    let text = transcript.text();
    if text.trim().is_empty() {
        return Interpretation::Unrecognized;
    }

    let Some(device) = match_device(text) else {
        return Interpretation::Unrecognized;
    };

    match match_action(text) {
        Some(action) => Interpretation::Command(DeviceCommand { device, action }),
        None => Interpretation::DeviceOnly(device),
    }
}

/// Find the first device whose keyword appears in the text
fn match_device(text: &str) -> Option<Device> {
    DEVICE_PRIORITY
        .into_iter()
        .find(|device| device.keywords().iter().any(|kw| text.contains(kw)))
}

/// Resolve the target state from on/off keywords ("开" wins over "关")
fn match_action(text: &str) -> Option<Action> {
    if text.contains("开") {
        Some(Action::On)
    } else if text.contains("关") {
        Some(Action::Off)
    } else {
        None
    }
}
