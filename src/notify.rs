//! Push notification modes and payloads.
//!
//! The backend renders notifications and publishes them on per-channel notify
//! topics. Users pick one of three modes; each mode maps to the channel set
//! this client subscribes to. Two door-open channels exist only to separate
//! subscribers by preferred sound; the long-open warning goes to both groups.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Notification channel for door-open alerts with the default tone.
pub const CHANNEL_DOOR_OPEN: &str = "door_open";
/// Notification channel for door-open alerts with the siren tone.
pub const CHANNEL_SIREN: &str = "siren";
/// Notification channel for door-left-open-too-long warnings.
pub const CHANNEL_DOOR_LONG: &str = "door_long";

/// User-selected notification mode, persisted as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum NotifyMode {
    #[default]
    Off,
    DefaultSound,
    SirenSound,
}

impl NotifyMode {
    /// Decode the persisted integer; unknown values fall back to `Off`.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::DefaultSound,
            2 => Self::SirenSound,
            _ => Self::Off,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::DefaultSound => 1,
            Self::SirenSound => 2,
        }
    }

    /// Notify channels this mode subscribes to.
    pub fn channels(self) -> &'static [&'static str] {
        match self {
            Self::Off => &[],
            Self::DefaultSound => &[CHANNEL_DOOR_OPEN, CHANNEL_DOOR_LONG],
            Self::SirenSound => &[CHANNEL_SIREN, CHANNEL_DOOR_LONG],
        }
    }
}

/// Sound selection for a presented notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum AlertTone {
    Default,
    Siren,
    Chime,
}

/// Rendered notification payload published by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    /// Optional tone hint from the backend ("default", "siren", "chime").
    #[serde(default)]
    pub sound: Option<String>,
}

impl NotificationMessage {
    /// Resolve the tone for this message.
    ///
    /// Long-open warnings always chime; otherwise the backend hint wins, and
    /// an absent or unknown hint falls back to the tone of the channel group.
    pub fn tone(&self, channel: &str) -> AlertTone {
        if channel == CHANNEL_DOOR_LONG {
            return AlertTone::Chime;
        }
        match self.sound.as_deref() {
            Some("siren") => AlertTone::Siren,
            Some("chime") => AlertTone::Chime,
            Some("default") => AlertTone::Default,
            _ if channel == CHANNEL_SIREN => AlertTone::Siren,
            _ => AlertTone::Default,
        }
    }
}
