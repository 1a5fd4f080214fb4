//! Collaborator contracts consumed by [`ChannelVolumeManager`](super::ChannelVolumeManager).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::SpeakerError;

/// Lowest volume accepted by a channel.
pub const AVS_SET_VOLUME_MIN: i8 = 0;
/// Highest volume accepted by a channel.
pub const AVS_SET_VOLUME_MAX: i8 = 100;

/// The logical audio role a channel controller addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelVolumeType {
    /// Dialog and content playback.
    #[default]
    AvsSpeakerVolume,
    /// Alarms, timers and notifications.
    AvsAlertsVolume,
}

impl fmt::Display for ChannelVolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelVolumeType::AvsSpeakerVolume => write!(f, "avs_speaker_volume"),
            ChannelVolumeType::AvsAlertsVolume => write!(f, "avs_alerts_volume"),
        }
    }
}

/// Volume and mute as reported by a speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerSettings {
    pub volume: i8,
    pub mute: bool,
}

impl Default for SpeakerSettings {
    fn default() -> Self {
        Self {
            volume: AVS_SET_VOLUME_MIN,
            mute: false,
        }
    }
}

/// The sink for volume and mute commands.
///
/// Calls are made while the owning controller holds its lock, so
/// implementations must return without blocking.
pub trait SpeakerInterface: Send + Sync {
    fn set_volume(&self, volume: i8) -> Result<(), SpeakerError>;
    fn set_mute(&self, mute: bool) -> Result<(), SpeakerError>;
    fn get_speaker_settings(&self) -> Result<SpeakerSettings, SpeakerError>;
}

/// Answers whether ducking is currently permitted.
pub trait DuckingInterface: Send + Sync {
    fn is_ducking_allowed(&self) -> bool;
}
