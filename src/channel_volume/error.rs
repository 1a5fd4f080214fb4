use thiserror::Error;

use super::speaker::{AVS_SET_VOLUME_MAX, AVS_SET_VOLUME_MIN};

/// Failures reported by a speaker collaborator.
#[derive(Error, Debug)]
pub enum SpeakerError {
    #[error("speaker transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("speaker rejected command: {0}")]
    Rejected(String),

    #[error("speaker state unavailable")]
    Unavailable,
}

/// Failures reported by a channel volume controller.
#[derive(Error, Debug)]
pub enum ChannelVolumeError {
    /// No speaker was supplied at construction.
    #[error("a speaker is required to create a channel volume manager")]
    MissingSpeaker,

    #[error("volume {0} outside [{min}, {max}]", min = AVS_SET_VOLUME_MIN, max = AVS_SET_VOLUME_MAX)]
    VolumeOutOfRange(i64),

    #[error("ducking is not allowed")]
    DuckingDenied,

    #[error(transparent)]
    Speaker(#[from] SpeakerError),

    #[error("channel state lock poisoned")]
    LockPoisoned,
}
