//! channel_volume - per-channel volume, mute and ducking control
//!
//! A [`ChannelVolumeManager`] owns the unducked volume of one audio channel
//! and drives a [`SpeakerInterface`]. While ducked, the speaker receives the
//! unducked volume passed through a [`VolumeCurveFunction`].

mod curve;
mod error;
mod manager;
mod speaker;

pub use curve::{default_volume_attenuate, VolumeCurveFunction};
pub use error::{ChannelVolumeError, SpeakerError};
pub use manager::{ChannelVolumeManager, ChannelVolumeManagerBuilder};
pub use speaker::{
    ChannelVolumeType, DuckingInterface, SpeakerInterface, SpeakerSettings, AVS_SET_VOLUME_MAX,
    AVS_SET_VOLUME_MIN,
};
