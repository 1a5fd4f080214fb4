//! Volume and ducking core of an in-vehicle voice assistant.
//!
//! The core process owns the volume state of each audio channel and
//! attenuates content while dialogs play. It talks to the audio process and
//! the GUI process over local UDP with JSON messages.

pub mod app_context;
pub mod channel_volume;
pub mod config;
pub mod controller;
pub mod ducking_policy;
pub mod gui_bridge;
pub mod locale_assets;
pub mod protocol;
pub mod speaker_bridge;
