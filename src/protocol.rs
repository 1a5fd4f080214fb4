use crate::channel_volume::{ChannelVolumeType, SpeakerSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DialogState {
    Start,
    Stop,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    Unauthorized,
    InProgress,
    Authorized,
}

/// Requests from the GUI process.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    StartDucking {
        channel: ChannelVolumeType,
    },
    StopDucking {
        channel: ChannelVolumeType,
    },
    /// `volume` is range-checked by the channel, so any integer parses.
    SetVolume {
        channel: ChannelVolumeType,
        volume: i64,
    },
    SetMute {
        channel: ChannelVolumeType,
        mute: bool,
    },
    GetSettings {
        channel: ChannelVolumeType,
    },
    SetDuckingAllowed {
        allowed: bool,
    },
    /// A voice dialog started or stopped; content on the speaker channel is
    /// ducked underneath it.
    Dialog {
        state: DialogState,
    },
    GetLocales,
    ChangeLocale {
        locales: Vec<String>,
        #[serde(default)]
        wake_words: Vec<String>,
    },
    RegisterMenu {
        id: String,
        menu: Value,
    },
    GetMenuValue {
        id: String,
        #[serde(default)]
        default: Value,
    },
    Authorization {
        service: String,
        state: AuthorizationState,
    },
    SetLogLevel {
        level: String,
    },
}

impl ControlMessage {
    /// The `type` tag, used to label replies.
    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::StartDucking { .. } => "start_ducking",
            ControlMessage::StopDucking { .. } => "stop_ducking",
            ControlMessage::SetVolume { .. } => "set_volume",
            ControlMessage::SetMute { .. } => "set_mute",
            ControlMessage::GetSettings { .. } => "get_settings",
            ControlMessage::SetDuckingAllowed { .. } => "set_ducking_allowed",
            ControlMessage::Dialog { .. } => "dialog",
            ControlMessage::GetLocales => "get_locales",
            ControlMessage::ChangeLocale { .. } => "change_locale",
            ControlMessage::RegisterMenu { .. } => "register_menu",
            ControlMessage::GetMenuValue { .. } => "get_menu_value",
            ControlMessage::Authorization { .. } => "authorization",
            ControlMessage::SetLogLevel { .. } => "set_log_level",
        }
    }
}

/// Replies and notifications to the GUI process.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusMessage {
    Result {
        request: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SpeakerSettings {
        channel: ChannelVolumeType,
        #[serde(flatten)]
        settings: SpeakerSettings,
        ducked: bool,
    },
    Locales {
        supported: Vec<String>,
        combinations: Vec<Vec<String>>,
        default: String,
        active: Vec<String>,
        wake_words: Vec<String>,
    },
    MenuValue {
        id: String,
        value: Value,
    },
}

impl StatusMessage {
    pub fn success(request: &str) -> Self {
        StatusMessage::Result {
            request: request.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failure(request: &str, error: impl ToString) -> Self {
        StatusMessage::Result {
            request: request.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}
