use crate::app_context::ApplicationContext;
use crate::channel_volume::{ChannelVolumeError, ChannelVolumeManager, ChannelVolumeType};
use crate::ducking_policy::DuckingPolicy;
use crate::locale_assets::{LocaleAssetsManager, WakeWords};
use crate::protocol::{AuthorizationState, ControlMessage, DialogState, StatusMessage};
use crate::speaker_bridge::SpeakerEvent;
use log::LevelFilter;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes GUI requests and audio reports to the channel managers and the
/// supporting state stores.
pub struct CoreController {
    channels: HashMap<ChannelVolumeType, Arc<ChannelVolumeManager>>,
    ducking_policy: Arc<DuckingPolicy>,
    locale_assets: Arc<LocaleAssetsManager>,
    context: Arc<ApplicationContext>,
    dialog_active: bool,
}

impl CoreController {
    pub fn new(
        ducking_policy: Arc<DuckingPolicy>,
        locale_assets: Arc<LocaleAssetsManager>,
        context: Arc<ApplicationContext>,
    ) -> Self {
        Self {
            channels: HashMap::new(),
            ducking_policy,
            locale_assets,
            context,
            dialog_active: false,
        }
    }

    pub fn add_channel(&mut self, manager: Arc<ChannelVolumeManager>) {
        log::info!(
            "Managing channel {} (speaker {:#x})",
            manager.speaker_type(),
            manager.id()
        );
        self.channels.insert(manager.speaker_type(), manager);
    }

    pub fn channel(&self, channel: ChannelVolumeType) -> Option<&Arc<ChannelVolumeManager>> {
        self.channels.get(&channel)
    }

    /// Handles one text message from the GUI and returns the reply to send.
    /// Text that is not a control message is logged and dropped.
    pub fn handle_gui_message(&mut self, text: &str) -> Option<StatusMessage> {
        let msg: ControlMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Ignoring GUI message ({}): {}", e, text);
                return None;
            }
        };
        log::debug!("GUI request: {:?}", msg);
        Some(self.handle_control(msg))
    }

    fn handle_control(&mut self, msg: ControlMessage) -> StatusMessage {
        let request = msg.name();
        match msg {
            ControlMessage::StartDucking { channel } => {
                self.on_channel(request, channel, |m| m.start_ducking())
            }
            ControlMessage::StopDucking { channel } => {
                self.on_channel(request, channel, |m| m.stop_ducking())
            }
            ControlMessage::SetVolume { channel, volume } => {
                self.on_channel(request, channel, |m| match i8::try_from(volume) {
                    Ok(volume) => m.set_unducked_volume(volume),
                    Err(_) => Err(ChannelVolumeError::VolumeOutOfRange(volume)),
                })
            }
            ControlMessage::SetMute { channel, mute } => {
                self.on_channel(request, channel, |m| m.set_mute(mute))
            }
            ControlMessage::GetSettings { channel } => self.speaker_settings(request, channel),
            ControlMessage::SetDuckingAllowed { allowed } => {
                self.ducking_policy.set_ducking_allowed(allowed);
                StatusMessage::success(request)
            }
            ControlMessage::Dialog { state } => self.on_dialog(request, state),
            ControlMessage::GetLocales => self.locales(),
            ControlMessage::ChangeLocale { locales, wake_words } => {
                let wake_words: WakeWords = wake_words.into_iter().collect();
                match self.locale_assets.change_assets(&locales, &wake_words) {
                    Ok(()) => StatusMessage::success(request),
                    Err(e) => {
                        log::warn!("Locale change to {:?} rejected: {}", locales, e);
                        StatusMessage::failure(request, e)
                    }
                }
            }
            ControlMessage::RegisterMenu { id, menu } => {
                let count = self.context.register_menu(id.clone(), menu);
                log::info!("Registered menu {} ({} menus)", id, count);
                StatusMessage::success(request)
            }
            ControlMessage::GetMenuValue { id, default } => {
                let value = self.context.menu_item_value(&id, default);
                StatusMessage::MenuValue { id, value }
            }
            ControlMessage::Authorization { service, state } => {
                self.on_authorization(&service, state);
                StatusMessage::success(request)
            }
            ControlMessage::SetLogLevel { level } => match level.parse::<LevelFilter>() {
                Ok(level) => {
                    log::set_max_level(level);
                    self.context.set_level(level);
                    StatusMessage::success(request)
                }
                Err(e) => StatusMessage::failure(request, e),
            },
        }
    }

    fn on_channel<F>(&self, request: &str, channel: ChannelVolumeType, f: F) -> StatusMessage
    where
        F: FnOnce(&ChannelVolumeManager) -> Result<(), ChannelVolumeError>,
    {
        let Some(manager) = self.channels.get(&channel) else {
            return StatusMessage::failure(request, format!("unknown channel {}", channel));
        };
        match f(manager) {
            Ok(()) => StatusMessage::success(request),
            Err(e) => {
                log::warn!("{} on {} failed: {}", request, channel, e);
                StatusMessage::failure(request, e)
            }
        }
    }

    fn speaker_settings(&self, request: &str, channel: ChannelVolumeType) -> StatusMessage {
        let Some(manager) = self.channels.get(&channel) else {
            return StatusMessage::failure(request, format!("unknown channel {}", channel));
        };
        match manager.settings_snapshot() {
            Ok((settings, ducked)) => StatusMessage::SpeakerSettings {
                channel,
                settings,
                ducked,
            },
            Err(e) => StatusMessage::failure(request, e),
        }
    }

    fn on_dialog(&mut self, request: &str, state: DialogState) -> StatusMessage {
        let active = state == DialogState::Start;
        if self.dialog_active == active {
            return StatusMessage::success(request);
        }

        let channel = ChannelVolumeType::AvsSpeakerVolume;
        let Some(manager) = self.channels.get(&channel) else {
            return StatusMessage::failure(request, format!("unknown channel {}", channel));
        };
        let result = match state {
            DialogState::Start => manager.start_ducking(),
            DialogState::Stop => manager.stop_ducking(),
        };

        match result {
            Ok(()) => {
                self.dialog_active = active;
                log::info!("Dialog {}", if active { "started" } else { "stopped" });
                StatusMessage::success(request)
            }
            // The dialog still runs when ducking is denied; the matching stop is harmless.
            Err(e @ ChannelVolumeError::DuckingDenied) => {
                self.dialog_active = active;
                log::info!("Dialog started without ducking");
                StatusMessage::failure(request, e)
            }
            // The channel did not change, so the next request for this state retries.
            Err(e) => {
                log::warn!("Dialog {:?} on {} failed: {}", state, channel, e);
                StatusMessage::failure(request, e)
            }
        }
    }

    fn on_authorization(&self, service: &str, state: AuthorizationState) {
        match state {
            AuthorizationState::InProgress => self.context.set_authorization_in_progress(service),
            AuthorizationState::Authorized => {
                self.context.set_active_authorization(service);
                if self.context.is_authorization_in_progress(service) {
                    self.context.set_authorization_in_progress("");
                }
            }
            AuthorizationState::Unauthorized => {
                if self.context.is_authorization_active(service) {
                    self.context.set_active_authorization("");
                }
                if self.context.is_authorization_in_progress(service) {
                    self.context.set_authorization_in_progress("");
                }
            }
        }
        log::info!("Authorization {} -> {:?}", service, state);
    }

    fn locales(&self) -> StatusMessage {
        let (active, wake_words) = self.locale_assets.active_assets();
        StatusMessage::Locales {
            supported: self.locale_assets.supported_locales().into_iter().collect(),
            combinations: self.locale_assets.supported_locale_combinations(),
            default: self.locale_assets.default_locale(),
            active,
            wake_words: wake_words.into_iter().collect(),
        }
    }

    /// Applies a report from the audio process to its channel and converts it
    /// into a GUI notification.
    pub fn handle_speaker_event(&self, event: SpeakerEvent) -> StatusMessage {
        let SpeakerEvent::Changed(channel, settings) = event;
        let ducked = match self.channels.get(&channel) {
            Some(manager) => match manager.on_speaker_settings_changed(settings) {
                Ok(ducked) => ducked,
                Err(e) => {
                    log::error!("Failed to record report for {}: {}", channel, e);
                    false
                }
            },
            None => false,
        };
        log::info!(
            "Audio process reports {}: volume {} mute {}",
            channel,
            settings.volume,
            settings.mute
        );
        StatusMessage::SpeakerSettings {
            channel,
            settings,
            ducked,
        }
    }
}
